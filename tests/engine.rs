use anyhow::Result;
use eqconsole::audio::analyzer::{Analyzer, AnalyzerHandle, DEFAULT_FFT_SIZE};
use eqconsole::audio::engine::{Engine, EngineHandle, EngineParams};
use eqconsole::graph::Topology;
use eqconsole::noise::{NoiseGenerator, NoiseKind};
use eqconsole::source::SourceKind;
use eqconsole::source::file::FilePlayer;
use std::f32::consts::TAU;

const SAMPLE_RATE: usize = 48_000;
const BUFFER_SIZE: usize = 256;

fn engine(params: &EngineParams) -> Result<(Engine, EngineHandle, AnalyzerHandle)> {
    let (analyzer, analyzer_handle) = Analyzer::new(DEFAULT_FFT_SIZE, SAMPLE_RATE)?;
    let (engine, handle) = Engine::new(SAMPLE_RATE, params, analyzer);
    Ok((engine, handle, analyzer_handle))
}

fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| amplitude * (TAU * freq * n as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Run `input` through the engine block by block and collect the output.
fn run(engine: &mut Engine, input: &[f32]) -> Result<Vec<f32>> {
    let mut output = vec![0.0; input.len()];
    for (inp, out) in input
        .chunks(BUFFER_SIZE)
        .zip(output.chunks_mut(BUFFER_SIZE))
    {
        engine.process(inp, out)?;
    }
    Ok(output)
}

#[test]
fn white_noise_through_flat_bank_reaches_analyzer() -> Result<()> {
    let (mut engine, handle, analyzer) = engine(&EngineParams::default())?;
    handle.start_noise(NoiseGenerator::new(NoiseKind::White, SAMPLE_RATE));
    handle.set_topology(Topology {
        source: Some(SourceKind::White),
        through_noise_gain: true,
        equalized: true,
    });

    let output = run(&mut engine, &vec![0.0; SAMPLE_RATE / 4])?;

    assert!(output.iter().any(|&x| x != 0.0), "expected non-zero output");
    // Noise level 0.2 into master 0.8 with every band flat.
    let bound = 0.2 * 0.8 + 1e-3;
    assert!(output.iter().all(|x| x.abs() <= bound));
    assert!(analyzer.snapshot().energy() > 0);

    Ok(())
}

#[test]
fn boosted_band_raises_level_at_its_center() -> Result<()> {
    let params = EngineParams {
        master_volume: 1.0,
        ..EngineParams::default()
    };
    let (mut engine, handle, _) = engine(&params)?;
    handle.set_band_gain(5, 12.0, 0.0);
    handle.set_topology(Topology {
        source: Some(SourceKind::Mic),
        through_noise_gain: false,
        equalized: true,
    });

    let input = sine(1000.0, 0.1, SAMPLE_RATE / 2);
    let output = run(&mut engine, &input)?;

    let settled = SAMPLE_RATE / 4;
    let gain = rms(&output[settled..]) / rms(&input[settled..]);
    let expected = 10f32.powf(12.0 / 20.0);
    assert!((gain - expected).abs() < 0.25, "gain {gain}, expected {expected}");

    Ok(())
}

#[test]
fn bypass_skips_the_bank() -> Result<()> {
    let params = EngineParams {
        master_volume: 1.0,
        ..EngineParams::default()
    };
    let (mut engine, handle, _) = engine(&params)?;
    handle.set_band_gains([20.0; 10], 0.0);
    handle.set_topology(Topology {
        source: Some(SourceKind::Mic),
        through_noise_gain: false,
        equalized: false,
    });

    let input = sine(440.0, 0.25, BUFFER_SIZE * 8);
    let output = run(&mut engine, &input)?;

    assert_eq!(output, input);
    Ok(())
}

#[test]
fn file_plays_once_then_falls_silent() -> Result<()> {
    let params = EngineParams {
        master_volume: 1.0,
        ..EngineParams::default()
    };
    let (mut engine, handle, _) = engine(&params)?;
    let clip = vec![0.5; BUFFER_SIZE * 2 + 10];

    handle.load_file(FilePlayer::new(clip.clone()));
    handle.set_file_playing(true);
    handle.set_topology(Topology {
        source: Some(SourceKind::File),
        through_noise_gain: false,
        equalized: false,
    });

    let output = run(&mut engine, &vec![0.0; BUFFER_SIZE * 4])?;

    assert_eq!(&output[..clip.len()], clip.as_slice());
    assert!(output[clip.len()..].iter().all(|&x| x == 0.0));
    assert!(!engine.file().is_some_and(FilePlayer::is_playing));

    Ok(())
}

#[test]
fn topology_switch_changes_source_at_block_boundary() -> Result<()> {
    let params = EngineParams {
        master_volume: 1.0,
        ..EngineParams::default()
    };
    let (mut engine, handle, _) = engine(&params)?;
    handle.set_topology(Topology {
        source: Some(SourceKind::Mic),
        through_noise_gain: false,
        equalized: false,
    });

    let input = vec![0.3; BUFFER_SIZE];
    let mut output = vec![0.0; BUFFER_SIZE];
    engine.process(&input, &mut output)?;
    assert_eq!(output, input);

    handle.set_topology(Topology::default());
    engine.process(&input, &mut output)?;
    assert!(output.iter().all(|&x| x == 0.0));

    Ok(())
}
