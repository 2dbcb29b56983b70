use anyhow::{Result, bail};
use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, error, warn};

use crate::audio::analyzer::Analyzer;
use crate::dsp::Stage;
use crate::dsp::level::LevelStage;
use crate::eq::bank::FilterBank;
use crate::eq::{BAND_COUNT, DEFAULT_Q};
use crate::graph::Topology;
use crate::noise::{NoiseGenerator, NoiseKind};
use crate::source::SourceKind;
use crate::source::file::FilePlayer;

const CHANNEL_CAPACITY: usize = 1024;

pub const MAX_MASTER_GAIN: f32 = 2.0;
pub const MAX_NOISE_LEVEL: f32 = 1.0;
/// Time constant for master and noise level moves.
pub const LEVEL_RAMP_SECONDS: f32 = 0.01;

pub enum EngineMessage {
    SetTopology(Topology),
    LoadFile(Box<FilePlayer>),
    UnloadFile,
    SetFilePlaying(bool),
    StartNoise(Box<NoiseGenerator>),
    StopNoise(NoiseKind),
    SetBandGain {
        band: usize,
        db: f32,
        ramp_seconds: f32,
    },
    SetBandGains {
        gains: [f32; BAND_COUNT],
        ramp_seconds: f32,
    },
    SetQ(f32),
    SetMasterGain(f32),
    SetNoiseLevel(f32),
}

/// Starting values for the engine's parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    pub q: f32,
    pub master_volume: f32,
    pub noise_level: f32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            q: DEFAULT_Q,
            master_volume: 0.8,
            noise_level: 0.2,
        }
    }
}

/// Control-side sender for [`EngineMessage`]s. Every method reports whether
/// the message was queued.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineMessage>,
    sample_rate: usize,
}

impl EngineHandle {
    pub const fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    fn send(&self, message: EngineMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                error!("Engine message queue is full, dropping message");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                error!("Engine is gone, dropping message");
                false
            }
        }
    }

    pub fn set_topology(&self, topology: Topology) -> bool {
        self.send(EngineMessage::SetTopology(topology))
    }

    pub fn load_file(&self, player: FilePlayer) -> bool {
        self.send(EngineMessage::LoadFile(Box::new(player)))
    }

    pub fn unload_file(&self) -> bool {
        self.send(EngineMessage::UnloadFile)
    }

    pub fn set_file_playing(&self, playing: bool) -> bool {
        self.send(EngineMessage::SetFilePlaying(playing))
    }

    pub fn start_noise(&self, generator: NoiseGenerator) -> bool {
        self.send(EngineMessage::StartNoise(Box::new(generator)))
    }

    pub fn stop_noise(&self, kind: NoiseKind) -> bool {
        self.send(EngineMessage::StopNoise(kind))
    }

    pub fn set_band_gain(&self, band: usize, db: f32, ramp_seconds: f32) -> bool {
        self.send(EngineMessage::SetBandGain {
            band,
            db,
            ramp_seconds,
        })
    }

    pub fn set_band_gains(&self, gains: [f32; BAND_COUNT], ramp_seconds: f32) -> bool {
        self.send(EngineMessage::SetBandGains {
            gains,
            ramp_seconds,
        })
    }

    pub fn set_q(&self, q: f32) -> bool {
        self.send(EngineMessage::SetQ(q))
    }

    pub fn set_master_gain(&self, gain: f32) -> bool {
        self.send(EngineMessage::SetMasterGain(gain))
    }

    pub fn set_noise_level(&self, level: f32) -> bool {
        self.send(EngineMessage::SetNoiseLevel(level))
    }
}

pub struct Engine {
    /// Channel for routing and parameter updates from the control thread.
    rx_updates: Receiver<EngineMessage>,
    topology: Topology,
    bank: FilterBank,
    /// Whether the bank processed the previous block.
    bank_in_path: bool,
    noise_gain: LevelStage,
    master: LevelStage,
    file: Option<Box<FilePlayer>>,
    noise: Option<Box<NoiseGenerator>>,
    analyzer: Analyzer,
}

impl Engine {
    pub fn new(
        sample_rate: usize,
        params: &EngineParams,
        analyzer: Analyzer,
    ) -> (Self, EngineHandle) {
        let (tx, rx_updates) = bounded(CHANNEL_CAPACITY);
        let sr = sample_rate as f32;

        (
            Self {
                rx_updates,
                topology: Topology::default(),
                bank: FilterBank::new(params.q, sr),
                bank_in_path: false,
                noise_gain: LevelStage::new(
                    params.noise_level,
                    MAX_NOISE_LEVEL,
                    LEVEL_RAMP_SECONDS,
                    sr,
                ),
                master: LevelStage::new(
                    params.master_volume,
                    MAX_MASTER_GAIN,
                    LEVEL_RAMP_SECONDS,
                    sr,
                ),
                file: None,
                noise: None,
                analyzer,
            },
            EngineHandle { tx, sample_rate },
        )
    }

    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        if input.len() != output.len() {
            bail!(
                "input block has {} frames but output has {}",
                input.len(),
                output.len()
            );
        }

        self.handle_messages();
        self.render_source(input, output);

        let frames = output.len();
        if self.topology.through_noise_gain {
            self.noise_gain.process_block(output);
        } else {
            self.noise_gain.advance(frames);
        }

        if self.topology.equalized {
            if !self.bank_in_path {
                self.bank.clear_state();
                self.bank_in_path = true;
            }
            self.bank.process_block(output);
        } else {
            self.bank_in_path = false;
            self.bank.advance(frames);
        }

        self.master.process_block(output);
        self.analyzer.process(output);

        Ok(())
    }

    fn render_source(&mut self, input: &[f32], output: &mut [f32]) {
        match self.topology.source {
            Some(SourceKind::File) => match self.file.as_mut() {
                Some(player) => player.render(output),
                None => output.fill(0.0),
            },
            Some(SourceKind::Mic) => output.copy_from_slice(input),
            Some(kind @ (SourceKind::White | SourceKind::Pink)) => match self.noise.as_mut() {
                Some(generator) if Some(generator.kind()) == kind.noise_kind() => {
                    generator.fill(output);
                }
                _ => output.fill(0.0),
            },
            None => output.fill(0.0),
        }
    }

    pub fn handle_messages(&mut self) {
        while let Ok(message) = self.rx_updates.try_recv() {
            match message {
                EngineMessage::SetTopology(topology) => {
                    debug!("Topology: {topology:?}");
                    self.topology = topology;
                }
                EngineMessage::LoadFile(player) => {
                    debug!("File loaded, {} samples", player.len());
                    self.file = Some(player);
                }
                EngineMessage::UnloadFile => {
                    self.file = None;
                }
                EngineMessage::SetFilePlaying(playing) => match self.file.as_mut() {
                    Some(player) if playing => player.play(),
                    Some(player) => player.pause(),
                    None => warn!("Play state change without a loaded file"),
                },
                EngineMessage::StartNoise(generator) => {
                    debug!("Noise generator started: {}", generator.kind());
                    self.noise = Some(generator);
                }
                EngineMessage::StopNoise(kind) => {
                    if self.noise.as_ref().is_some_and(|g| g.kind() == kind) {
                        debug!("Noise generator stopped: {kind}");
                        self.noise = None;
                    }
                }
                EngineMessage::SetBandGain {
                    band,
                    db,
                    ramp_seconds,
                } => self.bank.set_band_gain(band, db, ramp_seconds),
                EngineMessage::SetBandGains {
                    gains,
                    ramp_seconds,
                } => self.bank.set_gains(&gains, ramp_seconds),
                EngineMessage::SetQ(q) => self.bank.set_q(q),
                EngineMessage::SetMasterGain(gain) => self.master.set_gain(gain),
                EngineMessage::SetNoiseLevel(level) => self.noise_gain.set_gain(level),
            }
        }
    }

    pub const fn topology(&self) -> Topology {
        self.topology
    }

    pub const fn filter_bank(&self) -> &FilterBank {
        &self.bank
    }

    pub const fn master_gain(&self) -> f32 {
        self.master.target_gain()
    }

    pub const fn noise_level(&self) -> f32 {
        self.noise_gain.target_gain()
    }

    pub fn noise_kind(&self) -> Option<NoiseKind> {
        self.noise.as_ref().map(|g| g.kind())
    }

    pub fn file(&self) -> Option<&FilePlayer> {
        self.file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyzer::DEFAULT_FFT_SIZE;

    const SR: usize = 48_000;
    const BLOCK: usize = 128;

    fn engine() -> (Engine, EngineHandle) {
        let (analyzer, _) = Analyzer::new(DEFAULT_FFT_SIZE, SR).unwrap();
        Engine::new(SR, &EngineParams::default(), analyzer)
    }

    #[test]
    fn no_source_is_silent() {
        let (mut engine, _) = engine();
        let input = vec![0.5; BLOCK];
        let mut output = vec![1.0; BLOCK];
        engine.process(&input, &mut output).unwrap();
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn mismatched_blocks_are_an_error() {
        let (mut engine, _) = engine();
        let mut output = vec![0.0; BLOCK];
        assert!(engine.process(&[0.0; 64], &mut output).is_err());
    }

    #[test]
    fn messages_drain_in_one_block() {
        let (mut engine, handle) = engine();
        handle.set_q(3.0);
        handle.set_master_gain(1.5);
        handle.set_noise_level(0.7);
        handle.set_band_gain(2, -6.0, 0.0);

        let mut output = vec![0.0; BLOCK];
        engine.process(&vec![0.0; BLOCK], &mut output).unwrap();

        assert_eq!(engine.filter_bank().q(), 3.0);
        assert_eq!(engine.master_gain(), 1.5);
        assert_eq!(engine.noise_level(), 0.7);
        assert_eq!(engine.filter_bank().target_gains()[2], -6.0);
    }

    #[test]
    fn stop_noise_ignores_other_kind() {
        let (mut engine, handle) = engine();
        handle.start_noise(NoiseGenerator::new(NoiseKind::Pink, SR));
        handle.stop_noise(NoiseKind::White);
        engine.handle_messages();
        assert_eq!(engine.noise_kind(), Some(NoiseKind::Pink));

        handle.stop_noise(NoiseKind::Pink);
        engine.handle_messages();
        assert_eq!(engine.noise_kind(), None);
    }

    #[test]
    fn mic_topology_passes_input_through() {
        let params = EngineParams {
            master_volume: 1.0,
            ..EngineParams::default()
        };
        let (analyzer, _) = Analyzer::new(DEFAULT_FFT_SIZE, SR).unwrap();
        let (mut engine, handle) = Engine::new(SR, &params, analyzer);
        handle.set_topology(Topology {
            source: Some(SourceKind::Mic),
            through_noise_gain: false,
            equalized: false,
        });

        let input = vec![0.25; BLOCK];
        let mut output = vec![0.0; BLOCK];
        engine.process(&input, &mut output).unwrap();
        assert_eq!(output, input);
    }
}
