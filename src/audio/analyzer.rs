use anyhow::{Result, bail};
use arc_swap::ArcSwap;
use log::error;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 2048;
/// Weight of the previous frame in the magnitude average.
pub const SMOOTHING: f32 = 0.85;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Taps the post-master signal and publishes byte magnitudes per bin.
pub struct Analyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    fft_size: usize,
    hop: usize,
    history: Vec<f32>,
    write_pos: usize,
    since_frame: usize,
    window: Vec<f32>,
    frame: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    sample_rate: usize,
    snapshot: Arc<ArcSwap<SpectrumSnapshot>>,
}

#[derive(Clone)]
pub struct AnalyzerHandle {
    snapshot: Arc<ArcSwap<SpectrumSnapshot>>,
}

/// One byte per bin, `0` at or below -100 dB and `255` at or above -30 dB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrumSnapshot {
    pub bins: Vec<u8>,
    pub sample_rate: usize,
}

impl SpectrumSnapshot {
    pub fn silent(bin_count: usize, sample_rate: usize) -> Self {
        Self {
            bins: vec![0; bin_count],
            sample_rate,
        }
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    pub fn energy(&self) -> u64 {
        self.bins.iter().map(|&b| u64::from(b)).sum()
    }
}

/// Blackman window, matching what browser analyzers apply.
fn blackman(size: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;

    (0..size)
        .map(|n| {
            let phase = 2.0 * PI * n as f32 / size as f32;
            A2.mul_add((2.0 * phase).cos(), A1.mul_add(-phase.cos(), A0))
        })
        .collect()
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.floor().clamp(0.0, 255.0) as u8
}

impl Analyzer {
    pub fn new(fft_size: usize, sample_rate: usize) -> Result<(Self, AnalyzerHandle)> {
        if fft_size < 32 || !fft_size.is_power_of_two() {
            bail!("FFT size must be a power of two of at least 32, got {fft_size}");
        }

        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let bin_count = fft_size / 2;
        let snapshot = Arc::new(ArcSwap::from_pointee(SpectrumSnapshot::silent(
            bin_count,
            sample_rate,
        )));

        Ok((
            Self {
                frame: fft.make_input_vec(),
                spectrum: fft.make_output_vec(),
                scratch: fft.make_scratch_vec(),
                fft,
                fft_size,
                hop: fft_size / 2,
                history: vec![0.0; fft_size],
                write_pos: 0,
                since_frame: 0,
                window: blackman(fft_size),
                smoothed: vec![0.0; bin_count],
                sample_rate,
                snapshot: Arc::clone(&snapshot),
            },
            AnalyzerHandle { snapshot },
        ))
    }

    pub fn process(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
            self.since_frame += 1;

            if self.since_frame >= self.hop {
                self.since_frame = 0;
                self.analyze();
            }
        }
    }

    fn analyze(&mut self) {
        // Oldest sample first.
        let (newer, older) = self.history.split_at(self.write_pos);
        let ordered = older.iter().chain(newer);
        for ((slot, &sample), &w) in self.frame.iter_mut().zip(ordered).zip(&self.window) {
            *slot = sample * w;
        }

        if let Err(e) =
            self.fft
                .process_with_scratch(&mut self.frame, &mut self.spectrum, &mut self.scratch)
        {
            error!("Spectrum FFT failed: {e}");
            return;
        }

        let norm = 1.0 / self.fft_size as f32;
        for (avg, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() * norm;
            *avg = SMOOTHING.mul_add(*avg, (1.0 - SMOOTHING) * magnitude);
        }

        let bins = self.smoothed.iter().map(|&m| magnitude_to_byte(m)).collect();
        self.snapshot.store(Arc::new(SpectrumSnapshot {
            bins,
            sample_rate: self.sample_rate,
        }));
    }
}

impl AnalyzerHandle {
    /// Latest published snapshot. Never blocks the audio thread.
    pub fn snapshot(&self) -> Arc<SpectrumSnapshot> {
        self.snapshot.load_full()
    }
}
