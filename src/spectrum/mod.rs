pub mod renderer;

use std::sync::Arc;

use crate::audio::analyzer::{AnalyzerHandle, SpectrumSnapshot};

/// Lowest frequency shown on the axis.
pub const MIN_FREQUENCY_HZ: f32 = 20.0;
/// Decade grid lines.
pub const DECADE_LINES_HZ: [f32; 3] = [100.0, 1000.0, 10000.0];

/// Logarithmic frequency to pixel mapping.
///
/// `x(f) = width * (log10(max(f, f_min)) - log10(f_min)) / (log10(f_max) - log10(f_min))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogAxis {
    width: f32,
    f_min: f32,
    f_max: f32,
    log_min: f32,
    log_span: f32,
}

impl LogAxis {
    pub fn new(width: f32, f_min: f32, f_max: f32) -> Self {
        let log_min = f_min.log10();
        Self {
            width,
            f_min,
            f_max,
            log_min,
            log_span: f_max.log10() - log_min,
        }
    }

    /// Axis from 20 Hz to Nyquist.
    pub fn for_sample_rate(width: f32, sample_rate: usize) -> Self {
        Self::new(width, MIN_FREQUENCY_HZ, sample_rate as f32 / 2.0)
    }

    pub fn x(&self, freq_hz: f32) -> f32 {
        let t = (freq_hz.max(self.f_min).log10() - self.log_min) / self.log_span;
        t * self.width
    }

    /// Strictly inside the displayed range.
    pub fn contains(&self, freq_hz: f32) -> bool {
        freq_hz > self.f_min && freq_hz < self.f_max
    }

    pub const fn width(&self) -> f32 {
        self.width
    }

    pub const fn f_min(&self) -> f32 {
        self.f_min
    }

    pub const fn f_max(&self) -> f32 {
        self.f_max
    }
}

/// Frame-driven reader of analyzer snapshots that can be paused.
///
/// While paused it keeps handing out the last frame it saw. It never writes
/// to the analyzer.
pub struct FrameLoop {
    analyzer: AnalyzerHandle,
    frozen: Option<Arc<SpectrumSnapshot>>,
}

impl FrameLoop {
    pub const fn new(analyzer: AnalyzerHandle) -> Self {
        Self {
            analyzer,
            frozen: None,
        }
    }

    pub fn pause(&mut self) {
        if self.frozen.is_none() {
            self.frozen = Some(self.analyzer.snapshot());
        }
    }

    pub fn resume(&mut self) {
        self.frozen = None;
    }

    pub fn toggle(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub const fn is_paused(&self) -> bool {
        self.frozen.is_some()
    }

    /// Snapshot for the current frame.
    pub fn tick(&self) -> Arc<SpectrumSnapshot> {
        match &self.frozen {
            Some(snapshot) => Arc::clone(snapshot),
            None => self.analyzer.snapshot(),
        }
    }
}
