use log::{debug, warn};

use crate::audio::engine::EngineHandle;
use crate::eq::presets::{self, Preset};
use crate::eq::{
    BAND_COUNT, BAND_RAMP_SECONDS, PRESET_RAMP_SECONDS, clamp_gain, clamp_q, format_gain,
};

/// Control-side mirror of the filter bank: the values the user asked for
/// and their readouts. Every change is forwarded to the engine.
pub struct EqControls {
    gains: [f32; BAND_COUNT],
    readouts: [String; BAND_COUNT],
    q: f32,
    engine: EngineHandle,
    /// Some change never reached the engine.
    stale: bool,
}

impl EqControls {
    pub fn new(q: f32, engine: EngineHandle) -> Self {
        Self {
            gains: [0.0; BAND_COUNT],
            readouts: std::array::from_fn(|_| format_gain(0.0)),
            q: clamp_q(q),
            engine,
            stale: false,
        }
    }

    pub fn set_band_gain(&mut self, index: usize, db: f32) {
        if index >= BAND_COUNT {
            warn!("Ignoring gain for band {index}, only {BAND_COUNT} bands exist");
            return;
        }
        let db = clamp_gain(db);
        self.store(index, db);
        self.stale |= !self.engine.set_band_gain(index, db, BAND_RAMP_SECONDS);
    }

    pub fn reset_band(&mut self, index: usize) {
        self.set_band_gain(index, 0.0);
    }

    pub fn set_global_q(&mut self, q: f32) {
        self.q = clamp_q(q);
        debug!("Q set to {:.2}", self.q);
        self.stale |= !self.engine.set_q(self.q);
    }

    pub fn reset_all(&mut self) {
        self.apply_gains(&presets::FLAT.gains);
    }

    /// Apply a named preset. Unknown names fall back to flat.
    pub fn apply_preset(&mut self, name: &str) -> &'static Preset {
        let preset = presets::find(name).unwrap_or_else(|| {
            warn!("Unknown preset '{name}', using flat");
            &presets::FLAT
        });
        self.apply_gains(&preset.gains);
        preset
    }

    /// Overwrite every band in a single engine message.
    pub fn apply_gains(&mut self, gains: &[f32; BAND_COUNT]) {
        let gains = gains.map(clamp_gain);
        for (i, &db) in gains.iter().enumerate() {
            self.store(i, db);
        }
        self.stale |= !self.engine.set_band_gains(gains, PRESET_RAMP_SECONDS);
    }

    /// Push the whole mirror to the engine if an earlier change was dropped.
    /// Returns whether the engine is in step.
    pub fn resync(&mut self) -> bool {
        if self.stale
            && self.engine.set_band_gains(self.gains, BAND_RAMP_SECONDS)
            && self.engine.set_q(self.q)
        {
            debug!("Resent EQ state to engine");
            self.stale = false;
        }
        !self.stale
    }

    pub const fn gains(&self) -> &[f32; BAND_COUNT] {
        &self.gains
    }

    pub const fn readouts(&self) -> &[String; BAND_COUNT] {
        &self.readouts
    }

    pub fn readout(&self, index: usize) -> Option<&str> {
        self.readouts.get(index).map(String::as_str)
    }

    pub const fn q(&self) -> f32 {
        self.q
    }

    fn store(&mut self, index: usize, db: f32) {
        self.gains[index] = db;
        self.readouts[index] = format_gain(db);
    }
}
