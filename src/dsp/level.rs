use crate::dsp::Stage;
use crate::dsp::common::SmoothedParam;

const SNAP: f32 = 1e-6;

/// Linear gain stage with a smoothed gain, used for master and noise levels.
pub struct LevelStage {
    gain: SmoothedParam,
    max_gain: f32,
    ramp_seconds: f32,
    sample_rate: f32,
}

impl LevelStage {
    pub fn new(gain: f32, max_gain: f32, ramp_seconds: f32, sample_rate: f32) -> Self {
        Self {
            gain: SmoothedParam::new(gain.clamp(0.0, max_gain), SNAP),
            max_gain,
            ramp_seconds,
            sample_rate,
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        let gain = if gain.is_finite() {
            gain.clamp(0.0, self.max_gain)
        } else {
            0.0
        };
        self.gain
            .set_target(gain, self.ramp_seconds, self.sample_rate);
    }

    pub const fn gain(&self) -> f32 {
        self.gain.value()
    }

    pub const fn target_gain(&self) -> f32 {
        self.gain.target()
    }

    /// Let the ramp progress without touching any samples.
    pub fn advance(&mut self, samples: usize) {
        self.gain.advance(samples);
    }
}

impl Stage for LevelStage {
    fn process(&mut self, input: f32) -> f32 {
        input * self.gain.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_is_clamped_to_range() {
        let mut stage = LevelStage::new(1.0, 2.0, 0.01, 48_000.0);
        stage.set_gain(5.0);
        assert_eq!(stage.target_gain(), 2.0);
        stage.set_gain(-1.0);
        assert_eq!(stage.target_gain(), 0.0);
        stage.set_gain(f32::NAN);
        assert_eq!(stage.target_gain(), 0.0);
    }

    #[test]
    fn gain_ramps_instead_of_jumping() {
        let mut stage = LevelStage::new(0.0, 1.0, 0.01, 48_000.0);
        stage.set_gain(1.0);

        let first = stage.process(1.0);
        assert!(first > 0.0 && first < 0.01, "first sample {first}");

        stage.advance(48_000);
        assert_eq!(stage.process(1.0), 1.0);
    }
}
