use crate::dsp::Stage;
use crate::dsp::biquad::{Biquad, BiquadCoefficients};
use crate::dsp::common::SmoothedParam;
use crate::eq::{clamp_gain, clamp_q};

/// Settled-gain tolerance in dB; closer than this snaps to the target.
const GAIN_SNAP_DB: f32 = 1e-4;
/// Coefficients are refreshed at this sample interval while a ramp runs.
const COEFF_UPDATE_INTERVAL: usize = 16;

/// One peaking EQ band with a smoothed gain.
pub struct Band {
    center_hz: f32,
    q: f32,
    gain: SmoothedParam,
    sample_rate: f32,
    filter: Biquad,
    countdown: usize,
}

impl Band {
    pub fn new(center_hz: f32, q: f32, sample_rate: f32) -> Self {
        let q = clamp_q(q);
        Self {
            center_hz,
            q,
            gain: SmoothedParam::new(0.0, GAIN_SNAP_DB),
            sample_rate,
            filter: Biquad::new(BiquadCoefficients::peaking(center_hz, q, 0.0, sample_rate)),
            countdown: 0,
        }
    }

    pub const fn center_hz(&self) -> f32 {
        self.center_hz
    }

    pub const fn q(&self) -> f32 {
        self.q
    }

    /// Gain the band is currently running at, mid-ramp or not.
    pub const fn gain_db(&self) -> f32 {
        self.gain.value()
    }

    /// Gain the band is heading toward.
    pub const fn target_gain_db(&self) -> f32 {
        self.gain.target()
    }

    pub fn is_settled(&self) -> bool {
        self.gain.is_settled()
    }

    /// Ramp toward `db` with the given time constant. A zero time constant
    /// jumps straight to the target.
    pub fn set_gain(&mut self, db: f32, ramp_seconds: f32) {
        let db = clamp_gain(db);
        if ramp_seconds <= 0.0 {
            self.gain.set_immediate(db);
            self.refresh_coefficients();
        } else {
            self.gain.set_target(db, ramp_seconds, self.sample_rate);
            self.countdown = 0;
        }
    }

    /// Q changes take effect immediately.
    pub fn set_q(&mut self, q: f32) {
        self.q = clamp_q(q);
        self.refresh_coefficients();
    }

    /// Run the gain ramp forward without filtering, keeping coefficients in
    /// step with the ramp.
    pub fn advance(&mut self, samples: usize) {
        if self.gain.is_settled() {
            return;
        }
        self.gain.advance(samples);
        self.refresh_coefficients();
    }

    /// Zero the filter memory. Used when the band re-enters the signal path.
    pub const fn clear_state(&mut self) {
        self.filter.reset();
    }

    pub const fn coefficients(&self) -> &BiquadCoefficients {
        self.filter.coefficients()
    }

    fn refresh_coefficients(&mut self) {
        self.filter.set_coefficients(BiquadCoefficients::peaking(
            self.center_hz,
            self.q,
            self.gain.value(),
            self.sample_rate,
        ));
        self.countdown = COEFF_UPDATE_INTERVAL;
    }
}

impl Stage for Band {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        if !self.gain.is_settled() {
            self.gain.next();
            if self.countdown == 0 || self.gain.is_settled() {
                self.refresh_coefficients();
            }
            self.countdown -= 1;
        }
        self.filter.process(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::{BAND_RAMP_SECONDS, DEFAULT_Q, MAX_GAIN_DB, MAX_Q};

    const SR: f32 = 48_000.0;

    #[test]
    fn ramp_settles_on_exact_target() {
        let mut band = Band::new(1000.0, DEFAULT_Q, SR);
        band.set_gain(-7.3, BAND_RAMP_SECONDS);
        assert_eq!(band.target_gain_db(), -7.3);
        assert_eq!(band.gain_db(), 0.0);

        for _ in 0..SR as usize {
            band.process(0.0);
        }
        assert!(band.is_settled());
        assert_eq!(band.gain_db(), -7.3);
    }

    #[test]
    fn ramp_does_not_jump() {
        let mut band = Band::new(1000.0, DEFAULT_Q, SR);
        band.set_gain(12.0, BAND_RAMP_SECONDS);
        band.process(0.0);
        assert!(band.gain_db() < 0.1, "gain jumped to {}", band.gain_db());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut band = Band::new(63.0, DEFAULT_Q, SR);
        band.set_gain(30.0, 0.0);
        assert_eq!(band.gain_db(), MAX_GAIN_DB);
        band.set_q(99.0);
        assert_eq!(band.q(), MAX_Q);
    }

    #[test]
    fn advance_tracks_coefficients() {
        let mut band = Band::new(250.0, DEFAULT_Q, SR);
        band.set_gain(6.0, BAND_RAMP_SECONDS);
        band.advance(SR as usize);

        let expected = BiquadCoefficients::peaking(250.0, DEFAULT_Q, 6.0, SR);
        assert_eq!(*band.coefficients(), expected);
    }
}
