use log::warn;

use crate::dsp::Stage;
use crate::eq::band::Band;
use crate::eq::{BAND_CENTERS_HZ, BAND_COUNT};

/// Ten peaking bands wired in series, lowest center first.
///
/// The order and the inter-band wiring never change; only gains and the
/// shared Q do.
pub struct FilterBank {
    bands: [Band; BAND_COUNT],
    q: f32,
}

impl FilterBank {
    pub fn new(q: f32, sample_rate: f32) -> Self {
        let bands = std::array::from_fn(|i| Band::new(BAND_CENTERS_HZ[i], q, sample_rate));
        let q = bands[0].q();
        Self { bands, q }
    }

    pub fn set_band_gain(&mut self, index: usize, db: f32, ramp_seconds: f32) {
        match self.bands.get_mut(index) {
            Some(band) => band.set_gain(db, ramp_seconds),
            None => warn!("Ignoring gain for band {index}, only {BAND_COUNT} bands exist"),
        }
    }

    pub fn set_gains(&mut self, gains: &[f32; BAND_COUNT], ramp_seconds: f32) {
        for (band, &db) in self.bands.iter_mut().zip(gains) {
            band.set_gain(db, ramp_seconds);
        }
    }

    pub fn set_q(&mut self, q: f32) {
        for band in &mut self.bands {
            band.set_q(q);
        }
        self.q = self.bands[0].q();
    }

    pub const fn q(&self) -> f32 {
        self.q
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    pub const fn bands(&self) -> &[Band; BAND_COUNT] {
        &self.bands
    }

    pub fn target_gains(&self) -> [f32; BAND_COUNT] {
        std::array::from_fn(|i| self.bands[i].target_gain_db())
    }

    pub fn is_settled(&self) -> bool {
        self.bands.iter().all(Band::is_settled)
    }

    /// Run gain ramps forward while the bank is out of the signal path.
    pub fn advance(&mut self, samples: usize) {
        for band in &mut self.bands {
            band.advance(samples);
        }
    }

    pub fn clear_state(&mut self) {
        for band in &mut self.bands {
            band.clear_state();
        }
    }
}

impl Stage for FilterBank {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.bands
            .iter_mut()
            .fold(input, |sample, band| band.process(sample))
    }

    fn process_block(&mut self, input: &mut [f32]) {
        for band in &mut self.bands {
            band.process_block(input);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::presets;
    use crate::eq::{DEFAULT_Q, PRESET_RAMP_SECONDS};

    const SR: f32 = 48_000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * std::f32::consts::PI * freq * n as f32 / SR).sin() * 0.5)
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn bands_are_in_fixed_order() {
        let bank = FilterBank::new(DEFAULT_Q, SR);
        let centers: Vec<f32> = bank.bands().iter().map(Band::center_hz).collect();
        assert_eq!(centers, BAND_CENTERS_HZ);
    }

    #[test]
    fn flat_bank_passes_signal_unchanged() {
        let mut bank = FilterBank::new(DEFAULT_Q, SR);
        bank.set_gains(&[4.0; BAND_COUNT], PRESET_RAMP_SECONDS);
        bank.advance(SR as usize);
        bank.set_gains(&presets::FLAT.gains, PRESET_RAMP_SECONDS);
        bank.advance(SR as usize);
        assert!(bank.is_settled());

        let input = sine(440.0, 4096);
        let mut output = input.clone();
        bank.clear_state();
        bank.process_block(&mut output);

        for (a, b) in input.iter().zip(&output) {
            assert!((a - b).abs() < 1e-5, "flat bank altered signal: {a} vs {b}");
        }
    }

    #[test]
    fn boosted_band_raises_level_at_its_center() {
        let mut bank = FilterBank::new(DEFAULT_Q, SR);
        bank.set_band_gain(5, 12.0, 0.0);

        let input = sine(1000.0, 9600);
        let mut output = input.clone();
        bank.process_block(&mut output);

        // Skip the filter warm-up.
        let ratio = rms(&output[4800..]) / rms(&input[4800..]);
        let gain_db = 20.0 * ratio.log10();
        assert!((gain_db - 12.0).abs() < 0.5, "measured {gain_db} dB");
    }

    #[test]
    fn out_of_range_band_index_is_ignored() {
        let mut bank = FilterBank::new(DEFAULT_Q, SR);
        bank.set_band_gain(BAND_COUNT, 6.0, 0.0);
        assert_eq!(bank.target_gains(), [0.0; BAND_COUNT]);
    }

    #[test]
    fn q_applies_to_every_band_at_once() {
        let mut bank = FilterBank::new(DEFAULT_Q, SR);
        bank.set_q(4.0);
        assert!(bank.bands().iter().all(|b| b.q() == 4.0));
        assert_eq!(bank.q(), 4.0);
    }
}
