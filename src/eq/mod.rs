pub mod band;
pub mod bank;
pub mod controls;
pub mod presets;

pub const BAND_COUNT: usize = 10;

/// Nominal octave centers, low to high.
pub const BAND_CENTERS_HZ: [f32; BAND_COUNT] = [
    31.5, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

pub const MIN_GAIN_DB: f32 = -20.0;
pub const MAX_GAIN_DB: f32 = 20.0;

pub const MIN_Q: f32 = 0.1;
pub const MAX_Q: f32 = 18.0;
pub const DEFAULT_Q: f32 = 1.4;

/// Time constant for a single band move or reset.
pub const BAND_RAMP_SECONDS: f32 = 0.015;
/// Time constant for presets and the global reset.
pub const PRESET_RAMP_SECONDS: f32 = 0.02;

/// Clamp a requested band gain into the legal range. NaN maps to 0 dB.
pub fn clamp_gain(db: f32) -> f32 {
    if db.is_nan() {
        return 0.0;
    }
    db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
}

/// Clamp a requested Q. Non-finite values fall back to the default.
pub fn clamp_q(q: f32) -> f32 {
    if !q.is_finite() {
        return DEFAULT_Q;
    }
    q.clamp(MIN_Q, MAX_Q)
}

/// Readout text for a band gain, e.g. `"-3.5 dB"`.
pub fn format_gain(db: f32) -> String {
    let rounded = (db * 10.0).round() / 10.0;
    // Avoid "-0.0 dB" for tiny negative values.
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.1} dB")
}

/// Short center label used on the spectrum overlay: `31.5`, `63`, `1k`, `16k`.
pub fn band_label(center_hz: f32) -> String {
    if center_hz >= 1000.0 {
        let k = center_hz / 1000.0;
        if k.fract() == 0.0 {
            format!("{k:.0}k")
        } else {
            format!("{k:.1}k")
        }
    } else if center_hz.fract() == 0.0 {
        format!("{center_hz:.0}")
    } else {
        format!("{center_hz:.1}")
    }
}

/// Slider caption, e.g. `"31.5 Hz"` or `"2k Hz"`.
pub fn slider_label(center_hz: f32) -> String {
    format!("{} Hz", band_label(center_hz))
}
