use crate::eq::BAND_COUNT;

/// A named set of band gains, lowest band first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub gains: [f32; BAND_COUNT],
}

pub const FLAT: Preset = Preset {
    name: "flat",
    gains: [0.0; BAND_COUNT],
};

pub static PRESETS: [Preset; 5] = [
    FLAT,
    Preset {
        name: "bassBoost",
        gains: [6.0, 5.0, 4.0, 3.0, 2.0, 0.0, 0.0, -1.0, -2.0, -3.0],
    },
    Preset {
        name: "trebleBoost",
        gains: [-2.0, -2.0, -1.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    },
    Preset {
        name: "vocal",
        gains: [-2.0, -2.0, -1.0, 0.0, 1.5, 3.0, 3.0, 1.0, -1.0, -2.0],
    },
    Preset {
        name: "loudness",
        gains: [5.0, 4.0, 2.0, 1.0, 0.0, 0.0, 0.0, 1.0, 3.0, 5.0],
    },
];

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

/// Unknown names resolve to the flat preset.
pub fn find_or_flat(name: &str) -> &'static Preset {
    find(name).unwrap_or(&PRESETS[0])
}

pub fn names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|p| p.name)
}
