pub mod pink;
pub mod white;

use std::fmt;

use self::pink::PinkNoise;
use self::white::WhiteNoise;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseKind {
    White,
    Pink,
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Pink => write!(f, "pink"),
        }
    }
}

/// A running noise generator. Created fresh on every start.
pub enum NoiseGenerator {
    White(WhiteNoise),
    Pink(PinkNoise),
}

impl NoiseGenerator {
    pub fn new(kind: NoiseKind, sample_rate: usize) -> Self {
        match kind {
            NoiseKind::White => Self::White(WhiteNoise::new(sample_rate)),
            NoiseKind::Pink => Self::Pink(PinkNoise::new()),
        }
    }

    pub const fn kind(&self) -> NoiseKind {
        match self {
            Self::White(_) => NoiseKind::White,
            Self::Pink(_) => NoiseKind::Pink,
        }
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        match self {
            Self::White(noise) => noise.fill(out),
            Self::Pink(noise) => noise.fill(out),
        }
    }

    pub fn next_block(&mut self, n: usize) -> Vec<f32> {
        let mut block = vec![0.0; n];
        self.fill(&mut block);
        block
    }
}
