use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Seconds of noise pre-rendered into the loop buffer.
pub const LOOP_SECONDS: usize = 2;

/// White noise looped from a pre-filled buffer of uniform samples in [-1, 1).
pub struct WhiteNoise {
    buffer: Vec<f32>,
    position: usize,
}

impl WhiteNoise {
    pub fn new(sample_rate: usize) -> Self {
        Self::with_rng(sample_rate, &mut SmallRng::from_os_rng())
    }

    pub fn seeded(sample_rate: usize, seed: u64) -> Self {
        Self::with_rng(sample_rate, &mut SmallRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng>(sample_rate: usize, rng: &mut R) -> Self {
        let len = (LOOP_SECONDS * sample_rate).max(1);
        let buffer: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn loop_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        let mut written = 0;
        while written < out.len() {
            let available = self.buffer.len() - self.position;
            let count = available.min(out.len() - written);
            out[written..written + count]
                .copy_from_slice(&self.buffer[self.position..self.position + count]);

            written += count;
            self.position = (self.position + count) % self.buffer.len();
        }
    }

    pub fn next_block(&mut self, n: usize) -> Vec<f32> {
        let mut block = vec![0.0; n];
        self.fill(&mut block);
        block
    }
}
