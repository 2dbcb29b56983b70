use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Six-pole recursive approximation of a -3 dB/octave tilt, plus the
/// one-sample feed-forward term `b6`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinkFilter {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub b3: f32,
    pub b4: f32,
    pub b5: f32,
    pub b6: f32,
}

impl PinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape one white sample.
    #[inline]
    pub fn process(&mut self, white: f32) -> f32 {
        self.b0 = 0.99886 * self.b0 + white * 0.055_517_9;
        self.b1 = 0.99332 * self.b1 + white * 0.075_075_9;
        self.b2 = 0.96900 * self.b2 + white * 0.153_852;
        self.b3 = 0.86650 * self.b3 + white * 0.310_485_6;
        self.b4 = 0.55000 * self.b4 + white * 0.532_952_2;
        self.b5 = -0.7616 * self.b5 - white * 0.016_898;

        let out = (self.b0
            + self.b1
            + self.b2
            + self.b3
            + self.b4
            + self.b5
            + self.b6
            + white * 0.5362)
            * 0.11;

        self.b6 = white * 0.115_926;
        out
    }
}

/// Pink noise driven by a pseudo-random uniform source.
pub struct PinkNoise {
    filter: PinkFilter,
    rng: SmallRng,
}

impl Default for PinkNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl PinkNoise {
    pub fn new() -> Self {
        Self {
            filter: PinkFilter::new(),
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            filter: PinkFilter::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let white: f32 = self.rng.random_range(-1.0..1.0);
            *sample = self.filter.process(white);
        }
    }

    pub fn next_block(&mut self, n: usize) -> Vec<f32> {
        let mut block = vec![0.0; n];
        self.fill(&mut block);
        block
    }

    pub const fn filter(&self) -> &PinkFilter {
        &self.filter
    }
}
