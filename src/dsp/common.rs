/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// One-pole smoothing coefficient for a time constant given in seconds.
///
/// Returns `exp(-1 / (sample_rate * seconds))`, or `0.0` for a zero time
/// constant so the target is reached on the next sample.
#[inline]
pub fn time_constant_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 || sample_rate <= 0.0 {
        return 0.0;
    }
    (-1.0 / (sample_rate * seconds)).exp()
}

/// A parameter that glides exponentially toward its target, one step per sample.
///
/// `v[n] = target + (v[n-1] - target) * coeff`
///
/// Once the distance to the target falls below `snap` the value is set to the
/// target exactly, so a settled parameter reads back precisely what was asked.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    snap: f32,
}

impl SmoothedParam {
    pub const fn new(value: f32, snap: f32) -> Self {
        Self {
            current: value,
            target: value,
            coeff: 0.0,
            snap,
        }
    }

    pub fn set_target(&mut self, target: f32, seconds: f32, sample_rate: f32) {
        self.target = target;
        self.coeff = time_constant_coefficient(seconds, sample_rate);
    }

    pub const fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    pub const fn value(&self) -> f32 {
        self.current
    }

    pub const fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.current != self.target {
            self.current = self
                .coeff
                .mul_add(self.current - self.target, self.target);
            if (self.current - self.target).abs() <= self.snap {
                self.current = self.target;
            }
        }
        self.current
    }

    /// Advance by `samples` steps without producing output.
    pub fn advance(&mut self, samples: usize) -> f32 {
        for _ in 0..samples {
            if self.is_settled() {
                break;
            }
            self.next();
        }
        self.current
    }
}
