/// Small deterministic LCG; identical seeds give identical worlds.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        (self.state >> 32) as u32
    }

    /// Uniform in `[min, max)`.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        let unit = (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32;
        (max - min).mul_add(unit, min)
    }

    /// `true` roughly once every `one_in` calls.
    pub fn chance(&mut self, one_in: u32) -> bool {
        one_in > 0 && self.next_u32() % one_in == 0
    }

    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.next_u32() as usize % len
        }
    }
}
