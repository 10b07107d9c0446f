/// Random number source used for jitter (spin variance, random rotation,
/// noise waveforms).
///
/// Effects never reach for a global generator; the caller hands one in so
/// that replays stay deterministic.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    /// Uniform value in `[lo, hi)`.
    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Uniform value in `[-1, 1)`.
    fn signed_unit(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

/// Splitmix64 generator. Small, fast and reproducible across platforms.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

impl Default for SplitMix64 {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RandomSource for SplitMix64 {
    fn next_f32(&mut self) -> f32 {
        // top 24 bits fill the f32 mantissa exactly
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}
