//! A thin-but-stable wrapper over `rand::rngs::SmallRng` that provides the
//! handful of conveniences value synthesis needs.

use rand::{rngs::SmallRng, Rng as _, SeedableRng};

pub(crate) const DEFAULT_SEED: u64 = 0x7a17_f17e_5eed_0001;

/// A pseudorandom number generator.
///
/// Not cryptographically secure. Every `Rng` is seeded explicitly, so two
/// search runs configured with the same seed synthesize the same values.
#[derive(Clone, Debug)]
pub struct Rng {
    inner: SmallRng,
}

impl Default for Rng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Rng {
    /// Create a new generator from the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Generate a random `usize` in the range `0..len`.
    ///
    /// If `len` is `0`, then `None` is returned.
    #[inline]
    pub fn gen_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.inner.gen_range(0..len))
    }

    /// Generate a random `i64` in the inclusive range `lo..=hi`.
    #[inline]
    pub fn gen_i64_in(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }

    /// Generate a string of `len` ASCII decimal digits.
    pub fn gen_digits(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + self.inner.gen_range(0..10u8)))
            .collect()
    }

    /// Generate a string of `len` lowercase hexadecimal digits.
    pub fn gen_hex(&mut self, len: usize) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        (0..len)
            .map(|_| char::from(HEX[self.inner.gen_range(0..16usize)]))
            .collect()
    }

    /// Generate a random `bool`.
    #[inline]
    pub fn gen_bool(&mut self) -> bool {
        self.inner.gen()
    }

    /// Generate a random `u32`.
    #[inline]
    pub fn gen_u32(&mut self) -> u32 {
        self.inner.gen()
    }
}
