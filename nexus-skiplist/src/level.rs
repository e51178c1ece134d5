//! Level oracle: geometric participation levels for new entries.
//!
//! A new entry starts at level 0 and keeps climbing while a coin comes up
//! "continue". With the default ratio of 2 the coin is fair, so
//! `P(level = k) = 2^-(k+1)` for `k < max_level`, and the remaining tail
//! probability is folded into `max_level`.
//!
//! The oracle itself is a plain `Copy` value. The only mutable state it
//! touches is the random source passed to [`LevelOracle::draw`].

use rand_core::RngCore;

/// Default level ratio (p = 0.5).
pub const DEFAULT_LEVEL_RATIO: u32 = 2;

/// Largest accepted level ratio; bigger requests are clamped.
pub const MAX_LEVEL_RATIO: u32 = 1 << 16;

/// Draws participation levels in `[0, max_level]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelOracle {
    max_level: usize,
    /// log2(level_ratio): random bits consumed per coin flip.
    level_divisor: u32,
}

impl LevelOracle {
    /// Creates an oracle with a fair coin.
    pub fn new(max_level: usize) -> Self {
        Self::with_level_ratio(max_level, DEFAULT_LEVEL_RATIO)
    }

    /// Creates an oracle whose coin continues with probability `1 / level_ratio`.
    ///
    /// - 2: standard (p=0.5), ~2 links per entry on average
    /// - 4: Redis-style (p=0.25), ~1.33 links per entry on average
    ///
    /// Must be a power of 2 and >= 2. Invalid values are rounded up to the
    /// next valid value.
    pub fn with_level_ratio(max_level: usize, level_ratio: u32) -> Self {
        let level_ratio = level_ratio
            .clamp(DEFAULT_LEVEL_RATIO, MAX_LEVEL_RATIO)
            .next_power_of_two();
        Self {
            max_level,
            level_divisor: level_ratio.trailing_zeros(),
        }
    }

    /// Highest level this oracle can return.
    #[inline]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// The effective (rounded) level ratio.
    #[inline]
    pub fn level_ratio(&self) -> u32 {
        1 << self.level_divisor
    }

    /// Draws a level in `[0, max_level]`.
    ///
    /// Each flip consumes `log2(level_ratio)` random bits; the flip says
    /// "continue" only when all of them are set.
    pub fn draw<R: RngCore + ?Sized>(&self, rng: &mut R) -> usize {
        let bits_per_flip = self.level_divisor;
        let flips_per_word = u64::BITS / bits_per_flip;
        let mask = (1u64 << bits_per_flip) - 1;

        let mut level = 0;
        loop {
            let mut word = rng.next_u64();
            for _ in 0..flips_per_word {
                if level == self.max_level || word & mask != mask {
                    return level;
                }
                level += 1;
                word >>= bits_per_flip;
            }
        }
    }
}
