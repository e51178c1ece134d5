//! Builder for skip lists.
//!
//! ```
//! use nexus_skiplist::SkipListBuilder;
//!
//! let mut list = SkipListBuilder::default()
//!     .max_level(18)
//!     .seed(42)
//!     .build::<i32, String>()?;
//!
//! list.insert(1, "one".into());
//! assert_eq!(list.len(), 1);
//! # Ok::<(), nexus_skiplist::Error>(())
//! ```

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_core::RngCore;

use crate::error::{Error, Result};
use crate::level::{DEFAULT_LEVEL_RATIO, LevelOracle};
use crate::skiplist::SkipList;
use crate::sync::SharedSkipList;

/// Default upper bound on participation levels (~65K entries efficient).
pub const DEFAULT_MAX_LEVEL: usize = 16;

/// Largest `max_level` the builder accepts.
pub const MAX_LEVEL_LIMIT: usize = 64;

/// Builder for [`SkipList`] and [`SharedSkipList`].
#[derive(Clone, Debug)]
pub struct SkipListBuilder {
    max_level: usize,
    level_ratio: u32,
    seed: Option<u64>,
    capacity: usize,
}

impl Default for SkipListBuilder {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            level_ratio: DEFAULT_LEVEL_RATIO,
            seed: None,
            capacity: 0,
        }
    }
}

impl SkipListBuilder {
    /// Highest level an entry may reach. Default: 16.
    pub fn max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Level ratio (1/p). Default: 2.
    /// Rounded up to a power of two, see [`LevelOracle::with_level_ratio`].
    pub fn level_ratio(mut self, level_ratio: u32) -> Self {
        self.level_ratio = level_ratio;
        self
    }

    /// Seed the default generator for reproducible level draws.
    /// Default: seeded from the operating system.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pre-allocate room for this many entries. Default: 0.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build a skip list driven by a [`SmallRng`].
    pub fn build<K: Ord, V>(self) -> Result<SkipList<K, V, SmallRng>> {
        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        self.build_with_rng(rng)
    }

    /// Build a skip list driven by the given generator. Any seed set on the
    /// builder is ignored.
    pub fn build_with_rng<K: Ord, V, R: RngCore>(self, rng: R) -> Result<SkipList<K, V, R>> {
        let oracle = self.oracle()?;
        Ok(SkipList::with_oracle_and_capacity(oracle, rng, self.capacity))
    }

    /// Build a lock-guarded skip list for use across threads.
    pub fn build_shared<K: Ord, V>(self) -> Result<SharedSkipList<K, V, SmallRng>> {
        self.build().map(SharedSkipList::new)
    }

    fn oracle(&self) -> Result<LevelOracle> {
        if self.max_level > MAX_LEVEL_LIMIT {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "max_level {} exceeds limit {}",
                    self.max_level, MAX_LEVEL_LIMIT
                ),
            });
        }
        Ok(LevelOracle::with_level_ratio(
            self.max_level,
            self.level_ratio,
        ))
    }
}
