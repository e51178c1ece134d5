//! Skip list - a probabilistic ordered map over an entry arena.
//!
//! Insert, lookup, and removal take O(log n) expected steps. Nothing is ever
//! rebalanced; every entry draws its level once, at insert time.
//!
//! # Design
//!
//! Entries live in an [`Arena`] and link to their successors by index. The
//! header is not an entry; it is a successor array of length `max_level + 1`
//! owned by the list. Inside predecessor (`update`) arrays the header is
//! spelled `Idx::NONE`.
//!
//! ```text
//! Level 2:  HEAD ────────► 20 ──────────► 50 ──────────────────► NIL
//!             │            │              │
//! Level 1:  HEAD ──► 10 ──► 20 ──► 30 ──► 50 ──► 60 ──► NIL
//!             │      │      │      │      │      │
//! Level 0:  HEAD ──► 10 ──► 20 ──► 30 ──► 50 ──► 60 ──► 70 ──► NIL
//! ```
//!
//! # Example
//!
//! ```rust
//! use nexus_skiplist::{InsertOutcome, SkipList};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let rng = SmallRng::seed_from_u64(12345);
//! let mut map: SkipList<u64, String> = SkipList::new(8, rng);
//!
//! assert_eq!(map.insert(100, "first".into()), InsertOutcome::Inserted);
//! assert_eq!(map.insert(50, "second".into()), InsertOutcome::Inserted);
//! assert_eq!(map.insert(50, "again".into()), InsertOutcome::AlreadyExists);
//!
//! assert_eq!(map.get(&50), Some(&"second".into()));
//! assert_eq!(map.first(), Some((&50, &"second".into())));
//! ```

use core::fmt;
use core::mem;

use rand::rngs::SmallRng;
use rand_core::RngCore;
use tracing::{debug, trace};

use crate::Index;
use crate::config::MAX_LEVEL_LIMIT;
use crate::level::LevelOracle;
use crate::storage::Arena;

// ============================================================================
// Entry
// ============================================================================

/// One stored record plus its successor links.
///
/// `forward[i]` is the next entry at level `i`. The entry participates in
/// levels `0..forward.len()`; the length is fixed when the entry is created.
#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V, Idx: Index = u32> {
    key: K,
    value: V,
    forward: Vec<Idx>,
}

impl<K, V, Idx: Index> Entry<K, V, Idx> {
    #[inline]
    fn new(key: K, value: V, level: usize) -> Self {
        Self {
            key,
            value,
            forward: vec![Idx::NONE; level + 1],
        }
    }
}

/// Result of [`SkipList::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was absent and is now stored.
    Inserted,
    /// The key was already present; nothing changed.
    AlreadyExists,
}

impl InsertOutcome {
    /// Returns `true` for [`InsertOutcome::Inserted`].
    #[inline]
    pub fn is_inserted(self) -> bool {
        self == Self::Inserted
    }
}

// ============================================================================
// SkipList
// ============================================================================

/// A probabilistic ordered map.
///
/// Keys are unique: inserting a present key is rejected, never overwritten.
///
/// # Type Parameters
///
/// - `K`: Key type, must implement `Ord`
/// - `V`: Value type
/// - `R`: Random number generator implementing [`RngCore`], defaults to `SmallRng`
/// - `Idx`: Index type for successor links, defaults to `u32`
#[derive(Debug)]
pub struct SkipList<K, V, R = SmallRng, Idx: Index = u32> {
    /// Header successor array; `header[i]` is the first entry at level i.
    header: Vec<Idx>,
    /// Last entry at level 0, for O(1) `last()`.
    tail: Idx,
    entries: Arena<Entry<K, V, Idx>, Idx>,
    oracle: LevelOracle,
    rng: R,
    /// Highest level with at least one entry (0 when empty).
    height: usize,
    len: usize,
    /// Scratch predecessor array reused by insert and remove.
    update: Vec<Idx>,
}

impl<K, V, R, Idx> SkipList<K, V, R, Idx>
where
    K: Ord,
    R: RngCore,
    Idx: Index,
{
    /// Creates an empty skip list whose entries reach at most `max_level`.
    ///
    /// Uses a fair coin for level assignment.
    ///
    /// # Panics
    ///
    /// Panics if `max_level` exceeds [`MAX_LEVEL_LIMIT`]. Use
    /// [`SkipListBuilder`](crate::SkipListBuilder) to get an error instead.
    pub fn new(max_level: usize, rng: R) -> Self {
        Self::with_oracle(LevelOracle::new(max_level), rng)
    }

    /// Creates an empty skip list with an explicit level oracle.
    ///
    /// # Panics
    ///
    /// Panics if the oracle's `max_level` exceeds [`MAX_LEVEL_LIMIT`].
    pub fn with_oracle(oracle: LevelOracle, rng: R) -> Self {
        Self::with_oracle_and_capacity(oracle, rng, 0)
    }

    /// Creates an empty skip list with room for `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if the oracle's `max_level` exceeds [`MAX_LEVEL_LIMIT`].
    pub fn with_oracle_and_capacity(oracle: LevelOracle, rng: R, capacity: usize) -> Self {
        assert!(
            oracle.max_level() <= MAX_LEVEL_LIMIT,
            "max_level {} exceeds limit {}",
            oracle.max_level(),
            MAX_LEVEL_LIMIT
        );
        let levels = oracle.max_level() + 1;
        Self {
            header: vec![Idx::NONE; levels],
            tail: Idx::NONE,
            entries: Arena::with_capacity(capacity),
            oracle,
            rng,
            height: 0,
            len: 0,
            update: vec![Idx::NONE; levels],
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when no entries are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Highest level currently holding an entry.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Configured upper bound on participation levels.
    #[inline]
    pub fn max_level(&self) -> usize {
        self.oracle.max_level()
    }

    /// The level oracle used by insert.
    #[inline]
    pub fn oracle(&self) -> &LevelOracle {
        &self.oracle
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Returns `true` if `key` is stored.
    pub fn contains_key(&self, key: &K) -> bool {
        let found = self.find(key).is_some();
        trace!(found, "search");
        found
    }

    /// Looks up the value stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|idx| &self.entries[idx].value)
    }

    /// Looks up the value stored under `key` for in-place mutation.
    ///
    /// The key itself cannot be changed, so ordering is unaffected.
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find(key).map(|idx| &mut self.entries[idx].value)
    }

    /// Smallest entry.
    #[inline]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.entries
            .get(self.header[0])
            .map(|entry| (&entry.key, &entry.value))
    }

    /// Largest entry, read from the tracked tail in O(1).
    #[inline]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.entries
            .get(self.tail)
            .map(|entry| (&entry.key, &entry.value))
    }

    // ========================================================================
    // Insert / remove
    // ========================================================================

    /// Inserts a key-value pair if the key is absent.
    ///
    /// A present key is left untouched and the offered pair is dropped.
    pub fn insert(&mut self, key: K, value: V) -> InsertOutcome {
        let mut update = mem::take(&mut self.update);

        let outcome = if self.search(&key, &mut update).is_some() {
            InsertOutcome::AlreadyExists
        } else {
            let level = self.oracle.draw(&mut self.rng);
            if level > self.height {
                // New levels have no finer predecessor than the header.
                update[self.height + 1..=level].fill(Idx::NONE);
                debug!(from = self.height, to = level, "raising skip list height");
                self.height = level;
            }

            let idx = self.entries.insert(Entry::new(key, value, level));
            self.link(idx, level, &update);
            InsertOutcome::Inserted
        };

        self.update = update;
        trace!(?outcome, len = self.len, "insert");
        outcome
    }

    /// Unlinks `key` and hands back its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut update = mem::take(&mut self.update);
        let removed = self
            .search(key, &mut update)
            .map(|target| self.unlink(target, &update));
        self.update = update;

        trace!(found = removed.is_some(), len = self.len, "remove");
        removed
    }

    /// Removes the entry for the given key; a missing key is a no-op.
    #[inline]
    pub fn delete(&mut self, key: &K) {
        self.remove(key);
    }

    /// Removes all entries.
    ///
    /// Walks the level-0 chain iteratively, releasing one entry per step.
    pub fn clear(&mut self) {
        let mut current = self.header[0];
        while current.is_some() {
            let entry = self.entries.remove(current).expect("invalid index");
            current = entry.forward[0];
        }

        self.header.fill(Idx::NONE);
        self.tail = Idx::NONE;
        self.height = 0;
        self.len = 0;
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Successor of `at` on `level`, where `Idx::NONE` names the header.
    #[inline]
    fn successor(&self, at: Idx, level: usize) -> Idx {
        if at.is_none() {
            self.header[level]
        } else {
            self.entries[at].forward[level]
        }
    }

    #[inline]
    fn set_successor(&mut self, at: Idx, level: usize, next: Idx) {
        if at.is_none() {
            self.header[level] = next;
        } else {
            self.entries[at].forward[level] = next;
        }
    }

    /// Moves right along `level` while the next key is less than `key`.
    #[inline]
    fn advance(&self, mut current: Idx, level: usize, key: &K) -> Idx {
        loop {
            let next = self.successor(current, level);
            if next.is_none() || self.entries[next].key >= *key {
                return current;
            }
            current = next;
        }
    }

    /// Returns the level-0 successor of `current` if it holds `key`.
    #[inline]
    fn matching_successor(&self, current: Idx, key: &K) -> Option<Idx> {
        let next = self.successor(current, 0);
        (next.is_some() && self.entries[next].key == *key).then_some(next)
    }

    /// Read-only descent; no predecessors recorded.
    #[inline]
    fn find(&self, key: &K) -> Option<Idx> {
        let mut current = Idx::NONE;
        for level in (0..=self.height).rev() {
            current = self.advance(current, level, key);
        }
        self.matching_successor(current, key)
    }

    /// Descends like `find`, recording the last entry visited on each level
    /// in `update`. Used for mutations (insert, remove).
    #[inline]
    fn search(&self, key: &K, update: &mut [Idx]) -> Option<Idx> {
        let mut current = Idx::NONE;
        for level in (0..=self.height).rev() {
            current = self.advance(current, level, key);
            update[level] = current;
        }
        self.matching_successor(current, key)
    }

    /// Splices a freshly stored entry in after `update[i]` on levels `0..=level`.
    fn link(&mut self, idx: Idx, level: usize, update: &[Idx]) {
        for i in 0..=level {
            let next = self.successor(update[i], i);
            self.entries[idx].forward[i] = next;
            self.set_successor(update[i], i, idx);
        }

        if self.entries[idx].forward[0].is_none() {
            self.tail = idx;
        }

        self.len += 1;
    }

    /// Unsplices `target` from every level it occupies and releases it.
    fn unlink(&mut self, target: Idx, update: &[Idx]) -> V {
        // Participation is contiguous from level 0, so the first level where
        // the recorded predecessor does not point at target ends the walk.
        for i in 0..=self.height {
            if self.successor(update[i], i) != target {
                break;
            }
            let next = self.entries[target].forward[i];
            self.set_successor(update[i], i, next);
        }

        if self.tail == target {
            self.tail = update[0];
        }

        let before = self.height;
        while self.height > 0 && self.header[self.height].is_none() {
            self.height -= 1;
        }
        if self.height != before {
            debug!(from = before, to = self.height, "lowering skip list height");
        }

        self.len -= 1;
        self.entries.remove(target).expect("invalid index").value
    }
}

// ============================================================================
// Scans and display
// ============================================================================

impl<K, V, R, Idx: Index> SkipList<K, V, R, Idx> {
    /// Returns an iterator over key-value pairs in ascending key order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V, Idx> {
        Iter {
            entries: &self.entries,
            current: self.header[0],
            remaining: self.len,
        }
    }

    /// Returns an iterator over keys in ascending order.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// Returns an iterator over values in ascending key order.
    #[inline]
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Returns the keys linked on `level`, in chain order.
    ///
    /// Levels above [`height`](Self::height) (or above `max_level`) are empty.
    pub fn keys_at_level(&self, level: usize) -> LevelKeys<'_, K, V, Idx> {
        let current = self.header.get(level).copied().unwrap_or(Idx::NONE);
        LevelKeys {
            entries: &self.entries,
            current,
            level,
        }
    }

    /// Returns a [`Display`](fmt::Display) view listing every level, top first.
    #[inline]
    pub fn levels(&self) -> Levels<'_, K, V, R, Idx> {
        Levels { list: self }
    }

    /// Renders the per-level listing produced by [`levels`](Self::levels).
    ///
    /// ```text
    /// Level 1: 3:c;
    /// Level 0: 1:b;3:c;5:a;
    /// ```
    pub fn display(&self) -> String
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        self.levels().to_string()
    }
}

/// An iterator over key-value pairs in ascending key order.
pub struct Iter<'a, K, V, Idx: Index> {
    entries: &'a Arena<Entry<K, V, Idx>, Idx>,
    current: Idx,
    remaining: usize,
}

impl<'a, K, V, Idx: Index> Iterator for Iter<'a, K, V, Idx> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.current)?;
        self.current = entry.forward[0];
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, Idx: Index> ExactSizeIterator for Iter<'_, K, V, Idx> {}

impl<'a, K, V, R, Idx: Index> IntoIterator for &'a SkipList<K, V, R, Idx> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Keys linked on a single level.
pub struct LevelKeys<'a, K, V, Idx: Index> {
    entries: &'a Arena<Entry<K, V, Idx>, Idx>,
    current: Idx,
    level: usize,
}

impl<'a, K, V, Idx: Index> Iterator for LevelKeys<'a, K, V, Idx> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.current)?;
        self.current = entry.forward[self.level];
        Some(&entry.key)
    }
}

/// Per-level listing of a skip list, top level first.
pub struct Levels<'a, K, V, R, Idx: Index> {
    list: &'a SkipList<K, V, R, Idx>,
}

impl<K, V, R, Idx> fmt::Display for Levels<'_, K, V, R, Idx>
where
    K: fmt::Display,
    V: fmt::Display,
    Idx: Index,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = self.list;
        for level in (0..=list.height).rev() {
            write!(f, "Level {level}: ")?;
            let mut current = list.header[level];
            while let Some(entry) = list.entries.get(current) {
                write!(f, "{}:{};", entry.key, entry.value)?;
                current = entry.forward[level];
            }
            writeln!(f)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod bench_skiplist {
    use super::*;
    use hdrhistogram::Histogram;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::time::Instant;

    fn print_histogram(name: &str, hist: &Histogram<u64>) {
        println!(
            "{:24} p50: {:5} ns | p99: {:5} ns | p999: {:6} ns | min: {:4} | max: {:6}",
            name,
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.min(),
            hist.max(),
        );
    }

    type BenchSkipList = SkipList<u64, u64, SmallRng, u32>;

    const WARMUP: usize = 10_000;
    const ITERATIONS: usize = 100_000;

    fn make_list(seed: u64) -> BenchSkipList {
        SkipList::new(18, SmallRng::seed_from_u64(seed))
    }

    #[test]
    #[ignore]
    fn bench_insert_random() {
        let mut list = make_list(12345);
        let mut keys = SmallRng::seed_from_u64(1);
        let mut hist = Histogram::<u64>::new(3).unwrap();

        for _ in 0..WARMUP {
            list.insert(keys.random(), 0);
        }

        for _ in 0..ITERATIONS {
            let key = keys.random();
            let start = Instant::now();
            let outcome = list.insert(key, key);
            let elapsed = start.elapsed().as_nanos() as u64;
            std::hint::black_box(outcome);
            hist.record(elapsed.max(1)).unwrap();
        }

        print_histogram("insert (random)", &hist);
    }

    #[test]
    #[ignore]
    fn bench_get_hit() {
        let mut list = make_list(12345);
        for i in 0..ITERATIONS as u64 {
            list.insert(i, i);
        }

        let mut keys = SmallRng::seed_from_u64(2);
        let mut hist = Histogram::<u64>::new(3).unwrap();

        for _ in 0..ITERATIONS {
            let key = keys.random_range(0..ITERATIONS as u64);
            let start = Instant::now();
            let found = list.get(&key);
            let elapsed = start.elapsed().as_nanos() as u64;
            std::hint::black_box(found);
            hist.record(elapsed.max(1)).unwrap();
        }

        print_histogram("get (hit)", &hist);
    }

    #[test]
    #[ignore]
    fn bench_remove_random() {
        let mut list = make_list(12345);
        for i in 0..ITERATIONS as u64 {
            list.insert(i, i);
        }

        let mut order: Vec<u64> = (0..ITERATIONS as u64).collect();
        let mut shuffle = SmallRng::seed_from_u64(3);
        for i in (1..order.len()).rev() {
            order.swap(i, shuffle.random_range(0..=i));
        }

        let mut hist = Histogram::<u64>::new(3).unwrap();
        for key in order {
            let start = Instant::now();
            let removed = list.remove(&key);
            let elapsed = start.elapsed().as_nanos() as u64;
            std::hint::black_box(removed);
            hist.record(elapsed.max(1)).unwrap();
        }

        print_histogram("remove (random)", &hist);
    }
}
