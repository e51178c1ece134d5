//! Lock-guarded skip list for use from many threads.
//!
//! [`SharedSkipList`] wraps a [`SkipList`] in a single `parking_lot` mutex.
//! Every public operation takes the lock once, so each one is linearizable
//! with respect to the others. There is no reader/writer split and no
//! lock-free path.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use nexus_skiplist::{SharedSkipList, SkipListBuilder};
//!
//! let shared: Arc<SharedSkipList<u32, u32>> =
//!     Arc::new(SkipListBuilder::default().seed(1).build_shared()?);
//!
//! let handles: Vec<_> = (0..4u32)
//!     .map(|t| {
//!         let shared = Arc::clone(&shared);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 shared.insert(t * 100 + i, i);
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(shared.len(), 400);
//! # Ok::<(), nexus_skiplist::Error>(())
//! ```
//!
//! # Persistence
//!
//! [`dump`](SharedSkipList::dump) encodes the list while holding the lock and
//! writes the file after releasing it, so the file always holds one
//! consistent state. [`load`](SharedSkipList::load) reads and decodes the file
//! first, then applies every record under a single acquisition, so other
//! threads never observe a half-loaded list.

use core::fmt;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand_core::RngCore;

use crate::Index;
use crate::error::Result;
use crate::persist::{Codec, FlatFile, LoadReport};
use crate::skiplist::{InsertOutcome, SkipList};

/// A [`SkipList`] behind one mutex.
pub struct SharedSkipList<K, V, R = SmallRng, Idx: Index = u32> {
    inner: Mutex<SkipList<K, V, R, Idx>>,
}

impl<K, V, R, Idx> SharedSkipList<K, V, R, Idx>
where
    K: Ord,
    R: RngCore,
    Idx: Index,
{
    /// Wraps an existing skip list.
    pub fn new(list: SkipList<K, V, R, Idx>) -> Self {
        Self {
            inner: Mutex::new(list),
        }
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Inserts `key` if absent. See [`SkipList::insert`].
    pub fn insert(&self, key: K, value: V) -> InsertOutcome {
        self.inner.lock().insert(key, value)
    }

    /// Removes `key` if present.
    pub fn delete(&self, key: &K) {
        self.inner.lock().delete(key)
    }

    /// Removes `key` and returns its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Number of entries at the moment of the call.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the list held no entries at the moment of the call.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Highest occupied level at the moment of the call.
    pub fn height(&self) -> usize {
        self.inner.lock().height()
    }

    /// Per-level listing, see [`SkipList::display`].
    pub fn display(&self) -> String
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        self.inner.lock().display()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.lock().clear()
    }

    /// Runs `f` with exclusive access to the underlying list.
    ///
    /// Use this to group several operations into one atomic step.
    pub fn with_lock<T>(&self, f: impl FnOnce(&mut SkipList<K, V, R, Idx>) -> T) -> T {
        let mut list = self.inner.lock();
        f(&mut *list)
    }

    /// Writes a consistent snapshot of the list to `file`.
    ///
    /// Returns the number of records written.
    pub fn dump<KC, VC>(&self, file: &FlatFile<KC, VC>) -> Result<usize>
    where
        KC: Codec<K>,
        VC: Codec<V>,
    {
        let snapshot = {
            let list = self.inner.lock();
            file.snapshot(&*list)?
        };
        file.write_snapshot(&snapshot)
    }

    /// Inserts every valid record of `file` as one atomic step.
    pub fn load<KC, VC>(&self, file: &FlatFile<KC, VC>) -> Result<LoadReport>
    where
        KC: Codec<K>,
        VC: Codec<V>,
    {
        let decoded = file.read()?;
        let report = {
            let mut list = self.inner.lock();
            decoded.apply(&mut *list)
        };
        file.log_load(&report);
        Ok(report)
    }

    /// Consumes the wrapper and returns the list.
    pub fn into_inner(self) -> SkipList<K, V, R, Idx> {
        self.inner.into_inner()
    }
}

impl<K, V, R, Idx> From<SkipList<K, V, R, Idx>> for SharedSkipList<K, V, R, Idx>
where
    K: Ord,
    R: RngCore,
    Idx: Index,
{
    fn from(list: SkipList<K, V, R, Idx>) -> Self {
        Self::new(list)
    }
}

impl<K, V, R, Idx> fmt::Debug for SharedSkipList<K, V, R, Idx>
where
    K: fmt::Debug,
    V: fmt::Debug,
    R: fmt::Debug,
    Idx: Index,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSkipList")
            .field("inner", &self.inner)
            .finish()
    }
}
