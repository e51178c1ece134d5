//! Entry arena with stable indices.
//!
//! The skip list never holds pointers to its entries. Every entry lives in an
//! [`Arena`] slot and successor links are compact [`Index`] values into it.
//! A slot index stays valid until the entry is removed, after which the slot
//! may be reused by a later insert.

use core::marker::PhantomData;
use core::ops;

use slab::Slab;

use crate::Index;

/// Growable slab-backed storage handing out `Idx` keys.
///
/// Wraps [`slab::Slab`], narrowing its `usize` keys to `Idx` so links in
/// every entry stay small (`u32` by default).
///
/// # Example
///
/// ```
/// use nexus_skiplist::Arena;
///
/// let mut arena: Arena<&str> = Arena::with_capacity(4);
/// let idx = arena.insert("hello");
/// assert_eq!(arena.get(idx), Some(&"hello"));
/// assert_eq!(arena.remove(idx), Some("hello"));
/// assert!(arena.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Arena<T, Idx: Index = u32> {
    slots: Slab<T>,
    _marker: PhantomData<Idx>,
}

impl<T, Idx: Index> Arena<T, Idx> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty arena with room for `capacity` entries before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Slab::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slots are occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots allocated, occupied or not.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Stores `value` and returns its index.
    ///
    /// # Panics
    ///
    /// Panics if the next slot number does not fit below `Idx::NONE`.
    pub fn insert(&mut self, value: T) -> Idx {
        let slot = self.slots.vacant_key();
        assert!(
            slot < Idx::NONE.as_usize(),
            "arena exceeds index type maximum"
        );
        self.slots.insert(value);
        Idx::from_usize(slot)
    }

    /// Removes and returns the value at `index`, if present.
    #[inline]
    pub fn remove(&mut self, index: Idx) -> Option<T> {
        if index.is_none() {
            return None;
        }
        self.slots.try_remove(index.as_usize())
    }

    /// Returns a reference to the value at `index`, if present.
    #[inline]
    pub fn get(&self, index: Idx) -> Option<&T> {
        if index.is_none() {
            return None;
        }
        self.slots.get(index.as_usize())
    }

    /// Returns a mutable reference to the value at `index`, if present.
    #[inline]
    pub fn get_mut(&mut self, index: Idx) -> Option<&mut T> {
        if index.is_none() {
            return None;
        }
        self.slots.get_mut(index.as_usize())
    }
}

impl<T, Idx: Index> Default for Arena<T, Idx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Idx: Index> ops::Index<Idx> for Arena<T, Idx> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `index` is vacant.
    #[inline]
    fn index(&self, index: Idx) -> &T {
        self.get(index).expect("invalid index")
    }
}

impl<T, Idx: Index> ops::IndexMut<Idx> for Arena<T, Idx> {
    #[inline]
    fn index_mut(&mut self, index: Idx) -> &mut T {
        self.get_mut(index).expect("invalid index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut arena: Arena<u64> = Arena::new();

        let a = arena.insert(10);
        let b = arena.insert(20);

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&10));
        assert_eq!(arena[b], 20);

        assert_eq!(arena.remove(a), Some(10));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.remove(a), None);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn sentinel_is_never_occupied() {
        let mut arena: Arena<u64> = Arena::new();
        arena.insert(1);

        assert_eq!(arena.get(u32::NONE), None);
        assert_eq!(arena.get_mut(u32::NONE), None);
        assert_eq!(arena.remove(u32::NONE), None);
    }

    #[test]
    fn removed_slot_is_reused() {
        let mut arena: Arena<u64> = Arena::with_capacity(4);

        let a = arena.insert(1);
        arena.insert(2);
        arena.remove(a);

        let c = arena.insert(3);
        assert_eq!(c, a);
        assert_eq!(arena[c], 3);
    }

    #[test]
    fn index_mut_updates_in_place() {
        let mut arena: Arena<String> = Arena::new();
        let idx = arena.insert("a".into());

        arena[idx].push('b');
        assert_eq!(arena[idx], "ab");
    }

    #[test]
    #[should_panic(expected = "invalid index")]
    fn index_vacant_panics() {
        let arena: Arena<u64> = Arena::new();
        let _ = arena[3];
    }
}
