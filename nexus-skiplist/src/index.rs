//! Compact link type for successor chains.
//!
//! Entries link to each other through arena slot numbers rather than
//! pointers. The largest value of the integer type is reserved as the
//! end-of-chain marker, which keeps a link the size of the integer instead of
//! `Option<Idx>`.

/// Unsigned integer usable as an arena link, with a reserved end marker.
///
/// # Example
///
/// ```
/// use nexus_skiplist::Index;
///
/// let slot: u32 = 5;
/// assert!(slot.is_some());
/// assert!(u32::NONE.is_none());
/// assert_eq!(u32::NONE, u32::MAX);
/// ```
pub trait Index: Copy + Eq + core::fmt::Debug {
    /// Reserved marker. As a successor it ends the chain; in predecessor
    /// arrays it stands for the header.
    const NONE: Self;

    /// `true` for the reserved marker.
    #[inline]
    fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// `true` for a real slot.
    #[inline]
    fn is_some(self) -> bool {
        self != Self::NONE
    }

    /// Widens to a slab slot number.
    fn as_usize(self) -> usize;

    /// Narrows a slab slot number. The caller guarantees
    /// `slot < Self::NONE.as_usize()`.
    fn from_usize(slot: usize) -> Self;
}

macro_rules! index_impls {
    ($($ty:ty),*) => {
        $(
            impl Index for $ty {
                const NONE: Self = <$ty>::MAX;

                #[inline]
                fn as_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_usize(slot: usize) -> Self {
                    slot as Self
                }
            }
        )*
    };
}

index_impls!(u16, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    fn check<I: Index>(below_max: I) {
        assert!(I::NONE.is_none());
        assert!(!I::NONE.is_some());
        assert!(I::from_usize(0).is_some());
        assert!(below_max.is_some());
        assert_eq!(I::from_usize(7).as_usize(), 7);
    }

    #[test]
    fn marker_is_max() {
        check::<u16>(u16::MAX - 1);
        check::<u32>(u32::MAX - 1);
        check::<u64>(u64::MAX - 1);
        check::<usize>(usize::MAX - 1);
    }

    #[test]
    fn narrowing_round_trips_below_marker() {
        let top = u16::NONE.as_usize() - 1;
        assert_eq!(u16::from_usize(top), u16::MAX - 1);
        assert_eq!(u16::from_usize(top).as_usize(), top);
    }
}
