//! Ordering and error types shared by the heap and its consumers
//!
//! - [`Compare`]: the strict ordering a heap is parameterized over. A heap
//!   always extracts the element that compares *least*, so [`Less`] gives a
//!   min-heap and [`Greater`] a max-heap.
//! - [`HeapError`]: failures reported by heap operations.

use crate::storage::AllocError;
use thiserror::Error;

/// Error type for heap operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// `pop` was called on a heap with no elements
    #[error("pop error: empty heap")]
    Empty,
    /// The handle does not address a live element of this heap
    #[error("handle is no longer valid (element was removed)")]
    InvalidHandle,
    /// The new value does not compare less than the current one
    #[error("new value is not less than the current value")]
    NotDecreased,
    /// The node-memory provider could not supply a slot
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// A strict weak order over `T`.
///
/// `less(a, b)` must be irreflexive and transitive, and incomparability
/// must be transitive. Whatever compares least is extracted first.
///
/// Any `Fn(&T, &T) -> bool` closure is a comparator:
///
/// ```rust
/// use rp_heap::RpHeap;
///
/// let mut heap = RpHeap::with_compare(|a: &(u32, &str), b: &(u32, &str)| a.0 < b.0);
/// heap.push((3, "c"));
/// heap.push((1, "a"));
/// assert_eq!(heap.top(), &(1, "a"));
/// ```
pub trait Compare<T: ?Sized> {
    /// Returns true if `a` must be extracted before `b`
    fn less(&self, a: &T, b: &T) -> bool;
}

/// Orders by [`Ord`], smallest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Less;

/// Orders by [`Ord`], largest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Greater;

impl<T: ?Sized + Ord> Compare<T> for Less {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

impl<T: ?Sized + Ord> Compare<T> for Greater {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a > b
    }
}

impl<T: ?Sized, F> Compare<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}
