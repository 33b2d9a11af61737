//! Rank type and the rank-reduction policies used by decrease-key.
//!
//! # Why u8?
//!
//! A node's rank in a rank-pairing heap is bounded by `O(log n)`, so `u8`
//! covers any heap that fits in memory while keeping nodes small.
//!
//! # Rank reduction
//!
//! After a cut, ranks along the structural-parent chain of the cut point
//! may be too large. Each node `p` on that chain is given a candidate rank
//! from `i`, the rank of its first child, and `j`, the rank of its next
//! sibling (`-1` when absent). The walk stops as soon as the candidate is
//! not smaller than the current rank. The two classic policies differ only
//! in how the candidate is computed; see [`Type1`] and [`Type2`].

/// Type alias for node rank.
pub type Rank = u8;

/// Maximum valid rank value.
pub const MAX_RANK: Rank = u8::MAX;

/// Safely increment a rank value, panicking on overflow.
///
/// # Panics
///
/// Panics if `rank == MAX_RANK`, which would require more than 2²⁵⁵ nodes.
///
/// # Example
///
/// ```rust
/// use rp_heap::rank::{checked_increment, Rank};
///
/// let rank: Rank = 5;
/// assert_eq!(checked_increment(rank), 6);
/// ```
#[inline]
pub fn checked_increment(rank: Rank) -> Rank {
    rank.checked_add(1).expect(
        "rank overflow: this should be impossible since max rank is O(log n) \
         and u8::MAX (255) supports heaps with up to 2²⁵⁵ elements",
    )
}

/// Rank of a node that has `left` as its first child: one more than the
/// child's rank, or 0 for a leaf.
#[inline]
pub fn rank_from_child(left: Option<Rank>) -> Rank {
    left.map_or(0, checked_increment)
}

/// Policy computing the candidate rank during the decrease-key walk.
///
/// Implemented by zero-sized markers chosen at the type level, so the
/// policy costs nothing at runtime.
pub trait RankReduction {
    /// Candidate rank for a node whose first child has rank `left` and
    /// whose next sibling has rank `next`.
    fn reduce(left: Option<Rank>, next: Option<Rank>) -> Rank;
}

/// Type-1 rank reduction: `max(i, j)` if `i != j`, else `i + 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Type1;

/// Type-2 rank reduction: `max(i, j)` if `|i - j| > 1`, else
/// `max(i, j) + 1`. This is the default policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Type2;

#[inline]
fn signed(rank: Option<Rank>) -> i16 {
    rank.map_or(-1, i16::from)
}

// Candidates are never negative (at least one of i, j contributes max + 1
// when both are -1), and never exceed MAX_RANK + 1 in theory.
#[inline]
fn narrow(k: i16) -> Rank {
    Rank::try_from(k).expect("rank reduction produced a rank outside 0..=255")
}

impl RankReduction for Type1 {
    #[inline]
    fn reduce(left: Option<Rank>, next: Option<Rank>) -> Rank {
        let (i, j) = (signed(left), signed(next));
        narrow(if i != j { i.max(j) } else { i + 1 })
    }
}

impl RankReduction for Type2 {
    #[inline]
    fn reduce(left: Option<Rank>, next: Option<Rank>) -> Rank {
        let (i, j) = (signed(left), signed(next));
        let k = i.max(j);
        narrow(if (i - j).abs() > 1 { k } else { k + 1 })
    }
}
