//! Rank-pairing heap with pluggable node memory
//!
//! This crate provides a rank-pairing heap, a priority queue with efficient
//! `decrease` support, parameterized over the memory provider its nodes come
//! from.
//!
//! # Features
//!
//! - **Rank-Pairing Heap** ([`RpHeap`]): O(1) amortized push and decrease;
//!   O(log n) amortized pop. Stable generational [`Handle`]s address elements
//!   for decrease and detect use after removal.
//! - **Node-memory providers** ([`storage`]): [`Global`] allocates each node
//!   from the system; [`PoolAlloc`] carves nodes out of fixed-size blocks
//!   and recycles them through a free list.
//! - **Ordering** ([`Compare`]): [`Less`] for a min-heap, [`Greater`] for a
//!   max-heap, or any `Fn(&T, &T) -> bool`.
//! - **Rank policies** ([`rank`]): type-2 rank reduction by default, type-1
//!   on request.
//! - **Grid search** ([`grid`], [`pathfinding`]): binary map loading, A* and
//!   BFS driving the heap the way a path planner does.
//!
//! # Example
//!
//! ```rust
//! use rp_heap::{PoolAlloc, PooledRpHeap, RpHeap};
//!
//! let mut heap: PooledRpHeap<i32> = RpHeap::new_in(PoolAlloc::new());
//! let a = heap.push(5);
//! heap.push(3);
//! heap.decrease(&a, 1).unwrap();
//! assert_eq!(heap.pop_value(), Ok(1));
//! assert_eq!(heap.pop_value(), Ok(3));
//! assert!(heap.pop().is_err());
//! ```

pub mod grid;
pub mod pathfinding;
pub mod rank;
pub mod rank_pairing;
pub mod storage;
pub mod traits;

pub use rank::{Type1, Type2};
pub use rank_pairing::{Handle, Node, RpHeap};
pub use storage::{AllocError, Global, NodeAlloc, PoolAlloc};
pub use traits::{Compare, Greater, HeapError, Less};

/// A heap whose nodes come from a block pool
pub type PooledRpHeap<T, C = Less> = RpHeap<T, C, PoolAlloc<Node<T>>>;
