//! Rank-Pairing Heap implementation
//!
//! A rank-pairing heap is a heap data structure that achieves:
//! - O(1) amortized insert and decrease_key
//! - O(log n) amortized delete_min
//!
//! # Algorithm Overview
//!
//! The heap is a forest of *half-trees* whose roots form a circular singly
//! linked list. `head` points at the root holding the minimum.
//!
//! - **Insert**: O(1) - splice a rank-0 node into the root ring
//! - **Delete-min**: O(log n) amortized - detach the minimum, then link the
//!   orphaned half-trees and the other roots pairwise by rank (multi-pass
//!   bucket consolidation)
//! - **Decrease-key**: O(1) amortized - cut the node out of its sibling
//!   chain, make it a root, then lower ranks along the structural-parent
//!   chain until a rank no longer changes
//!
//! # Half-Tree Representation
//!
//! A node's children hang off `left` and continue through `next`. Only the
//! first child's `parent` points at the real parent; every later child's
//! `parent` points at its predecessor in the sibling chain. Cutting a node
//! out of the middle of a chain then touches exactly one `parent` link.
//!
//! ```text
//!   x            x.left = a
//!   |            a.parent = x, a.next = b
//!   a -> b -> c  b.parent = a, b.next = c
//!                c.parent = b
//! ```
//!
//! # Key Invariants
//!
//! 1. **Heap order**: every node compares no less than the node whose child
//!    chain it belongs to.
//! 2. **Root ring**: roots have no `parent` and form a non-empty circular
//!    list while the heap is non-empty; `head` is in it and is minimal.
//! 3. **Rank**: a root's rank is its first child's rank + 1 (0 for a
//!    leaf root); any other node's rank is at most the policy's candidate
//!    computed from its first child and next sibling.
//! 4. **Handles**: each live node owns exactly one entry of a generational
//!    handle table, so a handle to a removed node is detected, not aliased.

use crate::rank::{self, Rank, RankReduction, Type2};
use crate::storage::{AllocError, Global, NodeAlloc};
use crate::traits::{Compare, HeapError, Less};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

new_key_type! {
    /// Handle to an element in a rank-pairing heap
    ///
    /// Returned by [`RpHeap::push`] and used with [`RpHeap::decrease`]. A
    /// handle is an `(index, generation)` key: once its element is popped or
    /// cleared, every operation taking the handle reports
    /// [`HeapError::InvalidHandle`]. Handles are only meaningful for the heap
    /// that issued them.
    pub struct Handle;
}

type Link<T> = Option<NonNull<Node<T>>>;

/// Internal node structure for rank-pairing heap
///
/// Public only so that node-memory providers can be named for it, e.g.
/// `PoolAlloc<Node<T>>`; its fields are private.
pub struct Node<T> {
    value: T,
    /// First child (None if leaf)
    left: Link<T>,
    /// Next sibling in a child chain, or next root in the root ring
    next: Link<T>,
    /// Structural parent: real parent for a first child, predecessor
    /// otherwise, None for roots
    parent: Link<T>,
    rank: Rank,
    key: Handle,
}

#[inline]
unsafe fn rank_of<T>(link: Link<T>) -> Option<Rank> {
    link.map(|node| (*node.as_ptr()).rank)
}

/// Rank-Pairing Heap
///
/// Type parameters:
/// - `C`: ordering; whatever compares least is extracted first ([`Less`]
///   for a min-heap, [`Greater`](crate::Greater) for a max-heap, or a
///   closure)
/// - `A`: node-memory provider ([`Global`] or
///   [`PoolAlloc`](crate::storage::PoolAlloc))
/// - `R`: rank-reduction policy used by decrease ([`Type2`] or
///   [`Type1`](crate::rank::Type1))
///
/// # Example
///
/// ```rust
/// use rp_heap::RpHeap;
///
/// let mut heap = RpHeap::new();
/// heap.push(10);
/// let handle = heap.push(20);
/// heap.push(30);
/// assert_eq!(heap.top(), &10);
///
/// heap.decrease(&handle, 1).unwrap();
/// assert_eq!(heap.top(), &1);
/// assert_eq!(heap.into_sorted_vec(), vec![1, 10, 30]);
/// ```
pub struct RpHeap<T, C = Less, A = Global, R = Type2>
where
    A: NodeAlloc<Node<T>>,
{
    /// Root holding the minimum; entry point of the root ring
    head: Link<T>,
    handles: SlotMap<Handle, NonNull<Node<T>>>,
    compare: C,
    alloc: A,
    _marker: PhantomData<(Node<T>, fn() -> R)>,
}

impl<T> RpHeap<T> {
    /// Creates an empty min-heap ordered by [`Ord`]
    pub fn new() -> Self {
        Self::with_compare_in(Less, Global)
    }
}

impl<T, C: Compare<T>> RpHeap<T, C> {
    /// Creates an empty heap ordered by `compare`
    pub fn with_compare(compare: C) -> Self {
        Self::with_compare_in(compare, Global)
    }
}

impl<T, A: NodeAlloc<Node<T>>> RpHeap<T, Less, A> {
    /// Creates an empty min-heap drawing nodes from `alloc`
    pub fn new_in(alloc: A) -> Self {
        Self::with_compare_in(Less, alloc)
    }
}

impl<T, C, A, R> RpHeap<T, C, A, R>
where
    A: NodeAlloc<Node<T>>,
{
    /// Creates an empty heap ordered by `compare`, drawing nodes from `alloc`
    pub fn with_compare_in(compare: C, alloc: A) -> Self {
        RpHeap {
            head: None,
            handles: SlotMap::with_key(),
            compare,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements in the heap
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if the heap is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the minimum element, or `None` if the heap is empty
    pub fn peek(&self) -> Option<&T> {
        // SAFETY: head is a live node owned by this heap
        self.head.map(|head| unsafe { &(*head.as_ptr()).value })
    }

    /// Returns the minimum element
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty. Use [`peek`](Self::peek) when that is a
    /// possibility.
    pub fn top(&self) -> &T {
        match self.peek() {
            Some(value) => value,
            None => panic!("top() called on an empty heap"),
        }
    }

    /// Returns the element addressed by `handle`, if it is still in the heap
    pub fn get(&self, handle: &Handle) -> Option<&T> {
        // SAFETY: the handle table only holds live nodes
        self.handles
            .get(*handle)
            .map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Returns true if `handle` addresses an element still in the heap
    pub fn contains(&self, handle: &Handle) -> bool {
        self.handles.contains_key(*handle)
    }

    /// The ordering this heap was built with
    pub fn compare(&self) -> &C {
        &self.compare
    }

    /// The node-memory provider this heap draws from
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Removes every element
    ///
    /// **Time Complexity**: O(n)
    ///
    /// Nodes are released children-first by an iterative post-order walk with
    /// two explicit stacks, so arbitrarily deep or wide trees cannot overflow
    /// the call stack. Every outstanding handle becomes invalid. The heap is
    /// immediately reusable.
    ///
    /// The heap is emptied before any value is dropped. If a value's `Drop`
    /// panics, the remaining nodes are still released while unwinding.
    pub fn clear(&mut self) {
        let Some(head) = self.head.take() else {
            return;
        };
        let mut release = Release {
            alloc: &self.alloc,
            nodes: Vec::with_capacity(self.handles.len()),
        };
        self.handles.clear();

        let mut pending = vec![head];
        // SAFETY: every node reachable from head is live and owned by this
        // heap, and each is listed exactly once; all links are read before
        // anything is freed.
        unsafe {
            while let Some(node) = pending.pop() {
                release.nodes.push(node);
                let n = node.as_ptr();
                if let Some(left) = (*n).left {
                    pending.push(left);
                }
                if let Some(next) = (*n).next {
                    if next != head {
                        pending.push(next);
                    }
                }
            }
            release.run();
        }
    }

    /// Moves the value out of `node`, returns its slot to the provider and
    /// retires its handle.
    unsafe fn free_node(&mut self, node: NonNull<Node<T>>) -> T {
        let Node { value, key, .. } = self.alloc.take(node);
        self.alloc.deallocate(node, 1);
        self.handles.remove(key);
        value
    }
}

impl<T, C, A, R> RpHeap<T, C, A, R>
where
    C: Compare<T>,
    A: NodeAlloc<Node<T>>,
    R: RankReduction,
{
    /// Inserts an element, returning a handle for later [`decrease`](Self::decrease)
    ///
    /// **Time Complexity**: O(1)
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AllocError`] if it cannot supply a node; the
    /// heap is left unchanged and `value` is dropped. It converts into
    /// [`HeapError::Alloc`] with `?`.
    pub fn try_push(&mut self, value: T) -> Result<Handle, AllocError> {
        let node = self.alloc.allocate(1)?;
        let key = self.handles.insert(node);
        // SAFETY: node is a fresh slot from our provider
        unsafe {
            self.alloc.construct(
                node,
                Node {
                    value,
                    left: None,
                    next: None,
                    parent: None,
                    rank: 0,
                    key,
                },
            );
            self.insert_root(node);
        }
        Ok(key)
    }

    /// Inserts an element, returning a handle for later [`decrease`](Self::decrease)
    ///
    /// **Time Complexity**: O(1)
    ///
    /// # Panics
    ///
    /// Aborts through [`std::alloc::handle_alloc_error`] if the provider is
    /// out of memory, like the standard collections do. Use
    /// [`try_push`](Self::try_push) to handle that case.
    pub fn push(&mut self, value: T) -> Handle {
        match self.try_push(value) {
            Ok(handle) => handle,
            Err(err) => std::alloc::handle_alloc_error(err.layout()),
        }
    }

    /// Removes the minimum element
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::Empty`] if the heap is empty; nothing changes.
    pub fn pop(&mut self) -> Result<(), HeapError> {
        self.pop_value().map(drop)
    }

    /// Removes and returns the minimum element
    ///
    /// **Time Complexity**: O(log n) amortized
    ///
    /// **Algorithm**:
    /// 1. Detach `head`; its children become independent half-trees
    /// 2. Feed every orphaned child and every other root to a bucket array
    ///    indexed by rank; equal ranks are linked and carried upward
    /// 3. Free the old minimum
    /// 4. The surviving bucket entries form the new root ring
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::Empty`] if the heap is empty; nothing changes.
    pub fn pop_value(&mut self) -> Result<T, HeapError> {
        let min = self.head.take().ok_or(HeapError::Empty)?;
        // SAFETY: min was the live head; consolidate only relinks nodes that
        // are reachable from it, and min is freed exactly once afterwards.
        unsafe {
            self.consolidate(min);
            Ok(self.free_node(min))
        }
    }

    /// Lowers the value of the element addressed by `handle`
    ///
    /// **Time Complexity**: O(1) amortized
    ///
    /// **Algorithm**:
    /// 1. Overwrite the value (it must compare strictly less)
    /// 2. If the node is `head`, done; if it is another root, it may become
    ///    the new `head`
    /// 3. Otherwise cut it out of its sibling chain; the successor inherits its
    ///    structural parent. The node becomes a root with rank
    ///    `rank(left) + 1`
    /// 4. Walk the structural parents of the cut point lowering ranks with
    ///    policy `R`, stopping at the first rank that does not drop
    ///
    /// # Errors
    ///
    /// - [`HeapError::InvalidHandle`] if the element is no longer in the heap
    /// - [`HeapError::NotDecreased`] if `value` does not compare less than the
    ///   current value
    ///
    /// In both cases the heap is left unchanged.
    pub fn decrease(&mut self, handle: &Handle, value: T) -> Result<(), HeapError> {
        let node = *self.handles.get(*handle).ok_or(HeapError::InvalidHandle)?;
        // SAFETY: the handle table only holds live nodes of this heap
        unsafe {
            let n = node.as_ptr();
            if !self.compare.less(&value, &(*n).value) {
                return Err(HeapError::NotDecreased);
            }
            (*n).value = value;
            self.promote(node);
        }
        Ok(())
    }

    /// Lowers the value of the element addressed by `handle` to `f(current)`
    ///
    /// Same rules and errors as [`decrease`](Self::decrease).
    pub fn decrease_with<F>(&mut self, handle: &Handle, f: F) -> Result<(), HeapError>
    where
        F: FnOnce(&T) -> T,
    {
        let value = f(self.get(handle).ok_or(HeapError::InvalidHandle)?);
        self.decrease(handle, value)
    }

    /// Pops every element in priority order
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut sorted = Vec::with_capacity(self.len());
        while let Ok(value) = self.pop_value() {
            sorted.push(value);
        }
        sorted
    }

    /// Splices a detached half-tree root into the root ring, updating `head`
    unsafe fn insert_root(&mut self, node: NonNull<Node<T>>) {
        let n = node.as_ptr();
        match self.head {
            None => {
                (*n).next = Some(node);
                self.head = Some(node);
            }
            Some(head) => {
                let h = head.as_ptr();
                (*n).next = (*h).next;
                (*h).next = Some(node);
                if self.compare.less(&(*n).value, &(*h).value) {
                    self.head = Some(node);
                }
            }
        }
    }

    /// Links two half-tree roots of equal rank; the smaller becomes the
    /// parent and the result has rank + 1. Ties keep `a` on top.
    unsafe fn link(&self, a: NonNull<Node<T>>, b: NonNull<Node<T>>) -> NonNull<Node<T>> {
        let (winner, loser) = if self.compare.less(&(*b.as_ptr()).value, &(*a.as_ptr()).value) {
            (b, a)
        } else {
            (a, b)
        };
        let (w, l) = (winner.as_ptr(), loser.as_ptr());

        (*l).parent = Some(winner);
        if let Some(child) = (*w).left {
            // The old first child now follows the loser in the chain
            (*l).next = Some(child);
            (*child.as_ptr()).parent = Some(loser);
        }
        (*w).left = Some(loser);
        (*w).rank = rank::checked_increment((*l).rank);
        winner
    }

    /// Upper bound on the ranks present: floor(log2(len)) + 2
    fn bucket_estimate(len: usize) -> usize {
        (usize::BITS - len.leading_zeros()) as usize + 1
    }

    /// Drops a half-tree into the bucket array, linking on rank collisions
    unsafe fn multipass(&self, buckets: &mut SmallVec<[Link<T>; 32]>, mut tree: NonNull<Node<T>>) {
        loop {
            let rank = usize::from((*tree.as_ptr()).rank);
            if rank >= buckets.len() {
                buckets.resize(rank + 1, None);
            }
            match buckets[rank].take() {
                Some(other) => tree = self.link(tree, other),
                None => {
                    buckets[rank] = Some(tree);
                    return;
                }
            }
        }
    }

    /// Rebuilds the root ring from everything except `min`, which must be the
    /// detached former head.
    unsafe fn consolidate(&mut self, min: NonNull<Node<T>>) {
        let mut buckets: SmallVec<[Link<T>; 32]> =
            SmallVec::from_elem(None, Self::bucket_estimate(self.len()));
        let m = min.as_ptr();

        let mut child = (*m).left.take();
        while let Some(node) = child {
            let c = node.as_ptr();
            child = (*c).next.take();
            (*c).parent = None;
            (*c).rank = rank::rank_from_child(rank_of((*c).left));
            self.multipass(&mut buckets, node);
        }

        let mut root = (*m).next.take();
        while let Some(node) = root {
            if node == min {
                break;
            }
            root = (*node.as_ptr()).next.take();
            self.multipass(&mut buckets, node);
        }

        for tree in buckets.into_iter().flatten() {
            self.insert_root(tree);
        }
    }

    /// Restores heap order after `node`'s value was lowered
    unsafe fn promote(&mut self, node: NonNull<Node<T>>) {
        let Some(head) = self.head else { return };
        if node == head {
            return;
        }

        let n = node.as_ptr();
        let Some(parent) = (*n).parent else {
            if self.compare.less(&(*n).value, &(*head.as_ptr()).value) {
                self.head = Some(node);
            }
            return;
        };

        let p = parent.as_ptr();
        let successor = (*n).next;
        if (*p).left == Some(node) {
            (*p).left = successor;
        } else {
            (*p).next = successor;
        }
        if let Some(s) = successor {
            (*s.as_ptr()).parent = Some(parent);
        }

        (*n).next = None;
        (*n).parent = None;
        (*n).rank = rank::rank_from_child(rank_of((*n).left));
        self.insert_root(node);

        self.reduce_ranks(parent);
    }

    /// Lowers ranks from `node` up the structural-parent chain. A root
    /// reached by the walk takes `rank(left) + 1` and ends it.
    unsafe fn reduce_ranks(&mut self, mut node: NonNull<Node<T>>) {
        loop {
            let p = node.as_ptr();
            let Some(parent) = (*p).parent else {
                (*p).rank = rank::rank_from_child(rank_of((*p).left));
                return;
            };
            let k = R::reduce(rank_of((*p).left), rank_of((*p).next));
            if k >= (*p).rank {
                return;
            }
            (*p).rank = k;
            node = parent;
        }
    }
}

/// Detached nodes awaiting release. Whatever is left when this is dropped,
/// including during a panic out of a value's `Drop`, is still freed.
struct Release<'a, T, A: NodeAlloc<Node<T>>> {
    alloc: &'a A,
    nodes: Vec<NonNull<Node<T>>>,
}

impl<T, A: NodeAlloc<Node<T>>> Release<'_, T, A> {
    /// Frees the listed nodes last-first. Each slot goes back to the
    /// provider before its value is dropped.
    ///
    /// # Safety
    ///
    /// Every listed node is live, listed once, and no longer reachable from
    /// any heap.
    unsafe fn run(&mut self) {
        while let Some(node) = self.nodes.pop() {
            let Node { value, .. } = self.alloc.take(node);
            self.alloc.deallocate(node, 1);
            drop(value);
        }
    }
}

impl<T, A: NodeAlloc<Node<T>>> Drop for Release<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: only `clear` builds a Release, upholding `run`'s contract
        unsafe { self.run() }
    }
}

impl<T, C, A, R> Drop for RpHeap<T, C, A, R>
where
    A: NodeAlloc<Node<T>>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, C, A, R> Default for RpHeap<T, C, A, R>
where
    C: Default,
    A: NodeAlloc<Node<T>> + Default,
{
    fn default() -> Self {
        Self::with_compare_in(C::default(), A::default())
    }
}

impl<T, C, A, R> Extend<T> for RpHeap<T, C, A, R>
where
    C: Compare<T>,
    A: NodeAlloc<Node<T>>,
    R: RankReduction,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T, C, A, R> FromIterator<T> for RpHeap<T, C, A, R>
where
    C: Compare<T> + Default,
    A: NodeAlloc<Node<T>> + Default,
    R: RankReduction,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut heap = Self::default();
        heap.extend(iter);
        heap
    }
}

impl<T: fmt::Debug, C, A, R> fmt::Debug for RpHeap<T, C, A, R>
where
    A: NodeAlloc<Node<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpHeap")
            .field("len", &self.len())
            .field("top", &self.peek())
            .finish()
    }
}
