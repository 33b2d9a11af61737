//! Pluggable node-memory providers
//!
//! A heap asks its provider for one node-sized slot per push and hands the
//! slot back when the node is popped or cleared. Two providers ship with the
//! crate:
//!
//! - [`Global`]: Default, one system allocation per slot
//! - [`PoolAlloc`]: Block pool that carves slots out of fixed-size blocks
//!   and recycles freed slots through an intrusive free list
//!
//! # Design
//!
//! [`NodeAlloc`] mirrors a classic allocator: `allocate(count)` and
//! `deallocate(ptr, count)` deal in raw, uninitialized memory, while
//! `construct`, `take` and `destroy` move values in and out of a slot. The
//! pool only optimizes `count == 1`; any other count falls through to a plain
//! bulk allocation.
//!
//! Clones of a [`PoolAlloc`] share one pool through an `Rc`, so a heap and
//! every clone of its provider draw from the same blocks. [`PoolAlloc::rebind`]
//! creates an independent pool for another node type.
//!
//! # Example
//!
//! ```rust
//! use rp_heap::storage::{NodeAlloc, PoolAlloc};
//!
//! let pool: PoolAlloc<u64> = PoolAlloc::new();
//! let shared = pool.clone();
//! assert!(pool == shared);
//!
//! let slot = pool.allocate(1).unwrap();
//! unsafe {
//!     shared.construct(slot, 7);
//!     assert_eq!(shared.take(slot), 7);
//!     shared.deallocate(slot, 1);
//! }
//! assert_eq!(pool.stats().blocks, 1);
//! ```

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use std::rc::Rc;
use thiserror::Error;

/// Default byte budget of one pool block.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// The provider could not supply memory for the given layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory allocation of {} bytes failed", .layout.size())]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    /// Reports a failed request for `layout`; for custom providers
    pub fn new(layout: Layout) -> Self {
        AllocError { layout }
    }

    /// Layout of the request that failed
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

/// A node-memory provider.
///
/// # Safety
///
/// Implementors must return memory that is valid for reads and writes of
/// `count` values of `N`, properly aligned, and not handed out again until it
/// is passed back to `deallocate`. Providers that compare equal must be able
/// to deallocate each other's memory.
pub unsafe trait NodeAlloc<N>: Clone + PartialEq {
    /// Allocates uninitialized memory for `count` values of `N`.
    fn allocate(&self, count: usize) -> Result<NonNull<N>, AllocError>;

    /// Releases memory obtained from `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(count)` on this provider or one equal to
    /// it, must not have been released already, and must hold no live value.
    unsafe fn deallocate(&self, ptr: NonNull<N>, count: usize);

    /// Moves `value` into an allocated slot.
    ///
    /// # Safety
    ///
    /// `ptr` must be an allocated slot that holds no live value.
    #[inline]
    unsafe fn construct(&self, ptr: NonNull<N>, value: N) {
        ptr.as_ptr().write(value);
    }

    /// Moves the value out of a slot, leaving it uninitialized.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a live value.
    #[inline]
    unsafe fn take(&self, ptr: NonNull<N>) -> N {
        ptr.as_ptr().read()
    }

    /// Drops the value in a slot in place, leaving it uninitialized.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a live value.
    #[inline]
    unsafe fn destroy(&self, ptr: NonNull<N>) {
        ptr::drop_in_place(ptr.as_ptr());
    }
}

fn raw_alloc(layout: Layout) -> Result<NonNull<u8>, AllocError> {
    if layout.size() == 0 {
        // SAFETY: alignment is a non-zero power of two
        return Ok(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
    }
    // SAFETY: layout has a non-zero size
    NonNull::new(unsafe { alloc::alloc(layout) }).ok_or(AllocError { layout })
}

unsafe fn raw_dealloc(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() != 0 {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

fn array_layout<N>(count: usize) -> Result<Layout, AllocError> {
    Layout::array::<N>(count).map_err(|_| AllocError {
        layout: Layout::new::<N>(),
    })
}

// ============================================================================
// Global - plain allocation
// ============================================================================

/// Plain provider: every request is a separate system allocation.
///
/// All instances are interchangeable and compare equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl<N> NodeAlloc<N> for Global {
    fn allocate(&self, count: usize) -> Result<NonNull<N>, AllocError> {
        raw_alloc(array_layout::<N>(count)?).map(NonNull::cast)
    }

    unsafe fn deallocate(&self, ptr: NonNull<N>, count: usize) {
        // `allocate(count)` already validated this layout
        if let Ok(layout) = array_layout::<N>(count) {
            raw_dealloc(ptr.cast(), layout);
        }
    }
}

// ============================================================================
// PoolAlloc - block pool with free-list recycling
// ============================================================================

type FreeLink = Option<NonNull<u8>>;

/// Slot geometry of a pool, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotLayout {
    slot_size: usize,
    slot_align: usize,
    header_size: usize,
    slots_per_block: usize,
}

const fn round_up(size: usize, align: usize) -> usize {
    size.div_ceil(align) * align
}

impl SlotLayout {
    /// A slot must hold either an `N` or a free-list link; a block starts
    /// with a header holding the next-block link.
    fn of<N>(block_bytes: usize) -> Self {
        let slot_align = mem::align_of::<N>().max(mem::align_of::<FreeLink>());
        let raw_slot = mem::size_of::<N>().max(mem::size_of::<FreeLink>());
        let slot_size = round_up(raw_slot, slot_align);
        let header_size = round_up(mem::size_of::<FreeLink>(), slot_align);
        let slots_per_block = if block_bytes > header_size {
            ((block_bytes - header_size) / slot_size).max(1)
        } else {
            1
        };
        SlotLayout {
            slot_size,
            slot_align,
            header_size,
            slots_per_block,
        }
    }

    fn block(&self) -> Layout {
        let size = self.header_size + self.slots_per_block * self.slot_size;
        Layout::from_size_align(size, self.slot_align)
            .expect("pool block layout exceeds isize::MAX")
    }
}

/// Shared state behind every clone of one [`PoolAlloc`].
struct PoolState {
    geometry: SlotLayout,
    /// Most recently allocated block; each block's header links the previous one
    blocks: Cell<FreeLink>,
    /// Free slots; each free slot's first word links the next one
    free: Cell<FreeLink>,
    block_count: Cell<usize>,
    free_count: Cell<usize>,
}

impl PoolState {
    fn new(geometry: SlotLayout) -> Self {
        PoolState {
            geometry,
            blocks: Cell::new(None),
            free: Cell::new(None),
            block_count: Cell::new(0),
            free_count: Cell::new(0),
        }
    }

    /// Allocates one block and threads all of its slots onto the free list.
    fn grow(&self) -> Result<(), AllocError> {
        let layout = self.geometry.block();
        let block = raw_alloc(layout)?;
        let SlotLayout {
            slot_size,
            header_size,
            slots_per_block,
            ..
        } = self.geometry;

        // SAFETY: the block is freshly allocated, aligned to `slot_align`
        // (itself a multiple of the link alignment), and every offset below
        // stays inside it.
        unsafe {
            block.cast::<FreeLink>().as_ptr().write(self.blocks.get());
            self.blocks.set(Some(block));

            let start = block.as_ptr().add(header_size);
            for i in 0..slots_per_block {
                let slot = NonNull::new_unchecked(start.add(i * slot_size));
                slot.cast::<FreeLink>().as_ptr().write(self.free.get());
                self.free.set(Some(slot));
            }
        }

        self.block_count.set(self.block_count.get() + 1);
        self.free_count.set(self.free_count.get() + slots_per_block);
        tracing::trace!(
            block_bytes = layout.size(),
            slots = slots_per_block,
            blocks = self.block_count.get(),
            "node pool grew by one block"
        );
        Ok(())
    }

    fn pop_free(&self) -> Result<NonNull<u8>, AllocError> {
        let slot = loop {
            if let Some(slot) = self.free.get() {
                break slot;
            }
            self.grow()?;
        };
        // SAFETY: free slots always start with a valid link
        let next = unsafe { slot.cast::<FreeLink>().as_ptr().read() };
        self.free.set(next);
        self.free_count.set(self.free_count.get() - 1);
        Ok(slot)
    }

    unsafe fn push_free(&self, slot: NonNull<u8>) {
        slot.cast::<FreeLink>().as_ptr().write(self.free.get());
        self.free.set(Some(slot));
        self.free_count.set(self.free_count.get() + 1);
    }
}

impl Drop for PoolState {
    fn drop(&mut self) {
        let layout = self.geometry.block();
        let mut block = self.blocks.get();
        while let Some(ptr) = block {
            // SAFETY: every block in the list was allocated with `layout`
            // and starts with the link to the previous block.
            unsafe {
                block = ptr.cast::<FreeLink>().as_ptr().read();
                raw_dealloc(ptr, layout);
            }
        }
    }
}

/// Snapshot of a pool's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Blocks allocated so far (blocks are only released with the pool)
    pub blocks: usize,
    /// Slots currently on the free list
    pub free_slots: usize,
    /// Capacity of one block, in slots
    pub slots_per_block: usize,
    /// Bytes per slot after padding
    pub slot_size: usize,
}

/// Block pool provider for single-node allocations.
///
/// Slots are carved out of blocks of `BLOCK` bytes and recycled through a
/// free list stored inside the free slots themselves. Blocks are returned to
/// the system only when the last clone of the provider is dropped; the pool
/// never runs value destructors, so owners must destroy live values first.
///
/// # Characteristics
/// - One system allocation per `slots_per_block` pushes
/// - Freed slots are reused LIFO, keeping hot nodes close together
/// - Clones share the pool and compare equal; `rebind` starts a new pool
pub struct PoolAlloc<N, const BLOCK: usize = DEFAULT_BLOCK_SIZE> {
    state: Rc<PoolState>,
    _marker: PhantomData<fn() -> N>,
}

impl<N, const BLOCK: usize> PoolAlloc<N, BLOCK> {
    /// Creates an empty pool; the first allocation grows it by one block.
    pub fn new() -> Self {
        PoolAlloc {
            state: Rc::new(PoolState::new(SlotLayout::of::<N>(BLOCK))),
            _marker: PhantomData,
        }
    }

    /// Creates an independent pool for values of type `U`, with the same
    /// block budget.
    pub fn rebind<U>(&self) -> PoolAlloc<U, BLOCK> {
        PoolAlloc::new()
    }

    /// Current pool bookkeeping
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            blocks: self.state.block_count.get(),
            free_slots: self.state.free_count.get(),
            slots_per_block: self.state.geometry.slots_per_block,
            slot_size: self.state.geometry.slot_size,
        }
    }
}

impl<N, const BLOCK: usize> Default for PoolAlloc<N, BLOCK> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, const BLOCK: usize> Clone for PoolAlloc<N, BLOCK> {
    fn clone(&self) -> Self {
        PoolAlloc {
            state: Rc::clone(&self.state),
            _marker: PhantomData,
        }
    }
}

impl<N, const BLOCK: usize> PartialEq for PoolAlloc<N, BLOCK> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl<N, const BLOCK: usize> Eq for PoolAlloc<N, BLOCK> {}

impl<N, const BLOCK: usize> fmt::Debug for PoolAlloc<N, BLOCK> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAlloc")
            .field("pool", &Rc::as_ptr(&self.state))
            .field("stats", &self.stats())
            .finish()
    }
}

unsafe impl<N, const BLOCK: usize> NodeAlloc<N> for PoolAlloc<N, BLOCK> {
    fn allocate(&self, count: usize) -> Result<NonNull<N>, AllocError> {
        if count != 1 {
            return NodeAlloc::<N>::allocate(&Global, count);
        }
        self.state.pop_free().map(NonNull::cast)
    }

    unsafe fn deallocate(&self, ptr: NonNull<N>, count: usize) {
        if count != 1 {
            NodeAlloc::<N>::deallocate(&Global, ptr, count);
            return;
        }
        self.state.push_free(ptr.cast());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_basic() {
        let alloc = Global;
        let slot = NodeAlloc::<String>::allocate(&alloc, 1).unwrap();
        unsafe {
            alloc.construct(slot, "hello".to_string());
            assert_eq!(&*slot.as_ptr(), "hello");
            alloc.destroy(slot);
            alloc.deallocate(slot, 1);
        }
        assert_eq!(Global, Global);
    }

    #[test]
    fn test_pool_recycles_slots() {
        let pool: PoolAlloc<u64> = PoolAlloc::new();
        let a = pool.allocate(1).unwrap();
        unsafe { pool.deallocate(a, 1) };
        let b = pool.allocate(1).unwrap();
        assert_eq!(a, b);
        unsafe { pool.deallocate(b, 1) };
        assert_eq!(pool.stats().blocks, 1);
    }

    #[test]
    fn test_pool_grows_by_whole_blocks() {
        let pool: PoolAlloc<[u64; 4], 256> = PoolAlloc::new();
        let per_block = pool.stats().slots_per_block;
        assert!(per_block >= 1);

        let slots: Vec<_> = (0..=per_block).map(|_| pool.allocate(1).unwrap()).collect();
        let stats = pool.stats();
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.free_slots, per_block - 1);

        for slot in slots {
            unsafe { pool.deallocate(slot, 1) };
        }
        assert_eq!(pool.stats().free_slots, 2 * per_block);
    }

    #[test]
    fn test_pool_slot_geometry() {
        let pool: PoolAlloc<u8> = PoolAlloc::new();
        let stats = pool.stats();
        // A slot must fit a free-list link even for tiny values
        assert_eq!(stats.slot_size, mem::size_of::<FreeLink>());

        let big: PoolAlloc<[u8; 8192]> = PoolAlloc::new();
        assert_eq!(big.stats().slots_per_block, 1);
    }

    #[test]
    fn test_pool_clones_share_state() {
        let pool: PoolAlloc<u32> = PoolAlloc::new();
        let shared = pool.clone();
        assert_eq!(pool, shared);

        let slot = shared.allocate(1).unwrap();
        assert_eq!(pool.stats(), shared.stats());
        unsafe { pool.deallocate(slot, 1) };
        assert_eq!(shared.stats().free_slots, shared.stats().slots_per_block);
    }

    #[test]
    fn test_pool_rebind_is_independent() {
        let pool: PoolAlloc<u32> = PoolAlloc::new();
        let _slot = pool.allocate(1).unwrap();

        let other: PoolAlloc<u64> = pool.rebind();
        assert_eq!(other.stats().blocks, 0);
        assert_ne!(pool, pool.rebind::<u32>());
    }

    #[test]
    fn test_pool_bulk_falls_through() {
        let pool: PoolAlloc<u32> = PoolAlloc::new();
        let many = pool.allocate(16).unwrap();
        assert_eq!(pool.stats().blocks, 0);
        unsafe {
            for i in 0..16 {
                many.as_ptr().add(i).write(i as u32);
            }
            assert_eq!(*many.as_ptr().add(15), 15);
            pool.deallocate(many, 16);
        }
        assert_eq!(pool.stats().blocks, 0);
    }

    #[test]
    fn test_zero_count_is_dangling() {
        let slot = NodeAlloc::<u64>::allocate(&Global, 0).unwrap();
        assert_eq!(slot.as_ptr() as usize % mem::align_of::<u64>(), 0);
        unsafe { NodeAlloc::<u64>::deallocate(&Global, slot, 0) };
    }
}
