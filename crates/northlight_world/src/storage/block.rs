//! # Block Layout
//!
//! All object and component storage in the world is a sequence of
//! fixed-capacity blocks. Blocks are allocated whole and never move, so
//! growing a storage never relocates existing elements, and iterating one
//! block touches contiguous memory.
//!
//! Two policies are built on this layout:
//! - [`CompactStorage`](super::CompactStorage): dense, swap-remove fills
//!   holes from the tail. Fast to iterate, but removal changes the moved
//!   element's index.
//! - [`FreeListStorage`](super::FreeListStorage): removal leaves a hole
//!   and threads the slot into a free list. All other indices are
//!   preserved at the cost of sparser iteration.
//!
//! The policy is chosen per use-case, not globally.

/// Number of element slots per storage block.
pub const BLOCK_CAPACITY: usize = 64;

/// Splits a flat index into (block, offset).
#[inline]
#[must_use]
pub(crate) const fn split_index(index: usize) -> (usize, usize) {
    (index / BLOCK_CAPACITY, index % BLOCK_CAPACITY)
}
