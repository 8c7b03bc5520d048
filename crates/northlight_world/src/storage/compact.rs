//! # Compact Block Storage
//!
//! Dense storage: elements occupy flat indices `0..len` with no holes.
//! Removal swaps the last live element into the hole, so callers must not
//! cache raw indices across removals; [`CompactStorage::swap_remove`]
//! reports which index moved so owners can patch their back-references.

use super::block::{split_index, BLOCK_CAPACITY};

/// Dense block storage.
///
/// Elements live in fixed-capacity blocks; only the last block is
/// partially filled. Blocks never reallocate once created.
pub struct CompactStorage<T> {
    blocks: Vec<Vec<T>>,
    len: usize,
}

impl<T> CompactStorage<T> {
    /// Creates an empty storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            len: 0,
        }
    }

    /// Returns the number of stored elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the storage holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends an element, returning its flat index.
    ///
    /// O(1) amortized; allocates at most one new block.
    pub fn push(&mut self, value: T) -> usize {
        let index = self.len;
        let (block, _) = split_index(index);
        if block == self.blocks.len() {
            self.blocks.push(Vec::with_capacity(BLOCK_CAPACITY));
        }
        self.blocks[block].push(value);
        self.len += 1;
        index
    }

    /// Gets an element by flat index.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let (block, offset) = split_index(index);
        self.blocks[block].get(offset)
    }

    /// Gets an element mutably by flat index.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let (block, offset) = split_index(index);
        self.blocks[block].get_mut(offset)
    }

    /// Removes the element at `index`, filling the hole with the last
    /// element.
    ///
    /// Returns the removed element and, if another element was moved into
    /// the hole, the flat index it was moved *from* (the moved element now
    /// lives at `index`).
    pub fn swap_remove(&mut self, index: usize) -> Option<(T, Option<usize>)> {
        if index >= self.len {
            return None;
        }
        let last = self.len - 1;
        let (last_block, _) = split_index(last);
        let tail = self.blocks[last_block]
            .pop()
            .unwrap_or_else(|| unreachable!("non-empty storage has a tail element"));
        self.len = last;
        if self.blocks[last_block].is_empty() {
            self.blocks.pop();
        }
        if index == last {
            return Some((tail, None));
        }
        let (block, offset) = split_index(index);
        let removed = std::mem::replace(&mut self.blocks[block][offset], tail);
        Some((removed, Some(last)))
    }

    /// Iterates over all elements in flat-index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.blocks.iter().flat_map(|b| b.iter())
    }

    /// Iterates mutably over all elements in flat-index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.blocks.iter_mut().flat_map(|b| b.iter_mut())
    }

    /// Iterates over the per-block contiguous slices.
    ///
    /// Each slice starts at the flat index given alongside it. This is the
    /// unit used to carve parallel work without crossing block seams.
    pub fn block_slices_mut(&mut self) -> impl Iterator<Item = (usize, &mut [T])> {
        self.blocks
            .iter_mut()
            .enumerate()
            .map(|(i, b)| (i * BLOCK_CAPACITY, b.as_mut_slice()))
    }

    /// Removes all elements.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.len = 0;
    }
}

impl<T> Default for CompactStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}
