//! # Free-List Block Storage
//!
//! Slot storage: removal vacates the slot and threads its index into a
//! free list for reuse. Indices of all other elements are preserved, which
//! is what handle tables need; iteration has to skip holes.

use super::block::{split_index, BLOCK_CAPACITY};

/// Free-list block storage.
///
/// Occupancy is encoded by the slot's `Option`; vacated slot indices are
/// kept on a stack and reused in LIFO order.
pub struct FreeListStorage<T> {
    blocks: Vec<Vec<Option<T>>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> FreeListStorage<T> {
    /// Creates an empty storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Returns the number of live elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no live elements are stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total number of slots ever created (live + vacant).
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.live + self.free.len()
    }

    /// Inserts an element, reusing a vacant slot if one exists.
    ///
    /// O(1) amortized; allocates at most one new block. Returns the slot
    /// index, which stays valid until the element is removed.
    pub fn insert(&mut self, value: T) -> u32 {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let (block, offset) = split_index(index as usize);
            self.blocks[block][offset] = Some(value);
            return index;
        }

        // Fresh slots only ever append, so every block before the last
        // is full and the next index falls off the last block's tail.
        if self
            .blocks
            .last()
            .map_or(true, |block| block.len() == BLOCK_CAPACITY)
        {
            self.blocks.push(Vec::with_capacity(BLOCK_CAPACITY));
        }
        let block = self.blocks.len() - 1;
        let index = block * BLOCK_CAPACITY + self.blocks[block].len();
        self.blocks[block].push(Some(value));
        u32::try_from(index).unwrap_or_else(|_| {
            tracing::error!("free-list storage exceeded u32 index space");
            panic!("free-list storage exceeded u32 index space");
        })
    }

    /// Removes the element at `index`, leaving the slot vacant.
    ///
    /// Returns `None` if the slot is out of range or already vacant.
    pub fn remove(&mut self, index: u32) -> Option<T> {
        let (block, offset) = split_index(index as usize);
        let slot = self.blocks.get_mut(block)?.get_mut(offset)?;
        let value = slot.take()?;
        self.free.push(index);
        self.live -= 1;
        Some(value)
    }

    /// Gets the element at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&T> {
        let (block, offset) = split_index(index as usize);
        self.blocks.get(block)?.get(offset)?.as_ref()
    }

    /// Gets the element at `index` mutably.
    #[inline]
    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        let (block, offset) = split_index(index as usize);
        self.blocks.get_mut(block)?.get_mut(offset)?.as_mut()
    }

    /// Iterates over live elements with their slot indices.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(block, slots)| {
                slots.iter().enumerate().filter_map(move |(offset, slot)| {
                    let index = u32::try_from(block * BLOCK_CAPACITY + offset).ok()?;
                    slot.as_ref().map(|value| (index, value))
                })
            })
    }

    /// Iterates mutably over live elements with their slot indices.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.blocks
            .iter_mut()
            .enumerate()
            .flat_map(|(block, slots)| {
                slots
                    .iter_mut()
                    .enumerate()
                    .filter_map(move |(offset, slot)| {
                        let index = u32::try_from(block * BLOCK_CAPACITY + offset).ok()?;
                        slot.as_mut().map(|value| (index, value))
                    })
            })
    }
}

impl<T> Default for FreeListStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut storage = FreeListStorage::new();
        let a = storage.insert("a");
        let b = storage.insert("b");
        assert_eq!(storage.get(a), Some(&"a"));
        assert_eq!(storage.get(b), Some(&"b"));
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_remove_preserves_other_indices() {
        let mut storage = FreeListStorage::new();
        let a = storage.insert(1);
        let b = storage.insert(2);
        let c = storage.insert(3);

        assert_eq!(storage.remove(b), Some(2));
        assert_eq!(storage.get(a), Some(&1));
        assert_eq!(storage.get(c), Some(&3));
        assert!(storage.get(b).is_none());
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_slot_reuse() {
        let mut storage = FreeListStorage::new();
        let a = storage.insert(1);
        storage.remove(a).unwrap();

        let b = storage.insert(2);
        assert_eq!(a, b, "vacated slot is reused");
        assert_eq!(storage.get(b), Some(&2));
    }

    #[test]
    fn test_double_remove_is_none() {
        let mut storage = FreeListStorage::new();
        let a = storage.insert(1);
        assert_eq!(storage.remove(a), Some(1));
        assert_eq!(storage.remove(a), None);
    }

    #[test]
    fn test_fresh_inserts_stay_sequential_across_blocks() {
        let mut storage = FreeListStorage::new();
        let total = BLOCK_CAPACITY * 2 + 3;
        for i in 0..total {
            let slot = storage.insert(i);
            assert_eq!(slot as usize, i);
        }

        // Reuse never disturbs where the next fresh slot lands.
        storage.remove(5).unwrap();
        assert_eq!(storage.insert(999), 5);
        assert_eq!(storage.insert(1000) as usize, total);
    }

    #[test]
    fn test_iter_skips_holes() {
        let mut storage = FreeListStorage::new();
        let _a = storage.insert(1);
        let b = storage.insert(2);
        let _c = storage.insert(3);
        storage.remove(b).unwrap();

        let values: Vec<i32> = storage.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 3]);
    }
}
