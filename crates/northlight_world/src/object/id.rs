//! # Object Ids
//!
//! Objects are addressed through lightweight generation-counted handles:
//! - Lower 32 bits: index into the object table
//! - Upper 32 bits: generation counter for detecting stale references
//!
//! An id stays unique until its slot is reused; reuse increments the
//! generation so stale handles fail lookups deterministically instead of
//! aliasing a new object.

/// Unique identifier for a game object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Null/invalid object id.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates an object id from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the id.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the id.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Checks whether this id is the null sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = ObjectId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
        assert!(!id.is_null());
    }

    #[test]
    fn test_null_id() {
        assert!(ObjectId::NULL.is_null());
        assert!(ObjectId::default().is_null());
    }

    #[test]
    fn test_generation_distinguishes_reused_index() {
        let old = ObjectId::new(7, 0);
        let new = ObjectId::new(7, 1);
        assert_ne!(old, new);
        assert_eq!(old.index(), new.index());
    }
}
