//! # Transform Hierarchy
//!
//! Owns the transformation data of every object, separated from the
//! [`GameObject`](crate::object::GameObject) record itself and stored in
//! per-level block arrays so that traversing one hierarchy level walks
//! sequential memory.
//!
//! Each level is partitioned into a *static* and a *dynamic* storage:
//! dynamic records are recomputed every tick, static records only when
//! explicitly dirtied (re-parenting, editor moves). Propagation is
//! breadth-first, level by level, so a parent's global transform is always
//! finalized before any of its children are visited - including across
//! unrelated subtrees, which is what makes per-level parallelism safe.

mod propagate;

use crate::object::ObjectId;
use crate::storage::CompactStorage;
use crate::transform::Transform;

/// Static vs dynamic classification of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mobility {
    /// Never moves after placement; skipped by per-frame propagation
    /// unless explicitly dirtied.
    Static,
    /// Recomputed every tick.
    Dynamic,
}

/// Where an object's transform record lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Hierarchy depth; roots are level 0.
    pub level: u32,
    /// Which per-level storage holds the record.
    pub mobility: Mobility,
    /// Flat index into that storage. Changes when compaction moves the
    /// record; the owning object's placement is patched when it does.
    pub slot: u32,
}

impl Placement {
    /// Placement of an object that has not been inserted yet.
    pub const UNSET: Self = Self {
        level: 0,
        mobility: Mobility::Dynamic,
        slot: u32::MAX,
    };
}

/// Cache-line-oriented transform record, one per object.
#[derive(Clone, Copy, Debug)]
pub struct TransformRecord {
    /// Object this record belongs to (back-reference).
    pub owner: ObjectId,
    /// Parent object, or null at level 0.
    pub parent: ObjectId,
    /// Transform relative to the parent.
    pub local: Transform,
    /// Cached world-space transform.
    pub global: Transform,
    /// Static records only: recompute on the next pass.
    pub dirty: bool,
}

/// One hierarchy level: all objects at the same depth.
#[derive(Default)]
pub(crate) struct Level {
    pub(crate) statics: CompactStorage<TransformRecord>,
    pub(crate) dynamics: CompactStorage<TransformRecord>,
}

impl Level {
    pub(crate) fn storage(&self, mobility: Mobility) -> &CompactStorage<TransformRecord> {
        match mobility {
            Mobility::Static => &self.statics,
            Mobility::Dynamic => &self.dynamics,
        }
    }

    pub(crate) fn storage_mut(
        &mut self,
        mobility: Mobility,
    ) -> &mut CompactStorage<TransformRecord> {
        match mobility {
            Mobility::Static => &mut self.statics,
            Mobility::Dynamic => &mut self.dynamics,
        }
    }

    fn is_empty(&self) -> bool {
        self.statics.is_empty() && self.dynamics.is_empty()
    }
}

/// Per-level transform storage and propagation for one world.
#[derive(Default)]
pub struct Hierarchy {
    pub(crate) levels: Vec<Level>,
}

impl Hierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    /// Number of populated levels (depth of the deepest object + 1).
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Inserts a record for `owner` at the given level.
    ///
    /// The global transform is seeded immediately from the parent's global
    /// so reads are consistent before the first propagation pass.
    pub(crate) fn insert(
        &mut self,
        owner: ObjectId,
        parent: ObjectId,
        parent_global: Option<Transform>,
        level: u32,
        mobility: Mobility,
        local: Transform,
    ) -> Placement {
        while self.levels.len() <= level as usize {
            self.levels.push(Level::default());
        }
        let global = parent_global.map_or(local, |p| p.compose(&local));
        let record = TransformRecord {
            owner,
            parent,
            local,
            global,
            dirty: false,
        };
        let slot = self.levels[level as usize].storage_mut(mobility).push(record);
        Placement {
            level,
            mobility,
            slot: u32::try_from(slot).unwrap_or_else(|_| {
                tracing::error!(level, "hierarchy level exceeded u32 slot space");
                panic!("hierarchy level {level} exceeded u32 slot space");
            }),
        }
    }

    /// Removes a record.
    ///
    /// Returns the record and, if compaction moved another record into the
    /// vacated slot, the owner of that moved record; the caller must patch
    /// that object's placement.
    pub(crate) fn remove(
        &mut self,
        placement: Placement,
    ) -> Option<(TransformRecord, Option<ObjectId>)> {
        let storage = self
            .levels
            .get_mut(placement.level as usize)?
            .storage_mut(placement.mobility);
        let (record, moved_from) = storage.swap_remove(placement.slot as usize)?;
        let moved_owner = moved_from
            .and_then(|_| storage.get(placement.slot as usize))
            .map(|r| r.owner);
        while self.levels.last().is_some_and(Level::is_empty) {
            self.levels.pop();
        }
        Some((record, moved_owner))
    }

    /// Reads a record.
    #[must_use]
    pub(crate) fn record(&self, placement: Placement) -> Option<&TransformRecord> {
        self.levels
            .get(placement.level as usize)?
            .storage(placement.mobility)
            .get(placement.slot as usize)
    }

    pub(crate) fn record_mut(&mut self, placement: Placement) -> Option<&mut TransformRecord> {
        self.levels
            .get_mut(placement.level as usize)?
            .storage_mut(placement.mobility)
            .get_mut(placement.slot as usize)
    }

    /// Replaces a record's local transform.
    ///
    /// Static records are marked dirty; the caller is responsible for
    /// dirtying static descendants (it owns the child lists).
    pub(crate) fn set_local(&mut self, placement: Placement, local: Transform) -> bool {
        match self.record_mut(placement) {
            Some(record) => {
                record.local = local;
                if placement.mobility == Mobility::Static {
                    record.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    /// Marks a record for recomputation on the next pass.
    pub(crate) fn mark_dirty(&mut self, placement: Placement) {
        if let Some(record) = self.record_mut(placement) {
            record.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn id(index: u32) -> ObjectId {
        ObjectId::new(index, 0)
    }

    #[test]
    fn test_insert_seeds_global_from_parent() {
        let mut hierarchy = Hierarchy::new();
        let root = hierarchy.insert(
            id(0),
            ObjectId::NULL,
            None,
            0,
            Mobility::Dynamic,
            Transform::from_position(Vec3::new(5.0, 0.0, 0.0)),
        );
        let root_global = hierarchy.record(root).unwrap().global;
        let child = hierarchy.insert(
            id(1),
            id(0),
            Some(root_global),
            1,
            Mobility::Dynamic,
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
        );

        assert_eq!(hierarchy.level_count(), 2);
        let global = hierarchy.record(child).unwrap().global;
        assert_eq!(global.position, Vec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_remove_reports_moved_owner() {
        let mut hierarchy = Hierarchy::new();
        let a = hierarchy.insert(
            id(0),
            ObjectId::NULL,
            None,
            0,
            Mobility::Dynamic,
            Transform::IDENTITY,
        );
        let _b = hierarchy.insert(
            id(1),
            ObjectId::NULL,
            None,
            0,
            Mobility::Dynamic,
            Transform::IDENTITY,
        );

        let (record, moved) = hierarchy.remove(a).unwrap();
        assert_eq!(record.owner, id(0));
        assert_eq!(moved, Some(id(1)), "last record moved into the hole");
    }

    #[test]
    fn test_empty_tail_levels_trimmed() {
        let mut hierarchy = Hierarchy::new();
        let root = hierarchy.insert(
            id(0),
            ObjectId::NULL,
            None,
            0,
            Mobility::Dynamic,
            Transform::IDENTITY,
        );
        let child = hierarchy.insert(
            id(1),
            id(0),
            None,
            1,
            Mobility::Dynamic,
            Transform::IDENTITY,
        );
        assert_eq!(hierarchy.level_count(), 2);

        hierarchy.remove(child).unwrap();
        assert_eq!(hierarchy.level_count(), 1);
        hierarchy.remove(root).unwrap();
        assert_eq!(hierarchy.level_count(), 0);
    }

    #[test]
    fn test_static_set_local_marks_dirty() {
        let mut hierarchy = Hierarchy::new();
        let placement = hierarchy.insert(
            id(0),
            ObjectId::NULL,
            None,
            0,
            Mobility::Static,
            Transform::IDENTITY,
        );
        assert!(!hierarchy.record(placement).unwrap().dirty);

        hierarchy.set_local(placement, Transform::from_position(Vec3::X));
        assert!(hierarchy.record(placement).unwrap().dirty);
    }
}
