//! # Transform Propagation
//!
//! Breadth-first global-transform recomputation. Levels are processed in
//! order; within one level every record's parent already has a final
//! global transform, so records are mutually independent and a dynamic
//! level may be carved into per-block tasks for the worker pool.
//!
//! Depth-first traversal exists elsewhere (serialization, recursive
//! messages) but is never used here: it cannot guarantee parent-before-
//! child ordering across unrelated subtrees when run in parallel.

use crossbeam_channel::unbounded;

use super::{Hierarchy, Level, TransformRecord};
use crate::object::{ObjectId, ObjectTable};
use crate::schedule::WorkerPool;
use crate::storage::BLOCK_CAPACITY;
use crate::transform::Transform;

impl Hierarchy {
    /// Recomputes global transforms for the whole hierarchy.
    ///
    /// Dynamic records are always recomputed; static records only when
    /// dirty. Returns the dynamic objects whose global transform actually
    /// changed this pass, for spatial-index notification. Order within
    /// the returned set is unspecified.
    pub(crate) fn propagate(
        &mut self,
        objects: &ObjectTable,
        pool: &WorkerPool,
    ) -> Vec<(ObjectId, Transform)> {
        let mut changed = Vec::new();

        for level in 0..self.levels.len() {
            let (finished, rest) = self.levels.split_at_mut(level);
            let parent_level = finished.last();
            let current = &mut rest[0];

            // Dirty statics are rare; always serial.
            for record in current.statics.iter_mut() {
                if record.dirty {
                    recompute(record, parent_level, objects);
                    record.dirty = false;
                }
            }

            let parallel =
                pool.workers() > 0 && current.dynamics.len() > BLOCK_CAPACITY;
            if parallel {
                let (sender, receiver) = unbounded();
                let mut tasks: Vec<crate::schedule::Task<'_>> = Vec::new();
                for (_, block) in current.dynamics.block_slices_mut() {
                    let sender = sender.clone();
                    tasks.push(Box::new(move || {
                        for record in block {
                            if recompute(record, parent_level, objects) {
                                let _ = sender.send((record.owner, record.global));
                            }
                        }
                    }));
                }
                drop(sender);
                pool.run(tasks);
                changed.extend(receiver.try_iter());
            } else {
                for record in current.dynamics.iter_mut() {
                    if recompute(record, parent_level, objects) {
                        changed.push((record.owner, record.global));
                    }
                }
            }
        }

        changed
    }
}

/// Recomputes one record's global transform from its parent's.
///
/// Returns true if the cached global actually changed. A record whose
/// parent cannot be resolved (destroyed this tick, awaiting reclamation)
/// keeps its previous global.
fn recompute(
    record: &mut TransformRecord,
    parent_level: Option<&Level>,
    objects: &ObjectTable,
) -> bool {
    let new_global = if record.parent.is_null() {
        record.local
    } else {
        let Some(parent) = objects.try_get(record.parent) else {
            return false;
        };
        let placement = parent.placement;
        let Some(parent_record) = parent_level
            .and_then(|level| level.storage(placement.mobility).get(placement.slot as usize))
        else {
            return false;
        };
        parent_record.global.compose(&record.local)
    };

    if new_global == record.global {
        false
    } else {
        record.global = new_global;
        true
    }
}
