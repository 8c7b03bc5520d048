//! # Object Table
//!
//! Generation-checked lookup table for all game objects in a world.
//!
//! Slots follow the free-list policy so an object's index never changes
//! during its lifetime; each slot carries a generation counter that is
//! incremented when the slot is vacated. A lookup succeeds only if the
//! handle's generation matches the slot's, so stale ids fail
//! deterministically instead of aliasing a reused slot.
//!
//! Destroyed objects are not reclaimed immediately: they are marked dead
//! and collected into a dead set which the world processes at a defined
//! point in the tick, never mid-traversal.

use crate::object::{GameObject, ObjectId};
use crate::storage::FreeListStorage;

/// Owns every game object of one world.
pub struct ObjectTable {
    objects: FreeListStorage<GameObject>,
    generations: Vec<u32>,
    dead: Vec<ObjectId>,
}

impl ObjectTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: FreeListStorage::new(),
            generations: Vec::new(),
            dead: Vec::new(),
        }
    }

    /// Number of live (not yet reclaimed) objects.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the table holds no objects.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Inserts an object, returning its id. O(1) amortized, never blocks.
    pub fn create(&mut self, object: GameObject) -> ObjectId {
        let index = self.objects.insert(object);
        let idx = index as usize;
        if idx == self.generations.len() {
            self.generations.push(0);
        }
        ObjectId::new(index, self.generations[idx])
    }

    /// Checks whether an id refers to a live object.
    #[must_use]
    pub fn is_valid(&self, id: ObjectId) -> bool {
        self.try_get(id).is_some()
    }

    /// Looks up an object. Returns `None` for stale, out-of-range or dead
    /// ids.
    #[must_use]
    pub fn try_get(&self, id: ObjectId) -> Option<&GameObject> {
        if id.is_null() || self.generations.get(id.index() as usize) != Some(&id.generation()) {
            return None;
        }
        self.objects.get(id.index()).filter(|o| !o.dead)
    }

    /// Looks up an object mutably.
    pub fn try_get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        if id.is_null() || self.generations.get(id.index() as usize) != Some(&id.generation()) {
            return None;
        }
        self.objects.get_mut(id.index()).filter(|o| !o.dead)
    }

    /// Looks up an object that may already be marked dead.
    ///
    /// Reclamation and dead-set processing need to see the carcass.
    pub(crate) fn try_get_dead(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        if id.is_null() || self.generations.get(id.index() as usize) != Some(&id.generation()) {
            return None;
        }
        self.objects.get_mut(id.index())
    }

    /// Marks an object dead and records it in the dead set.
    ///
    /// The slot stays occupied (and the id keeps failing lookups through
    /// [`ObjectTable::try_get`]) until [`ObjectTable::reclaim`] runs.
    pub(crate) fn mark_dead(&mut self, id: ObjectId) -> bool {
        match self.try_get_mut(id) {
            Some(object) => {
                object.dead = true;
                self.dead.push(id);
                true
            }
            None => false,
        }
    }

    /// Takes the current dead set.
    pub(crate) fn take_dead(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.dead)
    }

    /// Reclaims a dead slot: removes the object and bumps the slot
    /// generation so the old id can never resolve to a future occupant.
    ///
    /// # Panics
    ///
    /// Panics if the slot's generation counter is exhausted. That means
    /// the same slot was recycled four billion times - a capacity
    /// misconfiguration, not a recoverable runtime condition.
    pub(crate) fn reclaim(&mut self, id: ObjectId) -> Option<GameObject> {
        if self.generations.get(id.index() as usize) != Some(&id.generation()) {
            return None;
        }
        let object = self.objects.remove(id.index())?;
        let generation = &mut self.generations[id.index() as usize];
        let Some(next) = generation.checked_add(1) else {
            tracing::error!(
                index = id.index(),
                "object slot generation counter exhausted"
            );
            panic!(
                "object slot {} exhausted its generation counter",
                id.index()
            );
        };
        *generation = next;
        Some(object)
    }

    /// Iterates over live objects with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &GameObject)> {
        self.objects
            .iter()
            .filter(|(_, o)| !o.dead)
            .map(|(index, o)| (ObjectId::new(index, self.generations[index as usize]), o))
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectDesc;

    fn object(name: &str) -> GameObject {
        GameObject::new(&ObjectDesc {
            name: name.to_owned(),
            ..ObjectDesc::default()
        })
    }

    #[test]
    fn test_create_and_lookup() {
        let mut table = ObjectTable::new();
        let id = table.create(object("a"));
        assert!(table.is_valid(id));
        assert_eq!(table.try_get(id).unwrap().name(), "a");
    }

    #[test]
    fn test_stale_id_fails_after_reclaim() {
        let mut table = ObjectTable::new();
        let id = table.create(object("a"));
        assert!(table.mark_dead(id));
        assert!(table.try_get(id).is_none(), "dead object already hidden");

        table.reclaim(id).unwrap();
        assert!(table.try_get(id).is_none());

        let reused = table.create(object("b"));
        assert_eq!(reused.index(), id.index(), "slot is reused");
        assert_ne!(reused.generation(), id.generation());
        assert!(table.try_get(id).is_none(), "old id never sees new object");
        assert_eq!(table.try_get(reused).unwrap().name(), "b");
    }

    #[test]
    fn test_out_of_range_id_fails() {
        let table = ObjectTable::new();
        assert!(table.try_get(ObjectId::new(999, 0)).is_none());
        assert!(table.try_get(ObjectId::NULL).is_none());
    }

    #[test]
    fn test_dead_set_collects_marked_objects() {
        let mut table = ObjectTable::new();
        let a = table.create(object("a"));
        let b = table.create(object("b"));
        table.mark_dead(a);

        let dead = table.take_dead();
        assert_eq!(dead, vec![a]);
        assert!(table.is_valid(b));
        assert!(table.take_dead().is_empty());
    }
}
