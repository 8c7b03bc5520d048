//! # Structural Listeners
//!
//! Observers notified of structural world changes: object creation,
//! destruction (at reclamation, not at the destroy call), and reparenting.
//! Listeners fire synchronously in registration order.

use crate::object::ObjectId;

/// Observer of structural world changes. All hooks default to no-ops.
pub trait WorldListener: Send + Sync {
    /// An object was created and placed in the hierarchy.
    fn object_created(&mut self, id: ObjectId) {
        let _ = id;
    }

    /// An object's slot is about to be reclaimed. The id is already
    /// invalid for lookups.
    fn object_destroyed(&mut self, id: ObjectId) {
        let _ = id;
    }

    /// An object was moved to a new parent. Either parent id may be null
    /// for root attachment.
    fn parent_changed(&mut self, child: ObjectId, old_parent: ObjectId, new_parent: ObjectId) {
        let _ = (child, old_parent, new_parent);
    }
}

/// Handle for unregistering a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Ordered listener registry.
#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: Vec<(ListenerId, Box<dyn WorldListener>)>,
    next: u64,
}

impl ListenerSet {
    pub(crate) fn register(&mut self, listener: Box<dyn WorldListener>) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn notify_created(&mut self, id: ObjectId) {
        for (_, listener) in &mut self.entries {
            listener.object_created(id);
        }
    }

    pub(crate) fn notify_destroyed(&mut self, id: ObjectId) {
        for (_, listener) in &mut self.entries {
            listener.object_destroyed(id);
        }
    }

    pub(crate) fn notify_parent_changed(
        &mut self,
        child: ObjectId,
        old_parent: ObjectId,
        new_parent: ObjectId,
    ) {
        for (_, listener) in &mut self.entries {
            listener.parent_changed(child, old_parent, new_parent);
        }
    }
}
