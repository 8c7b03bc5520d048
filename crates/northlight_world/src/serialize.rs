//! # Scene Walking
//!
//! The world does not serialize itself; it walks its contents through a
//! [`SceneVisitor`] in a deterministic order and lets the collaborator
//! decide on a format. Order: root objects in creation order, each
//! followed by its descendants depth-first, then per-type component
//! tables sorted by type name.
//!
//! Objects are identified to the visitor by a dense walk index instead of
//! their [`ObjectId`](crate::object::ObjectId): ids encode slot reuse and
//! generations, which have no meaning outside the live world.

use crate::component::Component;
use crate::object::{GameObject, ObjectId};

/// Receiver for one deterministic walk of a world's contents.
pub trait SceneVisitor {
    /// Called once per live object, parents before children.
    ///
    /// `index` is the dense walk index; `parent_index` refers to an
    /// earlier call or is `None` for roots.
    fn object(&mut self, index: u32, id: ObjectId, parent_index: Option<u32>, object: &GameObject);

    /// Called once per component type that has live instances, before its
    /// instances. Types arrive sorted by name.
    fn begin_component_type(&mut self, type_name: &'static str) {
        let _ = type_name;
    }

    /// Called once per component instance, in dense storage order.
    /// Downcast via [`Component::as_any`].
    fn component(&mut self, owner_index: u32, component: &dyn Component) {
        let _ = (owner_index, component);
    }
}
