//! # Game Objects
//!
//! A game object is a node in the scene hierarchy: a name, a parent link
//! (back-reference, never ownership), ordered child back-references, the
//! keys of its attached components, a tag set, and its placement in the
//! transform hierarchy. The transformation data itself lives in the
//! per-level block arrays owned by [`Hierarchy`](crate::hierarchy::Hierarchy).

use std::collections::HashSet;

use crate::component::ComponentKey;
use crate::hierarchy::{Mobility, Placement};
use crate::object::ObjectId;

/// Parameters for creating a game object.
#[derive(Clone, Debug)]
pub struct ObjectDesc {
    /// Display name.
    pub name: String,
    /// Parent object, or `None` for a root.
    pub parent: Option<ObjectId>,
    /// Local transform relative to the parent.
    pub local: crate::transform::Transform,
    /// Static objects are skipped by per-frame propagation unless dirtied.
    pub mobility: Mobility,
    /// Initial active flag.
    pub active: bool,
    /// Initial tags.
    pub tags: Vec<String>,
}

impl Default for ObjectDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            local: crate::transform::Transform::IDENTITY,
            mobility: Mobility::Dynamic,
            active: true,
            tags: Vec::new(),
        }
    }
}

/// A node in the scene hierarchy.
pub struct GameObject {
    pub(crate) name: String,
    pub(crate) parent: ObjectId,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) components: Vec<ComponentKey>,
    pub(crate) tags: HashSet<String>,
    pub(crate) active: bool,
    pub(crate) placement: Placement,
    pub(crate) dead: bool,
}

impl GameObject {
    pub(crate) fn new(desc: &ObjectDesc) -> Self {
        Self {
            name: desc.name.clone(),
            parent: desc.parent.unwrap_or(ObjectId::NULL),
            children: Vec::new(),
            components: Vec::new(),
            tags: desc.tags.iter().cloned().collect(),
            active: desc.active,
            placement: Placement::UNSET,
            dead: false,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent id, or [`ObjectId::NULL`] for roots.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> ObjectId {
        self.parent
    }

    /// Child ids in attach order.
    #[must_use]
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Keys of attached components in attach order.
    #[must_use]
    pub fn components(&self) -> &[ComponentKey] {
        &self.components
    }

    /// Whether the object is active.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Static/dynamic classification.
    #[inline]
    #[must_use]
    pub fn mobility(&self) -> Mobility {
        self.placement.mobility
    }

    /// Hierarchy depth (roots are level 0).
    #[inline]
    #[must_use]
    pub fn level(&self) -> u32 {
        self.placement.level
    }

    /// Checks a tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Adds a tag. Returns false if it was already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.tags.insert(tag.to_owned())
    }

    /// Removes a tag. Returns false if it was not present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }
}
