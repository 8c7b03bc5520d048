//! # Spatial Index Hook
//!
//! The world owns no spatial acceleration structure; an external index
//! (octree, grid, broadphase) can register here and is told which dynamic
//! objects actually moved after each propagation pass. Static objects
//! never generate notifications unless explicitly dirtied.

use crate::object::ObjectId;
use crate::transform::Transform;

/// External structure kept in sync with moving objects.
pub trait SpatialIndex: Send + Sync {
    /// An object's global transform changed during the last propagation.
    fn transform_changed(&mut self, object: ObjectId, global: &Transform);

    /// An object left the world; drop any cached entry for it.
    fn object_removed(&mut self, object: ObjectId) {
        let _ = object;
    }
}
