//! # World Modules
//!
//! A module is a world-scoped service (physics scene, navigation data,
//! scripting host) registered by type. At most one instance of a type
//! exists per world; lookup is by type, so modules need no name registry.

use std::any::Any;

use crate::world::World;

/// A typed world-scoped service.
pub trait WorldModule: Any + Send + Sync {
    /// Called once when the module is registered, before it becomes
    /// visible to lookups.
    fn initialize(&mut self, world: &mut World) {
        let _ = world;
    }

    /// Called once during world teardown, in reverse registration order.
    fn deinitialize(&mut self, world: &mut World) {
        let _ = world;
    }

    /// Upcast for typed lookup.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed lookup.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
