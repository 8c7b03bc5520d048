//! # Northlight World
//!
//! Scene runtime for a game engine: generation-checked game objects, a
//! breadth-first transform hierarchy, per-type component managers with
//! batched initialization, a phase/priority update scheduler with
//! data-parallel dispatch, and delayed message routing.
//!
//! ## Architecture Rules
//!
//! 1. **Handles, not pointers** - objects and components are addressed by
//!    generation-counted ids that fail deterministically when stale
//! 2. **Block storage** - hot data lives in fixed-capacity blocks that
//!    never reallocate, either compacted (update streaming) or free-listed
//!    (stable indices)
//! 3. **Deferred destruction** - nothing is torn down mid-traversal; dead
//!    objects and detached components wait for the tick's safe point
//!
//! ## Example
//!
//! ```rust,ignore
//! use northlight_world::{ObjectDesc, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig::default())?;
//! let hero = world.create_object(&ObjectDesc {
//!     name: "hero".into(),
//!     ..ObjectDesc::default()
//! });
//! world.start_simulation();
//! world.tick(1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod component;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod listener;
pub mod lock;
pub mod message;
pub mod module;
pub mod object;
pub mod schedule;
pub mod serialize;
pub mod spatial;
pub mod storage;
pub mod transform;
pub mod world;

pub use component::{
    Component, ComponentContext, ComponentEntry, ComponentHandle, ComponentKey,
    ComponentManager, ComponentState, InitBatchDesc, InitBatchId,
};
pub use config::{WorldConfig, DEFAULT_PHASES};
pub use error::WorldError;
pub use hierarchy::Mobility;
pub use listener::{ListenerId, WorldListener};
pub use lock::{SharedWorld, WorldReadGuard, WorldWriteGuard};
pub use message::{Message, MessageTarget};
pub use module::WorldModule;
pub use object::{GameObject, ObjectDesc, ObjectId};
pub use schedule::{UpdateContext, UpdateDesc};
pub use serialize::SceneVisitor;
pub use spatial::SpatialIndex;
pub use transform::Transform;
pub use world::{World, WorldClock};
