//! # Components
//!
//! A component is a unit of behavior/data attached to exactly one game
//! object. Capabilities are a closed set expressed directly on the
//! [`Component`] trait - lifecycle hooks, message handling, and a
//! serialization upcast - so no runtime type database exists; each type's
//! storage is owned exclusively by its per-world
//! [`ComponentManager`](crate::component::ComponentManager).

mod init_batch;
mod manager;

use std::any::{Any, TypeId};

use crate::error::WorldError;
use crate::message::{Message, MessageQueue, MessageTarget};
use crate::object::ObjectId;
use crate::world::WorldClock;

pub use init_batch::{InitBatchDesc, InitBatchId, InitBatches};
pub use manager::{ComponentEntry, ComponentManager};

pub(crate) use manager::{new_store, ComponentStore};

/// Lifecycle state of one component instance.
///
/// `Created → PendingInitialize → Initialized → PendingStartSimulation →
/// Simulating → PendingDeinitialize → Destroyed`; `Invalid` marks a
/// component whose `initialize` hook failed, excluded from all further
/// processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentState {
    /// Constructed, not yet queued for initialization.
    Created,
    /// Waiting in an initialization batch.
    PendingInitialize,
    /// `initialize` completed.
    Initialized,
    /// Waiting for the world to simulate.
    PendingStartSimulation,
    /// Fully live.
    Simulating,
    /// Queued for deinitialization.
    PendingDeinitialize,
    /// Removed; the handle generation has been bumped.
    Destroyed,
    /// `initialize` failed; excluded from further processing.
    Invalid,
}

/// Type-erased address of one component, usable as a message target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ComponentKey {
    /// Name of the component type this key addresses.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Typed generation-checked component handle.
pub struct ComponentHandle<C> {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
    _marker: std::marker::PhantomData<fn() -> C>,
}

impl<C> Clone for ComponentHandle<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ComponentHandle<C> {}

impl<C> std::fmt::Debug for ComponentHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<C: Component> ComponentHandle<C> {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self {
            slot,
            generation,
            _marker: std::marker::PhantomData,
        }
    }

    /// Type-erased key for this handle, usable as a message target.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            slot: self.slot,
            generation: self.generation,
        }
    }
}

/// World access handed to component hooks.
///
/// Hooks run while the world is mid-mutation, so they get a deliberately
/// narrow surface: the owner id, the clock, and message posting.
pub struct ComponentContext<'a> {
    owner: ObjectId,
    clock: &'a WorldClock,
    messages: &'a mut MessageQueue,
    simulating: bool,
}

impl ComponentContext<'_> {
    /// The object this component is attached to.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// Accumulated simulation time in seconds.
    #[inline]
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Current tick number.
    #[inline]
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Whether the world has begun simulating.
    #[inline]
    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    /// Posts a delayed message. Delivery happens on a later drain pass,
    /// never synchronously.
    pub fn post_message(
        &mut self,
        target: MessageTarget,
        message: Box<dyn Message>,
        delay_seconds: f32,
    ) {
        self.messages
            .post(target, message, delay_seconds, self.clock.now());
    }
}

/// Borrowed world state needed to build a [`ComponentContext`] inside a
/// type-erased store call.
pub(crate) struct HookEnv<'a> {
    pub(crate) clock: &'a WorldClock,
    pub(crate) messages: &'a mut MessageQueue,
    pub(crate) simulating: bool,
}

impl HookEnv<'_> {
    pub(crate) fn context(&mut self, owner: ObjectId) -> ComponentContext<'_> {
        ComponentContext {
            owner,
            clock: self.clock,
            messages: self.messages,
            simulating: self.simulating,
        }
    }
}

/// A unit of behavior attached to a game object.
///
/// All hooks have no-op defaults; a pure-data component only needs
/// [`Component::as_any`].
pub trait Component: Any + Send + Sync {
    /// First initialization stage. Runs from an initialization batch,
    /// possibly several ticks after creation.
    ///
    /// # Errors
    ///
    /// Returning an error marks the component invalid; it is excluded
    /// from further processing but does not abort the batch.
    fn initialize(&mut self, ctx: &mut ComponentContext<'_>) -> Result<(), WorldError> {
        let _ = ctx;
        Ok(())
    }

    /// Second initialization stage; runs only once the world simulates.
    /// Editor-only contexts never invoke it.
    fn start_simulation(&mut self, ctx: &mut ComponentContext<'_>) {
        let _ = ctx;
    }

    /// Teardown hook, invoked at the safe point before the slot is
    /// reclaimed.
    fn deinitialize(&mut self, ctx: &mut ComponentContext<'_>) {
        let _ = ctx;
    }

    /// Typed message handler. Downcast via [`Message::as_any`].
    fn on_message(&mut self, message: &dyn Message, ctx: &mut ComponentContext<'_>) {
        let _ = (message, ctx);
    }

    /// Upcast for serialization collaborators and typed queries.
    fn as_any(&self) -> &dyn Any;
}
