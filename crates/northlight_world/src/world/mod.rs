//! # World
//!
//! The world owns every runtime structure - object table, transform
//! hierarchy, component managers, scheduler, message queues, modules -
//! and is the single mutation surface. All mutators assume exclusive
//! access; [`SharedWorld`](crate::lock::SharedWorld) provides the
//! reader/writer discipline for multi-threaded hosts.
//!
//! ## Tick structure
//!
//! 1. advance the clock
//! 2. reclaim the dead set (deferred component teardown, slot recycling)
//! 3. process initialization batches under their time budget
//! 4. run scheduled updates phase by phase; the queued-message drain runs
//!    after the `simulation` phase (or the first phase if no phase has
//!    that name)
//! 5. propagate transforms breadth-first and notify the spatial index of
//!    dynamic objects that actually moved

mod clock;

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::ThreadId;

use crate::component::{
    new_store, Component, ComponentEntry, ComponentHandle, ComponentKey, ComponentManager,
    ComponentState, ComponentStore, HookEnv, InitBatchDesc, InitBatchId, InitBatches,
};
use crate::config::WorldConfig;
use crate::error::WorldError;
use crate::hierarchy::{Hierarchy, Mobility};
use crate::listener::{ListenerId, ListenerSet, WorldListener};
use crate::message::{Message, MessageQueue, MessageTarget};
use crate::module::WorldModule;
use crate::object::{GameObject, ObjectDesc, ObjectId, ObjectTable};
use crate::schedule::{Scheduler, UpdateContext, UpdateDesc, UpdateKind, WorkerPool};
use crate::serialize::SceneVisitor;
use crate::spatial::SpatialIndex;
use crate::transform::Transform;

pub use clock::WorldClock;

/// A complete scene runtime.
pub struct World {
    config: WorldConfig,
    clock: WorldClock,
    objects: ObjectTable,
    hierarchy: Hierarchy,
    roots: Vec<ObjectId>,
    managers: HashMap<TypeId, Box<dyn ComponentStore>>,
    batches: InitBatches,
    scheduler: Scheduler,
    messages: MessageQueue,
    modules: HashMap<TypeId, Box<dyn WorldModule>>,
    module_order: Vec<TypeId>,
    listeners: ListenerSet,
    spatial: Option<Box<dyn SpatialIndex>>,
    pool: WorkerPool,
    pending_detach: Vec<ComponentKey>,
    message_phase: u16,
    simulating: bool,
    #[cfg(debug_assertions)]
    writer: Option<ThreadId>,
}

impl World {
    /// Creates a world from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let message_phase = config
            .phases
            .iter()
            .position(|p| p == "simulation")
            .and_then(|i| u16::try_from(i).ok())
            .unwrap_or(0);
        tracing::info!(world = %config.name, phases = ?config.phases, "world created");
        Ok(Self {
            clock: WorldClock::new(),
            objects: ObjectTable::new(),
            hierarchy: Hierarchy::new(),
            roots: Vec::new(),
            managers: HashMap::new(),
            batches: InitBatches::new(config.init_slice_micros),
            scheduler: Scheduler::new(config.phases.clone()),
            messages: MessageQueue::new(),
            modules: HashMap::new(),
            module_order: Vec::new(),
            listeners: ListenerSet::default(),
            spatial: None,
            pool: WorkerPool::new(config.worker_threads),
            pending_detach: Vec::new(),
            message_phase,
            simulating: false,
            #[cfg(debug_assertions)]
            writer: None,
            config,
        })
    }

    /// The configuration this world was created with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The simulation clock.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &WorldClock {
        &self.clock
    }

    /// Whether [`World::start_simulation`] has been called.
    #[inline]
    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Begins simulating. Gated updates start running and queued
    /// `start_simulation` component stages begin draining on the next
    /// tick. Idempotent.
    pub fn start_simulation(&mut self) {
        self.check_write_access();
        if self.simulating {
            return;
        }
        self.simulating = true;
        tracing::info!(world = %self.config.name, "simulation started");
    }

    // ---- write discipline ----------------------------------------------

    #[cfg(debug_assertions)]
    pub(crate) fn begin_write(&mut self, thread: ThreadId) {
        self.writer = Some(thread);
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn begin_write(&mut self, _thread: ThreadId) {}

    #[cfg(debug_assertions)]
    pub(crate) fn end_write(&mut self) {
        self.writer = None;
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn end_write(&mut self) {}

    /// Mutation guard, debug builds only: while a write lock is held,
    /// only the thread that acquired it may mutate. Standalone worlds
    /// (no lock involved) have no recorded writer and pass
    /// unconditionally. Release builds compile the check out entirely.
    #[cfg(debug_assertions)]
    fn check_write_access(&self) {
        if let Some(owner) = self.writer {
            assert!(
                owner == std::thread::current().id(),
                "world mutated from a thread that does not hold the write lock"
            );
        }
    }

    #[cfg(not(debug_assertions))]
    fn check_write_access(&self) {}

    // ---- objects -------------------------------------------------------

    /// Creates a game object and places it in the hierarchy.
    ///
    /// A stale parent id demotes the object to a root. A static object
    /// under a dynamic parent is stored dynamic: its parent chain moves,
    /// so skipping propagation would leave its global stale.
    pub fn create_object(&mut self, desc: &ObjectDesc) -> ObjectId {
        self.check_write_access();
        let parent_info = desc
            .parent
            .and_then(|pid| self.objects.try_get(pid).map(|p| (pid, p.placement)));
        if desc.parent.is_some() && parent_info.is_none() {
            tracing::warn!(object = %desc.name, "parent id is stale; creating as root");
        }

        let mut mobility = desc.mobility;
        let (parent_id, level, parent_global) = match parent_info {
            Some((pid, placement)) => {
                if placement.mobility == Mobility::Dynamic && mobility == Mobility::Static {
                    mobility = Mobility::Dynamic;
                }
                let parent_global = self.hierarchy.record(placement).map(|r| r.global);
                (pid, placement.level + 1, parent_global)
            }
            None => (ObjectId::NULL, 0, None),
        };

        let mut object = GameObject::new(desc);
        object.parent = parent_id;
        let id = self.objects.create(object);
        let placement =
            self.hierarchy
                .insert(id, parent_id, parent_global, level, mobility, desc.local);
        if let Some(object) = self.objects.try_get_mut(id) {
            object.placement = placement;
        }
        if parent_id.is_null() {
            self.roots.push(id);
        } else if let Some(parent) = self.objects.try_get_mut(parent_id) {
            parent.children.push(id);
        }

        self.listeners.notify_created(id);
        id
    }

    /// Destroys an object and its whole subtree.
    ///
    /// Destruction is deferred: the objects are marked dead and hidden
    /// from lookups immediately, but teardown hooks and slot reclamation
    /// run at the start of the next tick. Returns false for stale ids.
    pub fn destroy_object(&mut self, id: ObjectId) -> bool {
        self.check_write_access();
        let subtree = self.collect_subtree(id);
        if subtree.is_empty() {
            return false;
        }
        for oid in subtree {
            if self.objects.mark_dead(oid) {
                let keys: Vec<ComponentKey> = self
                    .objects
                    .try_get_dead(oid)
                    .map(|o| o.components.clone())
                    .unwrap_or_default();
                for key in keys {
                    self.queue_detach(key);
                }
            }
        }
        true
    }

    /// Checks whether an id refers to a live object.
    #[must_use]
    pub fn is_valid(&self, id: ObjectId) -> bool {
        self.objects.is_valid(id)
    }

    /// Looks up an object.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.try_get(id)
    }

    /// Looks up an object mutably (name, tags, active flag).
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.check_write_access();
        self.objects.try_get_mut(id)
    }

    /// Sets the active flag. Inactive objects keep their transforms
    /// updated but stop receiving messages.
    pub fn set_active(&mut self, id: ObjectId, active: bool) -> bool {
        self.check_write_access();
        match self.objects.try_get_mut(id) {
            Some(object) => {
                object.active = active;
                true
            }
            None => false,
        }
    }

    /// Finds the first live object with the given name, in unspecified
    /// order. Linear scan; intended for tooling and tests.
    #[must_use]
    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name() == name)
            .map(|(id, _)| id)
    }

    /// Ids of all live objects carrying a tag. Linear scan.
    #[must_use]
    pub fn objects_with_tag(&self, tag: &str) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.has_tag(tag))
            .map(|(id, _)| id)
            .collect()
    }

    /// Live subtree of `root` in depth-first pre-order, `root` first.
    /// Empty if `root` is stale.
    fn collect_subtree(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(object) = self.objects.try_get(id) else {
                continue;
            };
            out.push(id);
            for child in object.children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    fn is_descendant_of(&self, candidate: ObjectId, ancestor: ObjectId) -> bool {
        let mut current = candidate;
        while let Some(object) = self.objects.try_get(current) {
            if object.parent == ancestor {
                return true;
            }
            current = object.parent;
        }
        false
    }

    // ---- hierarchy -----------------------------------------------------

    /// Local transform of an object.
    #[must_use]
    pub fn local_transform(&self, id: ObjectId) -> Option<Transform> {
        let placement = self.objects.try_get(id)?.placement;
        self.hierarchy.record(placement).map(|r| r.local)
    }

    /// Cached global transform of an object. Consistent immediately after
    /// creation and after every tick's propagation pass.
    #[must_use]
    pub fn global_transform(&self, id: ObjectId) -> Option<Transform> {
        let placement = self.objects.try_get(id)?.placement;
        self.hierarchy.record(placement).map(|r| r.global)
    }

    /// Replaces an object's local transform. The cached global updates on
    /// the next propagation pass. Returns false for stale ids.
    pub fn set_local_transform(&mut self, id: ObjectId, local: Transform) -> bool {
        self.check_write_access();
        let Some(object) = self.objects.try_get(id) else {
            return false;
        };
        let placement = object.placement;
        if !self.hierarchy.set_local(placement, local) {
            return false;
        }
        if placement.mobility == Mobility::Static {
            self.dirty_static_descendants(id);
        }
        true
    }

    /// Sets an object's global transform, back-computing the local from
    /// the parent's current global. The cached global updates immediately.
    pub fn set_global_transform(&mut self, id: ObjectId, global: Transform) -> bool {
        self.check_write_access();
        let Some(object) = self.objects.try_get(id) else {
            return false;
        };
        let placement = object.placement;
        let parent = object.parent;
        let local = match self.resolved_global(parent) {
            Some(parent_global) => parent_global.inverse().compose(&global),
            None => global,
        };
        if !self.hierarchy.set_local(placement, local) {
            return false;
        }
        if let Some(record) = self.hierarchy.record_mut(placement) {
            record.global = global;
        }
        if placement.mobility == Mobility::Static {
            self.dirty_static_descendants(id);
        }
        true
    }

    fn resolved_global(&self, id: ObjectId) -> Option<Transform> {
        let placement = self.objects.try_get(id)?.placement;
        self.hierarchy.record(placement).map(|r| r.global)
    }

    /// A moved static ancestor invalidates every static descendant's
    /// cached global; dynamics recompute every tick anyway.
    fn dirty_static_descendants(&mut self, root: ObjectId) {
        for id in self.collect_subtree(root) {
            if let Some(object) = self.objects.try_get(id) {
                if object.placement.mobility == Mobility::Static {
                    self.hierarchy.mark_dirty(object.placement);
                }
            }
        }
    }

    /// Moves an object (and its subtree) under a new parent, or to the
    /// root set with `None`. Global transforms are preserved: the child's
    /// local is rewritten relative to the new parent.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidHandle`] for stale ids and
    /// [`WorldError::LifecycleViolation`] if the move would create a
    /// cycle.
    pub fn set_parent(
        &mut self,
        child: ObjectId,
        new_parent: Option<ObjectId>,
    ) -> Result<(), WorldError> {
        self.check_write_access();
        let Some(child_object) = self.objects.try_get(child) else {
            return Err(WorldError::InvalidHandle {
                kind: "object",
                index: child.index(),
                generation: child.generation(),
            });
        };
        let old_parent = child_object.parent;
        let new_parent_id = new_parent.unwrap_or(ObjectId::NULL);
        if new_parent_id == old_parent {
            return Ok(());
        }
        if !new_parent_id.is_null() {
            if !self.objects.is_valid(new_parent_id) {
                return Err(WorldError::InvalidHandle {
                    kind: "object",
                    index: new_parent_id.index(),
                    generation: new_parent_id.generation(),
                });
            }
            if new_parent_id == child || self.is_descendant_of(new_parent_id, child) {
                return Err(WorldError::LifecycleViolation {
                    type_name: "GameObject",
                    detail: "re-parenting would create a hierarchy cycle",
                });
            }
        }

        // Unlink from the old parent.
        if old_parent.is_null() {
            self.roots.retain(|r| *r != child);
        } else if let Some(parent) = self.objects.try_get_mut(old_parent) {
            parent.children.retain(|c| *c != child);
        }
        if new_parent_id.is_null() {
            self.roots.push(child);
        } else if let Some(parent) = self.objects.try_get_mut(new_parent_id) {
            parent.children.push(child);
        }

        self.relocate_subtree(child, new_parent_id);
        self.listeners
            .notify_parent_changed(child, old_parent, new_parent_id);
        Ok(())
    }

    /// Re-inserts a subtree's transform records at their new levels,
    /// parents before children so each node can read its parent's already
    /// final record. Every node's global is preserved across the move.
    fn relocate_subtree(&mut self, root: ObjectId, new_parent: ObjectId) {
        for id in self.collect_subtree(root) {
            let Some(object) = self.objects.try_get(id) else {
                continue;
            };
            let old_placement = object.placement;
            let is_root = id == root;
            let node_parent = if is_root { new_parent } else { object.parent };

            let (level, parent_global, parent_mobility) = if node_parent.is_null() {
                (0, None, Mobility::Static)
            } else {
                let Some(parent) = self.objects.try_get(node_parent) else {
                    continue;
                };
                let placement = parent.placement;
                (
                    placement.level + 1,
                    self.hierarchy.record(placement).map(|r| r.global),
                    placement.mobility,
                )
            };

            let mut mobility = old_placement.mobility;
            if parent_mobility == Mobility::Dynamic && mobility == Mobility::Static {
                mobility = Mobility::Dynamic;
            }

            let Some(old_record) = self.hierarchy.record(old_placement) else {
                continue;
            };
            let old_global = old_record.global;
            // The moved node keeps its global; descendants keep their
            // locals (their parent's global did not change).
            let local = if is_root {
                match parent_global {
                    Some(pg) => pg.inverse().compose(&old_global),
                    None => old_global,
                }
            } else {
                old_record.local
            };

            if let Some((_, moved_owner)) = self.hierarchy.remove(old_placement) {
                if let Some(moved) = moved_owner {
                    if let Some(object) = self.objects.try_get_dead(moved) {
                        object.placement.slot = old_placement.slot;
                    }
                }
            }
            let placement =
                self.hierarchy
                    .insert(id, node_parent, parent_global, level, mobility, local);
            if let Some(object) = self.objects.try_get_mut(id) {
                object.placement = placement;
                if is_root {
                    object.parent = node_parent;
                }
            }
        }
    }

    // ---- components ----------------------------------------------------

    fn manager_mut<C: Component>(
        managers: &mut HashMap<TypeId, Box<dyn ComponentStore>>,
    ) -> &mut ComponentManager<C> {
        let store = managers
            .entry(TypeId::of::<C>())
            .or_insert_with(new_store::<C>);
        store
            .as_any_mut()
            .downcast_mut::<ComponentManager<C>>()
            .unwrap_or_else(|| unreachable!("store is registered under its own type id"))
    }

    /// Attaches a component through the default initialization batch.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidHandle`] if the owner id is stale.
    pub fn attach_component<C: Component>(
        &mut self,
        owner: ObjectId,
        component: C,
    ) -> Result<ComponentHandle<C>, WorldError> {
        let batch = self.batches.default_batch();
        self.attach_component_in_batch(owner, component, batch)
    }

    /// Attaches a component through a specific initialization batch.
    ///
    /// The component is only queued here; its `initialize` hook runs when
    /// the batch processes it, possibly several ticks later.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidHandle`] if the owner id is stale or
    /// the batch has already completed.
    pub fn attach_component_in_batch<C: Component>(
        &mut self,
        owner: ObjectId,
        component: C,
        batch: InitBatchId,
    ) -> Result<ComponentHandle<C>, WorldError> {
        self.check_write_access();
        if !self.objects.is_valid(owner) {
            return Err(WorldError::InvalidHandle {
                kind: "object",
                index: owner.index(),
                generation: owner.generation(),
            });
        }
        if !self.batches.contains(batch) {
            return Err(WorldError::InvalidHandle {
                kind: "batch",
                index: batch.0,
                generation: 0,
            });
        }

        let manager = Self::manager_mut::<C>(&mut self.managers);
        let handle = manager.insert(owner, component);
        manager.set_state(handle.slot, handle.generation, ComponentState::PendingInitialize);
        let key = handle.key();
        self.batches.enqueue(batch, key);
        if let Some(object) = self.objects.try_get_mut(owner) {
            object.components.push(key);
        }
        Ok(handle)
    }

    /// Detaches a component. Teardown is deferred to the next tick's
    /// reclamation point; the instance stops receiving messages and
    /// updates skip it immediately. Returns false for stale handles.
    pub fn detach_component<C: Component>(&mut self, handle: ComponentHandle<C>) -> bool {
        self.check_write_access();
        self.queue_detach(handle.key())
    }

    fn queue_detach(&mut self, key: ComponentKey) -> bool {
        let Some(store) = self.managers.get_mut(&key.type_id) else {
            return false;
        };
        if store.queue_deinit(key.slot, key.generation) {
            self.pending_detach.push(key);
            true
        } else {
            false
        }
    }

    /// Immutable component access. `None` for stale handles.
    #[must_use]
    pub fn component<C: Component>(&self, handle: ComponentHandle<C>) -> Option<&C> {
        self.component_manager::<C>()?.get(handle)
    }

    /// Mutable component access. `None` for stale handles.
    pub fn component_mut<C: Component>(&mut self, handle: ComponentHandle<C>) -> Option<&mut C> {
        self.check_write_access();
        let store = self.managers.get_mut(&TypeId::of::<C>())?;
        store
            .as_any_mut()
            .downcast_mut::<ComponentManager<C>>()?
            .get_mut(handle)
    }

    /// Lifecycle state of a component. `None` for stale handles.
    #[must_use]
    pub fn component_state<C: Component>(
        &self,
        handle: ComponentHandle<C>,
    ) -> Option<ComponentState> {
        self.component_manager::<C>()?
            .entry(handle)
            .map(ComponentEntry::state)
    }

    /// The typed manager for `C`, if any instance or kernel was ever
    /// registered.
    #[must_use]
    pub fn component_manager<C: Component>(&self) -> Option<&ComponentManager<C>> {
        self.managers.get(&TypeId::of::<C>())?.as_any().downcast_ref()
    }

    // ---- initialization batches ----------------------------------------

    /// Creates an explicit initialization batch.
    pub fn create_init_batch(&mut self, desc: InitBatchDesc) -> InitBatchId {
        self.check_write_access();
        self.batches.create(desc)
    }

    /// The default batch used by [`World::attach_component`].
    #[must_use]
    pub fn default_init_batch(&self) -> InitBatchId {
        self.batches.default_batch()
    }

    /// True once a batch has drained both stages (or was already
    /// destroyed).
    #[must_use]
    pub fn init_batch_finished(&self, id: InitBatchId) -> bool {
        self.batches.is_finished(id)
    }

    // ---- messages ------------------------------------------------------

    /// Delivers a message synchronously, right now.
    pub fn send_message(&mut self, target: MessageTarget, message: &dyn Message) {
        self.check_write_access();
        self.dispatch_message(target, message);
    }

    /// Queues a message for delivery after `delay_seconds` of simulation
    /// time. Zero targets the next drain pass.
    pub fn post_message(
        &mut self,
        target: MessageTarget,
        message: Box<dyn Message>,
        delay_seconds: f32,
    ) {
        self.check_write_access();
        self.messages
            .post(target, message, delay_seconds, self.clock.now());
    }

    fn dispatch_message(&mut self, target: MessageTarget, message: &dyn Message) {
        match target {
            MessageTarget::Object(id) => self.deliver_to_object(id, message),
            MessageTarget::Component(key) => self.deliver_to_component(key, message),
            MessageTarget::Subtree(root) => {
                for id in self.collect_subtree(root) {
                    self.deliver_to_object(id, message);
                }
            }
        }
    }

    fn deliver_to_object(&mut self, id: ObjectId, message: &dyn Message) {
        let keys: Vec<ComponentKey> = match self.objects.try_get(id) {
            Some(object) if object.active => object.components.clone(),
            _ => return,
        };
        for key in keys {
            self.deliver_to_component(key, message);
        }
    }

    fn deliver_to_component(&mut self, key: ComponentKey, message: &dyn Message) {
        let Some(store) = self.managers.get_mut(&key.type_id) else {
            return;
        };
        let mut env = HookEnv {
            clock: &self.clock,
            messages: &mut self.messages,
            simulating: self.simulating,
        };
        store.deliver_message(key.slot, key.generation, message, &mut env);
    }

    fn drain_messages(&mut self) {
        let batch = self.messages.take_due(self.clock.now());
        if batch.is_empty() {
            return;
        }
        tracing::trace!(count = batch.len(), "draining queued messages");
        for queued in batch {
            self.dispatch_message(queued.target, queued.message.as_ref());
        }
    }

    // ---- modules -------------------------------------------------------

    /// Registers a typed world module and runs its `initialize` hook.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateModule`] if a module of this type is
    /// already registered.
    pub fn register_module<M: WorldModule>(&mut self, mut module: M) -> Result<(), WorldError> {
        self.check_write_access();
        let type_id = TypeId::of::<M>();
        if self.modules.contains_key(&type_id) {
            return Err(WorldError::DuplicateModule(std::any::type_name::<M>()));
        }
        module.initialize(self);
        self.modules.insert(type_id, Box::new(module));
        self.module_order.push(type_id);
        tracing::debug!(module = std::any::type_name::<M>(), "module registered");
        Ok(())
    }

    /// Looks up a module by type.
    #[must_use]
    pub fn module<M: WorldModule>(&self) -> Option<&M> {
        self.modules.get(&TypeId::of::<M>())?.as_any().downcast_ref()
    }

    /// Looks up a module by type, mutably.
    pub fn module_mut<M: WorldModule>(&mut self) -> Option<&mut M> {
        self.check_write_access();
        self.modules
            .get_mut(&TypeId::of::<M>())?
            .as_any_mut()
            .downcast_mut()
    }

    // ---- listeners and spatial hook ------------------------------------

    /// Registers a structural listener.
    pub fn register_listener(&mut self, listener: Box<dyn WorldListener>) -> ListenerId {
        self.check_write_access();
        self.listeners.register(listener)
    }

    /// Removes a listener. Returns false if the id was already removed.
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        self.check_write_access();
        self.listeners.unregister(id)
    }

    /// Installs the spatial index notified after each propagation pass.
    /// Replaces any previous index.
    pub fn set_spatial_index(&mut self, index: Box<dyn SpatialIndex>) {
        self.check_write_access();
        self.spatial = Some(index);
    }

    // ---- updates -------------------------------------------------------

    /// Registers an update with exclusive world access.
    ///
    /// Registration from inside a running update is deferred to the next
    /// tick. Granularity is ignored for exclusive updates.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownPhase`] if the phase is not
    /// configured.
    pub fn register_update(
        &mut self,
        desc: UpdateDesc,
        update: impl FnMut(&mut World, &UpdateContext) + Send + Sync + 'static,
    ) -> Result<(), WorldError> {
        self.check_write_access();
        self.scheduler
            .submit(desc, UpdateKind::Exclusive(Box::new(update)))
    }

    /// Registers a batch update: a kernel over the dense entries of one
    /// component type, split into `ceil(instances / granularity)` parallel
    /// tasks per dispatch (granularity zero keeps one task).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownPhase`] if the phase is not
    /// configured.
    pub fn register_component_update<C: Component>(
        &mut self,
        desc: UpdateDesc,
        kernel: impl Fn(&mut [ComponentEntry<C>], &UpdateContext) + Send + Sync + 'static,
    ) -> Result<(), WorldError> {
        self.check_write_access();
        self.scheduler.resolve_phase(&desc.phase)?;
        let manager = Self::manager_mut::<C>(&mut self.managers);
        let kernel = manager.add_kernel(Arc::new(kernel));
        self.scheduler.submit(
            desc,
            UpdateKind::Batch {
                type_id: TypeId::of::<C>(),
                kernel,
            },
        )
    }

    // ---- tick ----------------------------------------------------------

    /// Advances the world by one tick of `delta` seconds.
    pub fn tick(&mut self, delta: f32) {
        self.check_write_access();
        self.clock.advance(delta);
        tracing::trace!(tick = self.clock.tick(), "tick begin");

        self.reclaim_dead();
        self.batches.process(
            &mut self.managers,
            &self.clock,
            &mut self.messages,
            self.simulating,
        );
        self.run_updates(delta);

        let changed = self.hierarchy.propagate(&self.objects, &self.pool);
        if let Some(spatial) = self.spatial.as_mut() {
            for (id, global) in &changed {
                spatial.transform_changed(*id, global);
            }
        }
    }

    /// The tick's safe point: runs deferred component teardown, then
    /// recycles dead object slots.
    fn reclaim_dead(&mut self) {
        for key in std::mem::take(&mut self.pending_detach) {
            self.finalize_detach(key);
        }

        for id in self.objects.take_dead() {
            let Some((parent, placement)) = self
                .objects
                .try_get_dead(id)
                .map(|o| (o.parent, o.placement))
            else {
                continue;
            };
            if parent.is_null() {
                self.roots.retain(|r| *r != id);
            } else if let Some(parent) = self.objects.try_get_mut(parent) {
                parent.children.retain(|c| *c != id);
            }
            if let Some((_, moved_owner)) = self.hierarchy.remove(placement) {
                if let Some(moved) = moved_owner {
                    if let Some(object) = self.objects.try_get_dead(moved) {
                        object.placement.slot = placement.slot;
                    }
                }
            }
            self.listeners.notify_destroyed(id);
            if let Some(spatial) = self.spatial.as_mut() {
                spatial.object_removed(id);
            }
            self.objects.reclaim(id);
        }
    }

    fn finalize_detach(&mut self, key: ComponentKey) {
        let Some(store) = self.managers.get_mut(&key.type_id) else {
            return;
        };
        let mut env = HookEnv {
            clock: &self.clock,
            messages: &mut self.messages,
            simulating: self.simulating,
        };
        if let Some(owner) = store.finalize_deinit(key.slot, key.generation, &mut env) {
            if let Some(object) = self.objects.try_get_mut(owner) {
                object.components.retain(|k| *k != key);
            }
        }
    }

    fn run_updates(&mut self, delta: f32) {
        let base = UpdateContext {
            delta,
            now: self.clock.now(),
            tick: self.clock.tick(),
            task_index: 0,
            task_count: 1,
        };
        let mut entries = self.scheduler.begin_tick();
        let phase_count = u16::try_from(self.scheduler.phases().len()).unwrap_or(u16::MAX);
        for phase in 0..phase_count {
            for entry in entries.iter_mut().filter(|e| e.phase == phase) {
                if entry.only_while_simulating && !self.simulating {
                    continue;
                }
                tracing::trace!(update = %entry.name, tick = base.tick, "dispatching update");
                match &mut entry.kind {
                    UpdateKind::Exclusive(update) => update(self, &base),
                    UpdateKind::Batch { type_id, kernel } => {
                        // The store leaves the map for the dispatch so
                        // kernels can run while the world is borrowed.
                        if let Some(mut store) = self.managers.remove(type_id) {
                            store.run_update(*kernel, entry.granularity, &self.pool, &base);
                            self.managers.insert(*type_id, store);
                        }
                    }
                }
            }
            if phase == self.message_phase {
                self.drain_messages();
            }
        }
        self.scheduler.end_tick(entries);
    }

    // ---- serialization walk --------------------------------------------

    /// Walks the live scene in deterministic order: roots in creation
    /// order, descendants depth-first, then component tables sorted by
    /// type name.
    pub fn walk_scene(&self, visitor: &mut dyn SceneVisitor) {
        let mut indices: HashMap<ObjectId, u32> = HashMap::new();
        let mut next: u32 = 0;
        for &root in &self.roots {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                let Some(object) = self.objects.try_get(id) else {
                    continue;
                };
                let index = next;
                next += 1;
                indices.insert(id, index);
                let parent_index = indices.get(&object.parent).copied();
                visitor.object(index, id, parent_index, object);
                for child in object.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }

        let mut stores: Vec<&dyn ComponentStore> =
            self.managers.values().map(Box::as_ref).collect();
        stores.sort_by_key(|s| s.type_name());
        for store in stores {
            visitor.begin_component_type(store.type_name());
            store.visit(visitor, &indices);
        }
    }
}

impl Drop for World {
    fn drop(&mut self) {
        // Modules tear down in reverse registration order while the rest
        // of the world is still intact.
        let order: Vec<TypeId> = self.module_order.drain(..).rev().collect();
        let mut modules = std::mem::take(&mut self.modules);
        for type_id in order {
            if let Some(mut module) = modules.remove(&type_id) {
                module.deinitialize(self);
            }
        }
    }
}
