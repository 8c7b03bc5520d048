//! # Component Manager
//!
//! Per-type component storage. Instances live densely in
//! [`CompactStorage`] so batch updates stream contiguous memory; a slot
//! table with generations sits in front so handles survive the swap-holes
//! that dense removal creates. The world holds managers behind the
//! type-erased [`ComponentStore`] trait and only drops to the typed
//! surface for user-facing queries.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::component::{ComponentHandle, ComponentState, HookEnv};
use crate::message::Message;
use crate::object::ObjectId;
use crate::schedule::{Task, UpdateContext, WorkerPool};
use crate::serialize::SceneVisitor;
use crate::storage::CompactStorage;

use super::Component;

/// Batch update function over a run of entries of one component type.
pub type Kernel<C> = dyn Fn(&mut [ComponentEntry<C>], &UpdateContext) + Send + Sync;

/// One stored component with its bookkeeping.
pub struct ComponentEntry<C> {
    pub(crate) owner: ObjectId,
    pub(crate) state: ComponentState,
    pub(crate) slot: u32,
    /// The component itself, mutable from batch kernels.
    pub component: C,
}

impl<C> ComponentEntry<C> {
    /// The object this component is attached to.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// True once `start_simulation` has run. Kernels typically skip
    /// entries that are not yet live.
    #[inline]
    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.state == ComponentState::Simulating
    }
}

struct SlotRecord {
    generation: u32,
    dense: u32,
}

const VACANT: u32 = u32::MAX;

/// Dense storage and registered kernels for one component type.
pub struct ComponentManager<C: Component> {
    entries: CompactStorage<ComponentEntry<C>>,
    slots: Vec<SlotRecord>,
    free: Vec<u32>,
    kernels: Vec<Arc<Kernel<C>>>,
}

impl<C: Component> ComponentManager<C> {
    pub(crate) fn new() -> Self {
        Self {
            entries: CompactStorage::new(),
            slots: Vec::new(),
            free: Vec::new(),
            kernels: Vec::new(),
        }
    }

    /// Number of live instances (any non-destroyed state).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no instances exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, owner: ObjectId, component: C) -> ComponentHandle<C> {
        let slot = self.free.pop().unwrap_or_else(|| {
            let slot = u32::try_from(self.slots.len())
                .unwrap_or_else(|_| panic!("component slot table exhausted"));
            self.slots.push(SlotRecord {
                generation: 0,
                dense: VACANT,
            });
            slot
        });
        let dense = self.entries.push(ComponentEntry {
            owner,
            state: ComponentState::Created,
            slot,
            component,
        });
        let record = &mut self.slots[slot as usize];
        record.dense = u32::try_from(dense).unwrap_or_else(|_| panic!("component storage exhausted"));
        ComponentHandle::new(slot, record.generation)
    }

    fn resolve(&self, slot: u32, generation: u32) -> Option<usize> {
        let record = self.slots.get(slot as usize)?;
        if record.generation != generation || record.dense == VACANT {
            return None;
        }
        Some(record.dense as usize)
    }

    /// Immutable access through a handle. `None` for stale handles.
    #[must_use]
    pub fn get(&self, handle: ComponentHandle<C>) -> Option<&C> {
        let dense = self.resolve(handle.slot, handle.generation)?;
        self.entries.get(dense).map(|e| &e.component)
    }

    /// Mutable access through a handle. `None` for stale handles.
    pub fn get_mut(&mut self, handle: ComponentHandle<C>) -> Option<&mut C> {
        let dense = self.resolve(handle.slot, handle.generation)?;
        self.entries.get_mut(dense).map(|e| &mut e.component)
    }

    /// Full entry access, exposing owner and lifecycle state.
    #[must_use]
    pub fn entry(&self, handle: ComponentHandle<C>) -> Option<&ComponentEntry<C>> {
        let dense = self.resolve(handle.slot, handle.generation)?;
        self.entries.get(dense)
    }

    /// Iterates all entries in dense order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentEntry<C>> {
        self.entries.iter()
    }

    pub(crate) fn add_kernel(&mut self, kernel: Arc<Kernel<C>>) -> usize {
        self.kernels.push(kernel);
        self.kernels.len() - 1
    }

    pub(crate) fn set_state(&mut self, slot: u32, generation: u32, state: ComponentState) {
        if let Some(dense) = self.resolve(slot, generation) {
            if let Some(entry) = self.entries.get_mut(dense) {
                entry.state = state;
            }
        }
    }

    fn remove(&mut self, slot: u32, generation: u32) -> Option<ComponentEntry<C>> {
        let dense = self.resolve(slot, generation)?;
        let (entry, moved_from) = self.entries.swap_remove(dense)?;
        if moved_from.is_some() {
            if let Some(moved) = self.entries.get(dense) {
                let moved_slot = moved.slot as usize;
                self.slots[moved_slot].dense = u32::try_from(dense)
                    .unwrap_or_else(|_| panic!("component storage exhausted"));
            }
        }
        let record = &mut self.slots[slot as usize];
        record.dense = VACANT;
        // Generation wrap would resurrect stale handles; treat as fatal.
        record.generation = record.generation.checked_add(1).unwrap_or_else(|| {
            tracing::error!(
                component = std::any::type_name::<C>(),
                slot,
                "component slot generation wrapped"
            );
            panic!("component slot generation wrapped");
        });
        self.free.push(slot);
        Some(entry)
    }

    fn run_update_impl(
        &mut self,
        kernel_index: usize,
        granularity: u32,
        pool: &WorkerPool,
        ctx: &UpdateContext,
    ) {
        let Some(kernel) = self.kernels.get(kernel_index).cloned() else {
            tracing::warn!(
                component = std::any::type_name::<C>(),
                kernel_index,
                "update references unknown kernel"
            );
            return;
        };
        let total = self.entries.len();
        if total == 0 {
            return;
        }

        let g = granularity as usize;
        let task_count = if g == 0 { 1 } else { total.div_ceil(g) };

        // Carve dense entries into `task_count` runs of `granularity`
        // flat indices each. Blocks are not contiguous in memory, so one
        // run may span several slices; they share a task index.
        let mut piecework: Vec<Vec<&mut [ComponentEntry<C>]>> =
            (0..task_count).map(|_| Vec::new()).collect();
        for (start, block) in self.entries.block_slices_mut() {
            if task_count == 1 {
                piecework[0].push(block);
                continue;
            }
            let mut flat = start;
            let mut rest = block;
            while !rest.is_empty() {
                let task = flat / g;
                let take = ((task + 1) * g - flat).min(rest.len());
                let (piece, tail) = rest.split_at_mut(take);
                piecework[task].push(piece);
                flat += take;
                rest = tail;
            }
        }

        let task_total = u32::try_from(task_count).unwrap_or(u32::MAX);
        let mut tasks: Vec<Task<'_>> = Vec::with_capacity(task_count);
        for (task_index, pieces) in piecework.into_iter().enumerate() {
            let kernel = Arc::clone(&kernel);
            let task_ctx = UpdateContext {
                task_index: u32::try_from(task_index).unwrap_or(u32::MAX),
                task_count: task_total,
                ..*ctx
            };
            tasks.push(Box::new(move || {
                for piece in pieces {
                    kernel(piece, &task_ctx);
                }
            }));
        }
        pool.run(tasks);
    }
}

/// Type-erased manager surface the world dispatches through.
pub(crate) trait ComponentStore: Any + Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Runs the `initialize` hook for one pending instance. Returns true
    /// on success; a failed hook marks the instance invalid.
    fn initialize_component(&mut self, slot: u32, generation: u32, env: &mut HookEnv<'_>)
        -> bool;

    /// Moves an initialized instance into the start queue's state.
    fn mark_start_pending(&mut self, slot: u32, generation: u32) -> bool;

    /// Runs the `start_simulation` hook for one pending instance.
    fn start_component(&mut self, slot: u32, generation: u32, env: &mut HookEnv<'_>);

    /// Marks an instance for teardown. Returns false if it was already
    /// queued or destroyed.
    fn queue_deinit(&mut self, slot: u32, generation: u32) -> bool;

    /// Runs the `deinitialize` hook (where the lifecycle permits it) and
    /// reclaims the slot. Returns the owner for component-list cleanup.
    fn finalize_deinit(
        &mut self,
        slot: u32,
        generation: u32,
        env: &mut HookEnv<'_>,
    ) -> Option<ObjectId>;

    /// Delivers a message to one live instance.
    fn deliver_message(
        &mut self,
        slot: u32,
        generation: u32,
        message: &dyn Message,
        env: &mut HookEnv<'_>,
    );

    /// Runs a registered kernel over all entries, carved by granularity.
    fn run_update(
        &mut self,
        kernel_index: usize,
        granularity: u32,
        pool: &WorkerPool,
        ctx: &UpdateContext,
    );

    /// Feeds every instance whose owner is in the index map to a visitor.
    fn visit(&self, visitor: &mut dyn SceneVisitor, indices: &HashMap<ObjectId, u32>);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ComponentStore for ComponentManager<C> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn initialize_component(
        &mut self,
        slot: u32,
        generation: u32,
        env: &mut HookEnv<'_>,
    ) -> bool {
        let Some(dense) = self.resolve(slot, generation) else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(dense) else {
            return false;
        };
        if entry.state != ComponentState::PendingInitialize {
            return false;
        }
        let mut ctx = env.context(entry.owner);
        match entry.component.initialize(&mut ctx) {
            Ok(()) => {
                entry.state = ComponentState::Initialized;
                true
            }
            Err(error) => {
                tracing::warn!(
                    component = std::any::type_name::<C>(),
                    %error,
                    "component initialization failed; instance excluded"
                );
                entry.state = ComponentState::Invalid;
                false
            }
        }
    }

    fn mark_start_pending(&mut self, slot: u32, generation: u32) -> bool {
        let Some(dense) = self.resolve(slot, generation) else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(dense) else {
            return false;
        };
        if entry.state != ComponentState::Initialized {
            return false;
        }
        entry.state = ComponentState::PendingStartSimulation;
        true
    }

    fn start_component(&mut self, slot: u32, generation: u32, env: &mut HookEnv<'_>) {
        let Some(dense) = self.resolve(slot, generation) else {
            return;
        };
        let Some(entry) = self.entries.get_mut(dense) else {
            return;
        };
        if entry.state != ComponentState::PendingStartSimulation {
            return;
        }
        let mut ctx = env.context(entry.owner);
        entry.component.start_simulation(&mut ctx);
        entry.state = ComponentState::Simulating;
    }

    fn queue_deinit(&mut self, slot: u32, generation: u32) -> bool {
        let Some(dense) = self.resolve(slot, generation) else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(dense) else {
            return false;
        };
        match entry.state {
            ComponentState::PendingDeinitialize | ComponentState::Destroyed => false,
            ComponentState::Invalid => true,
            ComponentState::Created | ComponentState::PendingInitialize => {
                tracing::warn!(
                    component = std::any::type_name::<C>(),
                    "component destroyed before initialization completed"
                );
                entry.state = ComponentState::Invalid;
                true
            }
            ComponentState::Initialized
            | ComponentState::PendingStartSimulation
            | ComponentState::Simulating => {
                entry.state = ComponentState::PendingDeinitialize;
                true
            }
        }
    }

    fn finalize_deinit(
        &mut self,
        slot: u32,
        generation: u32,
        env: &mut HookEnv<'_>,
    ) -> Option<ObjectId> {
        let dense = self.resolve(slot, generation)?;
        let run_hook = self
            .entries
            .get(dense)
            .map(|e| e.state == ComponentState::PendingDeinitialize)?;
        if run_hook {
            if let Some(entry) = self.entries.get_mut(dense) {
                let mut ctx = env.context(entry.owner);
                entry.component.deinitialize(&mut ctx);
            }
        }
        self.remove(slot, generation).map(|entry| entry.owner)
    }

    fn deliver_message(
        &mut self,
        slot: u32,
        generation: u32,
        message: &dyn Message,
        env: &mut HookEnv<'_>,
    ) {
        let Some(dense) = self.resolve(slot, generation) else {
            return;
        };
        let Some(entry) = self.entries.get_mut(dense) else {
            return;
        };
        // Uninitialized, invalid, and tearing-down instances never see
        // messages.
        if !matches!(
            entry.state,
            ComponentState::Initialized
                | ComponentState::PendingStartSimulation
                | ComponentState::Simulating
        ) {
            return;
        }
        let mut ctx = env.context(entry.owner);
        entry.component.on_message(message, &mut ctx);
    }

    fn run_update(
        &mut self,
        kernel_index: usize,
        granularity: u32,
        pool: &WorkerPool,
        ctx: &UpdateContext,
    ) {
        self.run_update_impl(kernel_index, granularity, pool, ctx);
    }

    fn visit(&self, visitor: &mut dyn SceneVisitor, indices: &HashMap<ObjectId, u32>) {
        for entry in self.entries.iter() {
            if let Some(&owner_index) = indices.get(&entry.owner) {
                visitor.component(owner_index, &entry.component);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Builds an empty store for `C`, used when the first instance or kernel
/// of a type arrives.
pub(crate) fn new_store<C: Component>() -> Box<dyn ComponentStore> {
    Box::new(ComponentManager::<C>::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageQueue;
    use crate::world::WorldClock;
    use std::collections::HashSet;

    struct Counter {
        value: u32,
        fail_init: bool,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                value: 0,
                fail_init: false,
            }
        }
    }

    impl Component for Counter {
        fn initialize(
            &mut self,
            _ctx: &mut crate::component::ComponentContext<'_>,
        ) -> Result<(), crate::error::WorldError> {
            if self.fail_init {
                return Err(crate::error::WorldError::ComponentInitFailed {
                    type_name: "Counter",
                    reason: "requested".to_owned(),
                });
            }
            self.value += 100;
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn owner(index: u32) -> ObjectId {
        ObjectId::new(index, 0)
    }

    fn env_parts() -> (WorldClock, MessageQueue) {
        (WorldClock::new(), MessageQueue::new())
    }

    #[test]
    fn test_handle_survives_swap_remove() {
        let mut manager = ComponentManager::new();
        let a = manager.insert(owner(0), Counter::new());
        let b = manager.insert(owner(1), Counter::new());
        let c = manager.insert(owner(2), Counter::new());
        manager.get_mut(c).unwrap().value = 42;

        // Removing the first entry swaps the last one into its place.
        let (clock, mut messages) = env_parts();
        let mut env = HookEnv {
            clock: &clock,
            messages: &mut messages,
            simulating: false,
        };
        manager.set_state(a.slot, a.generation, ComponentState::Simulating);
        assert!(manager.queue_deinit(a.slot, a.generation));
        assert_eq!(manager.finalize_deinit(a.slot, a.generation, &mut env), Some(owner(0)));

        assert!(manager.get(a).is_none());
        assert_eq!(manager.get(c).unwrap().value, 42);
        assert_eq!(manager.entry(b).unwrap().owner(), owner(1));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_slot_reuse_invalidates_old_handle() {
        let mut manager = ComponentManager::new();
        let first = manager.insert(owner(0), Counter::new());

        let (clock, mut messages) = env_parts();
        let mut env = HookEnv {
            clock: &clock,
            messages: &mut messages,
            simulating: false,
        };
        manager.set_state(first.slot, first.generation, ComponentState::Simulating);
        manager.queue_deinit(first.slot, first.generation);
        manager.finalize_deinit(first.slot, first.generation, &mut env);

        let second = manager.insert(owner(1), Counter::new());
        assert_eq!(second.slot, first.slot);
        assert!(manager.get(first).is_none());
        assert!(manager.get(second).is_some());
    }

    #[test]
    fn test_failed_initialize_marks_invalid() {
        let mut manager = ComponentManager::new();
        let mut component = Counter::new();
        component.fail_init = true;
        let handle = manager.insert(owner(0), component);
        manager.set_state(handle.slot, handle.generation, ComponentState::PendingInitialize);

        let (clock, mut messages) = env_parts();
        let mut env = HookEnv {
            clock: &clock,
            messages: &mut messages,
            simulating: false,
        };
        assert!(!manager.initialize_component(handle.slot, handle.generation, &mut env));
        assert_eq!(
            manager.entry(handle).unwrap().state(),
            ComponentState::Invalid
        );
    }

    #[test]
    fn test_granularity_carves_ceil_tasks() {
        let mut manager = ComponentManager::new();
        for i in 0..150 {
            manager.insert(owner(i), Counter::new());
        }
        // Kernels must be 'static, so tag each entry with its task index
        // and inspect the storage afterwards.
        let kernel_index = manager.add_kernel(Arc::new(|entries, ctx| {
            for entry in entries {
                entry.component.value = ctx.task_index + 1;
            }
        }));

        let pool = WorkerPool::new(3);
        let ctx = UpdateContext {
            delta: 0.016,
            now: 0.0,
            tick: 1,
            task_index: 0,
            task_count: 1,
        };
        manager.run_update_impl(kernel_index, 40, &pool, &ctx);

        // ceil(150 / 40) = 4 tasks, every entry touched exactly once.
        let mut tasks = HashSet::new();
        let mut counts = [0usize; 8];
        for entry in manager.iter() {
            assert!(entry.component.value >= 1);
            tasks.insert(entry.component.value);
            counts[(entry.component.value - 1) as usize] += 1;
        }
        assert_eq!(tasks.len(), 4);
        assert_eq!(counts[0], 40);
        assert_eq!(counts[1], 40);
        assert_eq!(counts[2], 40);
        assert_eq!(counts[3], 30);
    }

    #[test]
    fn test_zero_granularity_runs_single_task() {
        let mut manager = ComponentManager::new();
        for i in 0..100 {
            manager.insert(owner(i), Counter::new());
        }
        let kernel_index = manager.add_kernel(Arc::new(|entries, ctx| {
            assert_eq!(ctx.task_count, 1);
            for entry in entries {
                entry.component.value += 1;
            }
        }));

        let pool = WorkerPool::new(4);
        let ctx = UpdateContext {
            delta: 0.016,
            now: 0.0,
            tick: 1,
            task_index: 0,
            task_count: 1,
        };
        manager.run_update_impl(kernel_index, 0, &pool, &ctx);
        assert!(manager.iter().all(|e| e.component.value == 1));
    }
}
