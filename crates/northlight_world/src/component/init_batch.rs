//! # Initialization Batches
//!
//! Component initialization is deferred and amortized: attaching a
//! component only queues it, and a batch later runs the `initialize` and
//! `start_simulation` stages across ticks under a time budget. A batch
//! flagged `must_finish_within_frame` ignores the budget and drains fully
//! on the tick it is processed.
//!
//! Every world has a default batch that is never destroyed; explicitly
//! created batches are destroyed once both stages have drained.

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::component::{ComponentKey, ComponentStore, HookEnv};
use crate::message::MessageQueue;
use crate::storage::FreeListStorage;
use crate::world::WorldClock;

/// Identifies one initialization batch within its world.
///
/// Batch ids are plain slot indices; they are only handed out while the
/// batch is pending and a finished batch's id simply resolves to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitBatchId(pub(crate) u32);

/// Parameters for an explicitly created batch.
#[derive(Clone, Debug)]
pub struct InitBatchDesc {
    /// Diagnostic name.
    pub name: String,
    /// Drains the whole batch on one tick instead of time-slicing.
    pub must_finish_within_frame: bool,
}

struct InitBatch {
    name: String,
    must_finish_within_frame: bool,
    pending_init: VecDeque<ComponentKey>,
    pending_start: VecDeque<ComponentKey>,
}

/// All initialization batches of one world.
pub struct InitBatches {
    batches: FreeListStorage<InitBatch>,
    default_batch: u32,
    slice: Duration,
}

impl InitBatches {
    pub(crate) fn new(slice_micros: u64) -> Self {
        let mut batches = FreeListStorage::new();
        let default_batch = batches.insert(InitBatch {
            name: "default".to_owned(),
            must_finish_within_frame: false,
            pending_init: VecDeque::new(),
            pending_start: VecDeque::new(),
        });
        Self {
            batches,
            default_batch,
            slice: Duration::from_micros(slice_micros),
        }
    }

    /// The always-present batch used by plain attachment.
    #[must_use]
    pub fn default_batch(&self) -> InitBatchId {
        InitBatchId(self.default_batch)
    }

    /// Whether a batch id still resolves.
    #[must_use]
    pub fn contains(&self, id: InitBatchId) -> bool {
        self.batches.get(id.0).is_some()
    }

    /// True once the batch has drained (or never existed). The default
    /// batch reports true whenever its queues are empty.
    #[must_use]
    pub fn is_finished(&self, id: InitBatchId) -> bool {
        self.batches
            .get(id.0)
            .map_or(true, |b| b.pending_init.is_empty() && b.pending_start.is_empty())
    }

    /// Number of components still awaiting either stage, over all batches.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.batches
            .iter()
            .map(|(_, b)| b.pending_init.len() + b.pending_start.len())
            .sum()
    }

    pub(crate) fn create(&mut self, desc: InitBatchDesc) -> InitBatchId {
        tracing::debug!(batch = %desc.name, "initialization batch created");
        InitBatchId(self.batches.insert(InitBatch {
            name: desc.name,
            must_finish_within_frame: desc.must_finish_within_frame,
            pending_init: VecDeque::new(),
            pending_start: VecDeque::new(),
        }))
    }

    /// Queues a freshly attached component. Returns false if the batch id
    /// no longer resolves.
    pub(crate) fn enqueue(&mut self, id: InitBatchId, key: ComponentKey) -> bool {
        match self.batches.get_mut(id.0) {
            Some(batch) => {
                batch.pending_init.push_back(key);
                true
            }
            None => false,
        }
    }

    /// Runs both stages for every batch under the per-batch time budget.
    ///
    /// At least one component per stage is processed per batch per tick,
    /// so progress is guaranteed even under a zero budget. The start
    /// stage runs only while the world simulates.
    pub(crate) fn process(
        &mut self,
        managers: &mut HashMap<TypeId, Box<dyn ComponentStore>>,
        clock: &WorldClock,
        messages: &mut MessageQueue,
        simulating: bool,
    ) {
        let indices: Vec<u32> = self.batches.iter().map(|(i, _)| i).collect();
        for index in indices {
            let deadline = Instant::now() + self.slice;

            loop {
                let Some(batch) = self.batches.get_mut(index) else {
                    break;
                };
                let exempt = batch.must_finish_within_frame;
                let Some(key) = batch.pending_init.pop_front() else {
                    break;
                };
                let started = managers.get_mut(&key.type_id).is_some_and(|store| {
                    let mut env = HookEnv {
                        clock,
                        messages,
                        simulating,
                    };
                    store.initialize_component(key.slot, key.generation, &mut env)
                        && store.mark_start_pending(key.slot, key.generation)
                });
                if started {
                    if let Some(batch) = self.batches.get_mut(index) {
                        batch.pending_start.push_back(key);
                    }
                }
                if !exempt && Instant::now() >= deadline {
                    break;
                }
            }

            if simulating {
                loop {
                    let Some(batch) = self.batches.get_mut(index) else {
                        break;
                    };
                    let exempt = batch.must_finish_within_frame;
                    let Some(key) = batch.pending_start.pop_front() else {
                        break;
                    };
                    if let Some(store) = managers.get_mut(&key.type_id) {
                        let mut env = HookEnv {
                            clock,
                            messages,
                            simulating,
                        };
                        store.start_component(key.slot, key.generation, &mut env);
                    }
                    if !exempt && Instant::now() >= deadline {
                        break;
                    }
                }
            }

            let finished = self
                .batches
                .get(index)
                .is_some_and(|b| b.pending_init.is_empty() && b.pending_start.is_empty());
            if finished && index != self.default_batch {
                if let Some(batch) = self.batches.remove(index) {
                    tracing::debug!(batch = %batch.name, "initialization batch completed");
                }
            }
        }
    }
}
