//! # Update Scheduler
//!
//! Registered updates run once per tick, grouped by named phase, ordered
//! by priority within a phase, and by registration order within a
//! priority. Phases themselves come from
//! [`WorldConfig`](crate::config::WorldConfig) and are fixed for the
//! world's lifetime.
//!
//! Registration is allowed mid-tick: an update registered from inside an
//! update handler is deferred and first runs on the next tick, so one
//! tick always executes a stable snapshot of the schedule.

mod workers;

use std::any::TypeId;

use crate::error::WorldError;
use crate::world::World;

pub use workers::{Task, WorkerPool};

/// Per-dispatch context handed to every update callback and kernel.
#[derive(Clone, Copy, Debug)]
pub struct UpdateContext {
    /// Duration of the current tick in seconds.
    pub delta: f32,
    /// Accumulated simulation time in seconds.
    pub now: f64,
    /// Current tick number.
    pub tick: u64,
    /// Index of this task within the dispatch, `0..task_count`.
    pub task_index: u32,
    /// Number of tasks the dispatch was carved into.
    pub task_count: u32,
}

/// Registration parameters for one update.
#[derive(Clone, Debug)]
pub struct UpdateDesc {
    /// Diagnostic name.
    pub name: String,
    /// Phase the update runs in; must match a configured phase.
    pub phase: String,
    /// Lower priorities run earlier within a phase.
    pub priority: i32,
    /// Entries per parallel task for batch updates. Zero keeps the whole
    /// dispatch in one task.
    pub granularity: u32,
    /// Skips the update until the world starts simulating.
    pub only_while_simulating: bool,
}

impl UpdateDesc {
    /// Creates a registration with default priority and no splitting.
    #[must_use]
    pub fn new(name: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: phase.into(),
            priority: 0,
            granularity: 0,
            only_while_simulating: false,
        }
    }

    /// Sets the priority. Lower runs earlier.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the parallel split granularity.
    #[must_use]
    pub fn with_granularity(mut self, granularity: u32) -> Self {
        self.granularity = granularity;
        self
    }

    /// Gates the update on the world simulating.
    #[must_use]
    pub fn only_while_simulating(mut self) -> Self {
        self.only_while_simulating = true;
        self
    }
}

/// What a scheduled entry runs.
pub(crate) enum UpdateKind {
    /// Callback with exclusive world access; always a single task.
    Exclusive(Box<dyn FnMut(&mut World, &UpdateContext) + Send + Sync>),
    /// Kernel over one component type's dense entries, split by
    /// granularity.
    Batch { type_id: TypeId, kernel: usize },
}

pub(crate) struct UpdateEntry {
    pub(crate) name: String,
    pub(crate) phase: u16,
    pub(crate) priority: i32,
    pub(crate) granularity: u32,
    pub(crate) only_while_simulating: bool,
    order: u64,
    pub(crate) kind: UpdateKind,
}

/// Phase-ordered update registry for one world.
pub(crate) struct Scheduler {
    phases: Vec<String>,
    entries: Vec<UpdateEntry>,
    pending: Vec<UpdateEntry>,
    next_order: u64,
    in_tick: bool,
}

impl Scheduler {
    pub(crate) fn new(phases: Vec<String>) -> Self {
        Self {
            phases,
            entries: Vec::new(),
            pending: Vec::new(),
            next_order: 0,
            in_tick: false,
        }
    }

    pub(crate) fn phases(&self) -> &[String] {
        &self.phases
    }

    pub(crate) fn resolve_phase(&self, name: &str) -> Result<u16, WorldError> {
        self.phases
            .iter()
            .position(|p| p == name)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| WorldError::UnknownPhase(name.to_owned()))
    }

    pub(crate) fn submit(&mut self, desc: UpdateDesc, kind: UpdateKind) -> Result<(), WorldError> {
        let phase = self.resolve_phase(&desc.phase)?;
        let order = self.next_order;
        self.next_order += 1;
        tracing::debug!(update = %desc.name, phase = %desc.phase, priority = desc.priority, "update registered");
        let entry = UpdateEntry {
            name: desc.name,
            phase,
            priority: desc.priority,
            granularity: desc.granularity,
            only_while_simulating: desc.only_while_simulating,
            order,
            kind,
        };
        if self.in_tick {
            self.pending.push(entry);
        } else {
            self.entries.push(entry);
            self.sort();
        }
        Ok(())
    }

    fn sort(&mut self) {
        self.entries
            .sort_by_key(|e| (e.phase, e.priority, e.order));
    }

    /// Takes the entry list for one tick's execution and freezes further
    /// registrations into the pending list.
    pub(crate) fn begin_tick(&mut self) -> Vec<UpdateEntry> {
        self.in_tick = true;
        std::mem::take(&mut self.entries)
    }

    /// Returns the entry list and merges registrations made mid-tick.
    pub(crate) fn end_tick(&mut self, entries: Vec<UpdateEntry>) {
        self.entries = entries;
        self.in_tick = false;
        if !self.pending.is_empty() {
            self.entries.append(&mut self.pending);
            self.sort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases() -> Vec<String> {
        vec!["early".to_owned(), "late".to_owned()]
    }

    fn noop() -> UpdateKind {
        UpdateKind::Exclusive(Box::new(|_, _| {}))
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        let mut scheduler = Scheduler::new(phases());
        let result = scheduler.submit(UpdateDesc::new("u", "render"), noop());
        assert!(matches!(result, Err(WorldError::UnknownPhase(_))));
    }

    #[test]
    fn test_order_is_phase_then_priority_then_registration() {
        let mut scheduler = Scheduler::new(phases());
        scheduler
            .submit(UpdateDesc::new("b", "late"), noop())
            .unwrap();
        scheduler
            .submit(UpdateDesc::new("c", "early").with_priority(5), noop())
            .unwrap();
        scheduler
            .submit(UpdateDesc::new("a", "early").with_priority(-1), noop())
            .unwrap();
        scheduler
            .submit(UpdateDesc::new("d", "early").with_priority(5), noop())
            .unwrap();

        let names: Vec<&str> = scheduler.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn test_mid_tick_registration_is_deferred() {
        let mut scheduler = Scheduler::new(phases());
        let entries = scheduler.begin_tick();
        scheduler
            .submit(UpdateDesc::new("late_arrival", "early"), noop())
            .unwrap();
        assert!(scheduler.entries.is_empty());

        scheduler.end_tick(entries);
        assert_eq!(scheduler.entries.len(), 1);
    }
}
