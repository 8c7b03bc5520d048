//! # Messages
//!
//! Typed messages routed between objects and components.
//!
//! Two delivery classes exist:
//! - **immediate**: dispatched synchronously through a direct call on the
//!   world, never stored;
//! - **queued**: posted with a delay (possibly zero) and dispatched once
//!   the world clock reaches the due time.
//!
//! Queued messages live in two buckets: a FIFO queue for zero-delay posts
//! and a due-time-ordered heap for delayed posts. Among equal due times
//! delivery is in post order (a monotonic sequence number breaks heap
//! ties). A handler may post new messages while a batch drains; they are
//! appended to the live queues and delivered on a later pass, never
//! spliced into the draining batch.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::component::ComponentKey;
use crate::object::ObjectId;

/// A typed message payload.
///
/// Implementors are plain data types; dispatch hands them to component
/// message handlers which downcast via [`Message::as_any`].
pub trait Message: Any + Send + Sync {
    /// Message name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Upcast for handler-side downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Where a message is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageTarget {
    /// All components of one object.
    Object(ObjectId),
    /// One specific component.
    Component(ComponentKey),
    /// An object and all its descendants, depth-first.
    Subtree(ObjectId),
}

/// A queued message awaiting delivery.
pub(crate) struct QueuedMessage {
    pub(crate) target: MessageTarget,
    pub(crate) message: Box<dyn Message>,
    pub(crate) due: f64,
    pub(crate) seq: u64,
}

struct TimedEntry(QueuedMessage);

impl PartialEq for TimedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}

impl Eq for TimedEntry {}

impl PartialOrd for TimedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedEntry {
    // Min-heap on (due, seq): earliest due first, post order among equals.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .due
            .total_cmp(&self.0.due)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

/// Per-world message queues.
#[derive(Default)]
pub struct MessageQueue {
    next_tick: VecDeque<QueuedMessage>,
    timed: BinaryHeap<TimedEntry>,
    seq: u64,
}

impl MessageQueue {
    /// Creates empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting in both buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.next_tick.len() + self.timed.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next_tick.is_empty() && self.timed.is_empty()
    }

    /// Posts a message for delayed delivery.
    ///
    /// A non-positive delay targets the next drain; it still never lands
    /// in a batch that is already draining.
    pub fn post(
        &mut self,
        target: MessageTarget,
        message: Box<dyn Message>,
        delay_seconds: f32,
        now: f64,
    ) {
        let seq = self.seq;
        self.seq += 1;
        if delay_seconds <= 0.0 {
            self.next_tick.push_back(QueuedMessage {
                target,
                message,
                due: now,
                seq,
            });
        } else {
            self.timed.push(TimedEntry(QueuedMessage {
                target,
                message,
                due: now + f64::from(delay_seconds),
                seq,
            }));
        }
    }

    /// Takes every message that is due at `now`, in delivery order.
    ///
    /// The returned batch is detached: messages posted during its
    /// dispatch accumulate in the queue for the next pass.
    pub(crate) fn take_due(&mut self, now: f64) -> Vec<QueuedMessage> {
        let mut batch: Vec<QueuedMessage> = self.next_tick.drain(..).collect();
        while let Some(entry) = self.timed.peek() {
            if entry.0.due > now {
                break;
            }
            let Some(entry) = self.timed.pop() else {
                break;
            };
            batch.push(entry.0);
        }
        // Zero-delay posts and newly due timed posts interleave by the
        // order they were posted in.
        batch.sort_by(|a, b| a.due.total_cmp(&b.due).then_with(|| a.seq.cmp(&b.seq)));
        batch
    }
}
