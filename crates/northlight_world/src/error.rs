//! # World Error Types
//!
//! All recoverable errors that can occur in the world runtime.
//!
//! Capacity exhaustion (generation counter wrap, block allocation failure)
//! is deliberately *not* represented here: it indicates a design-time
//! capacity misconfiguration and aborts the process with context instead
//! of bubbling up a `Result` nobody can meaningfully handle.

use thiserror::Error;

/// Errors that can occur in the world runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// A handle was stale (generation mismatch) or out of range.
    #[error("invalid {kind} handle: index {index}, generation {generation}")]
    InvalidHandle {
        /// What the handle referred to ("object", "component", "batch").
        kind: &'static str,
        /// The index portion of the handle.
        index: u32,
        /// The generation portion of the handle.
        generation: u32,
    },

    /// An update function referenced a phase name that is not configured.
    #[error("unknown update phase: {0}")]
    UnknownPhase(String),

    /// A lifecycle transition was requested from a state that does not
    /// permit it (e.g. destroying a component mid-initialization).
    #[error("lifecycle violation on {type_name}: {detail}")]
    LifecycleViolation {
        /// Component type involved.
        type_name: &'static str,
        /// Human-readable description of the violation.
        detail: &'static str,
    },

    /// A component failed its `initialize` hook.
    #[error("component {type_name} failed to initialize: {reason}")]
    ComponentInitFailed {
        /// Component type that failed.
        type_name: &'static str,
        /// Failure reason reported by the component.
        reason: String,
    },

    /// A world module of the same type is already registered.
    #[error("world module already registered: {0}")]
    DuplicateModule(&'static str),

    /// Invalid world configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
