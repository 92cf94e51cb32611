//! State-change notifications.
//!
//! The component state store publishes a [`StateEvent`] on a
//! [`tokio::sync::broadcast`] channel after every applied update, so a GUI
//! or a network bridge can forward changes without polling every component.

use crate::types::Scope;

/// An event emitted by the state store.
///
/// Events are best effort: slow subscribers may lag and miss events, in
/// which case they should re-read the store (or request re-synthesis).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A component's believed state changed.
    Updated {
        /// Device kind of the component.
        scope: Scope,
        /// Bound address of the component.
        address: u16,
    },

    /// A command was rejected by a state object and dropped.
    Rejected {
        /// Scope the command was routed to.
        scope: Scope,
        /// Address the command carried.
        address: u16,
        /// Human-readable reason, from the error's `Display`.
        reason: String,
    },

    /// All state was discarded, typically ahead of a resynchronization.
    Cleared,
}
