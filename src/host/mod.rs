//! # Host navigation layer.
//!
//! The orchestrator does not own navigation. It asks a [`NavigationHost`] for the current
//! [`Location`], tells it when the location changes through
//! [`Orchestrator::navigate_to_url`](crate::Orchestrator::navigate_to_url), and asks it to
//! replay the navigation listeners it captured once a routing pass has finished
//! deactivating applications.
//!
//! [`MemoryHistory`] is an in-memory host for tests, demos and non-browser embeddings.

mod location;
mod memory;

pub use location::{Location, NavigationEvent, NavigationKind};
pub use memory::{ListenerId, MemoryHistory};

use crate::error::AppError;

/// Collaborator supplying the current location and replaying captured listeners.
pub trait NavigationHost: Send + Sync + 'static {
    /// Current location; activity predicates are evaluated against it.
    fn location(&self) -> Location;

    /// Records a navigation. Called before the routing pass it triggers.
    fn navigate(&self, event: &NavigationEvent);

    /// Invokes the navigation listeners captured for `event`.
    ///
    /// Called once every unmount/unload of a routing pass has settled, for the queued
    /// triggers first and the pass's own trigger last.
    fn replay_captured(&self, event: &NavigationEvent);

    /// Last-resort surface for application errors nobody observes.
    fn report_unhandled(&self, err: AppError) {
        tracing::error!(
            unit = %err.kind,
            name = %err.name,
            status = %err.new_status,
            error = %err,
            "uncaught application error"
        );
    }
}
