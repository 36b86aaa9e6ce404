//! Runtime events: types, routing payload and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`RoutingDetail`] payload of the routing notifications
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the scheduler (routing and first-mount notifications), unit
//!   transitions (`StatusChanged`, `AppFailed`), the timeout guard (`TimeoutHit`),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the orchestrator's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained from `Orchestrator::events()`.

mod bus;
mod event;
mod routing;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use routing::RoutingDetail;
