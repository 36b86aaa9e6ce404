//! # Event subscribers.
//!
//! Subscribers observe the [`Event`](crate::Event)s published on the orchestrator's
//! [`Bus`](crate::events::Bus). Each one runs on its own worker behind a bounded queue, so
//! a slow or panicking subscriber never delays a routing pass.
//!
//! ```text
//! Bus ──► subscriber listener ──► SubscriberSet::emit_arc
//!                                    ├──► LogWriter
//!                                    └──► custom Subscribe impls
//! ```

mod embedded;
mod set;
mod subscribe;

pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
