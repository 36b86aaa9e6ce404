//! Runtime core: registry, scheduling and orchestration.
//!
//! The only public entry point of this module is [`Orchestrator`]; the rest is shared
//! runtime state the lifecycle transitions work against.
//!
//! Internal modules:
//! - `runtime`: state shared by transitions, scheduler and parcel handles; failure reporting;
//! - `registry`: registered applications and the per-pass diff;
//! - `scheduler`: single-flight routing passes;
//! - `unload`: deduplicated unload requests;
//! - `error_channel`: error observers;
//! - `orchestrator`, `builder`: the public facade.

mod builder;
mod error_channel;
mod orchestrator;
mod registry;
mod runtime;
mod scheduler;
mod unload;

pub use builder::OrchestratorBuilder;
pub use error_channel::ErrorHandler;
pub use orchestrator::Orchestrator;
pub use scheduler::RerouteHandle;
pub use unload::{UnloadHandle, UnloadOptions};

pub(crate) use runtime::Runtime;
