//! # appvisor
//!
//! **Appvisor** coordinates the lifecycle of independently loaded micro-applications that
//! share one host, switching which of them are active as the host's location changes.
//!
//! Each application declares *when* it is active (path patterns or predicates over the
//! current [`Location`]) and *how* it is brought up and torn down (async lifecycle
//! functions: bootstrap, mount, unmount, optionally unload and update). The orchestrator
//! computes what has to change on every navigation and drives every application through
//! its state machine, one routing pass at a time.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Registration │   │ Registration │   │   manifest   │
//!     │   (navbar)   │   │   (store)    │   │    (JSON)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - Registry (applications in registration order, diff per pass)   │
//! │  - Scheduler (single-flight routing passes + queued callers)      │
//! │  - UnloadTracker (one shared unload request per application)      │
//! │  - ErrorChannel (error observers, host fallback)                  │
//! │  - NavigationHost (current location, captured listener replay)    │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ Application  │   │ Application  │   │    Parcel    │   │
//!     │ (UnitCell)   │   │ (UnitCell)   │   │ (UnitCell)   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Publishes:       │                  │                 │
//!      │ - StatusChanged  │ - AppFailed      │ - TimeoutHit    │ routing notifications
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          (per-sub queues)
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                     worker1   worker2   workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! NOT_LOADED ──► LOADING_SOURCE_CODE ──► NOT_BOOTSTRAPPED ──► BOOTSTRAPPING ──► NOT_MOUNTED
//!                      │                                                          │  ▲
//!                      └─► LOAD_ERROR (retried after Config::load_error_retry)     ▼  │
//!                                                                 MOUNTING ──► MOUNTED ──► UNMOUNTING
//!                                                                                 │ ▲
//! NOT_MOUNTED ──► UNLOADING ──► NOT_LOADED                              UPDATING ◄┘ └ (parcels)
//!
//! any failure after loading ──► SKIP_BECAUSE_BROKEN (never routed again)
//! ```
//!
//! ### Routing pass
//! ```text
//! diff = (to_load, to_mount, to_unmount, to_unload) for host.location()
//!   ├─ unmount + unload everything inactive ─────────────┐ (concurrently)
//!   ├─ load everything newly active ──────────────────┐  │
//!   │                                                 ▼  ▼
//!   │                                  every deactivation settled
//!   │                                          ├─► replay captured navigation listeners
//!   └──────────────────────────────────────────┴─► bootstrap + mount (if still active)
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                          |
//! |-------------------|-------------------------------------------------------------------|---------------------------------------------|
//! | **Orchestration** | Register applications, start routing, navigate, query statuses.   | [`Orchestrator`], [`Registration`]          |
//! | **Lifecycles**    | Async lifecycle functions, sequential composition, time budgets.  | [`LifecycleFn`], [`AppLifecycles`]          |
//! | **Parcels**       | Manually mounted child units owned by an application.             | [`Parcel`], [`Props::mount_parcel`]         |
//! | **Host**          | Current location and replay of captured navigation listeners.     | [`NavigationHost`], [`MemoryHistory`]       |
//! | **Subscriber API**| Hook into routing and lifecycle events.                           | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors for registration, lifecycles and routing passes.     | [`RegistrationError`], [`AppError`]         |
//! | **Configuration** | Bus capacity, load retry back-off, timeout policies.              | [`Config`], [`TimeoutPolicy`]               |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use appvisor::{AppLifecycles, Config, LifecycleFn, MemoryHistory, Orchestrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let history = Arc::new(MemoryHistory::at("/a")?);
//!     let orch = Orchestrator::builder(Config::default(), history).build();
//!
//!     let app = || {
//!         AppLifecycles::new(
//!             LifecycleFn::new(|_props| async { Ok(()) }),
//!             LifecycleFn::new(|props| async move {
//!                 println!("mounting {}", props.name());
//!                 Ok(())
//!             }),
//!             LifecycleFn::new(|_props| async { Ok(()) }),
//!         )
//!     };
//!     orch.register("a", app(), "/a")?;
//!     orch.register("b", app(), "/b")?;
//!
//!     assert_eq!(orch.start().await?, ["a"]);
//!     assert_eq!(orch.navigate_to_url("/b")?.await?, ["b"]);
//!     Ok(())
//! }
//! ```

mod apps;
mod config;
mod core;
mod error;
mod events;
mod host;
mod lifecycles;
mod parcels;
mod policies;
mod subscribers;
mod sync;

// ---- Public re-exports ----

pub use apps::{
    ActiveWhen, ActivityFn, AppStatus, CustomProps, LoaderResolver, Props, PropsFn, Registration,
    UnitKind, parse_manifest,
};
pub use config::Config;
pub use core::{
    ErrorHandler, Orchestrator, OrchestratorBuilder, RerouteHandle, UnloadHandle, UnloadOptions,
};
pub use error::{AppError, BoxError, LifecycleError, ParcelError, RegistrationError, RuntimeError};
pub use events::{Bus, Event, EventKind, RoutingDetail};
pub use host::{Location, ListenerId, MemoryHistory, NavigationEvent, NavigationHost, NavigationKind};
pub use lifecycles::{
    AppLifecycles, AppSource, Lifecycle, LifecycleFn, LifecycleName, LoadFuture, StepFuture,
    StepReturn,
};
pub use parcels::Parcel;
pub use policies::{TimeoutConfig, TimeoutOverrides, TimeoutPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
