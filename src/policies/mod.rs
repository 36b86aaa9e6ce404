//! Lifecycle timing policies.
//!
//! ## Contents
//! - [`TimeoutPolicy`] budget, warning interval and severity for one lifecycle call
//! - [`TimeoutConfig`] one policy per timed lifecycle (bootstrap, mount, unmount, unload, update)
//! - [`TimeoutOverrides`] per-application replacements merged at load time
//!
//! ## Quick wiring
//! ```text
//! Config { timeouts: TimeoutConfig }            (global, replaceable at runtime)
//!      └─► load: TimeoutConfig::merged(app overrides) stored with the loaded lifecycles
//!           └─► lifecycles::timeout::reasonable_time(policy, call)
//! ```
//!
//! ## Defaults
//! - every lifecycle: max=4s, warning=1s, die_on_timeout=false.

mod timeout;

pub use timeout::{TimeoutConfig, TimeoutOverrides, TimeoutPolicy};
