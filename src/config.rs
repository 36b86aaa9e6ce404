//! # Global runtime configuration.
//!
//! [`Config`] centralizes the orchestrator's settings:
//! - event bus capacity;
//! - the back-off before an application in `LOAD_ERROR` is loaded again;
//! - the default time budgets of every timed lifecycle.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use appvisor::{Config, TimeoutPolicy};
//!
//! let mut cfg = Config::default();
//! cfg.load_error_retry = Duration::from_millis(500);
//! cfg.timeouts.unmount = TimeoutPolicy::new(Duration::from_secs(1)).fatal();
//!
//! assert_eq!(cfg.bus_capacity_clamped(), 1024);
//! ```

use std::time::Duration;

use crate::policies::TimeoutConfig;

/// Global configuration for the orchestrator.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1, clamped)
/// - `load_error_retry`: minimum time between a load failure and the next load attempt
/// - `timeouts`: default budgets; replaceable at runtime and overridable per application
///
/// All fields are public. Prefer the accessors over re-implementing the clamping.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Back-off before an application in `LOAD_ERROR` becomes eligible for loading again.
    pub load_error_retry: Duration,

    /// Default per-lifecycle time budgets.
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `load_error_retry = 200ms`
    /// - `timeouts = TimeoutConfig::default()` (4s budget, 1s warnings, not fatal)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            load_error_retry: Duration::from_millis(200),
            timeouts: TimeoutConfig::default(),
        }
    }
}
