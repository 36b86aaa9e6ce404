//! # Time budgets for lifecycle calls.
//!
//! [`TimeoutPolicy`] decides how long the runtime waits on one lifecycle call:
//! - a warning is logged every [`TimeoutPolicy::warning`] while the call is pending;
//! - once [`TimeoutPolicy::max`] elapses (`0s` means no budget), either the call fails with
//!   [`LifecycleError::Timeout`](crate::LifecycleError::Timeout) (`die_on_timeout`), or an
//!   error is logged and the runtime keeps waiting.
//!
//! [`TimeoutConfig`] holds one policy per lifecycle. Applications may override individual
//! entries through [`TimeoutOverrides`]; overrides are merged on top of the global config
//! when the application is loaded.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{LifecycleName, TimeoutConfig, TimeoutOverrides, TimeoutPolicy};
//!
//! let global = TimeoutConfig::default();
//! let strict = TimeoutPolicy::new(Duration::from_millis(500)).fatal();
//!
//! let merged = global.merged(&TimeoutOverrides::default().with(LifecycleName::Mount, strict));
//! assert!(merged.get(LifecycleName::Mount).die_on_timeout);
//! assert!(!merged.get(LifecycleName::Unmount).die_on_timeout);
//! ```

use std::time::Duration;

use crate::lifecycles::LifecycleName;

/// Budget for a single lifecycle call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Hard budget.
    pub max: Duration,
    /// Whether exceeding `max` fails the lifecycle (otherwise it is only logged).
    pub die_on_timeout: bool,
    /// Interval between "still waiting" warnings before `max` is reached.
    pub warning: Duration,
}

impl TimeoutPolicy {
    /// Non-fatal policy with the given budget and the default warning interval.
    pub fn new(max: Duration) -> Self {
        Self {
            max,
            ..Self::default()
        }
    }

    /// Makes exceeding the budget fatal for the unit.
    #[must_use]
    pub fn fatal(mut self) -> Self {
        self.die_on_timeout = true;
        self
    }

    #[must_use]
    pub fn with_warning(mut self, warning: Duration) -> Self {
        self.warning = warning;
        self
    }

    /// Hard budget, `None` when the call may run unbounded (`0s`).
    #[inline]
    pub fn budget(&self) -> Option<Duration> {
        if self.max == Duration::ZERO {
            None
        } else {
            Some(self.max)
        }
    }

    /// Warning interval, `None` when warnings are disabled (`0s`).
    #[inline]
    pub fn warning_interval(&self) -> Option<Duration> {
        if self.warning == Duration::ZERO {
            None
        } else {
            Some(self.warning)
        }
    }
}

impl Default for TimeoutPolicy {
    /// `max = 4s`, `warning = 1s`, not fatal.
    fn default() -> Self {
        Self {
            max: Duration::from_millis(4000),
            die_on_timeout: false,
            warning: Duration::from_millis(1000),
        }
    }
}

/// One [`TimeoutPolicy`] per timed lifecycle.
///
/// `load` is not timed: fetching code is the loader's own business.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub bootstrap: TimeoutPolicy,
    pub mount: TimeoutPolicy,
    pub unmount: TimeoutPolicy,
    pub unload: TimeoutPolicy,
    pub update: TimeoutPolicy,
}

impl TimeoutConfig {
    pub fn get(&self, lifecycle: LifecycleName) -> TimeoutPolicy {
        match lifecycle {
            LifecycleName::Bootstrap => self.bootstrap,
            LifecycleName::Mount => self.mount,
            LifecycleName::Unmount => self.unmount,
            LifecycleName::Unload => self.unload,
            LifecycleName::Update => self.update,
        }
    }

    pub fn set(&mut self, lifecycle: LifecycleName, policy: TimeoutPolicy) {
        match lifecycle {
            LifecycleName::Bootstrap => self.bootstrap = policy,
            LifecycleName::Mount => self.mount = policy,
            LifecycleName::Unmount => self.unmount = policy,
            LifecycleName::Unload => self.unload = policy,
            LifecycleName::Update => self.update = policy,
        }
    }

    /// Returns a copy with every override applied.
    #[must_use]
    pub fn merged(&self, overrides: &TimeoutOverrides) -> Self {
        let mut out = *self;
        for lifecycle in LifecycleName::ALL {
            if let Some(policy) = overrides.get(lifecycle) {
                out.set(lifecycle, policy);
            }
        }
        out
    }
}

/// Per-application replacements for individual entries of [`TimeoutConfig`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeoutOverrides {
    pub bootstrap: Option<TimeoutPolicy>,
    pub mount: Option<TimeoutPolicy>,
    pub unmount: Option<TimeoutPolicy>,
    pub unload: Option<TimeoutPolicy>,
    pub update: Option<TimeoutPolicy>,
}

impl TimeoutOverrides {
    #[must_use]
    pub fn with(mut self, lifecycle: LifecycleName, policy: TimeoutPolicy) -> Self {
        let slot = match lifecycle {
            LifecycleName::Bootstrap => &mut self.bootstrap,
            LifecycleName::Mount => &mut self.mount,
            LifecycleName::Unmount => &mut self.unmount,
            LifecycleName::Unload => &mut self.unload,
            LifecycleName::Update => &mut self.update,
        };
        *slot = Some(policy);
        self
    }

    pub fn get(&self, lifecycle: LifecycleName) -> Option<TimeoutPolicy> {
        match lifecycle {
            LifecycleName::Bootstrap => self.bootstrap,
            LifecycleName::Mount => self.mount,
            LifecycleName::Unmount => self.unmount,
            LifecycleName::Unload => self.unload,
            LifecycleName::Update => self.update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let p = TimeoutPolicy::default();
        assert_eq!(p.max, Duration::from_secs(4));
        assert_eq!(p.warning_interval(), Some(Duration::from_secs(1)));
        assert!(!p.die_on_timeout);
    }

    #[test]
    fn test_zero_values_disable_budget_and_warnings() {
        let p = TimeoutPolicy::new(Duration::ZERO).with_warning(Duration::ZERO);
        assert_eq!(p.budget(), None);
        assert_eq!(p.warning_interval(), None);
    }

    #[test]
    fn test_merge_only_touches_overridden_entries() {
        let global = TimeoutConfig::default();
        let custom = TimeoutPolicy::new(Duration::from_millis(50)).fatal();
        let overrides = TimeoutOverrides::default()
            .with(LifecycleName::Bootstrap, custom)
            .with(LifecycleName::Unload, custom);

        let merged = global.merged(&overrides);
        assert_eq!(merged.bootstrap, custom);
        assert_eq!(merged.unload, custom);
        assert_eq!(merged.mount, TimeoutPolicy::default());
        assert_eq!(merged.update, TimeoutPolicy::default());
    }

    #[test]
    fn test_set_then_get_roundtrip_per_lifecycle() {
        let mut cfg = TimeoutConfig::default();
        let p = TimeoutPolicy::new(Duration::from_millis(10));
        cfg.set(LifecycleName::Update, p);
        assert_eq!(cfg.get(LifecycleName::Update), p);
        assert_eq!(cfg.get(LifecycleName::Mount), TimeoutPolicy::default());
    }
}
