//! # Lifecycle functions and the objects loaders resolve to.
//!
//! A lifecycle is an ordered list of [`LifecycleFn`] steps. Each step receives the unit's
//! [`Props`] and must hand back a future ([`StepReturn::Pending`]); a step that returns a
//! plain value ([`StepReturn::Ready`]) breaks the contract and fails the whole lifecycle.
//!
//! [`AppLifecycles`] is what a loader resolves to. `bootstrap`, `mount` and `unmount` are
//! required; `unload` and `update` are optional.
//!
//! ## Example
//! ```rust
//! use appvisor::{AppLifecycles, Lifecycle, LifecycleFn};
//!
//! let lifecycles = AppLifecycles::new(
//!     LifecycleFn::new(|_props| async { Ok(()) }),
//!     Lifecycle::sequence([
//!         LifecycleFn::new(|_props| async { Ok(()) }),
//!         LifecycleFn::new(|props| async move {
//!             println!("mounted {}", props.name());
//!             Ok(())
//!         }),
//!     ]),
//!     LifecycleFn::new(|_props| async { Ok(()) }),
//! );
//! assert_eq!(lifecycles.mount.as_ref().map(Lifecycle::len), Some(2));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::apps::{Props, UnitKind};
use crate::error::LifecycleError;
use crate::policies::{TimeoutConfig, TimeoutOverrides};

/// Boxed future produced by one lifecycle step.
pub type StepFuture = BoxFuture<'static, Result<(), LifecycleError>>;

/// Boxed future produced by an application loader.
pub type LoadFuture = BoxFuture<'static, Result<AppLifecycles, LifecycleError>>;

/// Name of a timed lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleName {
    Bootstrap,
    Mount,
    Unmount,
    Unload,
    Update,
}

impl LifecycleName {
    pub const ALL: [LifecycleName; 5] = [
        LifecycleName::Bootstrap,
        LifecycleName::Mount,
        LifecycleName::Unmount,
        LifecycleName::Unload,
        LifecycleName::Update,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleName::Bootstrap => "bootstrap",
            LifecycleName::Mount => "mount",
            LifecycleName::Unmount => "unmount",
            LifecycleName::Unload => "unload",
            LifecycleName::Update => "update",
        }
    }
}

impl fmt::Display for LifecycleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a lifecycle step returned.
pub enum StepReturn {
    /// An asynchronous result: the contract every step must honor.
    Pending(StepFuture),
    /// A plain value. Rejected by the executor as a contract violation.
    Ready,
}

type RawStep = dyn Fn(Props) -> StepReturn + Send + Sync + 'static;

/// One step of a lifecycle.
///
/// Cheap to clone (`Arc` inside). A fresh future is produced per call.
#[derive(Clone)]
pub struct LifecycleFn(Arc<RawStep>);

impl LifecycleFn {
    /// Adapts an async closure. Such steps always honor the future contract.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Props) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), LifecycleError>> + Send + 'static,
    {
        Self(Arc::new(move |props| StepReturn::Pending(f(props).boxed())))
    }

    /// Wraps a step that decides itself whether it returns a future.
    ///
    /// Meant for dynamic adapters that cannot guarantee the contract statically.
    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(Props) -> StepReturn + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, props: Props) -> StepReturn {
        (self.0)(props)
    }
}

impl fmt::Debug for LifecycleFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LifecycleFn")
    }
}

/// Ordered steps of one lifecycle. An empty lifecycle is a no-op.
#[derive(Clone, Debug, Default)]
pub struct Lifecycle {
    steps: Vec<LifecycleFn>,
}

impl Lifecycle {
    pub fn sequence(steps: impl IntoIterator<Item = LifecycleFn>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Appends a step that runs after the existing ones.
    #[must_use]
    pub fn then(mut self, step: LifecycleFn) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn steps(&self) -> &[LifecycleFn] {
        &self.steps
    }
}

impl From<LifecycleFn> for Lifecycle {
    fn from(step: LifecycleFn) -> Self {
        Self { steps: vec![step] }
    }
}

impl From<Vec<LifecycleFn>> for Lifecycle {
    fn from(steps: Vec<LifecycleFn>) -> Self {
        Self { steps }
    }
}

/// The lifecycle object a loader resolves to.
///
/// Fields are public so that dynamic adapters can assemble partial objects; a missing
/// required lifecycle is detected when the object is loaded and quarantines the unit.
#[derive(Clone, Debug, Default)]
pub struct AppLifecycles {
    pub bootstrap: Option<Lifecycle>,
    pub mount: Option<Lifecycle>,
    pub unmount: Option<Lifecycle>,
    pub unload: Option<Lifecycle>,
    pub update: Option<Lifecycle>,
    /// Per-unit replacements for the global time budgets.
    pub timeouts: TimeoutOverrides,
}

impl AppLifecycles {
    pub fn new(
        bootstrap: impl Into<Lifecycle>,
        mount: impl Into<Lifecycle>,
        unmount: impl Into<Lifecycle>,
    ) -> Self {
        Self {
            bootstrap: Some(bootstrap.into()),
            mount: Some(mount.into()),
            unmount: Some(unmount.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_unload(mut self, unload: impl Into<Lifecycle>) -> Self {
        self.unload = Some(unload.into());
        self
    }

    #[must_use]
    pub fn with_update(mut self, update: impl Into<Lifecycle>) -> Self {
        self.update = Some(update.into());
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutOverrides) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Checks the required lifecycles and freezes the object for execution.
    pub(crate) fn validate(
        self,
        kind: UnitKind,
        name: &Arc<str>,
        global: &TimeoutConfig,
    ) -> Result<LoadedLifecycles, LifecycleError> {
        let missing = |lifecycle| LifecycleError::InvalidLifecycles {
            kind,
            name: Arc::clone(name),
            missing: lifecycle,
        };
        let bootstrap = self.bootstrap.ok_or_else(|| missing(LifecycleName::Bootstrap))?;
        let mount = self.mount.ok_or_else(|| missing(LifecycleName::Mount))?;
        let unmount = self.unmount.ok_or_else(|| missing(LifecycleName::Unmount))?;

        Ok(LoadedLifecycles {
            bootstrap,
            mount,
            unmount,
            unload: self.unload.unwrap_or_default(),
            update: self.update,
            timeouts: global.merged(&self.timeouts),
        })
    }
}

/// Lifecycles attached to a unit between load and unload.
#[derive(Debug)]
pub(crate) struct LoadedLifecycles {
    pub bootstrap: Lifecycle,
    pub mount: Lifecycle,
    pub unmount: Lifecycle,
    pub unload: Lifecycle,
    pub update: Option<Lifecycle>,
    pub timeouts: TimeoutConfig,
}

impl LoadedLifecycles {
    /// Steps of `lifecycle`; `None` only for an absent `update`.
    pub fn get(&self, lifecycle: LifecycleName) -> Option<&Lifecycle> {
        match lifecycle {
            LifecycleName::Bootstrap => Some(&self.bootstrap),
            LifecycleName::Mount => Some(&self.mount),
            LifecycleName::Unmount => Some(&self.unmount),
            LifecycleName::Unload => Some(&self.unload),
            LifecycleName::Update => self.update.as_ref(),
        }
    }
}

/// Where a unit's lifecycles come from.
#[derive(Clone)]
pub enum AppSource {
    /// Called on every load; resolves to the lifecycle object.
    Loader(Arc<dyn Fn(Props) -> LoadFuture + Send + Sync + 'static>),
    /// Lifecycle object available up front.
    Resolved(AppLifecycles),
}

impl AppSource {
    pub fn loader<F, Fut>(f: F) -> Self
    where
        F: Fn(Props) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<AppLifecycles, LifecycleError>> + Send + 'static,
    {
        AppSource::Loader(Arc::new(move |props| f(props).boxed()))
    }

    pub(crate) fn load(&self, props: Props) -> LoadFuture {
        match self {
            AppSource::Loader(f) => f(props),
            AppSource::Resolved(lifecycles) => {
                let lifecycles = lifecycles.clone();
                async move { Ok(lifecycles) }.boxed()
            }
        }
    }
}

impl From<AppLifecycles> for AppSource {
    fn from(lifecycles: AppLifecycles) -> Self {
        AppSource::Resolved(lifecycles)
    }
}

impl fmt::Debug for AppSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppSource::Loader(_) => f.write_str("AppSource::Loader"),
            AppSource::Resolved(l) => f.debug_tuple("AppSource::Resolved").field(l).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::TimeoutPolicy;
    use std::time::Duration;

    fn noop() -> LifecycleFn {
        LifecycleFn::new(|_| async { Ok(()) })
    }

    #[test]
    fn test_missing_required_lifecycle_is_reported() {
        let name: Arc<str> = "nav".into();
        let partial = AppLifecycles {
            bootstrap: Some(noop().into()),
            mount: Some(noop().into()),
            ..AppLifecycles::default()
        };
        let err = partial
            .validate(UnitKind::Application, &name, &TimeoutConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidLifecycles {
                missing: LifecycleName::Unmount,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_defaults_unload_and_merges_timeouts() {
        let name: Arc<str> = "nav".into();
        let fast = TimeoutPolicy::new(Duration::from_millis(5));
        let loaded = AppLifecycles::new(noop(), noop(), noop())
            .with_timeouts(TimeoutOverrides::default().with(LifecycleName::Mount, fast))
            .validate(UnitKind::Application, &name, &TimeoutConfig::default())
            .unwrap();

        assert!(loaded.unload.is_empty());
        assert!(loaded.get(LifecycleName::Update).is_none());
        assert_eq!(loaded.timeouts.mount, fast);
        assert_eq!(loaded.timeouts.bootstrap, TimeoutPolicy::default());
    }

    #[test]
    fn test_lifecycle_names_are_lowercase() {
        let names: Vec<_> = LifecycleName::ALL.iter().map(|l| l.to_string()).collect();
        assert_eq!(names, ["bootstrap", "mount", "unmount", "unload", "update"]);
    }
}
