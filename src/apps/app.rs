//! # Unit state cells and registered applications.
//!
//! [`UnitCell`] holds everything the transitions mutate for one application or parcel:
//! its status, the lifecycles attached between load and unload, the time of the last load
//! failure and the in-flight load (so concurrent loads join instead of starting twice).
//!
//! ## Rules
//! - The lock is held only for short, synchronous critical sections; no user code and no
//!   `.await` ever runs under it.
//! - Status guards are compare-and-set ([`UnitCell::transition`]): two concurrent triggers
//!   can never both start the same transition.
//! - Every effective status change publishes `StatusChanged` after the lock is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;

use crate::core::Runtime;
use crate::error::{AppError, LifecycleError};
use crate::events::{Bus, Event, EventKind};
use crate::host::Location;
use crate::lifecycles::{AppSource, LoadedLifecycles};
use crate::parcels::ParcelSet;
use crate::sync::lock;

use super::active_when::Activity;
use super::props::{CustomProps, Props};
use super::registration::ValidRegistration;
use super::status::{AppStatus, UnitKind};

/// Outcome of an in-flight load, shared by every caller that joins it.
pub(crate) type LoadJoin = Shared<BoxFuture<'static, Result<(), AppError>>>;

/// What [`UnitCell::begin_load`] decided.
pub(crate) enum LoadStart {
    /// A load is already running; await it.
    Join(LoadJoin),
    /// This caller started the load; await it.
    Run(LoadJoin),
    /// The unit is not in a loadable status.
    Skip,
}

#[derive(Default)]
struct UnitState {
    status: AppStatus,
    lifecycles: Option<Arc<LoadedLifecycles>>,
    load_error_at: Option<Instant>,
    loading: Option<LoadJoin>,
}

/// Mutable state of one application or parcel.
pub(crate) struct UnitCell {
    kind: UnitKind,
    name: Arc<str>,
    bus: Bus,
    state: Mutex<UnitState>,
    children: Arc<ParcelSet>,
}

impl UnitCell {
    pub fn new(kind: UnitKind, name: Arc<str>, bus: Bus) -> Self {
        Self {
            kind,
            name,
            bus,
            state: Mutex::new(UnitState::default()),
            children: Arc::new(ParcelSet::default()),
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Parcels mounted by this unit.
    pub fn children(&self) -> &Arc<ParcelSet> {
        &self.children
    }

    pub fn status(&self) -> AppStatus {
        lock(&self.state).status
    }

    /// Moves `from → to` only if the unit is currently in `from`.
    pub fn transition(&self, from: AppStatus, to: AppStatus) -> bool {
        {
            let mut st = lock(&self.state);
            if st.status != from {
                return false;
            }
            st.status = to;
        }
        self.publish(from, to);
        true
    }

    /// Unconditionally sets the status; returns the previous one.
    pub fn set_status(&self, to: AppStatus) -> AppStatus {
        let from = std::mem::replace(&mut lock(&self.state).status, to);
        self.publish(from, to);
        from
    }

    pub fn lifecycles(&self) -> Option<Arc<LoadedLifecycles>> {
        lock(&self.state).lifecycles.clone()
    }

    pub fn load_error_at(&self) -> Option<Instant> {
        lock(&self.state).load_error_at
    }

    /// Joins the running load, or starts one built by `make` when the unit is
    /// `NOT_LOADED`/`LOAD_ERROR` (moving it to `LOADING_SOURCE_CODE`).
    ///
    /// `make` must only build the future; it runs under the lock.
    pub fn begin_load(&self, make: impl FnOnce() -> LoadJoin) -> LoadStart {
        let (start, from) = {
            let mut st = lock(&self.state);
            if let Some(join) = &st.loading {
                return LoadStart::Join(join.clone());
            }
            if !matches!(st.status, AppStatus::NotLoaded | AppStatus::LoadError) {
                return LoadStart::Skip;
            }
            let join = make();
            st.loading = Some(join.clone());
            let from = std::mem::replace(&mut st.status, AppStatus::LoadingSourceCode);
            (LoadStart::Run(join), from)
        };
        self.publish(from, AppStatus::LoadingSourceCode);
        start
    }

    /// Attaches freshly loaded lifecycles and moves to `NOT_BOOTSTRAPPED`.
    pub fn attach(&self, lifecycles: LoadedLifecycles) {
        let from = {
            let mut st = lock(&self.state);
            st.lifecycles = Some(Arc::new(lifecycles));
            st.load_error_at = None;
            st.loading = None;
            std::mem::replace(&mut st.status, AppStatus::NotBootstrapped)
        };
        self.publish(from, AppStatus::NotBootstrapped);
    }

    /// Ends a failed load in `to`, remembering `failed_at` for the retry back-off.
    pub fn fail_load(&self, to: AppStatus, failed_at: Option<Instant>) -> AppStatus {
        let from = {
            let mut st = lock(&self.state);
            st.load_error_at = failed_at;
            st.loading = None;
            std::mem::replace(&mut st.status, to)
        };
        self.publish(from, to);
        from
    }

    /// Drops the attached lifecycles and load bookkeeping, moving to `to`.
    pub fn detach(&self, to: AppStatus) -> AppStatus {
        let from = {
            let mut st = lock(&self.state);
            st.lifecycles = None;
            st.load_error_at = None;
            std::mem::replace(&mut st.status, to)
        };
        self.publish(from, to);
        from
    }

    /// Builds the error handed to observers and returned to hard-failing callers.
    pub fn error(&self, status: AppStatus, new_status: AppStatus, source: LifecycleError) -> AppError {
        AppError {
            kind: self.kind,
            name: Arc::clone(&self.name),
            status,
            new_status,
            source,
        }
    }

    fn publish(&self, from: AppStatus, to: AppStatus) {
        if from != to {
            self.bus.publish(
                Event::new(EventKind::StatusChanged)
                    .with_unit(self.kind, Arc::clone(&self.name))
                    .with_transition(from, to),
            );
        }
    }
}

/// Anything the lifecycle transitions can drive: applications and parcels.
pub(crate) trait Unit: Send + Sync + 'static {
    fn cell(&self) -> &UnitCell;

    fn source(&self) -> &AppSource;

    /// Props for the next lifecycle call.
    fn props(self: &Arc<Self>, rt: &Arc<Runtime>) -> Props;
}

/// A registered application.
pub(crate) struct Application {
    cell: UnitCell,
    source: AppSource,
    activity: Activity,
    custom_props: CustomProps,
    retiring: AtomicBool,
}

impl Application {
    pub fn new(reg: ValidRegistration, bus: Bus) -> Self {
        Self {
            cell: UnitCell::new(UnitKind::Application, reg.name, bus),
            source: reg.source,
            activity: reg.activity,
            custom_props: reg.custom_props,
            retiring: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &Arc<str> {
        self.cell.name()
    }

    pub fn status(&self) -> AppStatus {
        self.cell.status()
    }

    pub fn load_error_at(&self) -> Option<Instant> {
        self.cell.load_error_at()
    }

    /// Marks the application as being unregistered: it is never active again.
    pub fn retire(&self) {
        self.retiring.store(true, Ordering::Release);
    }

    pub fn is_active(&self, location: &Location) -> Result<bool, LifecycleError> {
        if self.retiring.load(Ordering::Acquire) {
            return Ok(false);
        }
        self.activity.is_active(location)
    }
}

impl Unit for Application {
    fn cell(&self) -> &UnitCell {
        &self.cell
    }

    fn source(&self) -> &AppSource {
        &self.source
    }

    fn props(self: &Arc<Self>, rt: &Arc<Runtime>) -> Props {
        let location = rt.host.location();
        let custom = self.custom_props.resolve(self.name(), &location);
        Props::new(
            rt,
            Arc::clone(self.name()),
            custom,
            Arc::clone(self.cell.children()),
            None,
        )
    }
}
