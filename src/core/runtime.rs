//! # Shared runtime state.
//!
//! [`Runtime`] is what the transitions, the scheduler and the parcel handles share: the
//! configuration, the event bus, the host, the application registry, the scheduler's
//! single-flight state, the unload tracker and the error channel.
//!
//! It also owns failure reporting: every unit failure publishes `AppFailed`, and unless the
//! caller asked for a hard failure the error goes to the observers (or the host fallback).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::apps::{AppStatus, Application, Unit, UnitCell};
use crate::config::Config;
use crate::error::{AppError, LifecycleError};
use crate::events::{Bus, Event, EventKind};
use crate::host::{Location, NavigationHost};
use crate::lifecycles::LifecycleName;
use crate::policies::{TimeoutConfig, TimeoutPolicy};
use crate::sync;

use super::error_channel::ErrorChannel;
use super::registry::Registry;
use super::scheduler::Scheduler;
use super::unload::UnloadTracker;

pub(crate) struct Runtime {
    pub cfg: Config,
    pub bus: Bus,
    pub host: Arc<dyn NavigationHost>,
    pub registry: Registry,
    pub scheduler: Scheduler,
    pub unloads: UnloadTracker,
    pub errors: ErrorChannel,
    timeouts: RwLock<TimeoutConfig>,
    started: AtomicBool,
    before_first_mount: AtomicBool,
    first_mount: AtomicBool,
    next_parcel_id: AtomicU64,
}

impl Runtime {
    pub fn new(cfg: Config, bus: Bus, host: Arc<dyn NavigationHost>) -> Self {
        Self {
            timeouts: RwLock::new(cfg.timeouts),
            cfg,
            bus,
            host,
            registry: Registry::default(),
            scheduler: Scheduler::default(),
            unloads: UnloadTracker::default(),
            errors: ErrorChannel::default(),
            started: AtomicBool::new(false),
            before_first_mount: AtomicBool::new(false),
            first_mount: AtomicBool::new(false),
            next_parcel_id: AtomicU64::new(0),
        }
    }

    /// Global budgets, merged with per-unit overrides at load time.
    pub fn timeouts(&self) -> TimeoutConfig {
        *sync::read(&self.timeouts)
    }

    pub fn set_timeout(&self, lifecycle: LifecycleName, policy: TimeoutPolicy) {
        sync::write(&self.timeouts).set(lifecycle, policy);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Returns `true` for the call that actually started the runtime.
    pub fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    pub fn claim_before_first_mount(&self) -> bool {
        !self.before_first_mount.swap(true, Ordering::AcqRel)
    }

    pub fn claim_first_mount(&self) -> bool {
        !self.first_mount.swap(true, Ordering::AcqRel)
    }

    pub fn next_parcel_id(&self) -> u64 {
        self.next_parcel_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Evaluates the application's activity against `location`.
    ///
    /// A failing predicate quarantines the application, which then counts as inactive.
    pub fn check_active(&self, app: &Application, location: &Location) -> bool {
        match app.is_active(location) {
            Ok(active) => active,
            Err(e) => {
                self.quarantine(app.cell(), e, false);
                false
            }
        }
    }

    /// Moves the unit to `SKIP_BECAUSE_BROKEN` and reports the failure.
    pub fn quarantine(&self, cell: &UnitCell, source: LifecycleError, hard_fail: bool) -> AppError {
        let from = cell.set_status(AppStatus::SkipBecauseBroken);
        let err = cell.error(from, AppStatus::SkipBecauseBroken, source);
        self.report(&err, hard_fail);
        err
    }

    /// Publishes `AppFailed` and, unless `hard_fail`, hands the error to the observers.
    ///
    /// Hard failures are returned to the caller instead.
    pub fn report(&self, err: &AppError, hard_fail: bool) {
        tracing::debug!(
            unit = %err.kind,
            name = %err.name,
            status = %err.status,
            new_status = %err.new_status,
            error = %err.source,
            "unit failed"
        );
        self.bus.publish(
            Event::new(EventKind::AppFailed)
                .with_unit(err.kind, Arc::clone(&err.name))
                .with_transition(err.status, err.new_status)
                .with_reason(err.source.to_string()),
        );
        if hard_fail || self.errors.dispatch(err) {
            return;
        }

        let host = Arc::clone(&self.host);
        let err = err.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { host.report_unhandled(err) });
            }
            Err(_) => host.report_unhandled(err),
        }
    }
}
