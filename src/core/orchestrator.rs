//! # Orchestrator: registry, routing passes and error observers behind one handle.
//!
//! The [`Orchestrator`] owns the shared runtime (registry, scheduler, unload tracker, error
//! channel, event bus) and the [`SubscriberSet`] fed from the bus.
//!
//! ## High-level architecture
//! ```text
//! register / register_with / register_manifest
//!   └─► Registration::validate ──► Registry::register ──► reroute()
//!
//! start()                    ──► steady-state mode ──► reroute()
//! navigate_to_url(url)       ──► host.navigate(event) ──► reroute(event)
//! trigger_app_change()       ──► reroute()
//! unload_application(name)   ──► UnloadTracker::request
//! unregister(name)           ──► unload (not waiting for unmount) ──► Registry::remove
//!
//! Event flow:
//!   transitions / scheduler ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit_arc
//!                                                  └──► events() receivers
//! ```
//!
//! ## Example
//! ```rust
//! use appvisor::{AppLifecycles, Config, LifecycleFn, MemoryHistory, Orchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let history = Arc::new(MemoryHistory::at("/home")?);
//!     let orch = Orchestrator::builder(Config::default(), history.clone()).build();
//!
//!     let noop = || LifecycleFn::new(|_props| async { Ok(()) });
//!     orch.register("home", AppLifecycles::new(noop(), noop(), noop()), "/home")?;
//!
//!     let mounted = orch.start().await?;
//!     assert_eq!(mounted, ["home"]);
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::apps::{ActiveWhen, AppStatus, Application, LoaderResolver, Registration, parse_manifest};
use crate::config::Config;
use crate::error::{ParcelError, RegistrationError, RuntimeError};
use crate::events::Event;
use crate::host::{Location, NavigationEvent, NavigationHost, NavigationKind};
use crate::lifecycles::{AppSource, LifecycleName};
use crate::parcels::{self, Parcel};
use crate::policies::TimeoutPolicy;
use crate::subscribers::SubscriberSet;
use crate::sync::lock;

use super::builder::OrchestratorBuilder;
use super::error_channel::ErrorHandler;
use super::runtime::Runtime;
use super::scheduler::{self, RerouteHandle};
use super::unload::{UnloadHandle, UnloadOptions};

/// Entry point of the runtime.
pub struct Orchestrator {
    rt: Arc<Runtime>,
    subs: Mutex<Option<Arc<SubscriberSet>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Starts building an orchestrator driven by `host`.
    pub fn builder(cfg: Config, host: Arc<dyn NavigationHost>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg, host)
    }

    pub(crate) fn new_internal(
        rt: Arc<Runtime>,
        subs: Option<Arc<SubscriberSet>>,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            rt,
            subs: Mutex::new(subs),
            listener: Mutex::new(listener),
        }
    }

    /// Registers an application from its positional parts.
    pub fn register(
        &self,
        name: impl Into<String>,
        app: impl Into<AppSource>,
        active_when: impl Into<ActiveWhen>,
    ) -> Result<(), RegistrationError> {
        self.register_with(Registration::new(name).app(app).active_when(active_when))
    }

    /// Registers an application.
    ///
    /// Validation happens synchronously. When called inside a tokio runtime, a routing pass
    /// follows (before [`start`](Orchestrator::start) it only loads active applications).
    pub fn register_with(&self, registration: Registration) -> Result<(), RegistrationError> {
        let valid = registration.validate()?;
        let app = Application::new(valid, self.rt.bus.clone());
        let app = self.rt.registry.register(app)?;
        tracing::debug!(name = %app.name(), "application registered");

        if tokio::runtime::Handle::try_current().is_ok() {
            let _ = scheduler::reroute(&self.rt, None);
        }
        Ok(())
    }

    /// Registers an application described by a JSON configuration object.
    pub fn register_manifest(
        &self,
        config: &Value,
        resolver: &dyn LoaderResolver,
    ) -> Result<(), RegistrationError> {
        self.register_with(parse_manifest(config, resolver)?)
    }

    /// Unloads the application (without waiting for a natural unmount), then removes it.
    ///
    /// From the call on, routing passes treat the application as inactive, so it is never
    /// mounted again while the unload is in flight.
    pub async fn unregister(&self, name: &str) -> Result<(), RuntimeError> {
        let app = self
            .rt
            .registry
            .get(name)
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: name.to_string(),
            })?;
        app.retire();
        let handle = self.rt.unloads.request(&self.rt, &app, false);
        handle.await?;
        self.rt.registry.remove(name);
        tracing::debug!(name, "application unregistered");
        Ok(())
    }

    /// Requests an unload of `name`.
    ///
    /// Concurrent requests for the same application share the returned handle.
    pub fn unload_application(
        &self,
        name: &str,
        opts: UnloadOptions,
    ) -> Result<UnloadHandle, RegistrationError> {
        let app = self
            .rt
            .registry
            .get(name)
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: name.to_string(),
            })?;
        Ok(self.rt.unloads.request(&self.rt, &app, opts.wait_for_unmount))
    }

    /// Switches to steady-state mode (mounting enabled) and runs a routing pass.
    pub fn start(&self) -> RerouteHandle {
        if self.rt.mark_started() {
            tracing::info!("orchestrator started");
        }
        scheduler::reroute(&self.rt, None)
    }

    pub fn is_started(&self) -> bool {
        self.rt.is_started()
    }

    /// Runs a routing pass against the current location.
    pub fn trigger_app_change(&self) -> RerouteHandle {
        scheduler::reroute(&self.rt, None)
    }

    /// Navigates the host to `url` (resolved against the current location) and runs a
    /// routing pass triggered by that navigation.
    pub fn navigate_to_url(&self, url: &str) -> Result<RerouteHandle, url::ParseError> {
        let location = self.rt.host.location().join(url)?;
        let event = NavigationEvent::new(NavigationKind::PushState, location);
        self.rt.host.navigate(&event);
        Ok(scheduler::reroute(&self.rt, Some(event)))
    }

    pub fn app_status(&self, name: &str) -> Option<AppStatus> {
        self.rt.registry.status(name)
    }

    /// Every registered name, in registration order.
    pub fn app_names(&self) -> Vec<String> {
        self.rt.registry.names()
    }

    pub fn mounted_apps(&self) -> Vec<String> {
        self.rt.registry.mounted()
    }

    /// Names whose activity matches `location` (failing predicates count as inactive).
    pub fn check_activity_functions(&self, location: &Location) -> Vec<String> {
        self.rt.registry.matching(location)
    }

    /// Returns `false` if this exact handler was already registered.
    pub fn add_error_handler(&self, handler: ErrorHandler) -> bool {
        self.rt.errors.add(handler)
    }

    /// Returns `false` if the handler was not registered.
    pub fn remove_error_handler(&self, handler: &ErrorHandler) -> bool {
        self.rt.errors.remove(handler)
    }

    /// Replaces the global budget of one lifecycle. Applies to units loaded afterwards.
    pub fn set_max_time(&self, lifecycle: LifecycleName, policy: TimeoutPolicy) {
        self.rt.set_timeout(lifecycle, policy);
    }

    /// Subscribes to the raw event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.rt.bus.subscribe()
    }

    /// Mounts a parcel owned by no unit.
    pub fn mount_root_parcel(
        &self,
        source: impl Into<AppSource>,
        custom_props: Value,
    ) -> Result<Parcel, ParcelError> {
        parcels::mount_parcel(&self.rt, None, "root".into(), source.into(), custom_props)
    }

    /// Stops forwarding events to subscribers and waits for their queues to drain.
    pub async fn shutdown(&self) {
        let listener = lock(&self.listener).take();
        if let Some(listener) = listener {
            listener.abort();
            let _ = listener.await;
        }
        let subs = lock(&self.subs).take();
        if let Some(subs) = subs.and_then(|s| Arc::try_unwrap(s).ok()) {
            subs.shutdown().await;
        }
    }
}
