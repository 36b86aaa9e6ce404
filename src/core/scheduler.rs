//! # Routing passes with single-flight re-entrancy.
//!
//! One pass at a time: a [`reroute`] arriving while a pass is underway is queued and handled
//! by one chained pass once the current one settles.
//!
//! ```text
//! reroute(trigger)
//!   ├─ underway ──► queue caller
//!   └─ idle ────► perform([caller])
//!
//! perform(callers)
//!   ├─ diff = registry.compute_diff(host.location())
//!   ├─ not started ──► load to_load ──► replay ──► resolve []
//!   └─ started:
//!        BeforeNoAppChange | BeforeAppChange ──► BeforeRoutingEvent
//!        deactivation = join(unload to_unload, unmount+unload to_unmount)   (shared)
//!        spawn per activating app:
//!           load? ──► active? ──► bootstrap ──► await deactivation ──► active? ──► mount
//!        await deactivation ──► BeforeMountRoutingEvent ──► replay captured listeners
//!          ├─ Err ──► reject callers + queue, release
//!          └─ Ok  ──► await activations ──► NoAppChange | AppChange ──► RoutingEvent
//!                     ──► release (chain queued callers) ──► resolve callers with mounted names
//! ```
//!
//! ## Rules
//! - No mount step begins before every unmount and unload of the pass has settled;
//!   loading and bootstrapping may overlap with them.
//! - Unit failures stay with their unit (quarantine + error channel); only a failure joined
//!   from a pending unload, or a panic, fails the pass.
//! - A failed pass still releases the flag and replays the captured listeners.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::apps::{AppStatus, Application};
use crate::error::{RuntimeError, panic_message};
use crate::events::{Event, EventKind, RoutingDetail};
use crate::host::NavigationEvent;
use crate::lifecycles::{to_bootstrap, to_load, to_mount, to_unload, to_unmount};
use crate::sync::lock;

use super::registry::Diff;
use super::runtime::Runtime;

type Outcome = Result<Vec<String>, RuntimeError>;
type Deactivation = Shared<BoxFuture<'static, Result<(), RuntimeError>>>;

/// Resolves with the names of the mounted applications once the routing pass that handled
/// this request finished.
pub struct RerouteHandle {
    rx: oneshot::Receiver<Outcome>,
}

impl Future for RerouteHandle {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(RuntimeError::Abandoned)))
    }
}

impl std::fmt::Debug for RerouteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerouteHandle").finish_non_exhaustive()
    }
}

struct Waiter {
    tx: oneshot::Sender<Outcome>,
    trigger: Option<NavigationEvent>,
}

#[derive(Default)]
struct State {
    underway: bool,
    waiting: Vec<Waiter>,
}

#[derive(Default)]
pub(crate) struct Scheduler {
    state: Mutex<State>,
}

impl Scheduler {
    /// Clears the flag, or keeps it set and hands over the queued callers.
    fn release(&self) -> Vec<Waiter> {
        let mut st = lock(&self.state);
        let next = std::mem::take(&mut st.waiting);
        st.underway = !next.is_empty();
        next
    }

    /// Clears the flag and drains the queue.
    fn abort(&self) -> Vec<Waiter> {
        let mut st = lock(&self.state);
        st.underway = false;
        std::mem::take(&mut st.waiting)
    }
}

/// Requests a routing pass.
pub(crate) fn reroute(rt: &Arc<Runtime>, trigger: Option<NavigationEvent>) -> RerouteHandle {
    let (tx, rx) = oneshot::channel();
    let waiter = Waiter { tx, trigger };

    let start = {
        let mut st = lock(&rt.scheduler.state);
        if st.underway {
            st.waiting.push(waiter);
            None
        } else {
            st.underway = true;
            Some(waiter)
        }
    };

    match start {
        Some(waiter) => {
            tokio::spawn(perform(Arc::clone(rt), vec![waiter]));
        }
        None => tracing::trace!("routing pass underway; request queued"),
    }
    RerouteHandle { rx }
}

fn perform(rt: Arc<Runtime>, callers: Vec<Waiter>) -> BoxFuture<'static, ()> {
    async move {
        let location = rt.host.location();
        let diff = rt.registry.compute_diff(&rt, &location, Instant::now());
        tracing::debug!(
            path = location.path(),
            started = rt.is_started(),
            callers = callers.len(),
            to_load = diff.to_load.len(),
            to_mount = diff.to_mount.len(),
            to_unmount = diff.to_unmount.len(),
            to_unload = diff.to_unload.len(),
            "routing pass"
        );

        if rt.is_started() {
            perform_changes(rt, diff, callers).await;
        } else {
            load_only(rt, diff, callers).await;
        }
    }
    .boxed()
}

/// Before start: only loads, nothing is mounted.
async fn load_only(rt: Arc<Runtime>, diff: Diff, callers: Vec<Waiter>) {
    join_all(diff.to_load.iter().map(|app| to_load(&rt, app))).await;
    replay(&rt, &callers);
    finish(&rt, callers, Ok(Vec::new()));
}

async fn perform_changes(rt: Arc<Runtime>, diff: Diff, callers: Vec<Waiter>) {
    let trigger = callers.iter().rev().find_map(|c| c.trigger.clone());

    let before = Arc::new(planned(&diff, trigger.clone()));
    let kind = if before.total_app_changes == 0 {
        EventKind::BeforeNoAppChange
    } else {
        EventKind::BeforeAppChange
    };
    rt.bus.publish(Event::new(kind).with_routing(Arc::clone(&before)));
    rt.bus
        .publish(Event::new(EventKind::BeforeRoutingEvent).with_routing(Arc::clone(&before)));

    let deactivation = deactivate(&rt, &diff);

    let activations: Vec<_> = diff
        .to_load
        .iter()
        .map(|app| (app, true))
        .chain(diff.to_mount.iter().map(|app| (app, false)))
        .map(|(app, load)| {
            tokio::spawn(activate(
                Arc::clone(&rt),
                Arc::clone(app),
                deactivation.clone(),
                load,
            ))
        })
        .collect();

    let deactivated = deactivation.await;
    if deactivated.is_ok() {
        rt.bus.publish(
            Event::new(EventKind::BeforeMountRoutingEvent).with_routing(Arc::clone(&before)),
        );
    }
    replay(&rt, &callers);

    if let Err(e) = deactivated {
        fail(&rt, callers, e);
        return;
    }

    let crashed = join_all(activations)
        .await
        .into_iter()
        .find_map(Result::err);
    if let Some(e) = crashed {
        let reason = if e.is_panic() {
            panic_message(&*e.into_panic())
        } else {
            e.to_string()
        };
        fail(&rt, callers, RuntimeError::Panicked(reason.into()));
        return;
    }

    let mut after = RoutingDetail::new(trigger);
    for app in diff.changed() {
        after.record(app.name(), app.status());
    }
    after.total_app_changes = diff.total();
    let after = Arc::new(after);

    let kind = if after.total_app_changes == 0 {
        EventKind::NoAppChange
    } else {
        EventKind::AppChange
    };
    rt.bus.publish(Event::new(kind).with_routing(Arc::clone(&after)));
    rt.bus.publish(Event::new(EventKind::RoutingEvent).with_routing(after));

    let mounted = rt.registry.mounted();
    finish(&rt, callers, Ok(mounted));
}

/// Statuses the applications of `diff` are about to assume.
fn planned(diff: &Diff, trigger: Option<NavigationEvent>) -> RoutingDetail {
    let mut detail = RoutingDetail::new(trigger);
    for app in diff.to_load.iter().chain(&diff.to_mount) {
        detail.record(app.name(), AppStatus::Mounted);
    }
    for app in &diff.to_unload {
        detail.record(app.name(), AppStatus::NotLoaded);
    }
    for app in &diff.to_unmount {
        detail.record(app.name(), AppStatus::NotMounted);
    }
    detail.total_app_changes = diff.total();
    detail
}

/// Unloads and unmounts (each unmount chained into its unload) concurrently.
fn deactivate(rt: &Arc<Runtime>, diff: &Diff) -> Deactivation {
    let unloads = diff.to_unload.iter().map(|app| {
        let rt = Arc::clone(rt);
        let app = Arc::clone(app);
        async move { to_unload(&rt, &app).await }.boxed()
    });
    let unmounts = diff.to_unmount.iter().map(|app| {
        let rt = Arc::clone(rt);
        let app = Arc::clone(app);
        async move {
            // Unmount failures quarantine the app and go to the error channel.
            if to_unmount(&rt, &app, false).await.is_ok() {
                to_unload(&rt, &app).await
            } else {
                Ok(())
            }
        }
        .boxed()
    });

    let all: Vec<BoxFuture<'static, Result<(), RuntimeError>>> = unloads.chain(unmounts).collect();
    async move {
        let results = join_all(all.into_iter().map(guarded)).await;
        results.into_iter().collect::<Result<Vec<()>, _>>().map(drop)
    }
    .boxed()
    .shared()
}

/// Turns a panic inside `fut` into [`RuntimeError::Panicked`].
fn guarded(
    fut: BoxFuture<'static, Result<(), RuntimeError>>,
) -> BoxFuture<'static, Result<(), RuntimeError>> {
    async move {
        match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(RuntimeError::Panicked(panic_message(&*panic).into())),
        }
    }
    .boxed()
}

async fn activate(
    rt: Arc<Runtime>,
    app: Arc<Application>,
    deactivation: Deactivation,
    load: bool,
) {
    if load && to_load(&rt, &app).await.is_err() {
        return;
    }
    if !rt.check_active(&app, &rt.host.location()) {
        return;
    }
    if to_bootstrap(&rt, &app, false).await.is_err() {
        return;
    }

    if deactivation.await.is_err() {
        return;
    }
    if !rt.check_active(&app, &rt.host.location()) {
        tracing::debug!(name = %app.name(), "no longer active; mount skipped");
        return;
    }
    // Failures are quarantined and reported by the transition itself.
    let _ = to_mount(&rt, &app, false).await;
}

/// Hands the pass's triggers back to the host in arrival order.
fn replay(rt: &Runtime, callers: &[Waiter]) {
    for trigger in callers.iter().filter_map(|c| c.trigger.as_ref()) {
        rt.host.replay_captured(trigger);
    }
}

fn finish(rt: &Arc<Runtime>, callers: Vec<Waiter>, outcome: Outcome) {
    let next = rt.scheduler.release();
    if !next.is_empty() {
        tracing::debug!(callers = next.len(), "chaining routing pass for queued requests");
        tokio::spawn(perform(Arc::clone(rt), next));
    }
    for caller in callers {
        let _ = caller.tx.send(outcome.clone());
    }
}

fn fail(rt: &Runtime, callers: Vec<Waiter>, err: RuntimeError) {
    tracing::warn!(error = %err, label = err.as_label(), "routing pass failed");
    let queued = rt.scheduler.abort();
    replay(rt, &queued);
    for caller in callers.into_iter().chain(queued) {
        let _ = caller.tx.send(Err(err.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_keeps_flag_for_queued_callers() {
        let scheduler = Scheduler::default();
        {
            let mut st = lock(&scheduler.state);
            st.underway = true;
            let (tx, _rx) = oneshot::channel();
            st.waiting.push(Waiter { tx, trigger: None });
        }

        assert_eq!(scheduler.release().len(), 1);
        assert!(lock(&scheduler.state).underway);
        assert!(scheduler.release().is_empty());
        assert!(!lock(&scheduler.state).underway);
    }

    #[test]
    fn test_abort_always_clears_flag() {
        let scheduler = Scheduler::default();
        {
            let mut st = lock(&scheduler.state);
            st.underway = true;
            let (tx, _rx) = oneshot::channel();
            st.waiting.push(Waiter { tx, trigger: None });
        }

        assert_eq!(scheduler.abort().len(), 1);
        assert!(!lock(&scheduler.state).underway);
    }

    #[tokio::test]
    async fn test_dropped_pass_resolves_as_abandoned() {
        let (tx, rx) = oneshot::channel::<Outcome>();
        drop(tx);
        let handle = RerouteHandle { rx };
        assert!(matches!(handle.await, Err(RuntimeError::Abandoned)));
    }
}
