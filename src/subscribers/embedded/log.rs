//! # LogWriter: events as `tracing` records
//!
//! A subscriber that writes every [`Event`] through `tracing`. Routing notifications
//! and status changes go to `debug`, failures and timeouts to `warn`/`error`.
//!
//! ## Example output (with `tracing-subscriber`'s fmt layer)
//! ```text
//! DEBUG appvisor: before-app-change changes=2 mounted=["a"] unmounted=["b"]
//! DEBUG appvisor: status-changed unit=application name=a from=NOT_MOUNTED to=MOUNTING
//! ERROR appvisor: app-failed unit=application name=b from=MOUNTING to=SKIP_BECAUSE_BROKEN reason=...
//! WARN  appvisor: timeout-hit unit=application name=c lifecycle=mount timeout_ms=4000
//! ```

use async_trait::async_trait;

use crate::apps::AppStatus;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let name = e.name.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::BeforeNoAppChange
            | EventKind::BeforeAppChange
            | EventKind::BeforeRoutingEvent
            | EventKind::BeforeMountRoutingEvent
            | EventKind::NoAppChange
            | EventKind::AppChange
            | EventKind::RoutingEvent => {
                let Some(detail) = e.routing.as_deref() else {
                    tracing::debug!(target: "appvisor", "{label}");
                    return;
                };
                tracing::debug!(
                    target: "appvisor",
                    changes = detail.total_app_changes,
                    mounted = ?detail.apps_with(AppStatus::Mounted),
                    unmounted = ?detail.apps_with(AppStatus::NotMounted),
                    unloaded = ?detail.apps_with(AppStatus::NotLoaded),
                    broken = ?detail.apps_with(AppStatus::SkipBecauseBroken),
                    "{label}"
                );
            }
            EventKind::BeforeFirstMount | EventKind::FirstMount => {
                tracing::info!(target: "appvisor", name, "{label}");
            }
            EventKind::StatusChanged => {
                tracing::debug!(
                    target: "appvisor",
                    unit = ?e.unit,
                    name,
                    from = ?e.from,
                    to = ?e.status,
                    "{label}"
                );
            }
            EventKind::AppFailed => {
                tracing::error!(
                    target: "appvisor",
                    unit = ?e.unit,
                    name,
                    from = ?e.from,
                    to = ?e.status,
                    reason,
                    "{label}"
                );
            }
            EventKind::TimeoutHit => {
                tracing::warn!(
                    target: "appvisor",
                    unit = ?e.unit,
                    name,
                    lifecycle = ?e.lifecycle,
                    timeout_ms = ?e.timeout_ms,
                    "{label}"
                );
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: "appvisor", subscriber = name, reason, "{label}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
