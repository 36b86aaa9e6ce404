//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for routing passes, status changes and failures.
//! - Wire the subscriber into [`Orchestrator::builder`].
//! - Observe failures through an error handler as well.
//!
//! ## Flow
//! ```text
//! Orchestrator::start() / navigate_to_url()
//!     ├─► publish(BeforeAppChange / BeforeRoutingEvent / BeforeMountRoutingEvent)
//!     ├─► transitions publish(StatusChanged / AppFailed / TimeoutHit)
//!     ├─► publish(AppChange / RoutingEvent)
//!     └─► subscriber listener (in Orchestrator)
//!           └─► SubscriberSet.emit_arc() ──► ConsoleSubscriber.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::time::Duration;

use appvisor::{
    AppError, AppLifecycles, AppStatus, Config, ErrorHandler, Event, EventKind, LifecycleError,
    LifecycleFn, LifecycleName, MemoryHistory, Orchestrator, Subscribe, TimeoutOverrides,
    TimeoutPolicy,
};

/// A simple console subscriber that prints selected events.
/// In real life, you could export metrics, ship logs, or trigger alerts.
struct ConsoleSubscriber;

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        let name = ev.name.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            // === Routing ===
            EventKind::BeforeAppChange | EventKind::AppChange => {
                if let Some(detail) = ev.routing.as_deref() {
                    println!(
                        "[sub] {}: changes={} mounted={:?} unmounted={:?} broken={:?}",
                        ev.kind.as_label(),
                        detail.total_app_changes,
                        detail.apps_with(AppStatus::Mounted),
                        detail.apps_with(AppStatus::NotMounted),
                        detail.apps_with(AppStatus::SkipBecauseBroken),
                    );
                }
            }
            EventKind::BeforeNoAppChange | EventKind::NoAppChange => {
                println!("[sub] {}", ev.kind.as_label());
            }
            EventKind::FirstMount => println!("[sub] first mount: app={name}"),

            // === Units ===
            EventKind::StatusChanged => {
                println!(
                    "[sub] status:   app={name} {:?} -> {:?}",
                    ev.from.unwrap_or_default(),
                    ev.status.unwrap_or_default()
                );
            }
            EventKind::AppFailed => {
                println!(
                    "[sub] failed:   app={name} reason={}",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::TimeoutHit => {
                let dur = ev
                    .timeout_ms
                    .map(|v| format!("{}ms", v))
                    .unwrap_or_default();
                println!(
                    "[sub] timeout:  app={name} lifecycle={:?} budget={dur}",
                    ev.lifecycle
                );
            }

            // === Ignored ===
            EventKind::BeforeRoutingEvent
            | EventKind::BeforeMountRoutingEvent
            | EventKind::RoutingEvent
            | EventKind::BeforeFirstMount
            | EventKind::SubscriberOverflow
            | EventKind::SubscriberPanicked => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}

fn healthy() -> AppLifecycles {
    AppLifecycles::new(
        LifecycleFn::new(|_props| async { Ok(()) }),
        LifecycleFn::new(|_props| async { Ok(()) }),
        LifecycleFn::new(|_props| async { Ok(()) }),
    )
}

/// Mount fails on purpose (to demonstrate AppFailed and quarantine).
fn failing() -> AppLifecycles {
    AppLifecycles::new(
        LifecycleFn::new(|_props| async { Ok(()) }),
        LifecycleFn::new(|_props| async { Err(LifecycleError::msg("boom (demo failure)")) }),
        LifecycleFn::new(|_props| async { Ok(()) }),
    )
}

/// Bootstrap exceeds a fatal 200ms budget (to demonstrate TimeoutHit).
fn slow() -> AppLifecycles {
    let budget = TimeoutPolicy::new(Duration::from_millis(200))
        .with_warning(Duration::from_millis(100))
        .fatal();
    AppLifecycles::new(
        LifecycleFn::new(|_props| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        }),
        LifecycleFn::new(|_props| async { Ok(()) }),
        LifecycleFn::new(|_props| async { Ok(()) }),
    )
    .with_timeouts(TimeoutOverrides::default().with(LifecycleName::Bootstrap, budget))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let history = Arc::new(MemoryHistory::at("/")?);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleSubscriber)];
    let orch = Orchestrator::builder(Config::default(), history)
        .with_subscribers(subs)
        .build();

    let handler: ErrorHandler = Arc::new(|err: &AppError| {
        println!("[err] {} ({})", err, err.as_label());
    });
    orch.add_error_handler(handler);

    orch.register("healthy", healthy(), "/")?;
    orch.register("failing", failing(), "/")?;
    orch.register("slow", slow(), "/")?;

    let mounted = orch.start().await?;
    println!("mounted: {mounted:?}");

    // Let the subscriber drain its queue before exiting.
    orch.shutdown().await;
    Ok(())
}
