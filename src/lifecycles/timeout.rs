//! # Time-bounded waiting on a lifecycle call.
//!
//! [`reasonable_time`] runs the composed lifecycle on its own task and waits for it under a
//! [`TimeoutPolicy`]:
//!
//! ```text
//! spawn(call) ──► every `warning` until `max`:  tracing::warn!("still waiting")
//!             ──► at `max`:  publish TimeoutHit
//!                             ├─ die_on_timeout → Err(Timeout)   (call keeps running, detached)
//!                             └─ otherwise      → tracing::error!, keep waiting
//! ```
//!
//! A timeout never cancels the underlying call: the runtime only stops waiting for it.
//! A panic inside the call is reported as [`LifecycleError::Panicked`].

use std::sync::Arc;

use tokio::task::JoinError;
use tokio::time::{self, Instant};

use crate::apps::UnitKind;
use crate::error::{LifecycleError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::policies::TimeoutPolicy;

use super::lifecycle::{LifecycleName, StepFuture};

pub(crate) async fn reasonable_time(
    bus: &Bus,
    kind: UnitKind,
    name: &Arc<str>,
    lifecycle: LifecycleName,
    policy: TimeoutPolicy,
    call: StepFuture,
) -> Result<(), LifecycleError> {
    let mut task = tokio::spawn(call);

    let Some(budget) = policy.budget() else {
        return settle(task.await);
    };

    let started = Instant::now();
    let deadline = started + budget;
    let step = policy.warning_interval();
    let mut next_warning = step.map(|w| started + w).filter(|at| *at < deadline);

    loop {
        let wake = next_warning.unwrap_or(deadline);
        tokio::select! {
            biased;
            res = &mut task => return settle(res),
            _ = time::sleep_until(wake) => {}
        }

        if let (Some(at), Some(w)) = (next_warning, step) {
            tracing::warn!(
                unit = %kind,
                name = %name,
                lifecycle = %lifecycle,
                elapsed_ms = at.duration_since(started).as_millis() as u64,
                "lifecycle has not resolved yet"
            );
            next_warning = Some(at + w).filter(|next| *next < deadline);
            continue;
        }
        break;
    }

    bus.publish(
        Event::new(EventKind::TimeoutHit)
            .with_unit(kind, Arc::clone(name))
            .with_lifecycle(lifecycle)
            .with_timeout(budget),
    );

    if policy.die_on_timeout {
        return Err(LifecycleError::Timeout {
            lifecycle,
            after: budget,
        });
    }

    tracing::error!(
        unit = %kind,
        name = %name,
        lifecycle = %lifecycle,
        budget_ms = budget.as_millis() as u64,
        "lifecycle exceeded its time budget; still waiting"
    );
    settle(task.await)
}

fn settle(res: Result<Result<(), LifecycleError>, JoinError>) -> Result<(), LifecycleError> {
    match res {
        Ok(out) => out,
        Err(e) if e.is_panic() => Err(LifecycleError::Panicked(
            panic_message(&*e.into_panic()).into(),
        )),
        Err(_) => Err(LifecycleError::Panicked("lifecycle task was cancelled".into())),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;

    use super::*;

    fn sleeping(d: Duration) -> StepFuture {
        async move {
            time::sleep(d).await;
            Ok::<(), LifecycleError>(())
        }
        .boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_policy_fails_and_publishes_timeout_hit() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let policy = TimeoutPolicy::new(Duration::from_millis(100)).fatal();

        let err = reasonable_time(
            &bus,
            UnitKind::Application,
            &"slow".into(),
            LifecycleName::Mount,
            policy,
            sleeping(Duration::from_secs(10)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LifecycleError::Timeout { lifecycle: LifecycleName::Mount, .. }));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TimeoutHit);
        assert_eq!(ev.timeout_ms, Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_fatal_policy_keeps_waiting() {
        let bus = Bus::new(16);
        let policy = TimeoutPolicy::new(Duration::from_millis(100))
            .with_warning(Duration::from_millis(30));

        reasonable_time(
            &bus,
            UnitKind::Parcel,
            &"slow".into(),
            LifecycleName::Bootstrap,
            policy,
            sleeping(Duration::from_millis(500)),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_panic_is_reported_as_lifecycle_error() {
        let bus = Bus::new(16);
        let call: StepFuture = async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), LifecycleError>(())
        }
        .boxed();

        let err = reasonable_time(
            &bus,
            UnitKind::Application,
            &"p".into(),
            LifecycleName::Unmount,
            TimeoutPolicy::default(),
            call,
        )
        .await
        .unwrap_err();

        match err {
            LifecycleError::Panicked(msg) => assert_eq!(&*msg, "kaboom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
