use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use appvisor::{
    ActiveWhen, AppError, AppLifecycles, AppSource, AppStatus, Config, ErrorHandler, Event,
    EventKind, Lifecycle, LifecycleError, LifecycleFn, LifecycleName, Location, MemoryHistory,
    NavigationEvent, NavigationHost, Orchestrator, ParcelError, RegistrationError, RuntimeError,
    StepReturn, TimeoutPolicy, UnloadOptions,
};
use futures::FutureExt;
use serde_json::json;
use tokio::sync::broadcast;

type Log = Arc<Mutex<Vec<String>>>;

fn noop() -> LifecycleFn {
    LifecycleFn::new(|_| async { Ok(()) })
}

fn lifecycles() -> AppLifecycles {
    AppLifecycles::new(noop(), noop(), noop())
}

fn recorder(log: &Log, tag: &str) -> LifecycleFn {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    LifecycleFn::new(move |props| {
        log.lock().unwrap().push(format!("{tag} {}", props.name()));
        async { Ok(()) }
    })
}

fn recorded(log: &Log) -> AppLifecycles {
    AppLifecycles::new(
        recorder(log, "bootstrap"),
        recorder(log, "mount"),
        recorder(log, "unmount"),
    )
    .with_unload(recorder(log, "unload"))
}

fn setup(path: &str) -> (Arc<MemoryHistory>, Arc<Orchestrator>) {
    let history = Arc::new(MemoryHistory::at(path).unwrap());
    let orch = Orchestrator::builder(Config::default(), history.clone()).build();
    (history, orch)
}

fn collecting_handler() -> (ErrorHandler, Arc<Mutex<Vec<AppError>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: ErrorHandler = Arc::new(move |err: &AppError| sink.lock().unwrap().push(err.clone()));
    (handler, seen)
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn transitions_of(events: &[Event], name: &str) -> Vec<AppStatus> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::StatusChanged && e.name.as_deref() == Some(name))
        .filter_map(|e| e.status)
        .collect()
}

#[tokio::test]
async fn test_duplicate_name_and_invalid_config_keys_are_rejected() {
    let (_history, orch) = setup("/");
    orch.register("a", lifecycles(), "/a").unwrap();

    let dup = orch.register("a", lifecycles(), "/b").unwrap_err();
    assert_eq!(dup, RegistrationError::DuplicateName { name: "a".into() });

    let resolver = |_: &str| Some(AppSource::from(lifecycles()));
    let bad = json!({ "name": "b", "app": "b", "activeWhen": "/b", "bogus": 1 });
    let err = orch.register_manifest(&bad, &resolver).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::InvalidConfigKeys {
            invalid: vec!["bogus".into()]
        }
    );

    let good = json!({ "name": "b", "app": "b", "activeWhen": ["/b", "/c"] });
    orch.register_manifest(&good, &resolver).unwrap();
    assert_eq!(orch.app_names(), ["a", "b"]);
}

#[tokio::test]
async fn test_navigation_swaps_mounted_apps() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();
    orch.register("a", recorded(&log), "/a").unwrap();
    orch.register("b", recorded(&log), "/b").unwrap();

    assert_eq!(orch.start().await.unwrap(), ["a"]);
    assert_eq!(orch.app_status("b"), Some(AppStatus::NotLoaded));

    let mut rx = orch.events();
    assert_eq!(orch.navigate_to_url("/b").unwrap().await.unwrap(), ["b"]);
    assert_eq!(orch.app_status("a"), Some(AppStatus::NotMounted));

    let events = drain(&mut rx);
    assert_eq!(
        transitions_of(&events, "a"),
        [AppStatus::Unmounting, AppStatus::NotMounted]
    );
    assert!(!transitions_of(&events, "a").contains(&AppStatus::LoadError));

    // Deactivation finished before anything mounted.
    let log = log.lock().unwrap();
    let unmount_a = log.iter().position(|l| l == "unmount a").unwrap();
    let mount_b = log.iter().position(|l| l == "mount b").unwrap();
    assert!(unmount_a < mount_b);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_overlaps_pending_unmounts_but_mount_waits() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();
    let slow_log = Arc::clone(&log);
    let slow_unmount = LifecycleFn::new(move |props| {
        let log = Arc::clone(&slow_log);
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            log.lock().unwrap().push(format!("unmount {}", props.name()));
            Ok(())
        }
    });
    orch.register("a", AppLifecycles::new(noop(), noop(), slow_unmount), "/a")
        .unwrap();
    orch.register("b", recorded(&log), "/b").unwrap();
    assert_eq!(orch.start().await.unwrap(), ["a"]);

    assert_eq!(orch.navigate_to_url("/b").unwrap().await.unwrap(), ["b"]);
    assert_eq!(*log.lock().unwrap(), ["bootstrap b", "unmount a", "mount b"]);
}

#[tokio::test]
async fn test_routing_notifications_carry_planned_and_actual_statuses() {
    let (_history, orch) = setup("/a");
    orch.register("a", lifecycles(), "/a").unwrap();
    orch.register("b", lifecycles(), "/b").unwrap();
    orch.start().await.unwrap();

    let mut rx = orch.events();
    orch.navigate_to_url("/b").unwrap().await.unwrap();
    let routing: Vec<Event> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.kind.is_routing())
        .collect();

    let kinds: Vec<EventKind> = routing.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            EventKind::BeforeAppChange,
            EventKind::BeforeRoutingEvent,
            EventKind::BeforeMountRoutingEvent,
            EventKind::AppChange,
            EventKind::RoutingEvent,
        ]
    );

    let before = routing[0].routing.as_ref().unwrap();
    assert_eq!(before.new_app_statuses["b"], AppStatus::Mounted);
    assert_eq!(before.new_app_statuses["a"], AppStatus::NotMounted);
    assert_eq!(before.total_app_changes, 2);
    assert_eq!(
        before.original_event.as_ref().map(|e| e.location.path()),
        Some("/b")
    );

    let after = routing[3].routing.as_ref().unwrap();
    assert_eq!(after.apps_with(AppStatus::Mounted), ["b"]);
    assert_eq!(after.apps_with(AppStatus::NotMounted), ["a"]);
    assert!(after.apps_with(AppStatus::SkipBecauseBroken).is_empty());

    let mut rx = orch.events();
    orch.trigger_app_change().await.unwrap();
    let kinds: Vec<EventKind> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.kind.is_routing())
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds.first(), Some(&EventKind::BeforeNoAppChange));
    assert!(kinds.contains(&EventKind::NoAppChange));
}

#[tokio::test]
async fn test_captured_listeners_are_replayed_once_per_navigation() {
    let (history, orch) = setup("/");
    let seen: Log = Arc::default();
    let sink = Arc::clone(&seen);
    history.listen(move |ev| sink.lock().unwrap().push(ev.location.path().to_string()));

    orch.register("a", lifecycles(), "/a").unwrap();
    orch.start().await.unwrap();
    assert!(seen.lock().unwrap().is_empty());

    orch.navigate_to_url("/a").unwrap().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), ["/a"]);
}

#[tokio::test(start_paused = true)]
async fn test_load_error_is_retried_only_after_backoff() {
    let (_history, orch) = setup("/a");
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let source = AppSource::loader(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                Err(LifecycleError::msg("network down"))
            } else {
                Ok(lifecycles())
            }
        }
    });
    let (handler, errors) = collecting_handler();
    orch.add_error_handler(handler);

    orch.register("a", source, "/a").unwrap();
    assert!(orch.start().await.unwrap().is_empty());
    assert_eq!(orch.app_status("a"), Some(AppStatus::LoadError));
    assert_eq!(errors.lock().unwrap()[0].new_status, AppStatus::LoadError);

    tokio::time::advance(Duration::from_millis(150)).await;
    assert!(orch.trigger_app_change().await.unwrap().is_empty());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(50)).await;
    assert_eq!(orch.trigger_app_change().await.unwrap(), ["a"]);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failing_predicate_quarantines_the_app_for_good() {
    let (_history, orch) = setup("/");
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let source = AppSource::loader(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(lifecycles()) }
    });
    let (handler, errors) = collecting_handler();
    orch.add_error_handler(handler);

    orch.register_with(
        appvisor::Registration::new("broken")
            .app(source)
            .active_when(ActiveWhen::try_predicate(|_| Err("boom".into()))),
    )
    .unwrap();
    orch.start().await.unwrap();
    assert_eq!(orch.app_status("broken"), Some(AppStatus::SkipBecauseBroken));

    let mut rx = orch.events();
    orch.trigger_app_change().await.unwrap();
    orch.navigate_to_url("/elsewhere").unwrap().await.unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert_eq!(orch.app_status("broken"), Some(AppStatus::SkipBecauseBroken));
    assert!(transitions_of(&drain(&mut rx), "broken").is_empty());

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].source, LifecycleError::Activity(_)));
}

#[tokio::test]
async fn test_plain_value_step_quarantines_with_its_index() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();
    let mount = Lifecycle::sequence([recorder(&log, "first"), LifecycleFn::raw(|_| StepReturn::Ready)]);
    let (handler, errors) = collecting_handler();
    orch.add_error_handler(handler);

    orch.register("a", AppLifecycles::new(noop(), mount, noop()), "/a")
        .unwrap();
    assert!(orch.start().await.unwrap().is_empty());

    assert_eq!(orch.app_status("a"), Some(AppStatus::SkipBecauseBroken));
    assert_eq!(*log.lock().unwrap(), ["first a"]);
    let errors = errors.lock().unwrap();
    assert_eq!(errors[0].status, AppStatus::Mounting);
    assert!(matches!(
        errors[0].source,
        LifecycleError::ContractViolation { index: 1, lifecycle: LifecycleName::Mount, .. }
    ));
}

#[tokio::test]
async fn test_overlapping_reroutes_chain_into_one_extra_pass() {
    let (_history, orch) = setup("/a");
    orch.register("a", lifecycles(), "/a").unwrap();
    orch.start().await.unwrap();

    let mut rx = orch.events();
    let first = orch.trigger_app_change();
    let second = orch.trigger_app_change();
    let third = orch.trigger_app_change();

    let results = futures::future::join3(first, second, third).await;
    assert_eq!(results.0.unwrap(), ["a"]);
    assert_eq!(results.1.unwrap(), ["a"]);
    assert_eq!(results.2.unwrap(), ["a"]);

    let passes = drain(&mut rx)
        .iter()
        .filter(|e| e.kind == EventKind::RoutingEvent)
        .count();
    assert_eq!(passes, 2);
}

/// Host whose location lookup panics on the n-th call after arming.
struct FlakyHost {
    inner: MemoryHistory,
    countdown: AtomicUsize,
}

impl FlakyHost {
    fn panic_on_call(&self, n: usize) {
        self.countdown.store(n, Ordering::SeqCst);
    }
}

impl NavigationHost for FlakyHost {
    fn location(&self) -> Location {
        let left = self
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if left == Ok(1) {
            panic!("location lookup failed");
        }
        self.inner.location()
    }

    fn navigate(&self, event: &NavigationEvent) {
        self.inner.navigate(event)
    }

    fn replay_captured(&self, event: &NavigationEvent) {
        self.inner.replay_captured(event)
    }
}

#[tokio::test]
async fn test_crashed_pass_rejects_every_caller_and_frees_the_scheduler() {
    let host = Arc::new(FlakyHost {
        inner: MemoryHistory::at("/b").unwrap(),
        countdown: AtomicUsize::new(0),
    });
    let orch = Orchestrator::builder(Config::default(), host.clone()).build();
    orch.register("b", lifecycles(), "/b").unwrap();
    assert_eq!(orch.start().await.unwrap(), ["b"]);
    assert!(orch.navigate_to_url("/").unwrap().await.unwrap().is_empty());

    let seen: Log = Arc::default();
    let sink = Arc::clone(&seen);
    host.inner
        .listen(move |ev| sink.lock().unwrap().push(ev.location.path().to_string()));

    let first = orch.navigate_to_url("/b").unwrap();
    let queued = orch.trigger_app_change();
    // The pass itself reads the location once; the activation of "b" reads it next.
    host.panic_on_call(2);

    let (first, queued) = futures::future::join(first, queued).await;
    assert!(matches!(first, Err(RuntimeError::Panicked(_))));
    assert!(matches!(queued, Err(RuntimeError::Panicked(_))));
    assert_eq!(*seen.lock().unwrap(), ["/b"]);
    assert_eq!(orch.app_status("b"), Some(AppStatus::NotMounted));

    assert_eq!(orch.trigger_app_change().await.unwrap(), ["b"]);
    assert_eq!(orch.app_status("b"), Some(AppStatus::Mounted));
}

#[tokio::test]
async fn test_waiting_unload_shares_one_handle_and_settles_on_navigation() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();
    orch.register("a", recorded(&log), "/a").unwrap();
    orch.start().await.unwrap();

    let first = orch
        .unload_application("a", UnloadOptions::wait_for_unmount())
        .unwrap();
    let second = orch
        .unload_application("a", UnloadOptions::wait_for_unmount())
        .unwrap();
    assert!(first.ptr_eq(&second));

    tokio::task::yield_now().await;
    assert!(first.clone().now_or_never().is_none());
    assert_eq!(orch.app_status("a"), Some(AppStatus::Mounted));

    assert!(orch.navigate_to_url("/b").unwrap().await.unwrap().is_empty());
    first.await.unwrap();
    second.await.unwrap();
    assert_eq!(orch.app_status("a"), Some(AppStatus::NotLoaded));
    let log = log.lock().unwrap();
    assert_eq!(log[log.len() - 2..], ["unmount a".to_string(), "unload a".to_string()]);
}

#[tokio::test]
async fn test_immediate_unload_remounts_a_still_active_app() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();
    orch.register("a", recorded(&log), "/a").unwrap();
    orch.start().await.unwrap();

    orch.unload_application("a", UnloadOptions::default())
        .unwrap()
        .await
        .unwrap();
    assert_eq!(orch.trigger_app_change().await.unwrap(), ["a"]);

    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        [
            "bootstrap a",
            "mount a",
            "unmount a",
            "unload a",
            "bootstrap a",
            "mount a"
        ]
    );
}

#[tokio::test]
async fn test_unregister_unloads_then_forgets_the_app() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();
    orch.register("a", recorded(&log), "/a").unwrap();
    orch.start().await.unwrap();

    orch.unregister("a").await.unwrap();
    assert!(orch.app_names().is_empty());
    assert_eq!(orch.app_status("a"), None);
    assert!(log.lock().unwrap().contains(&"unload a".to_string()));

    assert!(matches!(
        orch.unregister("a").await,
        Err(RuntimeError::Registration(RegistrationError::NotRegistered { .. }))
    ));
}

#[tokio::test]
async fn test_unregistered_app_is_not_remounted_by_the_follow_up_pass() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();
    orch.register("a", recorded(&log), "/a").unwrap();
    orch.start().await.unwrap();

    orch.unregister("a").await.unwrap();
    assert!(orch.trigger_app_change().await.unwrap().is_empty());
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert!(orch.app_names().is_empty());
    assert_eq!(
        *log.lock().unwrap(),
        ["bootstrap a", "mount a", "unmount a", "unload a"]
    );
}

#[tokio::test]
async fn test_error_handlers_are_idempotent() {
    let (_history, orch) = setup("/");
    let (handler, _) = collecting_handler();
    assert!(orch.add_error_handler(Arc::clone(&handler)));
    assert!(!orch.add_error_handler(Arc::clone(&handler)));
    assert!(orch.remove_error_handler(&handler));
    assert!(!orch.remove_error_handler(&handler));
}

#[tokio::test]
async fn test_pre_start_pass_only_loads() {
    let (_history, orch) = setup("/a");
    orch.register("a", lifecycles(), "/a").unwrap();
    assert!(orch.trigger_app_change().await.unwrap().is_empty());
    assert!(!orch.is_started());
    assert_eq!(orch.app_status("a"), Some(AppStatus::NotBootstrapped));
    assert_eq!(
        orch.check_activity_functions(&appvisor::Location::parse("/a/x").unwrap()),
        ["a"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_fatal_mount_timeout_quarantines() {
    let (_history, orch) = setup("/slow");
    orch.set_max_time(LifecycleName::Mount, TimeoutPolicy::new(Duration::from_secs(1)).fatal());
    let slow = LifecycleFn::new(|_| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    });
    let (handler, errors) = collecting_handler();
    orch.add_error_handler(handler);
    let mut rx = orch.events();

    orch.register("slow", AppLifecycles::new(noop(), slow, noop()), "/slow")
        .unwrap();
    assert!(orch.start().await.unwrap().is_empty());

    assert_eq!(orch.app_status("slow"), Some(AppStatus::SkipBecauseBroken));
    assert!(matches!(
        errors.lock().unwrap()[0].source,
        LifecycleError::Timeout { lifecycle: LifecycleName::Mount, .. }
    ));
    assert!(drain(&mut rx).iter().any(|e| e.kind == EventKind::TimeoutHit));
}

#[tokio::test]
async fn test_first_mount_is_announced_once() {
    let (_history, orch) = setup("/a");
    let mut rx = orch.events();
    orch.register("a", lifecycles(), "/a").unwrap();
    orch.register("b", lifecycles(), "/b").unwrap();
    orch.start().await.unwrap();
    orch.navigate_to_url("/b").unwrap().await.unwrap();

    let firsts: Vec<Event> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e.kind, EventKind::BeforeFirstMount | EventKind::FirstMount))
        .collect();
    assert_eq!(firsts.len(), 2);
    assert!(firsts.iter().all(|e| e.name.as_deref() == Some("a")));
}

#[tokio::test]
async fn test_app_parcels_unmount_before_their_owner() {
    let (_history, orch) = setup("/a");
    let log: Log = Arc::default();

    let parcel = recorded(&log);
    let owner_log = Arc::clone(&log);
    let mount = LifecycleFn::new(move |props| {
        let parcel = parcel.clone();
        let log = Arc::clone(&owner_log);
        async move {
            log.lock().unwrap().push(format!("mount {}", props.name()));
            let child = props
                .mount_parcel(parcel, json!({ "from": props.name() }))
                .map_err(|e| LifecycleError::msg(e.to_string()))?;
            child
                .mounted()
                .await
                .map_err(|e| LifecycleError::msg(e.to_string()))
        }
    });
    let app = AppLifecycles::new(noop(), mount, recorder(&log, "unmount"));

    orch.register("a", app, "/a").unwrap();
    assert_eq!(orch.start().await.unwrap(), ["a"]);
    orch.navigate_to_url("/elsewhere").unwrap().await.unwrap();

    let log = log.lock().unwrap();
    let parcel_unmount = log
        .iter()
        .position(|l| l.starts_with("unmount parcel-"))
        .unwrap();
    let app_unmount = log.iter().position(|l| l == "unmount a").unwrap();
    assert!(parcel_unmount < app_unmount);
    assert_eq!(orch.app_status("a"), Some(AppStatus::NotMounted));
}

#[tokio::test]
async fn test_root_parcel_handle_drives_its_lifecycle() {
    let (_history, orch) = setup("/");
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    let update = LifecycleFn::new(move |props| {
        sink.lock().unwrap().push(props.get("count").cloned());
        async { Ok(()) }
    });

    let parcel = orch
        .mount_root_parcel(lifecycles().with_update(update), json!({ "count": 0 }))
        .unwrap();
    parcel.mounted().await.unwrap();
    assert_eq!(parcel.status(), AppStatus::Mounted);

    parcel.update(json!({ "count": 1 })).await.unwrap();
    assert_eq!(*updates.lock().unwrap(), [Some(json!(1))]);

    parcel.unmount().await.unwrap();
    assert_eq!(parcel.status(), AppStatus::NotMounted);
    assert!(matches!(
        parcel.unmount().await,
        Err(ParcelError::WrongStatus { operation: "unmount", .. })
    ));

    parcel.mount().await.unwrap();
    assert_eq!(parcel.status(), AppStatus::Mounted);

    assert!(matches!(
        orch.mount_root_parcel(lifecycles(), json!([1])),
        Err(ParcelError::InvalidCustomProps)
    ));
}

#[tokio::test]
async fn test_parcel_failure_is_returned_not_observed() {
    let (_history, orch) = setup("/");
    let (handler, errors) = collecting_handler();
    orch.add_error_handler(handler);

    let failing = LifecycleFn::new(|_| async { Err(LifecycleError::msg("no dom")) });
    let parcel = orch
        .mount_root_parcel(AppLifecycles::new(noop(), failing, noop()), json!(null))
        .unwrap();

    let err = parcel.mounted().await.unwrap_err();
    assert!(matches!(err, ParcelError::Lifecycle(ref e) if e.status == AppStatus::Mounting));
    assert_eq!(parcel.status(), AppStatus::SkipBecauseBroken);
    assert!(errors.lock().unwrap().is_empty());
    assert!(matches!(
        parcel.update(json!({})).await,
        Err(ParcelError::WrongStatus { .. })
    ));
}
