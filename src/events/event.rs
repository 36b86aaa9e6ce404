//! # Runtime events emitted by the orchestrator.
//!
//! The [`EventKind`] enum classifies events into four groups:
//! - **Routing notifications**: published around every routing pass, each carrying a
//!   [`RoutingDetail`]
//! - **First mount**: published once per orchestrator around the first successful mount
//! - **Unit events**: status changes, failures and timeouts of applications and parcels
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use appvisor::{AppStatus, Event, EventKind, UnitKind};
//!
//! let ev = Event::new(EventKind::StatusChanged)
//!     .with_unit(UnitKind::Application, "nav")
//!     .with_transition(AppStatus::NotMounted, AppStatus::Mounting);
//!
//! assert_eq!(ev.name.as_deref(), Some("nav"));
//! assert_eq!(ev.status, Some(AppStatus::Mounting));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::apps::{AppStatus, UnitKind};
use crate::lifecycles::LifecycleName;

use super::routing::RoutingDetail;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Routing notifications (before the pass) ===
    /// The pass has nothing to load, mount, unmount or unload.
    ///
    /// Sets:
    /// - `routing`: planned statuses (all buckets empty)
    BeforeNoAppChange,

    /// The pass will change at least one application.
    ///
    /// Sets:
    /// - `routing`: the status each affected application is about to assume
    BeforeAppChange,

    /// Published on every steady-state pass, after the before-change notification.
    ///
    /// Sets:
    /// - `routing`: same payload as the preceding before-change notification
    BeforeRoutingEvent,

    /// Every unmount/unload of the pass has finished; mounting may begin.
    ///
    /// Sets:
    /// - `routing`: same payload as the preceding before-change notification
    BeforeMountRoutingEvent,

    // === Routing notifications (after the pass) ===
    /// The pass finished without changing any application.
    ///
    /// Sets:
    /// - `routing`: actual statuses (all buckets empty)
    NoAppChange,

    /// The pass finished and changed at least one application.
    ///
    /// Sets:
    /// - `routing`: the actual status of each application that changed
    AppChange,

    /// Published at the end of every steady-state pass.
    ///
    /// Sets:
    /// - `routing`: same payload as the preceding after-change notification
    RoutingEvent,

    // === First mount ===
    /// The first application of this orchestrator is about to mount.
    ///
    /// Sets:
    /// - `name`: application name
    BeforeFirstMount,

    /// The first application of this orchestrator finished mounting.
    ///
    /// Sets:
    /// - `name`: application name
    FirstMount,

    // === Unit events ===
    /// A unit's status changed.
    ///
    /// Sets:
    /// - `name`, `unit`: the unit
    /// - `from`: previous status
    /// - `status`: new status
    StatusChanged,

    /// A lifecycle (or activity predicate) failed and the unit was moved to an error status.
    ///
    /// Sets:
    /// - `name`, `unit`: the unit
    /// - `from`: status at failure
    /// - `status`: `LOAD_ERROR` or `SKIP_BECAUSE_BROKEN`
    /// - `reason`: error message
    AppFailed,

    /// A lifecycle call exceeded its time budget.
    ///
    /// Sets:
    /// - `name`, `unit`: the unit
    /// - `lifecycle`: which lifecycle was running
    /// - `timeout_ms`: the budget (ms)
    TimeoutHit,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

impl EventKind {
    /// Short kebab-case label, matching the notification names hosts listen for.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::BeforeNoAppChange => "before-no-app-change",
            EventKind::BeforeAppChange => "before-app-change",
            EventKind::BeforeRoutingEvent => "before-routing-event",
            EventKind::BeforeMountRoutingEvent => "before-mount-routing-event",
            EventKind::NoAppChange => "no-app-change",
            EventKind::AppChange => "app-change",
            EventKind::RoutingEvent => "routing-event",
            EventKind::BeforeFirstMount => "before-first-mount",
            EventKind::FirstMount => "first-mount",
            EventKind::StatusChanged => "status-changed",
            EventKind::AppFailed => "app-failed",
            EventKind::TimeoutHit => "timeout-hit",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::SubscriberPanicked => "subscriber-panicked",
        }
    }

    /// True for the seven notifications published around a routing pass.
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            EventKind::BeforeNoAppChange
                | EventKind::BeforeAppChange
                | EventKind::BeforeRoutingEvent
                | EventKind::BeforeMountRoutingEvent
                | EventKind::NoAppChange
                | EventKind::AppChange
                | EventKind::RoutingEvent
        )
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Unit (or subscriber) name.
    pub name: Option<Arc<str>>,
    /// Whether `name` is an application or a parcel.
    pub unit: Option<UnitKind>,
    /// Previous status.
    pub from: Option<AppStatus>,
    /// New status.
    pub status: Option<AppStatus>,
    pub lifecycle: Option<LifecycleName>,
    /// Lifecycle budget in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Payload of routing notifications.
    pub routing: Option<Arc<RoutingDetail>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            name: None,
            unit: None,
            from: None,
            status: None,
            lifecycle: None,
            timeout_ms: None,
            reason: None,
            routing: None,
        }
    }

    #[inline]
    pub fn with_unit(mut self, unit: UnitKind, name: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit);
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn with_transition(mut self, from: AppStatus, to: AppStatus) -> Self {
        self.from = Some(from);
        self.status = Some(to);
        self
    }

    #[inline]
    pub fn with_lifecycle(mut self, lifecycle: LifecycleName) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_routing(mut self, detail: Arc<RoutingDetail>) -> Self {
        self.routing = Some(detail);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_name(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_name(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::RoutingEvent);
        let b = Event::new(EventKind::RoutingEvent);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_routing_kinds() {
        assert!(EventKind::BeforeMountRoutingEvent.is_routing());
        assert!(EventKind::NoAppChange.is_routing());
        assert!(!EventKind::FirstMount.is_routing());
        assert!(!EventKind::StatusChanged.is_routing());
    }

    #[test]
    fn test_timeout_is_saturated_to_u32() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
