//! # In-memory navigation host.
//!
//! [`MemoryHistory`] keeps the current [`Location`] in memory. Navigation listeners
//! registered with [`MemoryHistory::listen`] are never called when the location changes;
//! they are captured and only invoked when the orchestrator replays them after a routing
//! pass has deactivated the applications that should no longer be active.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::sync;

use super::NavigationHost;
use super::location::{Location, NavigationEvent};

type Listener = Arc<dyn Fn(&NavigationEvent) + Send + Sync + 'static>;

/// Handle returned by [`MemoryHistory::listen`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// In-memory [`NavigationHost`].
pub struct MemoryHistory {
    current: RwLock<Location>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl MemoryHistory {
    pub fn new(initial: Location) -> Self {
        Self {
            current: RwLock::new(initial),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Starts at `path` (relative to `http://localhost/`).
    pub fn at(path: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Location::parse(path)?))
    }

    /// Registers a navigation listener. It only runs when captured events are replayed.
    pub fn listen<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&NavigationEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        sync::write(&self.listeners).push((id, Arc::new(f)));
        id
    }

    /// Returns `false` when the listener was not registered.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = sync::write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }
}

impl NavigationHost for MemoryHistory {
    fn location(&self) -> Location {
        sync::read(&self.current).clone()
    }

    fn navigate(&self, event: &NavigationEvent) {
        *sync::write(&self.current) = Location::clone(&event.location);
    }

    fn replay_captured(&self, event: &NavigationEvent) {
        // Listeners may register or remove listeners themselves.
        let snapshot: Vec<Listener> = sync::read(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::host::NavigationKind;

    #[test]
    fn test_navigate_updates_location_without_calling_listeners() {
        let history = MemoryHistory::at("/a").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        history.listen(move |ev| sink.lock().unwrap().push(ev.location.path().to_string()));

        let ev = NavigationEvent::new(NavigationKind::PushState, Location::parse("/b").unwrap());
        history.navigate(&ev);

        assert_eq!(history.location().path(), "/b");
        assert!(seen.lock().unwrap().is_empty());

        history.replay_captured(&ev);
        assert_eq!(*seen.lock().unwrap(), ["/b"]);
    }

    #[test]
    fn test_unlisten_is_idempotent() {
        let history = MemoryHistory::at("/").unwrap();
        let id = history.listen(|_| {});
        assert!(history.unlisten(id));
        assert!(!history.unlisten(id));
    }
}
