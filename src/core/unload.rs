//! # Pending unload requests.
//!
//! At most one unload request lives per application name. Concurrent requesters share the
//! same [`UnloadHandle`]; whoever finishes the unload (a routing pass or the immediate path
//! below) settles it and removes the entry.
//!
//! ```text
//! request(app, wait_for_unmount)
//!   ├─ entry exists ──► same handle (an immediate request still arms the immediate path once)
//!   └─ new entry
//!        ├─ wait_for_unmount && MOUNTED ──► wait for a routing pass to unmount + unload it
//!        └─ otherwise ──► spawn: unmount ──► unload ──► reroute
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;

use crate::apps::{AppStatus, Application};
use crate::error::RuntimeError;
use crate::lifecycles::{to_unload, to_unmount};
use crate::sync::lock;

use super::runtime::Runtime;
use super::scheduler;

type Outcome = Result<(), RuntimeError>;

/// Options of [`Orchestrator::unload_application`](crate::Orchestrator::unload_application).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnloadOptions {
    /// Wait for a routing pass to unmount a mounted application instead of forcing it.
    pub wait_for_unmount: bool,
}

impl UnloadOptions {
    pub fn wait_for_unmount() -> Self {
        Self {
            wait_for_unmount: true,
        }
    }
}

/// Resolves once the requested unload settled.
///
/// Every requester of the same application gets a clone of the same handle.
#[derive(Clone)]
pub struct UnloadHandle {
    inner: Shared<BoxFuture<'static, Outcome>>,
}

impl UnloadHandle {
    fn new(rx: oneshot::Receiver<Outcome>) -> Self {
        Self {
            inner: rx
                .map(|res| res.unwrap_or(Err(RuntimeError::Abandoned)))
                .boxed()
                .shared(),
        }
    }

    /// `true` if both handles wait on the same request.
    pub fn ptr_eq(&self, other: &UnloadHandle) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl Future for UnloadHandle {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl std::fmt::Debug for UnloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnloadHandle").finish_non_exhaustive()
    }
}

struct Entry {
    handle: UnloadHandle,
    tx: oneshot::Sender<Outcome>,
    immediate: bool,
}

#[derive(Default)]
pub(crate) struct UnloadTracker {
    entries: Mutex<HashMap<Arc<str>, Entry>>,
}

impl UnloadTracker {
    pub fn request(
        &self,
        rt: &Arc<Runtime>,
        app: &Arc<Application>,
        wait_for_unmount: bool,
    ) -> UnloadHandle {
        let immediate = !wait_for_unmount || app.status() != AppStatus::Mounted;

        let (handle, spawn_now) = {
            let mut entries = lock(&self.entries);
            match entries.get_mut(app.name()) {
                Some(entry) => {
                    let spawn_now = immediate && !entry.immediate;
                    entry.immediate |= immediate;
                    (entry.handle.clone(), spawn_now)
                }
                None => {
                    let (tx, rx) = oneshot::channel();
                    let handle = UnloadHandle::new(rx);
                    entries.insert(
                        Arc::clone(app.name()),
                        Entry {
                            handle: handle.clone(),
                            tx,
                            immediate,
                        },
                    );
                    (handle, immediate)
                }
            }
        };

        if spawn_now {
            tokio::spawn(unload_now(Arc::clone(rt), Arc::clone(app)));
        }
        handle
    }

    pub fn is_pending(&self, name: &str) -> bool {
        lock(&self.entries).contains_key(name)
    }

    pub fn handle(&self, name: &str) -> Option<UnloadHandle> {
        lock(&self.entries).get(name).map(|e| e.handle.clone())
    }

    /// Resolves every requester of `name` and forgets the request.
    pub fn settle(&self, name: &str, outcome: Outcome) {
        let entry = lock(&self.entries).remove(name);
        if let Some(entry) = entry {
            let _ = entry.tx.send(outcome);
        }
    }

    /// Lets a later request arm the immediate path again.
    fn disarm(&self, name: &str) {
        if let Some(entry) = lock(&self.entries).get_mut(name) {
            entry.immediate = false;
        }
    }
}

async fn unload_now(rt: Arc<Runtime>, app: Arc<Application>) {
    let name = Arc::clone(app.name());
    tracing::debug!(name = %name, "unloading immediately");

    if let Err(e) = to_unmount(&rt, &app, false).await {
        rt.unloads.settle(&name, Err(e.into()));
        return;
    }
    if let Err(e) = to_unload(&rt, &app).await {
        tracing::debug!(name = %name, error = %e, "joined unload failed");
    }

    if rt.unloads.is_pending(&name) {
        // Busy in another transition; a routing pass or a later request finishes it.
        rt.unloads.disarm(&name);
    }
    let _ = scheduler::reroute(&rt, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_request_resolves_as_abandoned() {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let handle = UnloadHandle::new(rx);
        drop(tx);
        assert!(matches!(handle.await, Err(RuntimeError::Abandoned)));
    }

    #[tokio::test]
    async fn test_clones_share_one_outcome() {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let a = UnloadHandle::new(rx);
        let b = a.clone();
        assert!(a.ptr_eq(&b));

        tx.send(Ok(())).unwrap();
        assert!(a.await.is_ok());
        assert!(b.await.is_ok());
    }
}
