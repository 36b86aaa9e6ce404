use std::sync::Arc;

use crate::{
    config::Config,
    events::Bus,
    host::NavigationHost,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{orchestrator::Orchestrator, runtime::Runtime};

/// Builder for constructing an [`Orchestrator`] with optional features.
pub struct OrchestratorBuilder {
    cfg: Config,
    host: Arc<dyn NavigationHost>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration and navigation host.
    pub fn new(cfg: Config, host: Arc<dyn NavigationHost>) -> Self {
        Self {
            cfg,
            host,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (routing notifications, status changes,
    /// failures) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the Orchestrator instance.
    ///
    /// With subscribers configured, this spawns their workers and the bus listener and must
    /// be called inside a tokio runtime.
    pub fn build(self) -> Arc<Orchestrator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let rt = Arc::new(Runtime::new(self.cfg, bus.clone(), self.host));

        if self.subscribers.is_empty() {
            return Arc::new(Orchestrator::new_internal(rt, None, None));
        }

        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let mut rx = bus.subscribe();
        let set = Arc::clone(&subs);
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Arc::new(Orchestrator::new_internal(rt, Some(subs), Some(listener)))
    }
}
