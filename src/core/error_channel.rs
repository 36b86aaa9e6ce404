//! # Error observers.
//!
//! Every application failure is handed to the registered observers in registration order.
//! When none are registered the runtime falls back to
//! [`NavigationHost::report_unhandled`](crate::NavigationHost::report_unhandled), so a failure
//! is never silently dropped.

use std::sync::{Arc, RwLock};

use crate::error::{AppError, panic_message};
use crate::sync;

/// Observer of application failures.
pub type ErrorHandler = Arc<dyn Fn(&AppError) + Send + Sync + 'static>;

#[derive(Default)]
pub(crate) struct ErrorChannel {
    handlers: RwLock<Vec<ErrorHandler>>,
}

impl ErrorChannel {
    /// Returns `false` if this exact handler is already registered.
    pub fn add(&self, handler: ErrorHandler) -> bool {
        let mut handlers = sync::write(&self.handlers);
        if handlers.iter().any(|h| same(h, &handler)) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Returns `false` if the handler was not registered.
    pub fn remove(&self, handler: &ErrorHandler) -> bool {
        let mut handlers = sync::write(&self.handlers);
        let before = handlers.len();
        handlers.retain(|h| !same(h, handler));
        handlers.len() != before
    }

    /// Calls every handler; returns `false` when there was nobody to call.
    pub fn dispatch(&self, err: &AppError) -> bool {
        let snapshot: Vec<ErrorHandler> = sync::read(&self.handlers).clone();
        for handler in &snapshot {
            if let Err(panic) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(err)))
            {
                tracing::error!(
                    name = %err.name,
                    panic = %panic_message(&*panic),
                    "error handler panicked"
                );
            }
        }
        !snapshot.is_empty()
    }
}

fn same(a: &ErrorHandler, b: &ErrorHandler) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
