//! Lifecycle functions and the transitions that drive units through them.
//!
//! ## Contents
//! - [`LifecycleFn`], [`Lifecycle`], [`AppLifecycles`], [`AppSource`] the user-facing model
//! - `executor` sequential composition with contract checking
//! - `timeout` time-bounded waiting under a [`TimeoutPolicy`](crate::TimeoutPolicy)
//! - `load`, `bootstrap`, `mount`, `unmount`, `unload`, `update` one transition each
//!
//! Every transition starts with a compare-and-set on the unit's status: a unit that is not
//! in the required pre-state is left untouched (a concurrent load is joined instead).

mod bootstrap;
mod executor;
mod lifecycle;
mod load;
mod mount;
mod timeout;
mod unload;
mod unmount;
mod update;

pub use lifecycle::{
    AppLifecycles, AppSource, Lifecycle, LifecycleFn, LifecycleName, LoadFuture, StepFuture,
    StepReturn,
};

pub(crate) use bootstrap::to_bootstrap;
pub(crate) use lifecycle::LoadedLifecycles;
pub(crate) use load::to_load;
pub(crate) use mount::to_mount;
pub(crate) use unload::to_unload;
pub(crate) use unmount::to_unmount;
pub(crate) use update::to_update;

use std::sync::Arc;

use crate::apps::Unit;
use crate::core::Runtime;
use crate::error::{LifecycleError, panic_message};

/// Runs one lifecycle of a loaded unit under its time budget.
///
/// A unit without attached lifecycles (or without the optional `update`) runs nothing.
pub(crate) async fn run_lifecycle<U: Unit>(
    rt: &Arc<Runtime>,
    unit: &Arc<U>,
    lifecycle: LifecycleName,
) -> Result<(), LifecycleError> {
    let cell = unit.cell();
    let Some(loaded) = cell.lifecycles() else {
        return Ok(());
    };
    let Some(steps) = loaded.get(lifecycle).cloned() else {
        return Ok(());
    };

    // Dynamic custom props are user code.
    let props = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unit.props(rt)))
        .map_err(|panic| LifecycleError::Panicked(panic_message(&*panic).into()))?;

    tracing::debug!(unit = %cell.kind(), name = %cell.name(), %lifecycle, "running lifecycle");
    let call = executor::compose(cell.kind(), Arc::clone(cell.name()), lifecycle, steps, props);
    timeout::reasonable_time(
        &rt.bus,
        cell.kind(),
        cell.name(),
        lifecycle,
        loaded.timeouts.get(lifecycle),
        call,
    )
    .await
}
