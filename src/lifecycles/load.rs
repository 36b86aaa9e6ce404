//! # Load: `NOT_LOADED | LOAD_ERROR → LOADING_SOURCE_CODE → NOT_BOOTSTRAPPED`.
//!
//! ```text
//! begin_load ──► running load?  ── yes ──► join it
//!            └─► NOT_LOADED / LOAD_ERROR ──► LOADING_SOURCE_CODE ──► source.load(props)
//!                   ├─ Ok(valid object)     ──► attach lifecycles ──► NOT_BOOTSTRAPPED
//!                   ├─ Ok(missing lifecycle)──► SKIP_BECAUSE_BROKEN
//!                   └─ Err / panic
//!                        ├─ application ──► LOAD_ERROR (retried after the back-off)
//!                        └─ parcel      ──► SKIP_BECAUSE_BROKEN
//! ```
//!
//! Application load failures go to the error channel; parcel failures are only returned.

use std::sync::Arc;

use futures::FutureExt;
use tokio::time::Instant;

use crate::apps::{AppStatus, LoadJoin, LoadStart, Unit, UnitKind};
use crate::core::Runtime;
use crate::error::{AppError, LifecycleError, panic_message};

use super::lifecycle::AppLifecycles;

pub(crate) async fn to_load<U: Unit>(rt: &Arc<Runtime>, unit: &Arc<U>) -> Result<(), AppError> {
    match unit.cell().begin_load(|| load_future(rt, unit)) {
        LoadStart::Join(join) | LoadStart::Run(join) => join.await,
        LoadStart::Skip => Ok(()),
    }
}

fn load_future<U: Unit>(rt: &Arc<Runtime>, unit: &Arc<U>) -> LoadJoin {
    let rt = Arc::clone(rt);
    let unit = Arc::clone(unit);

    async move {
        let cell = unit.cell();
        let hard_fail = cell.kind() == UnitKind::Parcel;
        tracing::debug!(unit = %cell.kind(), name = %cell.name(), "loading");

        let loaded = match fetch(&rt, &unit).await {
            Ok(lifecycles) => lifecycles.validate(cell.kind(), cell.name(), &rt.timeouts()),
            Err(e) => {
                let (to, failed_at) = if hard_fail {
                    (AppStatus::SkipBecauseBroken, None)
                } else {
                    (AppStatus::LoadError, Some(Instant::now()))
                };
                let from = cell.fail_load(to, failed_at);
                let err = cell.error(from, to, e);
                rt.report(&err, hard_fail);
                return Err(err);
            }
        };

        match loaded {
            Ok(loaded) => {
                cell.attach(loaded);
                Ok(())
            }
            Err(e) => {
                let from = cell.fail_load(AppStatus::SkipBecauseBroken, None);
                let err = cell.error(from, AppStatus::SkipBecauseBroken, e);
                rt.report(&err, hard_fail);
                Err(err)
            }
        }
    }
    .boxed()
    .shared()
}

async fn fetch<U: Unit>(
    rt: &Arc<Runtime>,
    unit: &Arc<U>,
) -> Result<AppLifecycles, LifecycleError> {
    let started = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        unit.source().load(unit.props(rt))
    }));
    let fut = started.map_err(|panic| LifecycleError::Panicked(panic_message(&*panic).into()))?;

    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(LifecycleError::Panicked(panic_message(&*panic).into())),
    }
}
