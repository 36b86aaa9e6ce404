//! # Unload: `NOT_MOUNTED → UNLOADING → NOT_LOADED` (applications).
//!
//! Only applications with a pending unload request are unloaded. The request is settled
//! by whichever path finishes it:
//!
//! ```text
//! no request          ──► nothing to do
//! NOT_LOADED          ──► settle Ok
//! UNLOADING           ──► join the running unload (its failure propagates)
//! LOAD_ERROR / NOT_BOOTSTRAPPED ──► detach ──► NOT_LOADED, settle Ok   (nothing to tear down)
//! NOT_MOUNTED         ──► UNLOADING ──► unload()
//!                           ├─ Ok  ──► detach ──► NOT_LOADED, settle Ok
//!                           └─ Err ──► detach ──► SKIP_BECAUSE_BROKEN, settle Err
//! anything else       ──► not yet; the request stays pending
//! ```

use std::sync::Arc;

use crate::apps::{AppStatus, Application, Unit};
use crate::core::Runtime;
use crate::error::RuntimeError;

use super::{LifecycleName, run_lifecycle};

pub(crate) async fn to_unload(rt: &Arc<Runtime>, app: &Arc<Application>) -> Result<(), RuntimeError> {
    let name = app.name();
    let Some(pending) = rt.unloads.handle(name) else {
        return Ok(());
    };
    let cell = app.cell();

    match cell.status() {
        AppStatus::NotLoaded => {
            rt.unloads.settle(name, Ok(()));
            return Ok(());
        }
        AppStatus::Unloading => return pending.await,
        AppStatus::LoadError | AppStatus::NotBootstrapped => {
            for from in [AppStatus::LoadError, AppStatus::NotBootstrapped] {
                if cell.transition(from, AppStatus::Unloading) {
                    cell.detach(AppStatus::NotLoaded);
                    rt.unloads.settle(name, Ok(()));
                    return Ok(());
                }
            }
            return Ok(());
        }
        _ => {}
    }

    if !cell.transition(AppStatus::NotMounted, AppStatus::Unloading) {
        return Ok(());
    }

    match run_lifecycle(rt, app, LifecycleName::Unload).await {
        Ok(()) => {
            cell.detach(AppStatus::NotLoaded);
            rt.unloads.settle(name, Ok(()));
        }
        Err(e) => {
            cell.detach(AppStatus::SkipBecauseBroken);
            let err = cell.error(AppStatus::Unloading, AppStatus::SkipBecauseBroken, e);
            rt.report(&err, false);
            rt.unloads.settle(name, Err(err.into()));
        }
    }
    Ok(())
}
