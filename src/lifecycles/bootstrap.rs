//! # Bootstrap: `NOT_BOOTSTRAPPED → BOOTSTRAPPING → NOT_MOUNTED`.
//!
//! A failing bootstrap quarantines the unit (`SKIP_BECAUSE_BROKEN`).

use std::sync::Arc;

use crate::apps::{AppStatus, Unit};
use crate::core::Runtime;
use crate::error::AppError;

use super::{LifecycleName, run_lifecycle};

pub(crate) async fn to_bootstrap<U: Unit>(
    rt: &Arc<Runtime>,
    unit: &Arc<U>,
    hard_fail: bool,
) -> Result<(), AppError> {
    let cell = unit.cell();
    if !cell.transition(AppStatus::NotBootstrapped, AppStatus::Bootstrapping) {
        return Ok(());
    }

    match run_lifecycle(rt, unit, LifecycleName::Bootstrap).await {
        Ok(()) => {
            cell.transition(AppStatus::Bootstrapping, AppStatus::NotMounted);
            Ok(())
        }
        Err(e) => Err(rt.quarantine(cell, e, hard_fail)),
    }
}
