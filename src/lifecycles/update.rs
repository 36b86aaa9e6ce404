//! # Update: `MOUNTED → UPDATING → MOUNTED` (parcels).

use std::sync::Arc;

use crate::apps::{AppStatus, Unit};
use crate::core::Runtime;
use crate::error::ParcelError;

use super::{LifecycleName, run_lifecycle};

pub(crate) async fn to_update<U: Unit>(rt: &Arc<Runtime>, unit: &Arc<U>) -> Result<(), ParcelError> {
    let cell = unit.cell();
    let supported = cell
        .lifecycles()
        .is_some_and(|l| l.get(LifecycleName::Update).is_some());
    if !supported {
        return Err(ParcelError::UpdateUnsupported {
            name: Arc::clone(cell.name()),
        });
    }
    if !cell.transition(AppStatus::Mounted, AppStatus::Updating) {
        return Err(ParcelError::WrongStatus {
            name: Arc::clone(cell.name()),
            operation: "update",
            status: cell.status(),
        });
    }

    match run_lifecycle(rt, unit, LifecycleName::Update).await {
        Ok(()) => {
            cell.transition(AppStatus::Updating, AppStatus::Mounted);
            Ok(())
        }
        Err(e) => Err(rt.quarantine(cell, e, true).into()),
    }
}
