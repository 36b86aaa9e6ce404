//! # Mount: `NOT_MOUNTED → MOUNTING → MOUNTED`.
//!
//! ```text
//! NOT_MOUNTED ──► MOUNTING ──► mount()
//!                    ├─ Ok  ──► MOUNTED
//!                    └─ Err ──► MOUNTED ──► unmount (hard fail, best effort) ──► SKIP_BECAUSE_BROKEN
//! ```
//!
//! The first application mounted by an orchestrator is announced with `BeforeFirstMount`
//! and `FirstMount`.

use std::sync::Arc;

use crate::apps::{AppStatus, Unit, UnitKind};
use crate::core::Runtime;
use crate::error::AppError;
use crate::events::{Event, EventKind};

use super::{LifecycleName, run_lifecycle, to_unmount};

pub(crate) async fn to_mount<U: Unit>(
    rt: &Arc<Runtime>,
    unit: &Arc<U>,
    hard_fail: bool,
) -> Result<(), AppError> {
    let cell = unit.cell();
    if !cell.transition(AppStatus::NotMounted, AppStatus::Mounting) {
        return Ok(());
    }

    let is_app = cell.kind() == UnitKind::Application;
    if is_app && rt.claim_before_first_mount() {
        rt.bus
            .publish(Event::new(EventKind::BeforeFirstMount).with_name(Arc::clone(cell.name())));
    }

    match run_lifecycle(rt, unit, LifecycleName::Mount).await {
        Ok(()) => {
            cell.transition(AppStatus::Mounting, AppStatus::Mounted);
            if is_app && rt.claim_first_mount() {
                rt.bus
                    .publish(Event::new(EventKind::FirstMount).with_name(Arc::clone(cell.name())));
            }
            Ok(())
        }
        Err(e) => {
            // Give the unit a chance to clean up whatever it rendered before failing.
            cell.transition(AppStatus::Mounting, AppStatus::Mounted);
            if let Err(cleanup) = to_unmount(rt, unit, true).await {
                tracing::debug!(name = %cell.name(), error = %cleanup, "unmount after failed mount also failed");
            }

            let err = cell.error(AppStatus::Mounting, AppStatus::SkipBecauseBroken, e);
            cell.set_status(AppStatus::SkipBecauseBroken);
            rt.report(&err, hard_fail);
            Err(err)
        }
    }
}
