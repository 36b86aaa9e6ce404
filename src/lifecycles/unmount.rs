//! # Unmount: `MOUNTED → UNMOUNTING → NOT_MOUNTED`.
//!
//! ```text
//! MOUNTED ──► UNMOUNTING ──► unmount every child parcel (concurrently)
//!                       ──► own unmount() (runs even if a child failed)
//!                             ├─ Ok, children Ok     ──► NOT_MOUNTED
//!                             ├─ Ok, a child failed  ──► SKIP_BECAUSE_BROKEN (ChildParcel)
//!                             └─ Err                 ──► SKIP_BECAUSE_BROKEN
//! ```
//!
//! Parcels unmount parcels, which is why this transition returns a boxed future.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};

use crate::apps::{AppStatus, Unit};
use crate::core::Runtime;
use crate::error::{AppError, LifecycleError};
use crate::parcels;

use super::{LifecycleName, run_lifecycle};

pub(crate) fn to_unmount<U: Unit>(
    rt: &Arc<Runtime>,
    unit: &Arc<U>,
    hard_fail: bool,
) -> BoxFuture<'static, Result<(), AppError>> {
    let rt = Arc::clone(rt);
    let unit = Arc::clone(unit);

    async move {
        let cell = unit.cell();
        if !cell.transition(AppStatus::Mounted, AppStatus::Unmounting) {
            return Ok(());
        }

        let children = cell.children().snapshot();
        let child_failure = join_all(children.iter().map(|child| parcels::unmount_child(&rt, child)))
            .await
            .into_iter()
            .find_map(Result::err);

        let own = run_lifecycle(&rt, &unit, LifecycleName::Unmount).await;
        match (own, child_failure) {
            (Err(e), _) => Err(rt.quarantine(cell, e, hard_fail)),
            (Ok(()), Some(child)) => {
                let cause = LifecycleError::ChildParcel(child.to_string().into());
                Err(rt.quarantine(cell, cause, hard_fail))
            }
            (Ok(()), None) => {
                cell.transition(AppStatus::Unmounting, AppStatus::NotMounted);
                Ok(())
            }
        }
    }
    .boxed()
}
