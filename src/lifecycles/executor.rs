//! # Sequential composition of lifecycle steps.
//!
//! [`compose`] turns a [`Lifecycle`] into one future that runs its steps strictly one
//! after another, each starting only once the previous one resolved successfully.
//!
//! ## Rules
//! - An empty lifecycle resolves immediately.
//! - A step returning [`StepReturn::Ready`] fails the lifecycle with
//!   [`LifecycleError::ContractViolation`] naming the unit, the lifecycle and the step index.
//! - The first failing step fails the lifecycle; later steps never run.
//!
//! ```text
//! compose([f0, f1, f2])
//!   f0(props) ─► await ─► f1(props) ─► await ─► f2(props) ─► await ─► Ok(())
//!                  │                      │
//!                  └─ Err(e) ─► Err(e)    └─ Ready ─► Err(ContractViolation{index: 1})
//! ```

use std::sync::Arc;

use futures::FutureExt;

use crate::apps::{Props, UnitKind};
use crate::error::LifecycleError;

use super::lifecycle::{Lifecycle, LifecycleName, StepFuture, StepReturn};

/// Builds the composed future for one lifecycle call.
pub(crate) fn compose(
    kind: UnitKind,
    name: Arc<str>,
    lifecycle: LifecycleName,
    steps: Lifecycle,
    props: Props,
) -> StepFuture {
    async move {
        for (index, step) in steps.steps().iter().enumerate() {
            match step.call(props.clone()) {
                StepReturn::Pending(fut) => fut.await?,
                StepReturn::Ready => {
                    return Err(LifecycleError::ContractViolation {
                        kind,
                        name,
                        lifecycle,
                        index,
                    });
                }
            }
        }
        Ok(())
    }
    .boxed()
}
