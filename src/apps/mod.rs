//! Registered applications: identity, activity, custom props and unit state.
//!
//! ## Contents
//! - [`AppStatus`], [`UnitKind`] the unit state machine
//! - [`ActiveWhen`] activity specifiers (path patterns, predicates, lists of both)
//! - [`CustomProps`], [`Props`] what every lifecycle call receives
//! - [`Registration`] and [`parse_manifest`] the two registration input forms
//! - `UnitCell`, `Unit`, `Application` (internal) per-unit state driven by the transitions

mod active_when;
mod app;
mod manifest;
mod props;
mod registration;
mod status;

pub use active_when::{ActiveWhen, ActivityFn};
pub use manifest::{LoaderResolver, parse_manifest};
pub use props::{CustomProps, Props, PropsFn};
pub use registration::Registration;
pub use status::{AppStatus, UnitKind};

pub(crate) use app::{Application, LoadJoin, LoadStart, Unit, UnitCell};
