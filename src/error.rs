//! Error types used by the appvisor runtime and lifecycles.
//!
//! - [`RegistrationError`]: synchronous validation failures returned to the direct caller.
//! - [`LifecycleError`]: why one lifecycle call (or activity predicate) failed.
//! - [`AppError`]: a [`LifecycleError`] attributed to an application or parcel, as handed
//!   to error observers.
//! - [`ParcelError`]: failures returned by parcel handles.
//! - [`RuntimeError`]: what routing and unload result handles resolve to on failure.
//!
//! All of them are `Clone`: a single outcome is fanned out to every caller that joined it.
//! Each type provides `as_label` for logs/metrics, like the rest of the runtime.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::apps::{AppStatus, UnitKind};
use crate::lifecycles::LifecycleName;

/// Boxed error type accepted from user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Validation errors raised at registration time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Application name is empty.
    #[error("application name must be a non-empty string")]
    EmptyName,

    /// Another application already uses this name.
    #[error("there is already an app registered with name {name}")]
    DuplicateName { name: String },

    /// Neither a loader nor a resolved lifecycle object was supplied.
    #[error("application '{name}' needs an application or a loading function")]
    MissingApp { name: String },

    /// Activity specifier is missing or malformed.
    #[error("invalid activeWhen for '{name}': {reason}")]
    InvalidActiveWhen { name: String, reason: String },

    /// Custom props are present but not an object.
    #[error("customProps for '{name}' must be an object")]
    InvalidCustomProps { name: String },

    /// Configuration object is not a JSON object.
    #[error("configuration object can't be an array, null or a scalar")]
    InvalidConfig,

    /// Configuration object carries keys other than the accepted ones.
    #[error("the configuration object accepts only: name, app, activeWhen, customProps. Invalid keys: {}", invalid.join(", "))]
    InvalidConfigKeys { invalid: Vec<String> },

    /// A manifest `app` specifier could not be resolved to a loader.
    #[error("no loader found for app specifier '{specifier}'")]
    UnknownLoader { specifier: String },

    /// No application with this name is registered.
    #[error("no application named '{name}' has been registered")]
    NotRegistered { name: String },
}

impl RegistrationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistrationError::EmptyName => "registration_empty_name",
            RegistrationError::DuplicateName { .. } => "registration_duplicate_name",
            RegistrationError::MissingApp { .. } => "registration_missing_app",
            RegistrationError::InvalidActiveWhen { .. } => "registration_invalid_active_when",
            RegistrationError::InvalidCustomProps { .. } => "registration_invalid_custom_props",
            RegistrationError::InvalidConfig => "registration_invalid_config",
            RegistrationError::InvalidConfigKeys { .. } => "registration_invalid_config_keys",
            RegistrationError::UnknownLoader { .. } => "registration_unknown_loader",
            RegistrationError::NotRegistered { .. } => "registration_not_registered",
        }
    }
}

/// # Why a lifecycle call failed.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum LifecycleError {
    /// The callback itself reported a failure.
    #[error("{message}")]
    Failed {
        message: Arc<str>,
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// A step returned a plain value instead of a future.
    #[error(
        "within {kind} {name}, the lifecycle function {lifecycle} at array index {index} did not return a future"
    )]
    ContractViolation {
        kind: UnitKind,
        name: Arc<str>,
        lifecycle: LifecycleName,
        index: usize,
    },

    /// The lifecycle exceeded its hard time budget and the policy is fatal.
    #[error("lifecycle function {lifecycle} did not settle within {after:?}")]
    Timeout {
        lifecycle: LifecycleName,
        after: Duration,
    },

    /// The loaded lifecycle object lacks a required lifecycle.
    #[error("{kind} '{name}' does not export a valid {missing} function or array of functions")]
    InvalidLifecycles {
        kind: UnitKind,
        name: Arc<str>,
        missing: LifecycleName,
    },

    /// The activity predicate failed or panicked.
    #[error("activity predicate failed: {0}")]
    Activity(Arc<str>),

    /// A child parcel failed to unmount while its owner was unmounting.
    #[error("{0}")]
    ChildParcel(Arc<str>),

    /// A lifecycle callback panicked.
    #[error("lifecycle panicked: {0}")]
    Panicked(Arc<str>),
}

impl LifecycleError {
    /// Creates a plain failure from a message.
    pub fn msg(message: impl Into<Arc<str>>) -> Self {
        LifecycleError::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an arbitrary error as the failure cause.
    pub fn from_error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LifecycleError::Failed {
            message: err.to_string().into(),
            source: Some(Arc::new(err)),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::Failed { .. } => "lifecycle_failed",
            LifecycleError::ContractViolation { .. } => "lifecycle_contract_violation",
            LifecycleError::Timeout { .. } => "lifecycle_timeout",
            LifecycleError::InvalidLifecycles { .. } => "lifecycle_invalid_export",
            LifecycleError::Activity(_) => "activity_failed",
            LifecycleError::ChildParcel(_) => "child_parcel_failed",
            LifecycleError::Panicked(_) => "lifecycle_panicked",
        }
    }
}

impl From<&str> for LifecycleError {
    fn from(message: &str) -> Self {
        LifecycleError::msg(message)
    }
}

impl From<String> for LifecycleError {
    fn from(message: String) -> Self {
        LifecycleError::msg(message)
    }
}

impl From<BoxError> for LifecycleError {
    fn from(err: BoxError) -> Self {
        LifecycleError::Failed {
            message: err.to_string().into(),
            source: Some(Arc::from(err)),
        }
    }
}

/// # A lifecycle failure attributed to one unit.
///
/// This is what error observers receive. `status` is the status the unit was in when it
/// failed and `new_status` the one it was moved to (`LOAD_ERROR` or `SKIP_BECAUSE_BROKEN`).
#[derive(Error, Debug, Clone)]
#[error("{kind} '{name}' died in status {status}: {source}")]
pub struct AppError {
    pub kind: UnitKind,
    pub name: Arc<str>,
    pub status: AppStatus,
    pub new_status: AppStatus,
    #[source]
    pub source: LifecycleError,
}

impl AppError {
    pub fn as_label(&self) -> &'static str {
        self.source.as_label()
    }
}

/// # Errors returned by parcel handles.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ParcelError {
    /// Custom props handed to `mount_parcel` are not an object.
    #[error("parcel custom props must be an object")]
    InvalidCustomProps,

    /// The requested operation is not legal in the parcel's current status.
    #[error("cannot {operation} parcel '{name}': it is in a {status} status")]
    WrongStatus {
        name: Arc<str>,
        operation: &'static str,
        status: AppStatus,
    },

    /// The parcel's lifecycle object has no `update` lifecycle.
    #[error("parcel '{name}' does not implement an update lifecycle")]
    UpdateUnsupported { name: Arc<str> },

    /// The props used to mount a parcel are not bound to a runtime.
    #[error("'{name}' cannot mount parcels outside of a runtime")]
    OwnerGone { name: Arc<str> },

    /// `unmount_self` was called from props that do not belong to a parcel.
    #[error("'{name}' is not a parcel")]
    NotAParcel { name: Arc<str> },

    /// A parcel lifecycle failed; the parcel is quarantined.
    #[error(transparent)]
    Lifecycle(#[from] AppError),
}

impl ParcelError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ParcelError::InvalidCustomProps => "parcel_invalid_custom_props",
            ParcelError::WrongStatus { .. } => "parcel_wrong_status",
            ParcelError::UpdateUnsupported { .. } => "parcel_update_unsupported",
            ParcelError::OwnerGone { .. } => "parcel_owner_gone",
            ParcelError::NotAParcel { .. } => "parcel_not_a_parcel",
            ParcelError::Lifecycle(e) => e.as_label(),
        }
    }
}

/// # Errors resolved by routing and unload result handles.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// An application failure that propagated out of the deactivation join.
    #[error(transparent)]
    App(#[from] AppError),

    /// A lifecycle panicked inside a routing pass.
    #[error("routing pass aborted: {0}")]
    Panicked(Arc<str>),

    /// The operation was dropped before settling its result.
    #[error("result channel closed before the operation settled")]
    Abandoned,

    /// Validation failure (e.g. unknown application name).
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::App(e) => e.as_label(),
            RuntimeError::Panicked(_) => "runtime_panicked",
            RuntimeError::Abandoned => "runtime_abandoned",
            RuntimeError::Registration(e) => e.as_label(),
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
