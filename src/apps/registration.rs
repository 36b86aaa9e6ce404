//! # Application registration input.
//!
//! [`Registration`] is the object form of a registration: a name, a source for the
//! lifecycles, an activity specifier and optional custom props. It is validated
//! synchronously when handed to the orchestrator; any problem is returned to the caller
//! as a [`RegistrationError`].
//!
//! ## Example
//! ```rust
//! use appvisor::{ActiveWhen, AppLifecycles, LifecycleFn, Registration};
//! use serde_json::json;
//!
//! let noop = || LifecycleFn::new(|_props| async { Ok(()) });
//! let reg = Registration::new("navbar")
//!     .app(AppLifecycles::new(noop(), noop(), noop()))
//!     .active_when(vec!["/", "/settings"])
//!     .custom_props(json!({ "theme": "dark" }));
//! # let _ = reg;
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::RegistrationError;
use crate::lifecycles::AppSource;

use super::active_when::{Activity, ActiveWhen};
use super::props::CustomProps;

/// Registration of one application.
#[derive(Clone, Default)]
pub struct Registration {
    name: String,
    app: Option<AppSource>,
    active_when: Option<ActiveWhen>,
    custom_props: Option<CustomProps>,
}

impl Registration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Loader or already-resolved lifecycle object.
    #[must_use]
    pub fn app(mut self, source: impl Into<AppSource>) -> Self {
        self.app = Some(source.into());
        self
    }

    #[must_use]
    pub fn active_when(mut self, active_when: impl Into<ActiveWhen>) -> Self {
        self.active_when = Some(active_when.into());
        self
    }

    #[must_use]
    pub fn custom_props(mut self, props: impl Into<CustomProps>) -> Self {
        self.custom_props = Some(props.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks every field except name uniqueness (a registry concern).
    pub(crate) fn validate(self) -> Result<ValidRegistration, RegistrationError> {
        if self.name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        let source = self.app.ok_or_else(|| RegistrationError::MissingApp {
            name: self.name.clone(),
        })?;
        let activity = self
            .active_when
            .ok_or_else(|| RegistrationError::InvalidActiveWhen {
                name: self.name.clone(),
                reason: "an activity specifier is required".into(),
            })?
            .compile(&self.name)?;
        let custom_props = self.custom_props.unwrap_or_default();
        if !custom_props.is_valid() {
            return Err(RegistrationError::InvalidCustomProps { name: self.name });
        }

        Ok(ValidRegistration {
            name: self.name.into(),
            source,
            activity,
            custom_props,
        })
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("app", &self.app)
            .field("active_when", &self.active_when)
            .field("custom_props", &self.custom_props)
            .finish()
    }
}

/// A registration that passed validation.
pub(crate) struct ValidRegistration {
    pub name: Arc<str>,
    pub source: AppSource,
    pub activity: Activity,
    pub custom_props: CustomProps,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::lifecycles::{AppLifecycles, LifecycleFn};

    fn app() -> AppLifecycles {
        let noop = || LifecycleFn::new(|_| async { Ok(()) });
        AppLifecycles::new(noop(), noop(), noop())
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = Registration::new("").app(app()).active_when("/").validate();
        assert_eq!(err.err(), Some(RegistrationError::EmptyName));
    }

    #[test]
    fn test_missing_app_is_rejected() {
        let err = Registration::new("a").active_when("/").validate();
        assert!(matches!(err, Err(RegistrationError::MissingApp { .. })));
    }

    #[test]
    fn test_missing_activity_is_rejected() {
        let err = Registration::new("a").app(app()).validate();
        assert!(matches!(err, Err(RegistrationError::InvalidActiveWhen { .. })));
    }

    #[test]
    fn test_non_object_custom_props_are_rejected() {
        let err = Registration::new("a")
            .app(app())
            .active_when("/")
            .custom_props(json!(["not", "an", "object"]))
            .validate();
        assert!(matches!(err, Err(RegistrationError::InvalidCustomProps { .. })));
    }

    #[test]
    fn test_valid_registration() {
        let reg = Registration::new("a")
            .app(app())
            .active_when(vec!["/a", "/b"])
            .custom_props(json!({"k": 1}))
            .validate()
            .unwrap();
        assert_eq!(&*reg.name, "a");
    }
}
