//! # Custom props and the props handed to lifecycles.
//!
//! Every lifecycle call receives a [`Props`] value: the unit's name, its custom props (always
//! a JSON object), a way to mount child parcels owned by the unit and, for parcels, a way to
//! unmount themselves.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::Runtime;
use crate::error::ParcelError;
use crate::host::Location;
use crate::lifecycles::AppSource;
use crate::parcels::{self, Parcel, ParcelSet, ParcelUnit};

/// Computes custom props from the unit name and the current location.
pub type PropsFn = Arc<dyn Fn(&str, &Location) -> Value + Send + Sync + 'static>;

/// Custom props of an application.
#[derive(Clone)]
pub enum CustomProps {
    /// A JSON value; must be an object (or `null`, meaning `{}`).
    Static(Value),
    /// Evaluated before every lifecycle call. A non-object result is replaced by `{}`.
    Dynamic(PropsFn),
}

impl CustomProps {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&str, &Location) -> Value + Send + Sync + 'static,
    {
        CustomProps::Dynamic(Arc::new(f))
    }

    /// `true` for objects, `null` and functions.
    pub(crate) fn is_valid(&self) -> bool {
        match self {
            CustomProps::Static(v) => v.is_object() || v.is_null(),
            CustomProps::Dynamic(_) => true,
        }
    }

    pub(crate) fn resolve(&self, name: &str, location: &Location) -> Map<String, Value> {
        let value = match self {
            CustomProps::Static(v) => v.clone(),
            CustomProps::Dynamic(f) => f(name, location),
        };
        match value {
            Value::Object(map) => map,
            Value::Null if matches!(self, CustomProps::Static(_)) => Map::new(),
            other => {
                tracing::warn!(
                    name,
                    received = %other,
                    "customProps function must return an object; using {{}}"
                );
                Map::new()
            }
        }
    }
}

impl Default for CustomProps {
    fn default() -> Self {
        CustomProps::Static(Value::Object(Map::new()))
    }
}

impl From<Value> for CustomProps {
    fn from(value: Value) -> Self {
        CustomProps::Static(value)
    }
}

impl From<Map<String, Value>> for CustomProps {
    fn from(map: Map<String, Value>) -> Self {
        CustomProps::Static(Value::Object(map))
    }
}

impl fmt::Debug for CustomProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomProps::Static(v) => f.debug_tuple("Static").field(v).finish(),
            CustomProps::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Arguments of every lifecycle call.
#[derive(Clone)]
pub struct Props {
    name: Arc<str>,
    custom: Arc<Map<String, Value>>,
    scope: Option<Scope>,
}

/// What a unit may do with the runtime from inside its lifecycles.
#[derive(Clone)]
struct Scope {
    rt: Arc<Runtime>,
    owner: Arc<ParcelSet>,
    this_parcel: Option<Arc<ParcelUnit>>,
}

impl Props {
    pub(crate) fn new(
        rt: &Arc<Runtime>,
        name: Arc<str>,
        custom: Map<String, Value>,
        owner: Arc<ParcelSet>,
        this_parcel: Option<Arc<ParcelUnit>>,
    ) -> Self {
        Self {
            name,
            custom: Arc::new(custom),
            scope: Some(Scope {
                rt: Arc::clone(rt),
                owner,
                this_parcel,
            }),
        }
    }

    /// Props detached from any runtime: parcels cannot be mounted from them.
    pub fn bare(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            custom: Arc::new(Map::new()),
            scope: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn custom_props(&self) -> &Map<String, Value> {
        &self.custom
    }

    /// Looks up one custom prop.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }

    pub fn is_parcel(&self) -> bool {
        self.scope.as_ref().is_some_and(|s| s.this_parcel.is_some())
    }

    /// Mounts a parcel owned by this unit.
    ///
    /// The parcel is loaded, bootstrapped and mounted in the background; await
    /// [`Parcel::mounted`] for the outcome. It is unmounted automatically before its owner.
    pub fn mount_parcel(
        &self,
        source: impl Into<AppSource>,
        custom_props: Value,
    ) -> Result<Parcel, ParcelError> {
        let scope = self.scope.as_ref().ok_or_else(|| ParcelError::OwnerGone {
            name: Arc::clone(&self.name),
        })?;
        parcels::mount_parcel(
            &scope.rt,
            Some(&scope.owner),
            Arc::clone(&self.name),
            source.into(),
            custom_props,
        )
    }

    /// Unmounts the parcel these props belong to.
    pub async fn unmount_self(&self) -> Result<(), ParcelError> {
        match &self.scope {
            Some(Scope {
                rt,
                this_parcel: Some(unit),
                ..
            }) => parcels::unmount_parcel(rt, unit).await,
            _ => Err(ParcelError::NotAParcel {
                name: Arc::clone(&self.name),
            }),
        }
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("name", &self.name)
            .field("custom", &self.custom)
            .field("parcel", &self.is_parcel())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn root() -> Location {
        Location::parse("/").unwrap()
    }

    #[test]
    fn test_static_object_and_null_are_valid() {
        assert!(CustomProps::from(json!({"a": 1})).is_valid());
        assert!(CustomProps::from(Value::Null).is_valid());
        assert!(!CustomProps::from(json!([1, 2])).is_valid());
        assert!(!CustomProps::from(json!("x")).is_valid());
    }

    #[test]
    fn test_dynamic_props_see_name_and_location() {
        let props = CustomProps::dynamic(|name, loc| json!({"who": name, "path": loc.path()}));
        let map = props.resolve("nav", &Location::parse("/x").unwrap());
        assert_eq!(map["who"], "nav");
        assert_eq!(map["path"], "/x");
    }

    #[test]
    fn test_dynamic_non_object_becomes_empty() {
        let props = CustomProps::dynamic(|_, _| json!(42));
        assert!(props.resolve("nav", &root()).is_empty());
    }

    #[tokio::test]
    async fn test_bare_props_cannot_mount_or_unmount_parcels() {
        let props = Props::bare("lonely");
        assert!(!props.is_parcel());
        assert!(matches!(
            props.unmount_self().await,
            Err(ParcelError::NotAParcel { .. })
        ));
    }
}
