//! # JSON configuration objects.
//!
//! A manifest entry is a JSON object with exactly the keys `name`, `app`, `activeWhen`
//! and `customProps`:
//!
//! ```json
//! { "name": "navbar", "app": "@org/navbar", "activeWhen": ["/", "/settings"], "customProps": { "theme": "dark" } }
//! ```
//!
//! `app` is a specifier that a [`LoaderResolver`] turns into an [`AppSource`]. Any other key
//! is rejected with the full list of offending keys.

use serde::Deserialize;
use serde_json::Value;

use crate::error::RegistrationError;
use crate::lifecycles::AppSource;

use super::active_when::ActiveWhen;
use super::registration::Registration;

const VALID_KEYS: [&str; 4] = ["name", "app", "activeWhen", "customProps"];

/// Resolves `app` specifiers found in manifests.
pub trait LoaderResolver: Send + Sync {
    fn resolve(&self, specifier: &str) -> Option<AppSource>;
}

impl<F> LoaderResolver for F
where
    F: Fn(&str) -> Option<AppSource> + Send + Sync,
{
    fn resolve(&self, specifier: &str) -> Option<AppSource> {
        self(specifier)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathSpec {
    One(String),
    Many(Vec<String>),
}

impl From<PathSpec> for ActiveWhen {
    fn from(spec: PathSpec) -> Self {
        match spec {
            PathSpec::One(path) => ActiveWhen::Path(path),
            PathSpec::Many(paths) => ActiveWhen::Any(paths.into_iter().map(ActiveWhen::Path).collect()),
        }
    }
}

/// Turns one configuration object into a [`Registration`].
pub fn parse_manifest(
    config: &Value,
    resolver: &dyn LoaderResolver,
) -> Result<Registration, RegistrationError> {
    let Value::Object(fields) = config else {
        return Err(RegistrationError::InvalidConfig);
    };

    let invalid: Vec<String> = fields
        .keys()
        .filter(|k| !VALID_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(RegistrationError::InvalidConfigKeys { invalid });
    }

    let name = match fields.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Err(RegistrationError::EmptyName),
    };

    let specifier = fields
        .get("app")
        .and_then(Value::as_str)
        .ok_or_else(|| RegistrationError::MissingApp { name: name.clone() })?;
    let source = resolver
        .resolve(specifier)
        .ok_or_else(|| RegistrationError::UnknownLoader {
            specifier: specifier.to_string(),
        })?;

    let active_when = fields
        .get("activeWhen")
        .cloned()
        .ok_or_else(|| "missing".to_string())
        .and_then(|v| serde_json::from_value::<PathSpec>(v).map_err(|e| e.to_string()))
        .map_err(|_| RegistrationError::InvalidActiveWhen {
            name: name.clone(),
            reason: "activeWhen must be a path string or an array of path strings".into(),
        })?;

    let mut reg = Registration::new(name.clone())
        .app(source)
        .active_when(ActiveWhen::from(active_when));

    match fields.get("customProps") {
        None | Some(Value::Null) => {}
        Some(props @ Value::Object(_)) => reg = reg.custom_props(props.clone()),
        Some(_) => return Err(RegistrationError::InvalidCustomProps { name }),
    }
    Ok(reg)
}
