//! # Navigation location and navigation events.
//!
//! [`Location`] is the value activity predicates are evaluated against. It wraps a
//! [`url::Url`]; relative inputs such as `"/a/b?x=1"` resolve against
//! `http://localhost/`, so hosts without a real origin can still use plain paths.

use std::fmt;
use std::sync::Arc;

use url::Url;

const DEFAULT_BASE: &str = "http://localhost/";

/// Current navigation location of the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    /// Parses an absolute URL or a path relative to `http://localhost/`.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        match Url::parse(input) {
            Ok(url) => Ok(Self { url }),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(DEFAULT_BASE)?;
                Ok(Self {
                    url: base.join(input)?,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves `input` relative to this location (like following a link).
    pub fn join(&self, input: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: self.url.join(input)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Everything after the origin: path, query and fragment.
    pub fn route(&self) -> &str {
        &self.url[url::Position::BeforePath..]
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.href())
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Self { url }
    }
}

/// How a navigation happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationKind {
    PushState,
    ReplaceState,
    PopState,
    HashChange,
}

/// A navigation that triggered a routing pass.
///
/// Carried as `original_event` in routing notifications and handed back to the host
/// when captured navigation listeners are replayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationEvent {
    pub kind: NavigationKind,
    pub location: Arc<Location>,
}

impl NavigationEvent {
    pub fn new(kind: NavigationKind, location: Location) -> Self {
        Self {
            kind,
            location: Arc::new(location),
        }
    }
}
