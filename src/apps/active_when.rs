//! # Activity specifiers.
//!
//! [`ActiveWhen`] decides when an application should be mounted. It is one of:
//! - a path pattern such as `"/users/:id/settings"` (compiled once at registration);
//! - a predicate over the current [`Location`];
//! - a list mixing both, active when any member is active.
//!
//! ## Path patterns
//! ```text
//! "/a/:id/b"  ──►  ^/a/[^/]+/?/b(/.*)?$     (case-insensitive)
//! "/shop/"    ──►  ^/shop/.*$
//! ```
//! Segments starting with `:` match any run of non-`/` characters plus an optional
//! trailing `/`. Literal text is matched verbatim. Unless the pattern ends with `/`, any
//! sub-path is accepted after it. Patterns are matched against everything after the
//! origin (path, query and fragment), so hash routes such as `"/#/inbox"` work.

use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::{BoxError, LifecycleError, RegistrationError, panic_message};
use crate::host::Location;

/// Predicate over the current location. An `Err` quarantines the application.
pub type ActivityFn = Arc<dyn Fn(&Location) -> Result<bool, BoxError> + Send + Sync + 'static>;

/// When an application should be active.
#[derive(Clone)]
pub enum ActiveWhen {
    Path(String),
    Predicate(ActivityFn),
    /// Active when any member is active. Members may not be lists themselves.
    Any(Vec<ActiveWhen>),
}

impl ActiveWhen {
    pub fn path(pattern: impl Into<String>) -> Self {
        ActiveWhen::Path(pattern.into())
    }

    /// Infallible predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Location) -> bool + Send + Sync + 'static,
    {
        ActiveWhen::Predicate(Arc::new(move |loc| Ok(f(loc))))
    }

    /// Predicate that may fail.
    pub fn try_predicate<F>(f: F) -> Self
    where
        F: Fn(&Location) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        ActiveWhen::Predicate(Arc::new(f))
    }

    pub fn any(members: impl IntoIterator<Item = ActiveWhen>) -> Self {
        ActiveWhen::Any(members.into_iter().collect())
    }

    pub(crate) fn compile(self, name: &str) -> Result<Activity, RegistrationError> {
        let members = match self {
            ActiveWhen::Any(members) => members,
            single => vec![single],
        };

        let mut checks = Vec::with_capacity(members.len());
        for member in members {
            let check = match member {
                ActiveWhen::Path(pattern) => Check::Path(path_to_regex(&pattern).map_err(|e| {
                    RegistrationError::InvalidActiveWhen {
                        name: name.to_string(),
                        reason: e.to_string(),
                    }
                })?),
                ActiveWhen::Predicate(f) => Check::Predicate(f),
                ActiveWhen::Any(_) => {
                    return Err(RegistrationError::InvalidActiveWhen {
                        name: name.to_string(),
                        reason: "lists may only contain path patterns and predicates".into(),
                    });
                }
            };
            checks.push(check);
        }
        Ok(Activity { checks })
    }
}

impl From<&str> for ActiveWhen {
    fn from(pattern: &str) -> Self {
        ActiveWhen::Path(pattern.to_string())
    }
}

impl From<String> for ActiveWhen {
    fn from(pattern: String) -> Self {
        ActiveWhen::Path(pattern)
    }
}

impl<T: Into<ActiveWhen>> From<Vec<T>> for ActiveWhen {
    fn from(members: Vec<T>) -> Self {
        ActiveWhen::Any(members.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for ActiveWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveWhen::Path(p) => f.debug_tuple("Path").field(p).finish(),
            ActiveWhen::Predicate(_) => f.write_str("Predicate(..)"),
            ActiveWhen::Any(members) => f.debug_tuple("Any").field(members).finish(),
        }
    }
}

enum Check {
    Path(Regex),
    Predicate(ActivityFn),
}

/// Compiled activity specifier: the OR of its checks.
pub(crate) struct Activity {
    checks: Vec<Check>,
}

impl Activity {
    /// Evaluates every check in order until one matches.
    ///
    /// Failing and panicking predicates are reported as [`LifecycleError::Activity`].
    pub(crate) fn is_active(&self, location: &Location) -> Result<bool, LifecycleError> {
        for check in &self.checks {
            let active = match check {
                Check::Path(re) => re.is_match(location.route()),
                Check::Predicate(f) => {
                    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(location))) {
                        Ok(Ok(active)) => active,
                        Ok(Err(e)) => return Err(LifecycleError::Activity(e.to_string().into())),
                        Err(panic) => {
                            return Err(LifecycleError::Activity(panic_message(&*panic).into()));
                        }
                    }
                }
            };
            if active {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Compiles a path pattern into an anchored, case-insensitive regex.
pub(crate) fn path_to_regex(path: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut last = 0;
    let mut in_dynamic = false;

    for (index, c) in path.char_indices() {
        let starts_dynamic = !in_dynamic && c == ':';
        let ends_dynamic = in_dynamic && c == '/';
        if starts_dynamic || ends_dynamic {
            append_segment(&mut pattern, path, last, index, in_dynamic);
            in_dynamic = !in_dynamic;
            last = index;
        }
    }
    append_segment(&mut pattern, path, last, path.len(), in_dynamic);

    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

fn append_segment(pattern: &mut String, path: &str, from: usize, to: usize, in_dynamic: bool) {
    if in_dynamic {
        pattern.push_str("[^/]+/?");
    } else {
        pattern.push_str(&regex::escape(&path[from..to]));
    }
    if to == path.len() && !in_dynamic {
        if pattern.ends_with('/') {
            pattern.push_str(".*$");
        } else {
            pattern.push_str("(/.*)?$");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(spec: impl Into<ActiveWhen>, path: &str) -> bool {
        spec.into()
            .compile("t")
            .unwrap()
            .is_active(&Location::parse(path).unwrap())
            .unwrap()
    }

    #[test]
    fn test_literal_prefix_allows_sub_paths_only_at_segment_boundary() {
        assert!(active("/a", "/a"));
        assert!(active("/a", "/a/b/c"));
        assert!(!active("/a", "/ab"));
        assert!(!active("/a", "/b"));
    }

    #[test]
    fn test_trailing_slash_requires_the_slash() {
        assert!(active("/shop/", "/shop/cart"));
        assert!(active("/shop/", "/shop/"));
        assert!(!active("/shop/", "/shop"));
    }

    #[test]
    fn test_dynamic_segments() {
        assert_eq!(path_to_regex("/a/:id/b").unwrap().as_str(), "^/a/[^/]+/?/b(/.*)?$");
        assert!(active("/users/:id/settings", "/users/42/settings"));
        assert!(active("/users/:id/settings", "/users/42/settings/profile"));
        assert!(!active("/users/:id/settings", "/users/settings"));
        assert!(active("/users/:id", "/users/42"));
    }

    #[test]
    fn test_matching_is_case_insensitive_and_escapes_literals() {
        assert!(active("/App", "/app/home"));
        assert!(active("/a.b", "/a.b"));
        assert!(!active("/a.b", "/axb"));
    }

    #[test]
    fn test_hash_routes_match() {
        assert!(active("/#/inbox", "/#/inbox"));
        assert!(active("/#/inbox", "/#/inbox/42"));
        assert!(!active("/#/inbox", "/#/outbox"));
    }

    #[test]
    fn test_query_is_part_of_the_route() {
        assert!(!active("/a", "/a?x=1"));
        assert!(active("/a", "/a/?x=1"));
        assert!(active("/a/", "/a/?x=1"));
        assert!(active("/users/:id", "/users/7?tab=2"));
    }

    #[test]
    fn test_list_is_logical_or() {
        let spec = ActiveWhen::any([
            ActiveWhen::path("/a"),
            ActiveWhen::predicate(|loc| loc.path().ends_with("/z")),
        ]);
        let activity = spec.compile("t").unwrap();
        let is = |p| activity.is_active(&Location::parse(p).unwrap()).unwrap();
        assert!(is("/a"));
        assert!(is("/x/y/z"));
        assert!(!is("/b"));
    }

    #[test]
    fn test_nested_lists_are_rejected() {
        let spec = ActiveWhen::any([ActiveWhen::any([ActiveWhen::path("/a")])]);
        assert!(matches!(
            spec.compile("bad"),
            Err(RegistrationError::InvalidActiveWhen { .. })
        ));
    }

    #[test]
    fn test_failing_and_panicking_predicates_are_activity_errors() {
        let loc = Location::parse("/").unwrap();
        let failing = ActiveWhen::try_predicate(|_| Err("no".into())).compile("f").unwrap();
        assert!(matches!(failing.is_active(&loc), Err(LifecycleError::Activity(_))));

        let panicking = ActiveWhen::predicate(|_| panic!("bad predicate"))
            .compile("p")
            .unwrap();
        match panicking.is_active(&loc) {
            Err(LifecycleError::Activity(msg)) => assert_eq!(&*msg, "bad predicate"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
