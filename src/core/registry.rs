//! # Application registry.
//!
//! Holds every registered application in registration order and classifies them into the
//! four action buckets of a routing pass.
//!
//! ## Diff rules
//! ```text
//! status                        active?   pending unload?   bucket
//! ─────────────────────────────────────────────────────────────────────────
//! LOAD_ERROR (back-off elapsed)   any         any           to_load
//! NOT_LOADED, LOADING_SOURCE_CODE yes         any           to_load
//! NOT_BOOTSTRAPPED, NOT_MOUNTED   no          yes           to_unload
//! NOT_BOOTSTRAPPED, NOT_MOUNTED   yes         any           to_mount
//! MOUNTED                         no          any           to_unmount
//! SKIP_BECAUSE_BROKEN             never evaluated
//! ```
//!
//! ## Rules
//! - Names are unique; the duplicate check and the insertion happen under one write lock.
//! - A predicate that fails while computing a diff quarantines its application.

use std::sync::{Arc, RwLock};

use tokio::time::Instant;

use crate::apps::{AppStatus, Application};
use crate::error::RegistrationError;
use crate::host::Location;
use crate::sync;

use super::runtime::Runtime;

/// Applications a routing pass has to act on.
#[derive(Default)]
pub(crate) struct Diff {
    pub to_unload: Vec<Arc<Application>>,
    pub to_unmount: Vec<Arc<Application>>,
    pub to_load: Vec<Arc<Application>>,
    pub to_mount: Vec<Arc<Application>>,
}

impl Diff {
    /// Every application the pass acts on, each once.
    pub fn changed(&self) -> impl Iterator<Item = &Arc<Application>> {
        self.to_unload
            .iter()
            .chain(&self.to_load)
            .chain(&self.to_unmount)
            .chain(&self.to_mount)
    }

    pub fn total(&self) -> usize {
        self.to_unload.len() + self.to_load.len() + self.to_unmount.len() + self.to_mount.len()
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    apps: RwLock<Vec<Arc<Application>>>,
}

impl Registry {
    pub fn register(&self, app: Application) -> Result<Arc<Application>, RegistrationError> {
        let mut apps = sync::write(&self.apps);
        if apps.iter().any(|a| a.name() == app.name()) {
            return Err(RegistrationError::DuplicateName {
                name: app.name().to_string(),
            });
        }
        let app = Arc::new(app);
        apps.push(Arc::clone(&app));
        Ok(app)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Application>> {
        sync::read(&self.apps)
            .iter()
            .find(|a| &**a.name() == name)
            .cloned()
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut apps = sync::write(&self.apps);
        let before = apps.len();
        apps.retain(|a| &**a.name() != name);
        apps.len() != before
    }

    pub fn snapshot(&self) -> Vec<Arc<Application>> {
        sync::read(&self.apps).clone()
    }

    pub fn names(&self) -> Vec<String> {
        sync::read(&self.apps).iter().map(|a| a.name().to_string()).collect()
    }

    pub fn status(&self, name: &str) -> Option<AppStatus> {
        self.get(name).map(|a| a.status())
    }

    pub fn mounted(&self) -> Vec<String> {
        sync::read(&self.apps)
            .iter()
            .filter(|a| a.status() == AppStatus::Mounted)
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Names whose activity matches `location`. Failing predicates count as inactive here.
    pub fn matching(&self, location: &Location) -> Vec<String> {
        self.snapshot()
            .iter()
            .filter(|a| a.is_active(location).unwrap_or(false))
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn compute_diff(&self, rt: &Runtime, location: &Location, now: Instant) -> Diff {
        let mut diff = Diff::default();

        for app in self.snapshot() {
            if app.status() == AppStatus::SkipBecauseBroken {
                continue;
            }
            let active = rt.check_active(&app, location);

            match app.status() {
                AppStatus::LoadError => {
                    let retry = rt.cfg.load_error_retry;
                    let due = app
                        .load_error_at()
                        .is_none_or(|at| now.saturating_duration_since(at) >= retry);
                    if due {
                        diff.to_load.push(app);
                    }
                }
                AppStatus::NotLoaded | AppStatus::LoadingSourceCode if active => {
                    diff.to_load.push(app);
                }
                AppStatus::NotBootstrapped | AppStatus::NotMounted => {
                    if !active && rt.unloads.is_pending(app.name()) {
                        diff.to_unload.push(app);
                    } else if active {
                        diff.to_mount.push(app);
                    }
                }
                AppStatus::Mounted if !active => diff.to_unmount.push(app),
                _ => {}
            }
        }
        diff
    }
}
