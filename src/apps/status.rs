//! # Unit status and unit kind.
//!
//! [`AppStatus`] is the state of one application or parcel. The only legal moves are:
//!
//! ```text
//! NOT_LOADED ─► LOADING_SOURCE_CODE ─► NOT_BOOTSTRAPPED ─► BOOTSTRAPPING ─► NOT_MOUNTED
//!                     │                                                      │  ▲
//!                     ▼                                                      ▼  │
//!                 LOAD_ERROR                                           MOUNTING UNMOUNTING
//!                                                                           │   ▲
//!                                                                           ▼   │
//!                                                     UPDATING ◄──────────► MOUNTED
//!
//! NOT_MOUNTED ─► UNLOADING ─► NOT_LOADED
//! any         ─► SKIP_BECAUSE_BROKEN   (terminal)
//! ```

use std::fmt;

/// Lifecycle status of an application or parcel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AppStatus {
    #[default]
    NotLoaded,
    LoadingSourceCode,
    NotBootstrapped,
    Bootstrapping,
    NotMounted,
    Mounting,
    Mounted,
    Updating,
    Unmounting,
    Unloading,
    /// Loading failed; the unit may be retried after the configured backoff.
    LoadError,
    /// Terminal quarantine. The unit never participates in routing again.
    SkipBecauseBroken,
}

impl AppStatus {
    /// Returns the stable upper-case label (`"NOT_LOADED"`, `"MOUNTED"`, ...).
    pub fn as_label(&self) -> &'static str {
        match self {
            AppStatus::NotLoaded => "NOT_LOADED",
            AppStatus::LoadingSourceCode => "LOADING_SOURCE_CODE",
            AppStatus::NotBootstrapped => "NOT_BOOTSTRAPPED",
            AppStatus::Bootstrapping => "BOOTSTRAPPING",
            AppStatus::NotMounted => "NOT_MOUNTED",
            AppStatus::Mounting => "MOUNTING",
            AppStatus::Mounted => "MOUNTED",
            AppStatus::Updating => "UPDATING",
            AppStatus::Unmounting => "UNMOUNTING",
            AppStatus::Unloading => "UNLOADING",
            AppStatus::LoadError => "LOAD_ERROR",
            AppStatus::SkipBecauseBroken => "SKIP_BECAUSE_BROKEN",
        }
    }

    /// True for the statuses a unit only holds while one of its lifecycles runs.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            AppStatus::LoadingSourceCode
                | AppStatus::Bootstrapping
                | AppStatus::Mounting
                | AppStatus::Updating
                | AppStatus::Unmounting
                | AppStatus::Unloading
        )
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// What kind of unit a lifecycle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Application,
    Parcel,
}

impl UnitKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitKind::Application => "application",
            UnitKind::Parcel => "parcel",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_wire_names() {
        assert_eq!(AppStatus::SkipBecauseBroken.to_string(), "SKIP_BECAUSE_BROKEN");
        assert_eq!(AppStatus::LoadingSourceCode.as_label(), "LOADING_SOURCE_CODE");
        assert_eq!(UnitKind::Parcel.to_string(), "parcel");
    }

    #[test]
    fn test_in_flight_statuses() {
        assert!(AppStatus::Mounting.is_in_flight());
        assert!(AppStatus::Unloading.is_in_flight());
        assert!(!AppStatus::Mounted.is_in_flight());
        assert!(!AppStatus::LoadError.is_in_flight());
    }
}
