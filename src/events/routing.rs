//! # Payload of routing notifications.

use std::collections::BTreeMap;

use crate::apps::AppStatus;
use crate::host::NavigationEvent;

/// Statuses carried by every routing notification.
///
/// Before the pass, applications to load or mount are reported as `MOUNTED`, applications
/// to unload as `NOT_LOADED` and applications to unmount as `NOT_MOUNTED`. After the pass,
/// each application that took part reports its actual status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingDetail {
    /// Application name → status it assumes.
    pub new_app_statuses: BTreeMap<String, AppStatus>,
    /// Status → application names. Always contains `MOUNTED`, `NOT_MOUNTED`, `NOT_LOADED`
    /// and `SKIP_BECAUSE_BROKEN`, possibly empty.
    pub apps_by_new_status: BTreeMap<AppStatus, Vec<String>>,
    /// Number of applications the pass acted on.
    pub total_app_changes: usize,
    /// Navigation that triggered the pass, if any.
    pub original_event: Option<NavigationEvent>,
}

impl RoutingDetail {
    pub(crate) fn new(original_event: Option<NavigationEvent>) -> Self {
        let apps_by_new_status = [
            AppStatus::Mounted,
            AppStatus::NotMounted,
            AppStatus::NotLoaded,
            AppStatus::SkipBecauseBroken,
        ]
        .into_iter()
        .map(|s| (s, Vec::new()))
        .collect();

        Self {
            new_app_statuses: BTreeMap::new(),
            apps_by_new_status,
            total_app_changes: 0,
            original_event,
        }
    }

    pub(crate) fn record(&mut self, name: &str, status: AppStatus) {
        self.new_app_statuses.insert(name.to_string(), status);
        self.apps_by_new_status
            .entry(status)
            .or_default()
            .push(name.to_string());
    }

    /// Names reported with `status`.
    pub fn apps_with(&self, status: AppStatus) -> &[String] {
        self.apps_by_new_status
            .get(&status)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_buckets_are_always_present() {
        let detail = RoutingDetail::new(None);
        assert_eq!(detail.apps_by_new_status.len(), 4);
        assert!(detail.apps_with(AppStatus::SkipBecauseBroken).is_empty());
        assert!(detail.apps_with(AppStatus::LoadError).is_empty());
    }

    #[test]
    fn test_record_groups_by_status() {
        let mut detail = RoutingDetail::new(None);
        detail.record("a", AppStatus::Mounted);
        detail.record("b", AppStatus::LoadError);
        detail.record("c", AppStatus::Mounted);

        assert_eq!(detail.apps_with(AppStatus::Mounted), ["a", "c"]);
        assert_eq!(detail.apps_with(AppStatus::LoadError), ["b"]);
        assert_eq!(detail.new_app_statuses["b"], AppStatus::LoadError);
    }
}
