//! # Parcel units and their handle.
//!
//! ```text
//! mount_parcel(owner, source, props)
//!   ├─ props not an object ──► InvalidCustomProps
//!   └─ parcel-<id> ──► owner set ──► spawn: load ──► bootstrap ──► mount   (hard fail)
//!                                            └─ any failure ──► SKIP_BECAUSE_BROKEN, left the owner
//!
//! Parcel::unmount ──► wait for the initial mount ──► MOUNTED? ──► unmount ──► left the owner
//! Parcel::mount   ──► NOT_MOUNTED? ──► back in the owner set ──► mount
//! Parcel::update  ──► MOUNTED + update lifecycle? ──► UPDATING ──► MOUNTED
//! ```
//!
//! Parcel failures are returned to the caller instead of the error observers, but still
//! publish `AppFailed`.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::{Map, Value};

use crate::apps::{AppStatus, Props, Unit, UnitCell, UnitKind};
use crate::core::Runtime;
use crate::error::{AppError, LifecycleError, ParcelError};
use crate::events::Bus;
use crate::lifecycles::{AppSource, to_bootstrap, to_load, to_mount, to_unmount, to_update};
use crate::sync::lock;

use super::ParcelSet;

type MountJoin = Shared<BoxFuture<'static, Result<(), ParcelError>>>;

pub(crate) struct ParcelUnit {
    id: u64,
    cell: UnitCell,
    source: AppSource,
    custom: Mutex<Map<String, Value>>,
    owner: Option<Weak<ParcelSet>>,
    initial_mount: OnceLock<MountJoin>,
}

impl ParcelUnit {
    fn new(
        id: u64,
        bus: Bus,
        source: AppSource,
        custom: Map<String, Value>,
        owner: Option<Weak<ParcelSet>>,
    ) -> Self {
        Self {
            id,
            cell: UnitCell::new(UnitKind::Parcel, format!("parcel-{id}").into(), bus),
            source,
            custom: Mutex::new(custom),
            owner,
            initial_mount: OnceLock::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn join_owner(self: &Arc<Self>) {
        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            owner.insert(Arc::clone(self));
        }
    }

    fn leave_owner(&self) {
        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            owner.remove(self.id);
        }
    }

    fn wrong_status(&self, operation: &'static str) -> ParcelError {
        ParcelError::WrongStatus {
            name: Arc::clone(self.cell.name()),
            operation,
            status: self.cell.status(),
        }
    }
}

impl Unit for ParcelUnit {
    fn cell(&self) -> &UnitCell {
        &self.cell
    }

    fn source(&self) -> &AppSource {
        &self.source
    }

    fn props(self: &Arc<Self>, rt: &Arc<Runtime>) -> Props {
        Props::new(
            rt,
            Arc::clone(self.cell.name()),
            lock(&self.custom).clone(),
            Arc::clone(self.cell.children()),
            Some(Arc::clone(self)),
        )
    }
}

/// Creates a parcel and starts mounting it in the background.
pub(crate) fn mount_parcel(
    rt: &Arc<Runtime>,
    owner: Option<&Arc<ParcelSet>>,
    owner_name: Arc<str>,
    source: AppSource,
    custom_props: Value,
) -> Result<Parcel, ParcelError> {
    let custom = match custom_props {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(ParcelError::InvalidCustomProps),
    };

    let unit = Arc::new(ParcelUnit::new(
        rt.next_parcel_id(),
        rt.bus.clone(),
        source,
        custom,
        owner.map(Arc::downgrade),
    ));
    tracing::debug!(parcel = %unit.cell.name(), owner = %owner_name, "mounting parcel");
    unit.join_owner();

    let task = tokio::spawn(initial_mount(Arc::clone(rt), Arc::clone(&unit)));
    let name = Arc::clone(unit.cell.name());
    let join = task
        .map(move |res| match res {
            Ok(res) => res,
            Err(e) => Err(AppError {
                kind: UnitKind::Parcel,
                name,
                status: AppStatus::SkipBecauseBroken,
                new_status: AppStatus::SkipBecauseBroken,
                source: LifecycleError::Panicked(e.to_string().into()),
            }
            .into()),
        })
        .boxed()
        .shared();
    let _ = unit.initial_mount.set(join);

    Ok(Parcel {
        rt: Arc::clone(rt),
        unit,
    })
}

async fn initial_mount(rt: Arc<Runtime>, unit: Arc<ParcelUnit>) -> Result<(), ParcelError> {
    let res: Result<(), AppError> = async {
        to_load(&rt, &unit).await?;
        to_bootstrap(&rt, &unit, true).await?;
        to_mount(&rt, &unit, true).await
    }
    .await;

    match res {
        Ok(()) if unit.cell.status() == AppStatus::Mounted => Ok(()),
        Ok(()) => {
            unit.leave_owner();
            Err(unit.wrong_status("mount"))
        }
        Err(e) => {
            unit.leave_owner();
            Err(e.into())
        }
    }
}

/// Unmounts a mounted parcel and removes it from its owner.
pub(crate) async fn unmount_parcel(rt: &Arc<Runtime>, unit: &Arc<ParcelUnit>) -> Result<(), ParcelError> {
    if unit.cell.status() != AppStatus::Mounted {
        return Err(unit.wrong_status("unmount"));
    }
    to_unmount(rt, unit, true).await?;
    unit.leave_owner();
    Ok(())
}

/// Unmounts a parcel on behalf of its unmounting owner.
///
/// A parcel still mounting is waited for; one that never made it is simply dropped.
pub(crate) async fn unmount_child(rt: &Arc<Runtime>, unit: &Arc<ParcelUnit>) -> Result<(), ParcelError> {
    if let Some(initial) = unit.initial_mount.get() {
        let _ = initial.clone().await;
    }
    match unit.cell.status() {
        AppStatus::Mounted => unmount_parcel(rt, unit).await,
        AppStatus::NotLoaded
        | AppStatus::LoadError
        | AppStatus::NotBootstrapped
        | AppStatus::NotMounted
        | AppStatus::SkipBecauseBroken => {
            unit.leave_owner();
            Ok(())
        }
        _ => Err(unit.wrong_status("unmount")),
    }
}

/// Handle of a mounted parcel.
#[derive(Clone)]
pub struct Parcel {
    rt: Arc<Runtime>,
    unit: Arc<ParcelUnit>,
}

impl Parcel {
    /// Generated name (`parcel-<id>`).
    pub fn name(&self) -> &str {
        self.unit.cell.name()
    }

    pub fn status(&self) -> AppStatus {
        self.unit.cell.status()
    }

    /// Outcome of the initial load, bootstrap and mount.
    pub async fn mounted(&self) -> Result<(), ParcelError> {
        match self.unit.initial_mount.get() {
            Some(initial) => initial.clone().await,
            None => Ok(()),
        }
    }

    /// Mounts the parcel again after an [`unmount`](Parcel::unmount).
    pub async fn mount(&self) -> Result<(), ParcelError> {
        if self.status() != AppStatus::NotMounted {
            return Err(self.unit.wrong_status("mount"));
        }
        self.unit.join_owner();
        if let Err(e) = to_mount(&self.rt, &self.unit, true).await {
            self.unit.leave_owner();
            return Err(e.into());
        }
        Ok(())
    }

    /// Waits for the initial mount, then unmounts the parcel.
    pub async fn unmount(&self) -> Result<(), ParcelError> {
        self.mounted().await?;
        unmount_parcel(&self.rt, &self.unit).await
    }

    /// Replaces the custom props and runs the `update` lifecycle.
    pub async fn update(&self, custom_props: Value) -> Result<(), ParcelError> {
        let custom = match custom_props {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(ParcelError::InvalidCustomProps),
        };
        if self.status() != AppStatus::Mounted {
            return Err(self.unit.wrong_status("update"));
        }
        *lock(&self.unit.custom) = custom;
        to_update(&self.rt, &self.unit).await
    }
}

impl fmt::Debug for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parcel")
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::MemoryHistory;
    use crate::lifecycles::{AppLifecycles, LifecycleFn};

    fn unit(id: u64, owner: &Arc<ParcelSet>) -> Arc<ParcelUnit> {
        let noop = || LifecycleFn::new(|_| async { Ok(()) });
        Arc::new(ParcelUnit::new(
            id,
            Bus::new(8),
            AppLifecycles::new(noop(), noop(), noop()).into(),
            Map::new(),
            Some(Arc::downgrade(owner)),
        ))
    }

    #[test]
    fn test_name_is_derived_from_id() {
        let owner = Arc::new(ParcelSet::default());
        assert_eq!(&**unit(7, &owner).cell.name(), "parcel-7");
    }

    #[test]
    fn test_joining_and_leaving_owner() {
        let owner = Arc::new(ParcelSet::default());
        let (a, b) = (unit(2, &owner), unit(1, &owner));
        a.join_owner();
        b.join_owner();
        let ids: Vec<u64> = owner.snapshot().iter().map(|p| p.id()).collect();
        assert_eq!(ids, [1, 2]);

        a.leave_owner();
        assert_eq!(owner.snapshot().len(), 1);
        assert!(!owner.remove(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_mount_leaves_the_owner_set_empty() {
        let host = Arc::new(MemoryHistory::at("/").unwrap());
        let rt = Arc::new(Runtime::new(Config::default(), Bus::new(8), host));
        let owner = Arc::new(ParcelSet::default());
        let noop = || LifecycleFn::new(|_| async { Ok(()) });
        let failing = LifecycleFn::new(|_| async { Err(LifecycleError::msg("no dom")) });

        for _ in 0..16 {
            let parcel = mount_parcel(
                &rt,
                Some(&owner),
                "owner".into(),
                AppLifecycles::new(noop(), failing.clone(), noop()).into(),
                Value::Null,
            )
            .unwrap();
            assert!(parcel.mounted().await.is_err());
            assert_eq!(parcel.status(), AppStatus::SkipBecauseBroken);
        }
        assert!(owner.snapshot().is_empty());
    }

    #[test]
    fn test_gone_owner_is_ignored() {
        let owner = Arc::new(ParcelSet::default());
        let orphan = unit(0, &owner);
        drop(owner);
        orphan.join_owner();
        orphan.leave_owner();
    }
}
