//! Parcels: manually mounted child units.
//!
//! A parcel has the lifecycle shape of an application but is not registered globally and
//! never takes part in routing. It is owned by the unit that mounted it and is unmounted
//! automatically before its owner.
//!
//! ## Contents
//! - [`Parcel`] the handle returned by `mount_parcel`
//! - `ParcelSet` the parcels owned by one unit
//! - `ParcelUnit` the parcel's state cell and source

mod parcel;

pub use parcel::Parcel;

pub(crate) use parcel::{ParcelUnit, mount_parcel, unmount_child, unmount_parcel};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::sync::lock;

/// Parcels owned by one application or parcel, in mount order.
#[derive(Default)]
pub(crate) struct ParcelSet {
    parcels: Mutex<BTreeMap<u64, Arc<ParcelUnit>>>,
}

impl ParcelSet {
    pub fn insert(&self, parcel: Arc<ParcelUnit>) {
        lock(&self.parcels).insert(parcel.id(), parcel);
    }

    pub fn remove(&self, id: u64) -> bool {
        lock(&self.parcels).remove(&id).is_some()
    }

    pub fn snapshot(&self) -> Vec<Arc<ParcelUnit>> {
        lock(&self.parcels).values().cloned().collect()
    }
}
