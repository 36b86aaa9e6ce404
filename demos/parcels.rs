//! # Example: parcels
//!
//! A dashboard application that mounts a widget parcel from its own `mount` lifecycle,
//! plus a root parcel driven directly through its handle.
//!
//! Demonstrates how to:
//! - Mount a parcel from [`Props::mount_parcel`] and wait for it with [`Parcel::mounted`].
//! - Push new props into a mounted parcel with [`Parcel::update`].
//! - Rely on owned parcels being unmounted before their owner.
//!
//! ## Flow
//! ```text
//! start() at /dashboard
//!     └─► mount dashboard ──► props.mount_parcel(widget) ──► widget mounted
//! mount_root_parcel(clock) ──► update({ tick: 1 }) ──► update({ tick: 2 }) ──► unmount
//! navigate_to_url("/")
//!     └─► unmount dashboard
//!           ├─► unmount widget (owned parcel first)
//!           └─► dashboard unmount()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example parcels
//! ```

use std::sync::Arc;

use appvisor::{
    AppLifecycles, Config, LifecycleError, LifecycleFn, MemoryHistory, Orchestrator, Parcel,
    Props,
};
use serde_json::json;

fn widget() -> AppLifecycles {
    AppLifecycles::new(
        LifecycleFn::new(|_props| async { Ok(()) }),
        LifecycleFn::new(|props| async move {
            println!("[{}] widget mounted with {:?}", props.name(), props.custom_props());
            Ok(())
        }),
        LifecycleFn::new(|props| async move {
            println!("[{}] widget unmounted", props.name());
            Ok(())
        }),
    )
}

fn dashboard() -> AppLifecycles {
    AppLifecycles::new(
        LifecycleFn::new(|_props| async { Ok(()) }),
        LifecycleFn::new(|props: Props| async move {
            println!("[{}] mounting, bringing up its widget", props.name());
            let child = props
                .mount_parcel(widget(), json!({ "owner": props.name() }))
                .map_err(|e| LifecycleError::msg(e.to_string()))?;
            child
                .mounted()
                .await
                .map_err(|e| LifecycleError::msg(e.to_string()))
        }),
        LifecycleFn::new(|props| async move {
            println!("[{}] unmounted", props.name());
            Ok(())
        }),
    )
}

fn clock() -> AppLifecycles {
    widget().with_update(LifecycleFn::new(|props| async move {
        println!("[{}] tick {:?}", props.name(), props.get("tick"));
        Ok(())
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let history = Arc::new(MemoryHistory::at("/dashboard")?);
    let orch = Orchestrator::builder(Config::default(), history).build();

    orch.register("dashboard", dashboard(), "/dashboard")?;
    println!("mounted: {:?}", orch.start().await?);

    let parcel: Parcel = orch.mount_root_parcel(clock(), json!({ "tick": 0 }))?;
    parcel.mounted().await?;
    for tick in 1..=2 {
        parcel.update(json!({ "tick": tick })).await?;
    }
    parcel.unmount().await?;
    println!("{} is now {:?}", parcel.name(), parcel.status());

    println!("mounted: {:?}", orch.navigate_to_url("/")?.await?);
    Ok(())
}
