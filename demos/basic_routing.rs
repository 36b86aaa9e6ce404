//! # Example: basic_routing
//!
//! Two applications bound to different paths, switched by navigation.
//!
//! Demonstrates how to:
//! - Describe an application with [`AppLifecycles`] and a lazy [`AppSource::loader`].
//! - Register it by predicate, by path pattern and from a JSON configuration object.
//! - Start routing and navigate, printing what is mounted after each pass.
//! - Log every runtime event with the built-in [`LogWriter`].
//!
//! ## Flow
//! ```text
//! register(home, path == "/")  register_manifest({ name: "settings", activeWhen: "/settings" })
//!     └─► pre-start pass: load active applications only
//! start()
//!     └─► pass: bootstrap + mount home
//! navigate_to_url("/settings")
//!     └─► pass: unmount home ──► mount settings
//! navigate_to_url("/users/7")
//!     └─► pass: unmount settings ──► mount profile (path parameter)
//! navigate_to_url("/")
//!     └─► pass: unmount profile ──► mount home
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic_routing
//! ```

use std::sync::Arc;
use std::time::Duration;

use appvisor::{
    ActiveWhen, AppLifecycles, AppSource, Config, LifecycleFn, LogWriter, MemoryHistory, Orchestrator,
    Subscribe,
};
use serde_json::json;

fn page(label: &'static str) -> AppLifecycles {
    AppLifecycles::new(
        LifecycleFn::new(move |_props| async move {
            println!("[{label}] bootstrap");
            Ok(())
        }),
        LifecycleFn::new(move |props| async move {
            println!("[{label}] mount (props: {:?})", props.custom_props());
            Ok(())
        }),
        LifecycleFn::new(move |_props| async move {
            println!("[{label}] unmount");
            Ok(())
        }),
    )
}

/// Simulates fetching the code of an application.
fn lazy(label: &'static str) -> AppSource {
    AppSource::loader(move |_props| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!("[{label}] loaded");
        Ok(page(label))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let history = Arc::new(MemoryHistory::at("/")?);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let orch = Orchestrator::builder(Config::default(), history)
        .with_subscribers(subs)
        .build();

    // A bare "/" pattern would match every path.
    orch.register(
        "home",
        lazy("home"),
        ActiveWhen::predicate(|loc| loc.path() == "/"),
    )?;
    orch.register("profile", lazy("profile"), "/users/:id")?;

    let resolver = |specifier: &str| match specifier {
        "settings" => Some(lazy("settings")),
        _ => None,
    };
    orch.register_manifest(
        &json!({
            "name": "settings",
            "app": "settings",
            "activeWhen": "/settings",
            "customProps": { "theme": "dark" }
        }),
        &resolver,
    )?;

    println!("mounted after start: {:?}", orch.start().await?);

    for url in ["/settings", "/users/7", "/"] {
        let mounted = orch.navigate_to_url(url)?.await?;
        println!("mounted at {url}: {mounted:?}");
    }

    for name in orch.app_names() {
        println!("{name}: {:?}", orch.app_status(&name));
    }

    orch.shutdown().await;
    Ok(())
}
