//! Walk-through of the `RemoteMap` API against a local directory store.
//!
//! Run with: cargo run -p basic-demo
//!
//! Parameters come from the environment (`BUCKET_MAP_BUCKET`,
//! `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `BUCKET_MAP_FILE`,
//! `BUCKET_MAP_AUTOSAVE`), falling back to the JSON config file in the user
//! config directory. Objects are written under `BUCKET_MAP_ROOT`
//! (default `./bucket-map-data`).

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use bucket_map::{MapConfig, RecordingObserver, RemoteMap};
use bucket_map_store::FsStore;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ROOT: &str = "bucket-map-data";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;
    let recorder = Arc::new(RecordingObserver::new());
    let options = config
        .into_options()
        .context("incomplete bucket-map configuration")?
        .observer(Arc::clone(&recorder) as Arc<dyn bucket_map::MapObserver>);

    let root = std::env::var_os("BUCKET_MAP_ROOT")
        .map_or_else(|| PathBuf::from(DEFAULT_ROOT), PathBuf::from);
    let store = FsStore::new(&root);
    store.create_bucket(&options.bucket_name).await?;
    tracing::info!(root = %root.display(), bucket = %options.bucket_name, "using local store");

    let mut state = RemoteMap::open(store, options).await?;

    // assignment like any map
    state.set("foo", "bar").await?;
    println!("foo: {}", state.get("foo")?);

    state.set("foobar", 42).await?;
    println!("contains foobar: {}", state.contains_key("foobar"));

    // iteration
    for (k, v) in &state {
        println!("k = {k}, {v}");
    }

    state.remove("foobar").await?;
    println!("len: {}", state.len());

    state.clear().await?;

    let mut state = state.from_keys(["1", "2", "3"], None).await?;
    println!("pop: {}", state.pop("1", None).await?);
    println!("pop_item: {:?}", state.pop_item().await?);
    println!("set_default: {}", state.set_default("42", None).await?);

    state
        .update([("a", json!("1")), ("b", json!(2)), ("c", json!(3))])
        .await?;
    state.set("foobar", "hahhah").await?;
    println!("values: {:?}", state.values().collect::<Vec<_>>());
    println!("keys: {:?}", state.keys().collect::<Vec<_>>());

    // persist whatever autosave did not
    state.save(true).await?;

    tracing::info!(
        saves = recorder.save_count(),
        events = recorder.history().len(),
        file = state.file_name(),
        "done"
    );
    Ok(())
}

fn load_config() -> anyhow::Result<MapConfig> {
    let env = MapConfig::from_env()?;
    let file = match MapConfig::default_path() {
        Some(path) if path.is_file() => MapConfig::from_file(&path)?,
        _ => MapConfig::default(),
    };
    Ok(env.or(file))
}
