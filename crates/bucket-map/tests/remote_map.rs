use std::sync::Arc;

use bucket_map::{
    Credentials, JsonMap, MapError, MapEvent, MapOptions, RecordingObserver, RemoteCause,
    RemoteMap, StoreError, StoreOp,
};
use bucket_map_store::{FsStore, MemoryStore};
use serde_json::{Value, json};

const BUCKET: &str = "state-bucket";

fn options(file: &str) -> MapOptions {
    MapOptions::new(BUCKET, Credentials::new("AKIDEXAMPLE", "secret"), file)
}

fn remote(store: &MemoryStore, file: &str) -> Value {
    let body = store.object(BUCKET, file).expect("object exists");
    serde_json::from_slice(&body).unwrap()
}

fn map_of(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test]
async fn test_empty_bucket_scenario() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("s.json"))
        .await
        .unwrap();
    assert_eq!(remote(&store, "s.json"), json!({}));

    map.set("x", 1).await.unwrap();
    assert_eq!(remote(&store, "s.json"), json!({}));
    assert_eq!(map.get("x").unwrap(), &json!(1));

    map.save(true).await.unwrap();
    assert_eq!(remote(&store, "s.json"), json!({"x": 1}));
}

#[tokio::test]
async fn test_autosave_mirrors_every_mutation() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("auto.json").autosave(true))
        .await
        .unwrap();

    map.set("foo", "bar").await.unwrap();
    assert_eq!(remote(&store, "auto.json"), json!({"foo": "bar"}));

    map.set("foobar", 42).await.unwrap();
    assert_eq!(remote(&store, "auto.json"), json!({"foo": "bar", "foobar": 42}));

    map.remove("foobar").await.unwrap();
    assert_eq!(remote(&store, "auto.json"), json!({"foo": "bar"}));

    map.update([("a", json!("1")), ("b", json!(2))]).await.unwrap();
    assert_eq!(
        remote(&store, "auto.json"),
        json!({"foo": "bar", "a": "1", "b": 2})
    );

    map.clear().await.unwrap();
    assert_eq!(remote(&store, "auto.json"), json!({}));
}

#[tokio::test]
async fn test_existing_object_is_loaded() {
    let store = MemoryStore::with_bucket(BUCKET);
    store.insert_object(BUCKET, "old.json", r#"{"answer": 42, "name": "bot"}"#);

    let map = RemoteMap::open(store.clone(), options("old.json"))
        .await
        .unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("answer").unwrap(), &json!(42));
    assert!(map.contains_key("name"));
    assert!(!map.contains_key("missing"));
}

#[tokio::test]
async fn test_initial_data_overrides_and_persists() {
    let store = MemoryStore::with_bucket(BUCKET);
    store.insert_object(BUCKET, "seeded.json", r#"{"stale": true}"#);

    let data = map_of(json!({"fresh": 1}));
    let map = RemoteMap::open(store.clone(), options("seeded.json").data(data))
        .await
        .unwrap();

    assert!(!map.contains_key("stale"));
    assert_eq!(remote(&store, "seeded.json"), json!({"fresh": 1}));
}

#[tokio::test]
async fn test_default_only_used_for_missing_object() {
    let store = MemoryStore::with_bucket(BUCKET);
    let seed = map_of(json!({"count": 0}));

    let map = RemoteMap::open(store.clone(), options("new.json").default_data(seed.clone()))
        .await
        .unwrap();
    assert_eq!(map.get("count").unwrap(), &json!(0));
    assert_eq!(remote(&store, "new.json"), json!({"count": 0}));

    store.insert_object(BUCKET, "existing.json", r#"{"count": 5}"#);
    let map = RemoteMap::open(store.clone(), options("existing.json").default_data(seed))
        .await
        .unwrap();
    assert_eq!(map.get("count").unwrap(), &json!(5));
}

#[tokio::test]
async fn test_open_always_writes_once() {
    let store = MemoryStore::with_bucket(BUCKET);
    store.insert_object(BUCKET, "once.json", "{}");
    let _map = RemoteMap::open(store.clone(), options("once.json"))
        .await
        .unwrap();
    assert_eq!(store.put_count(), 1);
}

#[tokio::test]
async fn test_open_missing_object_writes_twice() {
    let store = MemoryStore::with_bucket(BUCKET);
    let recorder = Arc::new(RecordingObserver::new());
    let _map = RemoteMap::open(
        store.clone(),
        options("absent.json").observer(Arc::clone(&recorder) as Arc<dyn bucket_map::MapObserver>),
    )
    .await
    .unwrap();

    assert_eq!(store.put_count(), 2);
    let history = recorder.history();
    assert_eq!(history.len(), 2);
    assert!(matches!(history[0], MapEvent::Created { .. }));
    assert!(matches!(history[1], MapEvent::Saved { .. }));
}

#[tokio::test]
async fn test_missing_parameters_rejected() {
    let store = MemoryStore::with_bucket(BUCKET);
    for opts in [
        MapOptions::new("", Credentials::new("id", "secret"), "f.json"),
        MapOptions::new(BUCKET, Credentials::new("", "secret"), "f.json"),
        MapOptions::new(BUCKET, Credentials::new("id", ""), "f.json"),
        MapOptions::new(BUCKET, Credentials::new("id", "secret"), ""),
    ] {
        let err = RemoteMap::open(store.clone(), opts).await.unwrap_err();
        assert!(matches!(err, MapError::Configuration(_)), "{err}");
    }
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_corrupt_object_fails_load() {
    let store = MemoryStore::with_bucket(BUCKET);
    store.insert_object(BUCKET, "bad.json", "{not json");
    let err = RemoteMap::open(store.clone(), options("bad.json"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MapError::RemoteLoad {
            source: RemoteCause::Json(_),
            ..
        }
    ));

    store.insert_object(BUCKET, "array.json", "[1, 2, 3]");
    let err = RemoteMap::open(store, options("array.json"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MapError::RemoteLoad {
            source: RemoteCause::NotAnObject,
            ..
        }
    ));
}

#[tokio::test]
async fn test_remote_failures_are_typed() {
    let store = MemoryStore::with_bucket(BUCKET);
    store.deny(StoreOp::Put);
    let err = RemoteMap::open(store.clone(), options("denied.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, MapError::RemoteCreate { .. }));

    store.allow(StoreOp::Put);
    let mut map = RemoteMap::open(store.clone(), options("denied.json").autosave(true))
        .await
        .unwrap();

    store.deny(StoreOp::Put);
    let err = map.set("k", "v").await.unwrap_err();
    assert!(matches!(err, MapError::RemoteSave { .. }));
    // the local mirror keeps the change
    assert_eq!(map.get("k").unwrap(), &json!("v"));

    store.deny(StoreOp::Get);
    let err = RemoteMap::open(store.clone(), options("denied.json"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MapError::RemoteLoad {
            source: RemoteCause::Store(StoreError::AccessDenied { .. }),
            ..
        }
    ));

    let missing_bucket = MemoryStore::new();
    let err = RemoteMap::open(missing_bucket, options("x.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, MapError::RemoteLoad { .. }));
}

#[tokio::test]
async fn test_save_load_round_trip() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store, options("rt.json")).await.unwrap();
    map.update([
        ("nested", json!({"a": [1, 2, {"b": null}]})),
        ("float", json!(1.5)),
        ("text", json!("héllo")),
        ("flag", json!(false)),
    ])
    .await
    .unwrap();

    let before = map.snapshot();
    map.save(true).await.unwrap();
    map.load().await.unwrap();
    assert_eq!(map.snapshot(), before);
}

#[tokio::test]
async fn test_get_after_set_and_remove() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store, options("kv.json")).await.unwrap();

    map.set("list", json!([1, "two"])).await.unwrap();
    assert_eq!(map.get("list").unwrap(), &json!([1, "two"]));

    assert_eq!(map.remove("list").await.unwrap(), json!([1, "two"]));
    assert!(matches!(map.get("list"), Err(MapError::KeyNotFound(k)) if k == "list"));
    assert!(matches!(
        map.remove("list").await,
        Err(MapError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn test_pop_and_pop_item() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("pop.json").autosave(true))
        .await
        .unwrap();

    assert!(matches!(map.pop_item().await, Err(MapError::EmptyMap)));

    map.set("only", 1).await.unwrap();
    assert_eq!(map.pop_item().await.unwrap(), ("only".to_string(), json!(1)));
    assert!(map.is_empty());
    assert_eq!(remote(&store, "pop.json"), json!({}));

    map.set("a", 1).await.unwrap();
    assert_eq!(map.pop("a", None).await.unwrap(), json!(1));
    assert!(matches!(
        map.pop("a", None).await,
        Err(MapError::KeyNotFound(_))
    ));

    let puts = store.put_count();
    assert_eq!(map.pop("a", Some(json!("dflt"))).await.unwrap(), json!("dflt"));
    assert_eq!(store.put_count(), puts);
}

#[tokio::test]
async fn test_set_default_saves_only_on_insert() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("sd.json").autosave(true))
        .await
        .unwrap();

    let puts = store.put_count();
    assert_eq!(map.set_default("42", None).await.unwrap(), Value::Null);
    assert_eq!(store.put_count(), puts + 1);
    assert_eq!(remote(&store, "sd.json"), json!({"42": null}));

    map.set("k", "v").await.unwrap();
    let puts = store.put_count();
    assert_eq!(
        map.set_default("k", Some(json!("other"))).await.unwrap(),
        json!("v")
    );
    assert_eq!(store.put_count(), puts);
}

#[tokio::test]
async fn test_update_saves_once() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("up.json").autosave(true))
        .await
        .unwrap();

    let puts = store.put_count();
    map.update([("a", 1), ("b", 2), ("a", 3)]).await.unwrap();
    assert_eq!(store.put_count(), puts + 1);
    assert_eq!(map.get("a").unwrap(), &json!(3));
    assert_eq!(map.len(), 2);
}

#[tokio::test]
async fn test_from_keys_overwrites_shared_object() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("F.json"))
        .await
        .unwrap();
    map.set("old", true).await.unwrap();
    map.save(true).await.unwrap();

    let fresh = map.from_keys(["a", "b"], Some(json!(0))).await.unwrap();
    assert_eq!(fresh.file_name(), "F.json");
    assert_eq!(fresh.bucket_name(), BUCKET);
    assert!(!fresh.autosave());
    assert_eq!(remote(&store, "F.json"), json!({"a": 0, "b": 0}));

    let reloaded = RemoteMap::open(store.clone(), options("F.json"))
        .await
        .unwrap();
    assert_eq!(reloaded.snapshot(), map_of(json!({"a": 0, "b": 0})));

    let nulls = map.from_keys(["x"], None).await.unwrap();
    assert_eq!(nulls.get("x").unwrap(), &Value::Null);
}

#[tokio::test]
async fn test_from_keys_carries_autosave_seed_and_observer() {
    let store = MemoryStore::with_bucket(BUCKET);
    let recorder = Arc::new(RecordingObserver::new());
    let map = RemoteMap::open(
        store.clone(),
        options("carry.json")
            .autosave(true)
            .default_data(map_of(json!({"seed": 1})))
            .observer(Arc::clone(&recorder) as Arc<dyn bucket_map::MapObserver>),
    )
    .await
    .unwrap();
    let saves = recorder.save_count();

    let mut fresh = map.from_keys(["a"], Some(json!(0))).await.unwrap();
    assert!(fresh.autosave());
    assert_eq!(recorder.save_count(), saves + 1);

    fresh.set("b", 2).await.unwrap();
    assert_eq!(remote(&store, "carry.json"), json!({"a": 0, "b": 2}));
    assert_eq!(recorder.save_count(), saves + 2);

    fresh.delete_remote().await.unwrap();
    fresh.load().await.unwrap();
    assert_eq!(fresh.snapshot(), map_of(json!({"seed": 1})));
    assert_eq!(remote(&store, "carry.json"), json!({"seed": 1}));
    assert!(matches!(
        recorder.history().last(),
        Some(MapEvent::Created { .. })
    ));
}

#[tokio::test]
async fn test_iteration_order_and_snapshot() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store, options("iter.json")).await.unwrap();
    map.update([("z", 1), ("a", 2), ("m", 3)]).await.unwrap();

    let keys: Vec<&String> = map.keys().collect();
    assert_eq!(keys, ["z", "a", "m"]);
    let values: Vec<&Value> = map.values().collect();
    assert_eq!(values, [&json!(1), &json!(2), &json!(3)]);

    let mut seen = Vec::new();
    for (k, v) in &map {
        seen.push((k.clone(), v.clone()));
    }
    assert_eq!(seen.len(), 3);

    let snapshot = map.snapshot();
    map.set("new", 4).await.unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(map.iter().count(), 4);
}

#[tokio::test]
async fn test_set_autosave_forces_save() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("as.json"))
        .await
        .unwrap();
    map.set("pending", 1).await.unwrap();
    assert_eq!(remote(&store, "as.json"), json!({}));

    map.set_autosave(true).await.unwrap();
    assert!(map.autosave());
    assert_eq!(remote(&store, "as.json"), json!({"pending": 1}));

    let puts = store.put_count();
    map.set_autosave(false).await.unwrap();
    assert_eq!(store.put_count(), puts);
}

#[tokio::test]
async fn test_accessors() {
    let store = MemoryStore::with_bucket(BUCKET);
    let map = RemoteMap::open(store, options("acc.json")).await.unwrap();
    assert_eq!(map.file_name(), "acc.json");
    assert_eq!(map.bucket_name(), BUCKET);
    assert_eq!(map.access_key_id(), "AKIDEXAMPLE");
    assert_eq!(map.credentials().secret_access_key, "secret");
    assert!(!map.autosave());
}

#[tokio::test]
async fn test_delete_remote() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("del.json"))
        .await
        .unwrap();
    map.set("k", 1).await.unwrap();

    map.delete_remote().await.unwrap();
    assert!(store.object(BUCKET, "del.json").is_none());
    assert!(matches!(map.get("k"), Err(MapError::KeyNotFound(_))));
    assert!(matches!(
        map.reload().await,
        Err(MapError::RemoteLoad {
            source: RemoteCause::Store(StoreError::NoSuchKey { .. }),
            ..
        })
    ));

    let err = map.delete_remote().await.unwrap_err();
    assert!(matches!(err, MapError::RemoteDelete { .. }));

    // load-or-create brings the object back
    map.load().await.unwrap();
    assert_eq!(remote(&store, "del.json"), json!({}));
}

#[tokio::test]
async fn test_delete_forbidden() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut map = RemoteMap::open(store.clone(), options("keep.json"))
        .await
        .unwrap();
    store.deny(StoreOp::Delete);

    let err = map.delete_remote().await.unwrap_err();
    assert!(matches!(
        err,
        MapError::RemoteDelete {
            source: StoreError::AccessDenied { .. },
            ..
        }
    ));
    assert!(store.object(BUCKET, "keep.json").is_some());
}

#[tokio::test]
async fn test_observer_sees_remote_activity() {
    let store = MemoryStore::with_bucket(BUCKET);
    let recorder = Arc::new(RecordingObserver::new());
    let mut map = RemoteMap::open(
        store,
        options("obs.json").observer(Arc::clone(&recorder) as Arc<dyn bucket_map::MapObserver>),
    )
    .await
    .unwrap();

    map.set("k", 1).await.unwrap();
    map.save(true).await.unwrap();

    let history = recorder.history();
    assert!(matches!(history[0], MapEvent::Created { .. }));
    assert!(matches!(history[1], MapEvent::Saved { bytes: 2, .. }));
    assert!(matches!(history[2], MapEvent::SaveSkipped { .. }));
    assert!(matches!(history[3], MapEvent::Saved { .. }));
    assert_eq!(recorder.save_count(), 2);
}

#[tokio::test]
async fn test_two_writers_last_save_wins() {
    let store = MemoryStore::with_bucket(BUCKET);
    let mut first = RemoteMap::open(store.clone(), options("race.json"))
        .await
        .unwrap();
    let mut second = RemoteMap::open(store.clone(), options("race.json"))
        .await
        .unwrap();

    first.set("writer", "first").await.unwrap();
    second.set("writer", "second").await.unwrap();
    second.save(true).await.unwrap();
    first.save(true).await.unwrap();

    assert_eq!(remote(&store, "race.json"), json!({"writer": "first"}));
}

#[tokio::test]
async fn test_fs_store_backed_map() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store.create_bucket(BUCKET).await.unwrap();

    let mut map = RemoteMap::open(store.clone(), options("disk/state.json").autosave(true))
        .await
        .unwrap();
    map.set("foo", "bar").await.unwrap();

    let on_disk = std::fs::read_to_string(dir.path().join(BUCKET).join("disk/state.json")).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&on_disk).unwrap(), json!({"foo": "bar"}));

    let reopened = RemoteMap::open(store, options("disk/state.json"))
        .await
        .unwrap();
    assert_eq!(reopened.get("foo").unwrap(), &json!("bar"));
}
