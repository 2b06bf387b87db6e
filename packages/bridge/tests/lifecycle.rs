#![cfg(feature = "test-utils")]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use lockbox_bridge::testing::{FakeEngine, RecordingDispatcher};
use lockbox_bridge::{
    BridgeConfig, BroadcastDispatcher, CallbackFunction, DataStoreBridge, DataStoreError,
    DataStoreEvent, EngineError, Item, ItemEntry, OperationKind,
};

const WAIT: Duration = Duration::from_secs(2);
const SETTLE: Duration = Duration::from_millis(30);

struct Harness {
    bridge: DataStoreBridge,
    engine: Arc<FakeEngine>,
    events: Arc<RecordingDispatcher>,
}

fn harness_with(config: BridgeConfig, auto_reply: bool) -> Harness {
    let (engine, notifications) = FakeEngine::new(auto_reply);
    let events = RecordingDispatcher::new();
    let bridge = DataStoreBridge::new(config, Arc::clone(&engine), Arc::clone(&events));
    bridge.spawn_ingest(notifications);
    Harness {
        bridge,
        engine,
        events,
    }
}

fn harness(auto_reply: bool) -> Harness {
    harness_with(BridgeConfig::with_bundle_path("/app/bundle"), auto_reply)
}

async fn ready_and_open(h: &Harness) {
    h.engine.finish_loading();
    h.bridge.open("user-1").await.unwrap();
}

fn login(id: &str) -> Item {
    Item::builder()
        .id(id)
        .title("Amazon")
        .origins(["amazon.com"])
        .entry(ItemEntry::login("tjacobson", "hunter2"))
        .build()
}

#[tokio::test]
async fn test_open_waits_for_engine_ready() {
    let h = harness(true);

    let open = h.bridge.open("user-1");
    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.engine.count("swiftOpen"), 0);
    assert!(h.events.events().is_empty());

    h.engine.finish_loading();
    tokio::time::timeout(WAIT, open).await.unwrap().unwrap();

    assert_eq!(h.engine.count("swiftOpen"), 1);
    assert_eq!(h.events.events(), vec![DataStoreEvent::Opened(true)]);
    assert!(h.bridge.is_opened());
}

#[tokio::test]
async fn test_open_after_engine_ready_replays() {
    let h = harness(true);
    h.engine.finish_loading();
    h.engine.finish_loading();

    while !h.bridge.is_engine_ready() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    tokio::time::timeout(WAIT, h.bridge.open("user-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.events.events(), vec![DataStoreEvent::Opened(true)]);
}

#[tokio::test]
async fn test_operations_wait_for_open() {
    let h = harness(true);
    h.engine.finish_loading();

    let initialize = h.bridge.initialize(r#"{"kty":"oct"}"#);
    let unlock = h.bridge.unlock(r#"{"kty":"oct"}"#);
    let lock = h.bridge.lock();
    let refresh_initialized = h.bridge.refresh_initialized();
    let refresh_locked = h.bridge.refresh_locked();
    let bridge = h.bridge.clone();
    let is_initialized = tokio::spawn(async move { bridge.is_initialized().await });
    let bridge = h.bridge.clone();
    let is_locked = tokio::spawn(async move { bridge.is_locked().await });
    tokio::time::sleep(SETTLE).await;

    assert!(h.engine.scripts().is_empty());
    assert!(h.events.events().is_empty());

    h.bridge.open("user-1").await.unwrap();
    for handle in [initialize, unlock, lock, refresh_initialized, refresh_locked] {
        tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    }
    assert!(is_initialized.await.unwrap().is_ok());
    assert!(is_locked.await.unwrap().is_ok());

    assert_eq!(h.engine.count("swiftOpen"), 1);
    assert_eq!(h.engine.count(".initialize("), 1);
    assert_eq!(h.engine.count(".unlock("), 1);
    assert_eq!(h.engine.count(".lock()"), 1);
    // One read each from the refresh and the direct status call.
    assert_eq!(h.engine.count("ds.initialized"), 2);
    assert_eq!(h.engine.count("ds.locked"), 2);

    assert!(h.events.errors().is_empty());
    assert_eq!(h.events.count(|e| *e == DataStoreEvent::Opened(true)), 1);
    assert_eq!(h.events.count(|e| *e == DataStoreEvent::Initialized(true)), 1);
    assert_eq!(h.events.count(|e| *e == DataStoreEvent::Locked(true)), 1);
    assert_eq!(h.events.count(|e| *e == DataStoreEvent::Locked(false)), 1);
    assert_eq!(h.events.events().len(), 6);
}

#[tokio::test]
async fn test_list_and_touch_wait_for_open() {
    let h = harness(true);
    h.engine.finish_loading();
    h.engine.set_initialized(true);
    h.engine.set_list_payload(json!([["id1", {
        "id": "id1", "title": "Amazon", "origins": [],
        "entry": {"kind": "login", "username": "tj", "password": "pw"}
    }]]));

    let list = h.bridge.list();
    let touch = h.bridge.touch(login("id1"));
    tokio::time::sleep(SETTLE).await;

    assert!(h.engine.scripts().is_empty());
    assert!(h.events.events().is_empty());

    h.bridge.open("user-1").await.unwrap();
    tokio::time::timeout(WAIT, list).await.unwrap().unwrap();
    tokio::time::timeout(WAIT, touch).await.unwrap().unwrap();

    assert_eq!(h.engine.count("ds.list()"), 1);
    assert_eq!(h.engine.count(".touch("), 1);
    assert!(h.events.errors().is_empty());
    assert_eq!(
        h.events
            .count(|e| matches!(e, DataStoreEvent::ItemsListed(items) if items.contains_key("id1"))),
        1
    );
    assert_eq!(
        h.events.count(|e| *e == DataStoreEvent::ItemUpdated(login("id1"))),
        1
    );
}

#[tokio::test]
async fn test_full_session() {
    let h = harness(true);
    ready_and_open(&h).await;

    h.bridge.initialize(r#"{"kty":"oct","k":"abc"}"#).await.unwrap();
    h.engine.set_list_payload(json!([
        ["id1", {"id": "id1", "title": "Amazon", "origins": ["amazon.com"],
                 "entry": {"kind": "login", "username": "tj", "password": "pw"}}],
    ]));
    h.bridge.list().await.unwrap();
    h.bridge.lock().await.unwrap();
    h.bridge.list().await.unwrap();
    h.bridge.unlock(r#"{"kty":"oct","k":"abc"}"#).await.unwrap();
    h.bridge.touch(login("id1")).await.unwrap();

    let events = h.events.events();
    assert_eq!(events[0], DataStoreEvent::Opened(true));
    assert_eq!(events[1], DataStoreEvent::Initialized(true));
    let DataStoreEvent::ItemsListed(items) = &events[2] else {
        panic!("expected a listing, got {:?}", events[2]);
    };
    assert_eq!(items.keys().collect::<Vec<_>>(), vec!["id1"]);
    assert_eq!(events[3], DataStoreEvent::Locked(true));
    assert_eq!(events[4], DataStoreEvent::Error(DataStoreError::Locked));
    assert_eq!(events[5], DataStoreEvent::Locked(false));
    assert_eq!(events[6], DataStoreEvent::ItemUpdated(login("id1")));
    assert_eq!(events.len(), 7);

    // The locked listing never reached the engine.
    assert_eq!(h.engine.count("ds.list()"), 1);
}

#[tokio::test]
async fn test_list_when_not_initialized() {
    let h = harness(true);
    ready_and_open(&h).await;

    h.bridge.list().await.unwrap();

    assert_eq!(h.events.errors(), vec![DataStoreError::NotInitialized]);
    assert_eq!(h.engine.count("ds.list()"), 0);
    assert_eq!(h.engine.count("ds.locked"), 0);
    assert_eq!(h.bridge.pending(OperationKind::List), 0);
}

#[tokio::test]
async fn test_touch_without_id() {
    let h = harness(true);
    let item = Item::builder()
        .title("No id")
        .entry(ItemEntry::login("u", "p"))
        .build();

    h.bridge.touch(item).await.unwrap();

    assert_eq!(
        h.events.events(),
        vec![DataStoreEvent::Error(DataStoreError::NoIdPassed)]
    );
    assert!(h.engine.scripts().is_empty());
}

#[tokio::test]
async fn test_failed_initialize_does_not_poison_next() {
    let h = harness(true);
    ready_and_open(&h).await;
    h.engine.fail_next(
        ".initialize(",
        EngineError::Evaluation("TypeError: bad key".into()),
    );

    h.bridge.initialize("{}").await.unwrap();
    h.bridge.initialize("{}").await.unwrap();

    let events = h.events.events();
    assert!(matches!(
        &events[1],
        DataStoreEvent::Error(DataStoreError::Engine { message }) if message.contains("bad key")
    ));
    assert_eq!(events[2], DataStoreEvent::Initialized(true));
}

#[tokio::test]
async fn test_failed_open_can_be_retried() {
    let h = harness(true);
    h.engine.finish_loading();
    h.engine
        .fail_next("swiftOpen", EngineError::Evaluation("no salt".into()));

    h.bridge.open("user-1").await.unwrap();
    assert!(!h.bridge.is_opened());
    assert!(h.events.events()[0].is_error());

    h.bridge.open("user-1").await.unwrap();
    assert!(h.bridge.is_opened());
    assert_eq!(h.events.events()[1], DataStoreEvent::Opened(true));
}

#[tokio::test]
async fn test_concurrent_opens_each_get_one_completion() {
    let h = harness(false);
    h.engine.finish_loading();

    let first = h.bridge.open("user-1");
    let second = h.bridge.open("user-1");
    h.engine.wait_for_script("swiftOpen", 2, WAIT).await;
    assert_eq!(h.bridge.pending(OperationKind::Open), 2);

    h.engine.post_message("OpenComplete", json!(null));
    h.events.wait_for(1, WAIT).await;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.events.events(), vec![DataStoreEvent::Opened(true)]);
    assert_eq!(h.bridge.pending(OperationKind::Open), 1);

    h.engine.post_message("OpenComplete", json!(null));
    let events = h.events.wait_for(2, WAIT).await;
    assert_eq!(events, vec![DataStoreEvent::Opened(true); 2]);

    first.await.unwrap();
    second.await.unwrap();
}

#[tokio::test]
async fn test_timeout_then_recovery() {
    let mut config = BridgeConfig::with_bundle_path("/app/bundle");
    config.callback_timeout_ms = Some(50);
    let h = harness_with(config, true);
    ready_and_open(&h).await;

    h.engine.set_auto_reply(false);
    h.bridge.initialize("{}").await.unwrap();
    assert_eq!(
        h.events.errors(),
        vec![DataStoreError::Timeout {
            operation: "initialize"
        }]
    );
    assert_eq!(h.bridge.pending(OperationKind::Initialize), 0);

    h.engine.set_auto_reply(true);
    h.bridge.initialize("{}").await.unwrap();
    assert_eq!(
        h.events.events().last(),
        Some(&DataStoreEvent::Initialized(true))
    );
}

#[tokio::test]
async fn test_load_dispatches_closed_and_registers_callbacks() {
    let bundle = tempfile::tempdir().unwrap();
    let h = harness_with(BridgeConfig::with_bundle_path(bundle.path()), true);

    h.bridge.load().await;

    assert_eq!(h.events.events(), vec![DataStoreEvent::Opened(false)]);
    let loads = h.engine.loads();
    assert_eq!(loads.len(), 1);
    let (page, base, callbacks) = &loads[0];
    assert_eq!(page.scheme(), "file");
    assert!(page.path().ends_with("/lockbox-datastore/index.html"));
    assert!(base.path().ends_with("/lockbox-datastore/"));
    assert_eq!(callbacks.as_slice(), &CallbackFunction::ALL);
}

#[tokio::test]
async fn test_load_with_relative_bundle() {
    let h = harness_with(BridgeConfig::with_bundle_path("relative/bundle"), true);

    h.bridge.load().await;

    assert_eq!(
        h.events.events(),
        vec![DataStoreEvent::Error(DataStoreError::Unknown)]
    );
    assert!(h.engine.loads().is_empty());
}

#[tokio::test]
async fn test_load_failure_is_reported() {
    let h = harness(true);
    h.engine.fail_load(EngineError::Load("missing page".into()));

    h.bridge.load().await;

    let events = h.events.events();
    assert_eq!(events[0], DataStoreEvent::Opened(false));
    assert!(matches!(
        &events[1],
        DataStoreEvent::Error(DataStoreError::Engine { .. })
    ));
}

#[tokio::test]
async fn test_broadcast_subscribers_see_events() {
    let (engine, notifications) = FakeEngine::new(true);
    let bus = BroadcastDispatcher::new(16);
    let mut rx = bus.subscribe();
    let bridge = DataStoreBridge::launch(
        BridgeConfig::with_bundle_path("/app/bundle"),
        Arc::clone(&engine),
        bus.clone(),
    )
    .await;
    bridge.spawn_ingest(notifications);
    engine.finish_loading();
    bridge.open("user-1").await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), DataStoreEvent::Opened(false));
    assert_eq!(rx.recv().await.unwrap(), DataStoreEvent::Opened(true));
}
