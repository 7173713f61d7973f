use om_client::Method;
use om_console::{Console, Severity, StoreError};
use om_core::{reducer, Action, ObjectKey, ResourceKind, ServiceState};
use om_testkit::fixtures::{self, params};
use om_testkit::{init_tracing, FakeConfigurator};
use serde_json::json;

#[tokio::test]
async fn test_fetch_all_hits_the_network_once() {
    init_tracing();
    let fake = FakeConfigurator::new();
    fake.seed_node("n1");
    let console = Console::new(fake.configurator());

    let first = console.nodes.fetch_all().await.unwrap();
    assert_eq!(first.unwrap().len(), 1);
    let second = console.nodes.fetch_all().await.unwrap();
    assert!(second.is_none());

    assert_eq!(fake.count(Method::Get, "/v0/nodes"), 1);
    let state = console.nodes.state().await;
    assert!(state.last_updated.is_some());
    assert!(!state.is_fetching);
}

#[tokio::test]
async fn test_recorded_error_blocks_fetch_until_refresh() {
    let fake = FakeConfigurator::new();
    fake.set_offline(true);
    let console = Console::new(fake.configurator());
    let mut events = console.subscribe();

    let res = console.brokers.fetch_all().await;
    assert!(matches!(res, Err(StoreError::Client(_))));
    assert!(console.brokers.state().await.error.is_some());

    let event = events.recv().await.unwrap();
    assert_eq!(event.severity, Severity::Error);
    assert_eq!(event.title, "Get broker list failed.");

    fake.set_offline(false);
    assert!(console.brokers.fetch_all().await.unwrap().is_none());
    assert_eq!(fake.count(Method::Get, "/v0/brokers"), 1);

    let refreshed = console.brokers.refresh().await.unwrap();
    assert_eq!(refreshed, Some(vec![]));
    assert!(console.brokers.state().await.error.is_none());
}

#[tokio::test]
async fn test_lifecycle_updates_cache_and_notifies() {
    let fake = FakeConfigurator::new();
    let console = Console::new(fake.configurator());
    let mut events = console.subscribe();
    let key = ObjectKey::of("zk");

    console
        .zookeepers
        .create(&fixtures::zookeeper_params(&key, &["n1"]))
        .await
        .unwrap();
    assert_eq!(
        events.recv().await.unwrap().title,
        "Create zookeeper default/zk successful."
    );

    console.zookeepers.start(&key).await.unwrap();
    let cached = console.zookeepers.find(&key).await.unwrap();
    assert_eq!(cached.state, Some(ServiceState::Running));
    // Loading entries one by one does not count as a full load.
    assert!(console.zookeepers.state().await.last_updated.is_none());

    let res = console.zookeepers.remove(&key).await;
    match res {
        Err(StoreError::Failed { title, message }) => {
            assert_eq!(title, "Remove zookeeper default/zk failed.");
            assert!(message.contains("is running"));
        }
        other => panic!("expected a failed removal, got {:?}", other),
    }
    assert!(console.zookeepers.find(&key).await.is_some());

    console.zookeepers.stop(&key).await.unwrap();
    let remaining = console.zookeepers.remove(&key).await.unwrap().unwrap();
    assert!(remaining.is_empty());
    assert!(console.zookeepers.data().await.is_empty());
}

#[tokio::test]
async fn test_failed_create_notifies_with_the_object_key() {
    let fake = FakeConfigurator::new();
    let console = Console::new(fake.configurator());
    let zk = fixtures::zookeeper_params(&ObjectKey::of("zk"), &["n1"]);
    console.zookeepers.create(&zk).await.unwrap();

    let mut events = console.subscribe();
    let res = console.zookeepers.create(&zk).await;
    assert!(matches!(res, Err(StoreError::Failed { .. })));
    let event = events.recv().await.unwrap();
    assert_eq!(event.severity, Severity::Error);
    assert_eq!(event.title, "Create zookeeper default/zk failed.");
    assert!(event.message.unwrap().contains("exists"));

    // Rejected before any request is sent: the key still names the object.
    let res = console
        .brokers
        .create(&params(json!({"name": "bk", "nodeNames": ["n1"]})))
        .await;
    assert!(matches!(res, Err(StoreError::Client(_))));
    let event = events.recv().await.unwrap();
    assert_eq!(event.title, "Create broker default/bk failed.");
    assert_eq!(fake.count(Method::Post, "/v0/brokers"), 0);
}

#[tokio::test]
async fn test_create_and_start_caches_the_running_cluster() {
    let fake = FakeConfigurator::new();
    let console = Console::new(fake.configurator());
    let key = ObjectKey::of("zk");
    let mut events = console.subscribe();

    let started = console
        .zookeepers
        .create_and_start(&fixtures::zookeeper_params(&key, &["n1"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(started.state, Some(ServiceState::Running));
    assert_eq!(
        console.zookeepers.find(&key).await.unwrap().state,
        Some(ServiceState::Running)
    );
    assert_eq!(fake.count(Method::Post, "/v0/zookeepers"), 1);
    assert_eq!(fake.count(Method::Put, "/v0/zookeepers/zk/start"), 1);

    assert_eq!(
        events.recv().await.unwrap().title,
        "Create zookeeper default/zk successful."
    );
    assert_eq!(
        events.recv().await.unwrap().title,
        "Start zookeeper default/zk successful."
    );
}

#[tokio::test]
async fn test_mutations_are_skipped_while_busy() {
    let fake = FakeConfigurator::new();
    let console = Console::new(fake.configurator());
    console
        .topics
        .dispatch(reducer::FETCH.request())
        .await;

    let res = console
        .topics
        .create(&fixtures::topic_params(&ObjectKey::of("t1"), &ObjectKey::of("bk")))
        .await
        .unwrap();
    assert!(res.is_none());
    assert!(fake.requests().is_empty());

    console.topics.dispatch(Action::Reset).await;
    assert!(!console.topics.state().await.is_fetching);
}

#[tokio::test]
async fn test_apply_staged_sends_only_the_diff() {
    let fake = FakeConfigurator::new();
    fake.seed_service(
        ResourceKind::Zookeeper,
        json!({"name": "zk", "clientPort": 2181, "peerPort": 2888}),
    );
    let console = Console::new(fake.configurator());
    let key = ObjectKey::of("zk");
    console.zookeepers.fetch_all().await.unwrap();

    console
        .zookeepers
        .stage(&key, params(json!({"clientPort": 2181, "peerPort": 3000})))
        .await;
    assert_eq!(
        console.zookeepers.staged(&key).await,
        Some(params(json!({"peerPort": 3000})))
    );

    let updated = console.zookeepers.apply_staged(&key).await.unwrap().unwrap();
    assert_eq!(updated.settings["peerPort"], json!(3000));
    assert_eq!(
        fake.last_body(Method::Put, "/v0/zookeepers/zk"),
        Some(json!({"peerPort": 3000}))
    );
    assert!(console.zookeepers.staged(&key).await.is_none());

    // Nothing differs any more: no request.
    fake.clear_log();
    console
        .zookeepers
        .stage(&key, params(json!({"peerPort": 3000})))
        .await;
    assert!(console.zookeepers.apply_staged(&key).await.unwrap().is_none());
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_close_resets_every_store() {
    let fake = FakeConfigurator::new();
    fake.seed_node("n1");
    let console = Console::new(fake.configurator());
    console.nodes.fetch_all().await.unwrap();
    console.pipelines.fetch_all().await.unwrap();

    console.close().await;

    assert!(console.nodes.data().await.is_empty());
    assert!(console.nodes.state().await.should_fetch());
    assert!(console.pipelines.state().await.should_fetch());
}
