//! Lifecycle tests against the in-memory configurator.

use om_client::{ClientError, Method, ResourceApi, WaitConfig};
use om_core::{ObjectKey, ResourceKind, SchemaError, ServiceState};
use om_testkit::fixtures::{self, params, unique_name};
use om_testkit::{init_tracing, FakeConfigurator};
use serde_json::json;

#[tokio::test]
async fn test_create_then_get_returns_same_key() {
    init_tracing();
    let fake = FakeConfigurator::new();
    let zookeepers = fake.configurator().zookeepers();
    let key = ObjectKey::of(unique_name("zk"));

    let created = zookeepers
        .create(&fixtures::zookeeper_params(&key, &["n1"]))
        .await
        .unwrap();
    assert!(created.is_success(), "{:?}", created.errors);
    assert_eq!(created.title, format!("Create zookeeper {} successful.", key));

    let fetched = zookeepers.get(&key).await.unwrap();
    let zk = fetched.data.unwrap();
    assert_eq!(zk.object_key(), key);
    assert!(zk.node_names.contains("n1"));
}

#[tokio::test]
async fn test_cluster_create_uses_inspected_defaults() {
    let fake = FakeConfigurator::new();
    let zookeepers = fake.configurator().zookeepers();
    let key = ObjectKey::of("zk");

    let mut request = fixtures::zookeeper_params(&key, &["n1"]);
    request.insert("peerPort".into(), json!("2999"));
    request.insert("color".into(), json!("blue"));
    zookeepers.create(&request).await.unwrap();

    assert_eq!(fake.count(Method::Get, "/v0/inspect/zookeeper"), 1);
    let body = fake.last_body(Method::Post, "/v0/zookeepers").unwrap();
    assert_eq!(body["clientPort"], json!(2181));
    assert_eq!(body["peerPort"], json!(2999));
    assert_eq!(body["group"], json!("default"));
    assert!(body.get("color").is_none());
}

#[tokio::test]
async fn test_explicit_body_skips_inspection() {
    let fake = FakeConfigurator::new();
    let zookeepers = fake.configurator().zookeepers();
    let key = ObjectKey::of("zk");
    let body = params(json!({"clientPort": 3000, "jmxPort": 3001}));

    let res = zookeepers
        .create_with(&fixtures::zookeeper_params(&key, &["n1"]), Some(&body))
        .await
        .unwrap();
    assert!(res.is_success());
    assert_eq!(fake.count(Method::Get, "/v0/inspect/zookeeper"), 0);
    let sent = fake.last_body(Method::Post, "/v0/zookeepers").unwrap();
    assert_eq!(sent["jmxPort"], json!(3001));
}

#[tokio::test]
async fn test_missing_required_field_never_reaches_the_configurator() {
    let fake = FakeConfigurator::new();
    let brokers = fake.configurator().brokers();

    let res = brokers
        .create(&params(json!({"name": "bk", "nodeNames": ["n1"]})))
        .await;
    assert!(matches!(
        res,
        Err(ClientError::Schema(SchemaError::Missing(ref field))) if field == "zookeeperClusterKey"
    ));
    assert_eq!(fake.count(Method::Post, "/v0/brokers"), 0);
}

#[tokio::test]
async fn test_update_keeps_only_declared_settings() {
    let fake = FakeConfigurator::new();
    let configurator = fake.configurator();
    let zk = ObjectKey::of("zk");
    let zookeepers = configurator.zookeepers();
    zookeepers
        .create(&fixtures::zookeeper_params(&zk, &["n1"]))
        .await
        .unwrap();

    let res = zookeepers
        .update(&zk, &params(json!({"peerPort": "3000", "color": "blue"})))
        .await
        .unwrap();
    assert!(res.is_success(), "{:?}", res.errors);
    let body = fake.last_body(Method::Put, "/v0/zookeepers/zk").unwrap();
    assert_eq!(body["peerPort"], json!(3000));
    assert!(body.get("color").is_none());

    let bk = ObjectKey::of("bk");
    let topics = configurator.topics();
    topics
        .create(&fixtures::topic_params(&ObjectKey::of("t1"), &bk))
        .await
        .unwrap();
    topics
        .update(
            &ObjectKey::of("t1"),
            &params(json!({"numberOfPartitions": 3, "color": "blue"})),
        )
        .await
        .unwrap();
    let body = fake.last_body(Method::Put, "/v0/topics/t1").unwrap();
    assert_eq!(body["numberOfPartitions"], json!(3));
    assert!(body.get("color").is_none());

    // Connector settings are open-ended.
    let connectors = configurator.connectors();
    connectors
        .create(&params(json!({
            "name": "src",
            "connector.class": "perf",
            "workerClusterKey": "default/wk"
        })))
        .await
        .unwrap();
    connectors
        .update(&ObjectKey::of("src"), &params(json!({"perf.batch": 10})))
        .await
        .unwrap();
    let body = fake.last_body(Method::Put, "/v0/connectors/src").unwrap();
    assert_eq!(body["perf.batch"], json!(10));
}

#[tokio::test]
async fn test_start_then_stop() {
    let fake = FakeConfigurator::new();
    let zookeepers = fake.configurator().zookeepers();
    let key = ObjectKey::of("zk");
    zookeepers
        .create(&fixtures::zookeeper_params(&key, &["n1"]))
        .await
        .unwrap();

    let started = zookeepers.start(&key).await.unwrap();
    assert_eq!(started.title, "Start zookeeper default/zk successful.");
    assert_eq!(started.data.unwrap().state, Some(ServiceState::Running));
    // The transition lands on the second poll, then the object is re-read.
    assert_eq!(fake.count(Method::Get, "/v0/zookeepers/zk"), 3);

    let stopped = zookeepers.stop(&key).await.unwrap();
    assert!(stopped.is_success());
    assert_eq!(stopped.data.unwrap().state, None);
}

#[tokio::test]
async fn test_worker_start_waits_for_connect_then_refetches() {
    let fake = FakeConfigurator::new();
    let key = ObjectKey::of("wk");
    fake.seed_service(ResourceKind::Worker, json!({"name": "wk", "nodeNames": ["n1"]}));

    let started = fake.configurator().workers().start(&key).await.unwrap();
    assert!(started.data.unwrap().is_running());
    assert_eq!(fake.count(Method::Get, "/v0/inspect/worker/wk"), 2);
    assert_eq!(fake.count(Method::Get, "/v0/workers/wk"), 1);
}

#[tokio::test]
async fn test_remove_running_is_rejected() {
    let fake = FakeConfigurator::new();
    let topics = fake.configurator().topics();
    let key = ObjectKey::of("t1");
    fake.seed_service(ResourceKind::Topic, json!({"name": "t1", "state": "RUNNING"}));

    let res = topics.remove(&key).await.unwrap();
    assert!(!res.is_success());
    assert_eq!(res.title, "Remove topic default/t1 failed.");
    assert!(res.error_message().unwrap().contains("is running"));
    assert!(fake.service(ResourceKind::Topic, &key).is_some());

    topics.stop(&key).await.unwrap();
    let res = topics.remove(&key).await.unwrap();
    assert!(res.is_success());
    assert!(res.data.unwrap().is_empty());
    assert!(fake.service(ResourceKind::Topic, &key).is_none());
}

#[tokio::test]
async fn test_get_all_lists_every_created_object() {
    let fake = FakeConfigurator::new();
    let zookeepers = fake.configurator().zookeepers();
    let first = ObjectKey::of(unique_name("zk"));
    let second = ObjectKey::new(unique_name("zk"), "other");

    for key in [&first, &second] {
        zookeepers
            .create(&fixtures::zookeeper_params(key, &["n1"]))
            .await
            .unwrap();
    }

    let all = zookeepers.get_all(&Default::default()).await.unwrap();
    assert_eq!(all.title, "Get zookeeper list successful.");
    let keys: Vec<_> = all.data.unwrap().iter().map(|z| z.object_key()).collect();
    assert!(keys.contains(&first));
    assert!(keys.contains(&second));
}

#[tokio::test]
async fn test_wait_budget_exhaustion_fails_the_action() {
    let fake = FakeConfigurator::new();
    fake.set_lag(100);
    fake.seed_service(ResourceKind::Zookeeper, json!({"name": "zk"}));
    let zookeepers = fake
        .configurator_with(WaitConfig {
            interval_ms: 1,
            max_retry: 3,
        })
        .zookeepers();

    let res = zookeepers.start(&ObjectKey::of("zk")).await.unwrap();
    assert_eq!(res.title, "Start zookeeper default/zk failed.");
    assert_eq!(res.error_message().as_deref(), Some("WaitTimeout: exceed max retry"));
    assert_eq!(fake.count(Method::Get, "/v0/zookeepers/zk"), 3);
}

#[tokio::test]
async fn test_unknown_object_fails_without_polling() {
    let fake = FakeConfigurator::new();
    let res = fake
        .configurator()
        .streams()
        .start(&ObjectKey::of("missing"))
        .await
        .unwrap();
    assert!(!res.is_success());
    assert_eq!(fake.requests().len(), 1);
}

#[tokio::test]
async fn test_cluster_node_membership() {
    let fake = FakeConfigurator::new();
    fake.seed_node("n1");
    fake.seed_node("n2");
    fake.seed_service(
        ResourceKind::Broker,
        json!({"name": "bk", "state": "RUNNING", "nodeNames": ["n1"]}),
    );
    let brokers = fake.configurator().brokers();
    let key = ObjectKey::of("bk");

    let added = brokers.add_node(&key, "n2").await.unwrap();
    assert_eq!(added.title, "Add node to broker default/bk successful.");
    assert!(added.data.unwrap().node_names.contains("n2"));

    let removed = brokers.remove_node(&key, "n1").await.unwrap();
    assert_eq!(removed.title, "Remove node from broker default/bk successful.");
    let bk = removed.data.unwrap();
    assert!(!bk.node_names.contains("n1"));
    assert!(bk.node_names.contains("n2"));
}

#[tokio::test]
async fn test_node_membership_is_cluster_only() {
    let fake = FakeConfigurator::new();
    let res = fake
        .configurator()
        .topics()
        .add_node(&ObjectKey::of("t1"), "n1")
        .await;
    assert!(matches!(res, Err(ClientError::Unsupported(_, ResourceKind::Topic))));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_node_crud() {
    let fake = FakeConfigurator::new();
    let nodes = fake.configurator().nodes();

    let created = nodes.create(&fixtures::node_params("n1")).await.unwrap();
    assert_eq!(created.title, "Create node n1 successful.");

    let updated = nodes
        .update(&"n1".to_string(), &params(json!({"port": "2222", "hostname": "ignored"})))
        .await
        .unwrap();
    assert_eq!(updated.data.unwrap().port, Some(2222));
    let sent = fake.last_body(Method::Put, "/v0/nodes/n1").unwrap();
    assert!(sent.get("hostname").is_none());

    let res = nodes.start(&"n1".to_string()).await;
    assert!(matches!(res, Err(ClientError::Unsupported("start", ResourceKind::Node))));

    let remaining = nodes.remove(&"n1".to_string()).await.unwrap();
    assert_eq!(remaining.title, "Remove node n1 successful.");
    assert!(remaining.data.unwrap().is_empty());
}

#[tokio::test]
async fn test_pipeline_refresh() {
    let fake = FakeConfigurator::new();
    let pipelines = fake.configurator().pipelines();
    let key = ObjectKey::of("p1");
    pipelines
        .create(&params(json!({"name": "p1", "endpoints": []})))
        .await
        .unwrap();

    let refreshed = pipelines.refresh(&key).await.unwrap();
    assert_eq!(refreshed.title, "Refresh pipeline default/p1 successful.");
    assert_eq!(fake.count(Method::Put, "/v0/pipelines/p1/refresh"), 1);

    let missing = pipelines.refresh(&ObjectKey::of("p2")).await.unwrap();
    assert!(!missing.is_success());
}

#[tokio::test]
async fn test_transport_failure_is_an_error() {
    let fake = FakeConfigurator::new();
    fake.set_offline(true);
    let res = fake.configurator().nodes().get_all(&Default::default()).await;
    assert!(matches!(res, Err(ClientError::Transport(_))));
}
