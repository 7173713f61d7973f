//! Request parameters for the common test objects.

use om_core::ObjectKey;
use serde_json::{json, Map, Value};

/// A fresh lowercase alphanumeric name, valid as a service name.
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &id[..8])
}

pub fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn node_params(hostname: &str) -> Map<String, Value> {
    params(json!({"hostname": hostname, "port": 22, "user": "ohara", "password": "ohara"}))
}

pub fn zookeeper_params(key: &ObjectKey, nodes: &[&str]) -> Map<String, Value> {
    params(json!({"name": key.name, "group": key.group, "nodeNames": nodes}))
}

pub fn broker_params(key: &ObjectKey, zookeeper: &ObjectKey, nodes: &[&str]) -> Map<String, Value> {
    params(json!({
        "name": key.name,
        "group": key.group,
        "nodeNames": nodes,
        "zookeeperClusterKey": zookeeper,
    }))
}

pub fn worker_params(key: &ObjectKey, broker: &ObjectKey, nodes: &[&str]) -> Map<String, Value> {
    params(json!({
        "name": key.name,
        "group": key.group,
        "nodeNames": nodes,
        "brokerClusterKey": broker,
    }))
}

pub fn topic_params(key: &ObjectKey, broker: &ObjectKey) -> Map<String, Value> {
    params(json!({
        "name": key.name,
        "group": key.group,
        "brokerClusterKey": broker,
        "numberOfPartitions": "1",
    }))
}
