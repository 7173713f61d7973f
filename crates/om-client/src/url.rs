//! Path and query builders for the configurator's `/v0` surface.

use om_core::{ObjectKey, ResourceKind};
use serde_json::{Map, Value};

pub const API_PREFIX: &str = "/v0";

pub fn collection(kind: ResourceKind) -> String {
    format!("{}/{}", API_PREFIX, kind.collection())
}

/// `/v0/{kind}/{name}`; pair with [`group_query`] for grouped objects.
pub fn object(kind: ResourceKind, name: &str) -> String {
    format!("{}/{}", collection(kind), name)
}

/// Sub-resource of an object: `start`, `stop`, `refresh` or a node name.
pub fn action(kind: ResourceKind, name: &str, action: &str) -> String {
    format!("{}/{}", object(kind, name), action)
}

pub fn inspect(kind: ResourceKind) -> String {
    format!("{}/inspect/{}", API_PREFIX, kind.label())
}

pub fn inspect_object(kind: ResourceKind, name: &str) -> String {
    format!("{}/{}", inspect(kind), name)
}

pub fn group_query(key: &ObjectKey) -> Vec<(String, String)> {
    vec![("group".to_string(), key.group.clone())]
}

/// Flattens filter parameters into query pairs; nulls are skipped and
/// non-string values are rendered as JSON.
pub fn to_query_parameters(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = v
                .as_str()
                .map(ToString::to_string)
                .unwrap_or_else(|| v.to_string());
            (k.clone(), value)
        })
        .collect()
}
