//! Terminal output: tables for lists, pretty JSON for single objects.

use chrono::DateTime;
use om_core::{Node, Pipeline, Service, SettingDefinition};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ServiceRow {
    name: String,
    group: String,
    state: String,
    nodes: String,
    modified: String,
}

#[derive(Tabled)]
struct NodeRow {
    hostname: String,
    port: String,
    user: String,
    state: String,
    services: usize,
    modified: String,
}

#[derive(Tabled)]
struct PipelineRow {
    name: String,
    group: String,
    objects: usize,
    running: usize,
    modified: String,
}

#[derive(Tabled)]
struct DefinitionRow {
    key: String,
    #[tabled(rename = "type")]
    value_type: String,
    default: String,
    necessary: String,
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Formats epoch milliseconds; `-` when the backend reported none.
pub fn timestamp(millis: i64) -> String {
    if millis <= 0 {
        return "-".to_string();
    }
    or_dash(
        DateTime::from_timestamp_millis(millis)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
    )
}

fn table<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows).with(Style::psql()).to_string()
}

pub fn services(items: &[Service]) -> String {
    table(
        items
            .iter()
            .map(|s| ServiceRow {
                name: s.name.clone(),
                group: s.group.clone(),
                state: or_dash(s.state.map(|st| format!("{:?}", st).to_uppercase())),
                nodes: s.node_names.iter().cloned().collect::<Vec<_>>().join(","),
                modified: timestamp(s.last_modified),
            })
            .collect(),
    )
}

pub fn nodes(items: &[Node]) -> String {
    table(
        items
            .iter()
            .map(|n| NodeRow {
                hostname: n.hostname.clone(),
                port: or_dash(n.port.map(|p| p.to_string())),
                user: or_dash(n.user.clone()),
                state: or_dash(n.state.map(|st| format!("{:?}", st).to_uppercase())),
                services: n.services.len(),
                modified: timestamp(n.last_modified),
            })
            .collect(),
    )
}

pub fn pipelines(items: &[Pipeline]) -> String {
    table(
        items
            .iter()
            .map(|p| PipelineRow {
                name: p.name.clone(),
                group: p.group.clone(),
                objects: p.objects.len(),
                running: p.objects.iter().filter(|o| o.state.is_some()).count(),
                modified: timestamp(p.last_modified),
            })
            .collect(),
    )
}

pub fn definitions(items: &[SettingDefinition]) -> String {
    table(
        items
            .iter()
            .map(|d| DefinitionRow {
                key: d.key.clone(),
                value_type: d.value_type.clone(),
                default: or_dash(d.default_value.as_ref().map(|v| v.to_string())),
                necessary: or_dash(d.necessary.clone()),
            })
            .collect(),
    )
}

pub fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp() {
        assert_eq!(timestamp(0), "-");
        assert_eq!(timestamp(1_600_000_000_000), "2020-09-13 12:26:40");
    }

    #[test]
    fn test_service_table() {
        let zk: Service = serde_json::from_value(json!({
            "name": "zk1",
            "state": "RUNNING",
            "nodeNames": ["n2", "n1"],
            "lastModified": 1_600_000_000_000i64
        }))
        .unwrap();
        let out = services(&[zk]);
        assert!(out.contains("zk1"));
        assert!(out.contains("RUNNING"));
        assert!(out.contains("n1,n2"));
        assert!(out.contains("default"));
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let out = pipelines(&[]);
        assert!(out.contains("name"));
        assert!(out.contains("objects"));
    }
}
