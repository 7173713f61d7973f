//! # Resource Model
//!
//! Typed views of the objects the configurator hands back. Services are
//! addressed by an [`ObjectKey`] (`name` + `group`); nodes by hostname.
//! Anything the console does not model explicitly lands in the open
//! `settings` map so nothing the backend returns is lost on a round trip.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Group assigned to keys that do not name one.
pub const DEFAULT_GROUP: &str = "default";

/// Open key-value labels attached to any resource.
pub type Tags = Map<String, Value>;

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

// =============================================================================
// Keys & Kinds
// =============================================================================

/// Identity of a service object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub name: String,
    #[serde(default = "default_group")]
    pub group: String,
}

impl ObjectKey {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }

    /// Key in the default group.
    pub fn of(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_GROUP)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

/// Parses `group/name`, or a bare `name` in the default group.
impl FromStr for ObjectKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((group, name)) if !group.is_empty() && !name.is_empty() => {
                Ok(Self::new(name, group))
            }
            Some(_) => Err(format!("Invalid object key '{}'", s)),
            None if s.is_empty() => Err("Object key must not be empty".to_string()),
            None => Ok(Self::of(s)),
        }
    }
}

/// Every resource type the console manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Node,
    Zookeeper,
    Broker,
    Worker,
    Topic,
    Connector,
    Stream,
    Pipeline,
}

impl ResourceKind {
    /// Kinds served by the generic service API.
    pub const SERVICES: [ResourceKind; 6] = [
        Self::Zookeeper,
        Self::Broker,
        Self::Worker,
        Self::Topic,
        Self::Connector,
        Self::Stream,
    ];

    /// Path segment of the collection under `/v0`.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Node => "nodes",
            Self::Zookeeper => "zookeepers",
            Self::Broker => "brokers",
            Self::Worker => "workers",
            Self::Topic => "topics",
            Self::Connector => "connectors",
            Self::Stream => "streams",
            Self::Pipeline => "pipelines",
        }
    }

    /// Zookeeper, broker and worker clusters accept node membership changes.
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Zookeeper | Self::Broker | Self::Worker)
    }

    /// Whether the kind has a start/stop lifecycle.
    pub fn is_runnable(&self) -> bool {
        !matches!(self, Self::Node | Self::Pipeline)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Zookeeper => "zookeeper",
            Self::Broker => "broker",
            Self::Worker => "worker",
            Self::Topic => "topic",
            Self::Connector => "connector",
            Self::Stream => "stream",
            Self::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Run state reported for services. Absent means "not running".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    Running,
    Paused,
    Failed,
    Unassigned,
    Destroyed,
    #[serde(other)]
    Unknown,
}

/// Reachability of a node as seen by the configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Available,
    Unavailable,
}

// =============================================================================
// Resource trait
// =============================================================================

/// Anything a state container can cache.
pub trait Resource: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

// =============================================================================
// Services (zookeeper, broker, worker, topic, connector, stream)
// =============================================================================

/// A service object. Cluster kinds populate `node_names` and the
/// cluster-key references; everything else is kept in `settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ServiceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_modified: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub node_names: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zookeeper_cluster_key: Option<ObjectKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_cluster_key: Option<ObjectKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_cluster_key: Option<ObjectKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topic_keys: Vec<ObjectKey>,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Service {
    pub fn object_key(&self) -> ObjectKey {
        ObjectKey::new(self.name.clone(), self.group.clone())
    }

    pub fn is_running(&self) -> bool {
        self.state == Some(ServiceState::Running)
    }

    /// Topics tagged `type: private` belong to a single pipeline.
    pub fn is_private(&self) -> bool {
        is_private_tags(&self.tags)
    }
}

impl Resource for Service {
    type Key = ObjectKey;

    fn key(&self) -> ObjectKey {
        self.object_key()
    }
}

pub(crate) fn is_private_tags(tags: &Tags) -> bool {
    tags.get("type").and_then(Value::as_str) == Some("private")
}

// =============================================================================
// Nodes
// =============================================================================

/// A host the platform can schedule services onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NodeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_modified: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Tags,
    #[serde(default)]
    pub services: Vec<NodeService>,
    #[serde(default)]
    pub resources: Vec<Value>,
}

/// Services of one type deployed on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeService {
    pub name: String,
    #[serde(default)]
    pub cluster_keys: Vec<ObjectKey>,
}

impl Resource for Node {
    type Key = String;

    fn key(&self) -> String {
        self.hostname.clone()
    }
}

// =============================================================================
// Pipelines
// =============================================================================

/// Role of an element drawn on a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Source,
    Sink,
    Topic,
    Stream,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    #[serde(default = "default_group")]
    pub group: String,
    pub kind: ElementKind,
}

/// Runtime view of one pipeline element, as reported by the configurator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineObject {
    pub name: String,
    #[serde(default = "default_group")]
    pub group: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ServiceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub name: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub objects: Vec<PipelineObject>,
    pub last_modified: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Tags,
}

impl Resource for Pipeline {
    type Key = ObjectKey;

    fn key(&self) -> ObjectKey {
        ObjectKey::new(self.name.clone(), self.group.clone())
    }
}

/// One step of a pipeline teardown.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineService {
    pub key: ObjectKey,
    pub kind: ElementKind,
    pub state: Option<ServiceState>,
    pub tags: Tags,
}

impl PipelineService {
    /// Any reported state counts as running for teardown purposes.
    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_private(&self) -> bool {
        is_private_tags(&self.tags)
    }
}

impl From<&PipelineObject> for PipelineService {
    fn from(object: &PipelineObject) -> Self {
        Self {
            key: ObjectKey::new(object.name.clone(), object.group.clone()),
            kind: object.kind,
            state: object.state,
            tags: object.tags.clone(),
        }
    }
}

impl Pipeline {
    /// Elements in teardown order. Topic tags are resolved against
    /// `topics` because pipeline objects may not carry them.
    pub fn services(&self, topics: &[Service]) -> Vec<PipelineService> {
        self.objects
            .iter()
            .map(|object| {
                let mut service = PipelineService::from(object);
                if service.kind == ElementKind::Topic && service.tags.is_empty() {
                    if let Some(topic) = topics.iter().find(|t| t.object_key() == service.key) {
                        service.tags = topic.tags.clone();
                    }
                }
                service
            })
            .collect()
    }
}
