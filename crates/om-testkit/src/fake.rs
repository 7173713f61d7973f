//! # In-memory configurator
//!
//! Implements [`Transport`] against a small model of the configurator:
//! objects are stored as JSON, start/stop settle only after `lag` polls of
//! the object, deleting a running service is rejected with 409 and every
//! request is recorded for later assertions.

use async_trait::async_trait;
use om_client::{ClientError, Configurator, Method, Request, Response, Transport, WaitConfig};
use om_core::{ApiError, ObjectKey, ResourceKind, DEFAULT_GROUP};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Start,
    Stop,
}

#[derive(Default)]
struct World {
    services: BTreeMap<(String, ObjectKey), Value>,
    nodes: BTreeMap<String, Value>,
    pipelines: BTreeMap<ObjectKey, Value>,
    /// Pending transition and the polls left before it lands.
    pending: HashMap<(String, ObjectKey), (Transition, u32)>,
    log: Vec<Request>,
    clock: i64,
    lag: u32,
    offline: bool,
}

pub struct FakeConfigurator {
    world: Mutex<World>,
}

fn kind_of(collection: &str) -> Option<ResourceKind> {
    [ResourceKind::Node, ResourceKind::Pipeline]
        .into_iter()
        .chain(ResourceKind::SERVICES)
        .find(|kind| kind.collection() == collection)
}

fn not_found(what: impl std::fmt::Display) -> Response {
    Response::failed(
        404,
        vec![ApiError::with_code(
            "NoSuchElementException",
            format!("{} does not exist", what),
        )],
    )
}

fn conflict(message: String) -> Response {
    Response::failed(409, vec![ApiError::with_code("IllegalArgumentException", message)])
}

fn bad_request(message: &str) -> Response {
    Response::failed(400, vec![ApiError::with_code("IllegalArgumentException", message)])
}

fn accepted() -> Response {
    Response::ok(202, Value::Null)
}

fn merge(target: &mut Value, body: &Option<Value>) {
    if let (Some(target), Some(Value::Object(body))) = (target.as_object_mut(), body) {
        for (k, v) in body {
            target.insert(k.clone(), v.clone());
        }
    }
}

fn definitions(kind: ResourceKind) -> Value {
    match kind {
        ResourceKind::Zookeeper => json!([
            {"key": "clientPort", "valueType": "BINDING_PORT", "defaultValue": 2181},
            {"key": "peerPort", "valueType": "BINDING_PORT", "defaultValue": 2888},
            {"key": "nodeNames", "valueType": "ARRAY"}
        ]),
        ResourceKind::Broker => json!([
            {"key": "clientPort", "valueType": "BINDING_PORT", "defaultValue": 9092},
            {"key": "log.dirs", "valueType": "STRING", "defaultValue": "/tmp/broker/data"}
        ]),
        ResourceKind::Worker => json!([
            {"key": "clientPort", "valueType": "BINDING_PORT", "defaultValue": 8083},
            {"key": "groupId", "valueType": "STRING", "defaultValue": "connect"}
        ]),
        _ => json!([]),
    }
}

impl World {
    fn now(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    /// Advances a pending transition of the object by one poll.
    fn tick(&mut self, collection: &str, key: &ObjectKey) {
        let id = (collection.to_string(), key.clone());
        let Some((transition, left)) = self.pending.get_mut(&id) else {
            return;
        };
        if *left > 0 {
            *left -= 1;
            return;
        }
        let transition = *transition;
        self.pending.remove(&id);
        if let Some(obj) = self.services.get_mut(&id).and_then(Value::as_object_mut) {
            match transition {
                Transition::Start => {
                    obj.insert("state".to_string(), json!("RUNNING"));
                }
                Transition::Stop => {
                    obj.remove("state");
                }
            }
        }
    }

    fn route(&mut self, request: &Request) -> Response {
        let Some(rest) = request.path.strip_prefix("/v0/") else {
            return not_found(&request.path);
        };
        let segments: Vec<&str> = rest.split('/').collect();
        let group = request.query_value("group").unwrap_or(DEFAULT_GROUP).to_string();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["inspect", "worker", name]) => {
                let key = ObjectKey::new(*name, group);
                self.tick("workers", &key);
                match self.services.get(&("workers".to_string(), key.clone())) {
                    Some(worker) if worker.get("state").is_some() => Response::ok(
                        200,
                        json!({"classInfos": [{
                            "className": "oharastream.ohara.connector.perf.PerfSource",
                            "classType": "source",
                            "settingDefinitions": []
                        }]}),
                    ),
                    Some(_) => Response::ok(200, json!({"classInfos": []})),
                    None => not_found(key),
                }
            }
            (Method::Get, ["inspect", label]) => {
                match ResourceKind::SERVICES.into_iter().find(|k| k.label() == *label) {
                    Some(kind) => Response::ok(
                        200,
                        json!({"imageName": format!("oharastream/{}", label), "settingDefinitions": definitions(kind)}),
                    ),
                    None => not_found(label),
                }
            }
            (_, [collection, tail @ ..]) => match kind_of(collection) {
                Some(ResourceKind::Node) => self.route_node(request, tail),
                Some(ResourceKind::Pipeline) => self.route_pipeline(request, tail, group),
                Some(kind) => self.route_service(request, kind, tail, group),
                None => not_found(&request.path),
            },
            _ => not_found(&request.path),
        }
    }

    fn route_node(&mut self, request: &Request, tail: &[&str]) -> Response {
        match (request.method, tail) {
            (Method::Get, []) => Response::ok(200, Value::Array(self.nodes.values().cloned().collect())),
            (Method::Post, []) => {
                let mut body = request.body.clone().unwrap_or(Value::Null);
                let Some(host) = body.get("hostname").and_then(Value::as_str).map(String::from) else {
                    return bad_request("hostname is required");
                };
                if self.nodes.contains_key(&host) {
                    return conflict(format!("node {} exists", host));
                }
                let now = self.now();
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("lastModified".to_string(), json!(now));
                    obj.insert("state".to_string(), json!("AVAILABLE"));
                }
                self.nodes.insert(host, body.clone());
                Response::ok(200, body)
            }
            (Method::Get, [host]) => match self.nodes.get(*host) {
                Some(node) => Response::ok(200, node.clone()),
                None => not_found(host),
            },
            (Method::Put, [host]) => {
                let now = self.now();
                match self.nodes.get_mut(*host) {
                    Some(node) => {
                        merge(node, &request.body);
                        merge(node, &Some(json!({"lastModified": now})));
                        Response::ok(200, node.clone())
                    }
                    None => not_found(host),
                }
            }
            (Method::Delete, [host]) => match self.nodes.remove(*host) {
                Some(_) => accepted(),
                None => not_found(host),
            },
            _ => not_found(&request.path),
        }
    }

    fn route_pipeline(&mut self, request: &Request, tail: &[&str], group: String) -> Response {
        match (request.method, tail) {
            (Method::Get, []) => Response::ok(200, Value::Array(self.pipelines.values().cloned().collect())),
            (Method::Post, []) => {
                let mut body = request.body.clone().unwrap_or(Value::Null);
                let Some(key) = object_key(&body) else {
                    return bad_request("name is required");
                };
                if self.pipelines.contains_key(&key) {
                    return conflict(format!("pipeline {} exists", key));
                }
                let now = self.now();
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("lastModified".to_string(), json!(now));
                    obj.entry("objects").or_insert_with(|| json!([]));
                }
                self.pipelines.insert(key, body.clone());
                Response::ok(200, body)
            }
            (method, [name, rest @ ..]) => {
                let key = ObjectKey::new(*name, group);
                match (method, rest) {
                    (Method::Get, []) | (Method::Put, ["refresh"]) if !self.pipelines.contains_key(&key) => {
                        not_found(key)
                    }
                    (Method::Get, []) => Response::ok(200, self.pipelines[&key].clone()),
                    (Method::Put, ["refresh"]) => accepted(),
                    (Method::Put, []) => {
                        let now = self.now();
                        match self.pipelines.get_mut(&key) {
                            Some(pipeline) => {
                                merge(pipeline, &request.body);
                                merge(pipeline, &Some(json!({"lastModified": now})));
                                Response::ok(200, pipeline.clone())
                            }
                            None => not_found(key),
                        }
                    }
                    (Method::Delete, []) => match self.pipelines.remove(&key) {
                        Some(_) => accepted(),
                        None => not_found(key),
                    },
                    _ => not_found(&request.path),
                }
            }
            _ => not_found(&request.path),
        }
    }

    fn route_service(
        &mut self,
        request: &Request,
        kind: ResourceKind,
        tail: &[&str],
        group: String,
    ) -> Response {
        let collection = kind.collection().to_string();
        match (request.method, tail) {
            (Method::Get, []) => {
                let items = self
                    .services
                    .iter()
                    .filter(|((c, _), _)| *c == collection)
                    .map(|(_, v)| v.clone())
                    .collect();
                Response::ok(200, Value::Array(items))
            }
            (Method::Post, []) => {
                let mut body = request.body.clone().unwrap_or(Value::Null);
                let Some(key) = object_key(&body) else {
                    return bad_request("name is required");
                };
                let id = (collection, key.clone());
                if self.services.contains_key(&id) {
                    return conflict(format!("{} {} exists", kind, key));
                }
                let now = self.now();
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("lastModified".to_string(), json!(now));
                }
                self.services.insert(id, body.clone());
                Response::ok(200, body)
            }
            (method, [name, rest @ ..]) => {
                let key = ObjectKey::new(*name, group);
                let id = (collection.clone(), key.clone());
                if !self.services.contains_key(&id) {
                    return not_found(key);
                }
                match (method, rest) {
                    (Method::Get, []) => {
                        self.tick(&collection, &key);
                        Response::ok(200, self.services[&id].clone())
                    }
                    (Method::Put, []) => {
                        let now = self.now();
                        let service = self.services.entry(id).or_insert(Value::Null);
                        merge(service, &request.body);
                        merge(service, &Some(json!({"lastModified": now})));
                        Response::ok(200, service.clone())
                    }
                    (Method::Delete, []) => {
                        if self.services[&id].get("state").is_some() {
                            return conflict(format!("{} {} is running", kind, key));
                        }
                        self.services.remove(&id);
                        accepted()
                    }
                    (Method::Put, ["start"]) => {
                        let lag = self.lag;
                        self.pending.insert(id, (Transition::Start, lag));
                        accepted()
                    }
                    (Method::Put, ["stop"]) => {
                        let lag = self.lag;
                        self.pending.insert(id, (Transition::Stop, lag));
                        accepted()
                    }
                    (Method::Put, [host]) if kind.is_cluster() => {
                        if !self.nodes.contains_key(*host) {
                            return not_found(host);
                        }
                        if let Some(names) = self.services.get_mut(&id).and_then(node_names) {
                            if !names.iter().any(|n| n == *host) {
                                names.push(json!(host));
                            }
                        }
                        accepted()
                    }
                    (Method::Delete, [host]) if kind.is_cluster() => {
                        if let Some(names) = self.services.get_mut(&id).and_then(node_names) {
                            names.retain(|n| n != *host);
                        }
                        accepted()
                    }
                    _ => not_found(&request.path),
                }
            }
            _ => not_found(&request.path),
        }
    }
}

fn object_key(body: &Value) -> Option<ObjectKey> {
    let name = body.get("name")?.as_str()?;
    let group = body.get("group").and_then(Value::as_str).unwrap_or(DEFAULT_GROUP);
    Some(ObjectKey::new(name, group))
}

fn node_names(service: &mut Value) -> Option<&mut Vec<Value>> {
    service
        .as_object_mut()?
        .entry("nodeNames")
        .or_insert_with(|| json!([]))
        .as_array_mut()
}

impl FakeConfigurator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            world: Mutex::new(World {
                lag: 1,
                ..World::default()
            }),
        })
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Client over this fake with a millisecond poll interval.
    pub fn configurator(self: &Arc<Self>) -> Configurator {
        self.configurator_with(WaitConfig {
            interval_ms: 1,
            max_retry: 10,
        })
    }

    pub fn configurator_with(self: &Arc<Self>, wait: WaitConfig) -> Configurator {
        Configurator::with_transport(self.clone(), wait)
    }

    /// Polls a start/stop needs before it becomes visible.
    pub fn set_lag(&self, polls: u32) {
        self.world().lag = polls;
    }

    /// While offline every request fails at the transport level.
    pub fn set_offline(&self, offline: bool) {
        self.world().offline = offline;
    }

    pub fn seed_node(&self, hostname: &str) {
        let mut world = self.world();
        let now = world.now();
        world.nodes.insert(
            hostname.to_string(),
            json!({"hostname": hostname, "port": 22, "user": "ohara", "state": "AVAILABLE", "lastModified": now}),
        );
    }

    /// Stores `object` as-is; it needs `name` and may carry `state`.
    pub fn seed_service(&self, kind: ResourceKind, mut object: Value) {
        let mut world = self.world();
        let now = world.now();
        if let Some(obj) = object.as_object_mut() {
            obj.entry("group").or_insert_with(|| json!(DEFAULT_GROUP));
            obj.entry("lastModified").or_insert_with(|| json!(now));
        }
        if let Some(key) = object_key(&object) {
            world.services.insert((kind.collection().to_string(), key), object);
        }
    }

    pub fn seed_pipeline(&self, mut pipeline: Value) {
        let mut world = self.world();
        let now = world.now();
        if let Some(obj) = pipeline.as_object_mut() {
            obj.entry("group").or_insert_with(|| json!(DEFAULT_GROUP));
            obj.entry("lastModified").or_insert_with(|| json!(now));
        }
        if let Some(key) = object_key(&pipeline) {
            world.pipelines.insert(key, pipeline);
        }
    }

    pub fn service(&self, kind: ResourceKind, key: &ObjectKey) -> Option<Value> {
        self.world()
            .services
            .get(&(kind.collection().to_string(), key.clone()))
            .cloned()
    }

    pub fn pipeline(&self, key: &ObjectKey) -> Option<Value> {
        self.world().pipelines.get(key).cloned()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.world().log.clone()
    }

    /// Number of recorded requests with this method and path.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.world()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Body of the most recent request with this method and path.
    pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        self.world()
            .log
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| r.body.clone())
    }

    pub fn clear_log(&self) {
        self.world().log.clear();
    }
}

#[async_trait]
impl Transport for FakeConfigurator {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut world = self.world();
        world.log.push(request.clone());
        if world.offline {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        let response = world.route(&request);
        tracing::trace!(method = ?request.method, path = %request.path, status = response.status, "fake configurator");
        Ok(response)
    }
}
