//! # Service API
//!
//! Action creators for zookeeper, broker, worker, topic, connector and
//! stream objects. Start, stop, removal and node membership changes are
//! asynchronous on the configurator side; each of them is accepted first,
//! awaited with the matching [`Expect`] predicate and then re-read.

use crate::client::{Configurator, ResourceApi};
use crate::error::ClientError;
use crate::transport::Request;
use crate::url;
use crate::wait::{Expect, WaitRequest};
use async_trait::async_trait;
use om_core::schema::{self, FieldSpec, FieldType, SchemaError};
use om_core::{ActionResult, ObjectKey, ResourceKind, Service, Subject, Verb, DEFAULT_GROUP};
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct ServiceApi {
    configurator: Configurator,
    kind: ResourceKind,
}

/// Object key named by creation parameters; the group falls back to the
/// default one.
pub(crate) fn key_of(params: &Map<String, Value>) -> Result<ObjectKey, SchemaError> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| SchemaError::Missing("name".to_string()))?;
    let group = params
        .get("group")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_GROUP);
    Ok(ObjectKey::new(name, group))
}

impl ServiceApi {
    pub(crate) fn new(configurator: Configurator, kind: ResourceKind) -> Self {
        Self { configurator, kind }
    }

    fn subject(&self, verb: Verb, key: &ObjectKey) -> Subject {
        Subject::new(verb, self.kind, key)
    }

    fn object(&self, key: &ObjectKey) -> Request {
        Request::get(url::object(self.kind, &key.name)).with_query(url::group_query(key))
    }

    fn poll_object(&self, key: &ObjectKey, expect: Expect) -> WaitRequest {
        WaitRequest::new(url::object(self.kind, &key.name), expect)
            .with_query(url::group_query(key))
    }

    /// Creates the object from `params` layered over `body`.
    ///
    /// Without a body, cluster kinds start from the default values their
    /// inspection advertises; advertised settings are accepted as fields.
    /// Keys of an explicit body are accepted verbatim.
    pub async fn create_with(
        &self,
        params: &Map<String, Value>,
        body: Option<&Map<String, Value>>,
    ) -> Result<ActionResult<Service>, ClientError> {
        let key = key_of(params)?;
        let mut schema = schema::request_schema(self.kind);
        let mut merged = Map::new();

        match body {
            Some(body) if !body.is_empty() => {
                for name in body.keys() {
                    schema = schema.with_field(FieldSpec::optional(name.clone(), FieldType::Any));
                }
                merged = body.clone();
            }
            _ if self.kind.is_cluster() => {
                let info = self.configurator.inspect().info(self.kind).await?;
                if let Some(info) = info.data {
                    let definitions = info.definitions();
                    schema = schema.extend(definitions);
                    merged = schema::defaults(definitions);
                }
            }
            _ => {}
        }

        merged.extend(params.clone());
        merged.insert("group".to_string(), Value::String(key.group.clone()));
        let request = schema.shape(&merged)?;

        let response = self
            .configurator
            .send(Request::post(url::collection(self.kind), Value::Object(request)))
            .await?;
        Ok(response.into_result(&self.subject(Verb::Create, &key)))
    }
}

#[async_trait]
impl ResourceApi for ServiceApi {
    type Data = Service;

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn key_of(&self, params: &Map<String, Value>) -> Option<ObjectKey> {
        key_of(params).ok()
    }

    async fn get(&self, key: &ObjectKey) -> Result<ActionResult<Service>, ClientError> {
        let response = self.configurator.send(self.object(key)).await?;
        Ok(response.into_result(&self.subject(Verb::Get, key)))
    }

    async fn get_all(
        &self,
        query: &Map<String, Value>,
    ) -> Result<ActionResult<Vec<Service>>, ClientError> {
        let request =
            Request::get(url::collection(self.kind)).with_query(url::to_query_parameters(query));
        let response = self.configurator.send(request).await?;
        Ok(response.into_result(&Subject::list(self.kind)))
    }

    async fn create(
        &self,
        params: &Map<String, Value>,
    ) -> Result<ActionResult<Service>, ClientError> {
        self.create_with(params, None).await
    }

    async fn update(
        &self,
        key: &ObjectKey,
        params: &Map<String, Value>,
    ) -> Result<ActionResult<Service>, ClientError> {
        let mut params = params.clone();
        params.remove("name");
        params.remove("group");
        let mut schema = schema::update_schema(self.kind);
        // Cluster settings are whatever the inspected definitions declare.
        if self.kind.is_cluster() {
            let info = self.configurator.inspect().info(self.kind).await?;
            if let Some(info) = info.data {
                schema = schema.extend(info.definitions());
            }
        }
        let body = schema.shape(&params)?;
        let request = Request::put(url::object(self.kind, &key.name))
            .with_query(url::group_query(key))
            .with_body(Value::Object(body));
        let response = self.configurator.send(request).await?;
        Ok(response.into_result(&self.subject(Verb::Update, key)))
    }

    async fn remove(&self, key: &ObjectKey) -> Result<ActionResult<Vec<Service>>, ClientError> {
        let request =
            Request::delete(url::object(self.kind, &key.name)).with_query(url::group_query(key));
        let until = WaitRequest::new(url::collection(self.kind), Expect::ServiceAbsent(key.clone()));
        let response = self.configurator.settle(request, until, None).await?;
        Ok(response.into_result(&self.subject(Verb::Remove, key)))
    }

    async fn start(&self, key: &ObjectKey) -> Result<ActionResult<Service>, ClientError> {
        let request = Request::put(url::action(self.kind, &key.name, "start"))
            .with_query(url::group_query(key));

        // Workers report RUNNING before their connect service answers.
        let until = if self.kind == ResourceKind::Worker {
            WaitRequest::new(url::inspect_object(self.kind, &key.name), Expect::ConnectReady)
                .with_query(url::group_query(key))
        } else {
            self.poll_object(key, Expect::Running)
        };
        let response = self
            .configurator
            .settle(request, until, Some(self.object(key)))
            .await?;
        Ok(response.into_result(&self.subject(Verb::Start, key)))
    }

    async fn stop(&self, key: &ObjectKey) -> Result<ActionResult<Service>, ClientError> {
        let request = Request::put(url::action(self.kind, &key.name, "stop"))
            .with_query(url::group_query(key));
        let response = self
            .configurator
            .settle(request, self.poll_object(key, Expect::Stopped), Some(self.object(key)))
            .await?;
        Ok(response.into_result(&self.subject(Verb::Stop, key)))
    }

    async fn add_node(
        &self,
        key: &ObjectKey,
        hostname: &str,
    ) -> Result<ActionResult<Service>, ClientError> {
        if !self.kind.is_cluster() {
            return Err(ClientError::Unsupported("add node", self.kind));
        }
        let request = Request::put(url::action(self.kind, &key.name, hostname))
            .with_query(url::group_query(key));
        let until = self.poll_object(key, Expect::NodeJoined(hostname.to_string()));
        let response = self
            .configurator
            .settle(request, until, Some(self.object(key)))
            .await?;
        Ok(response.into_result(&self.subject(Verb::AddNode, key)))
    }

    async fn remove_node(
        &self,
        key: &ObjectKey,
        hostname: &str,
    ) -> Result<ActionResult<Service>, ClientError> {
        if !self.kind.is_cluster() {
            return Err(ClientError::Unsupported("remove node", self.kind));
        }
        let request = Request::delete(url::action(self.kind, &key.name, hostname))
            .with_query(url::group_query(key));
        let until = self.poll_object(key, Expect::NodeLeft(hostname.to_string()));
        let response = self
            .configurator
            .settle(request, until, Some(self.object(key)))
            .await?;
        Ok(response.into_result(&self.subject(Verb::RemoveNode, key)))
    }
}
