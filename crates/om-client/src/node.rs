//! Node API. Nodes are keyed by hostname and have no run lifecycle.

use crate::client::{Configurator, ResourceApi};
use crate::error::ClientError;
use crate::transport::Request;
use crate::url;
use crate::wait::{Expect, WaitRequest};
use async_trait::async_trait;
use om_core::schema::{self, SchemaError};
use om_core::{ActionResult, Node, ResourceKind, Subject, Verb};
use serde_json::{Map, Value};

const KIND: ResourceKind = ResourceKind::Node;

#[derive(Clone)]
pub struct NodeApi {
    configurator: Configurator,
}

impl NodeApi {
    pub(crate) fn new(configurator: Configurator) -> Self {
        Self { configurator }
    }
}

#[async_trait]
impl ResourceApi for NodeApi {
    type Data = Node;

    fn kind(&self) -> ResourceKind {
        KIND
    }

    fn key_of(&self, params: &Map<String, Value>) -> Option<String> {
        params
            .get("hostname")
            .and_then(Value::as_str)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
    }

    async fn get(&self, hostname: &String) -> Result<ActionResult<Node>, ClientError> {
        let response = self
            .configurator
            .send(Request::get(url::object(KIND, hostname)))
            .await?;
        Ok(response.into_result(&Subject::new(Verb::Get, KIND, hostname)))
    }

    async fn get_all(&self, query: &Map<String, Value>) -> Result<ActionResult<Vec<Node>>, ClientError> {
        let request = Request::get(url::collection(KIND)).with_query(url::to_query_parameters(query));
        let response = self.configurator.send(request).await?;
        Ok(response.into_result(&Subject::list(KIND)))
    }

    async fn create(&self, params: &Map<String, Value>) -> Result<ActionResult<Node>, ClientError> {
        let body = schema::request_schema(KIND).shape(params)?;
        let hostname = body
            .get("hostname")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::Missing("hostname".to_string()))?
            .to_string();
        let response = self
            .configurator
            .send(Request::post(url::collection(KIND), Value::Object(body)))
            .await?;
        Ok(response.into_result(&Subject::new(Verb::Create, KIND, hostname)))
    }

    async fn update(
        &self,
        hostname: &String,
        params: &Map<String, Value>,
    ) -> Result<ActionResult<Node>, ClientError> {
        let body = schema::update_schema(KIND).shape(params)?;
        let request = Request::put(url::object(KIND, hostname)).with_body(Value::Object(body));
        let response = self.configurator.send(request).await?;
        Ok(response.into_result(&Subject::new(Verb::Update, KIND, hostname)))
    }

    async fn remove(&self, hostname: &String) -> Result<ActionResult<Vec<Node>>, ClientError> {
        let until = WaitRequest::new(url::collection(KIND), Expect::NodeAbsent(hostname.clone()));
        let response = self
            .configurator
            .settle(Request::delete(url::object(KIND, hostname)), until, None)
            .await?;
        Ok(response.into_result(&Subject::new(Verb::Remove, KIND, hostname)))
    }
}
