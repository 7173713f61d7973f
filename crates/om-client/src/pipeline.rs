//! Pipeline API. Pipelines carry no run state of their own; `refresh` asks
//! the configurator to re-resolve the state of their elements.

use crate::client::{Configurator, ResourceApi};
use crate::error::ClientError;
use crate::service::key_of;
use crate::transport::Request;
use crate::url;
use crate::wait::{Expect, WaitRequest};
use async_trait::async_trait;
use om_core::schema;
use om_core::{ActionResult, ObjectKey, Pipeline, ResourceKind, Subject, Verb};
use serde_json::{Map, Value};

const KIND: ResourceKind = ResourceKind::Pipeline;

#[derive(Clone)]
pub struct PipelineApi {
    configurator: Configurator,
}

impl PipelineApi {
    pub(crate) fn new(configurator: Configurator) -> Self {
        Self { configurator }
    }

    fn object(key: &ObjectKey) -> Request {
        Request::get(url::object(KIND, &key.name)).with_query(url::group_query(key))
    }

    pub async fn refresh(&self, key: &ObjectKey) -> Result<ActionResult<Pipeline>, ClientError> {
        let subject = Subject::new(Verb::Refresh, KIND, key);
        let accepted = self
            .configurator
            .send(Request::put(url::action(KIND, &key.name, "refresh")).with_query(url::group_query(key)))
            .await?;
        if !accepted.is_success {
            return Ok(accepted.into_result(&subject));
        }
        let response = self.configurator.send(Self::object(key)).await?;
        Ok(response.into_result(&subject))
    }
}

#[async_trait]
impl ResourceApi for PipelineApi {
    type Data = Pipeline;

    fn kind(&self) -> ResourceKind {
        KIND
    }

    fn key_of(&self, params: &Map<String, Value>) -> Option<ObjectKey> {
        key_of(params).ok()
    }

    async fn get(&self, key: &ObjectKey) -> Result<ActionResult<Pipeline>, ClientError> {
        let response = self.configurator.send(Self::object(key)).await?;
        Ok(response.into_result(&Subject::new(Verb::Get, KIND, key)))
    }

    async fn get_all(
        &self,
        query: &Map<String, Value>,
    ) -> Result<ActionResult<Vec<Pipeline>>, ClientError> {
        let request = Request::get(url::collection(KIND)).with_query(url::to_query_parameters(query));
        let response = self.configurator.send(request).await?;
        Ok(response.into_result(&Subject::list(KIND)))
    }

    async fn create(
        &self,
        params: &Map<String, Value>,
    ) -> Result<ActionResult<Pipeline>, ClientError> {
        let key = key_of(params)?;
        let mut params = params.clone();
        params.insert("group".to_string(), Value::String(key.group.clone()));
        let body = schema::request_schema(KIND).shape(&params)?;
        let response = self
            .configurator
            .send(Request::post(url::collection(KIND), Value::Object(body)))
            .await?;
        Ok(response.into_result(&Subject::new(Verb::Create, KIND, &key)))
    }

    async fn update(
        &self,
        key: &ObjectKey,
        params: &Map<String, Value>,
    ) -> Result<ActionResult<Pipeline>, ClientError> {
        let body = schema::update_schema(KIND).shape(params)?;
        let request = Request::put(url::object(KIND, &key.name))
            .with_query(url::group_query(key))
            .with_body(Value::Object(body));
        let response = self.configurator.send(request).await?;
        Ok(response.into_result(&Subject::new(Verb::Update, KIND, key)))
    }

    async fn remove(&self, key: &ObjectKey) -> Result<ActionResult<Vec<Pipeline>>, ClientError> {
        let request = Request::delete(url::object(KIND, &key.name)).with_query(url::group_query(key));
        let until = WaitRequest::new(url::collection(KIND), Expect::ServiceAbsent(key.clone()));
        let response = self.configurator.settle(request, until, None).await?;
        Ok(response.into_result(&Subject::new(Verb::Remove, KIND, key)))
    }
}
