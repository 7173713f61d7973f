//! # Configurator Client
//!
//! [`Configurator`] bundles a [`Transport`] with the wait budget and hands
//! out one API object per resource type. Every resource API implements
//! [`ResourceApi`], the seam the console's state containers are generic
//! over.

use crate::config::{ClientConfig, WaitConfig};
use crate::error::ClientError;
use crate::inspect::InspectApi;
use crate::node::NodeApi;
use crate::pipeline::PipelineApi;
use crate::service::ServiceApi;
use crate::transport::{HttpTransport, Request, Response, Transport};
use crate::wait::{self, WaitRequest};
use async_trait::async_trait;
use om_core::{ActionResult, Resource, ResourceKind};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct Configurator {
    transport: Arc<dyn Transport>,
    wait: WaitConfig,
}

impl Configurator {
    /// Client speaking HTTP to `config.configurator`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config)?;
        tracing::debug!(base_url = transport.base_url(), "configurator client ready");
        Ok(Self::with_transport(Arc::new(transport), config.wait.clone()))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, wait: WaitConfig) -> Self {
        Self { transport, wait }
    }

    pub fn wait_config(&self) -> &WaitConfig {
        &self.wait
    }

    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.transport.send(request).await
    }

    pub async fn wait(&self, request: WaitRequest) -> Result<Response, ClientError> {
        wait::wait(self.transport.as_ref(), request, &self.wait).await
    }

    /// Accept, wait, optionally re-read.
    ///
    /// A rejected `request` or a failed wait is the final answer. Otherwise
    /// the answer is `refetch` when given, else the response that satisfied
    /// the wait.
    pub(crate) async fn settle(
        &self,
        request: Request,
        until: WaitRequest,
        refetch: Option<Request>,
    ) -> Result<Response, ClientError> {
        let accepted = self.send(request).await?;
        if !accepted.is_success {
            return Ok(accepted);
        }

        let waited = self.wait(until).await?;
        match refetch {
            Some(request) if waited.is_success => self.send(request).await,
            _ => Ok(waited),
        }
    }

    pub fn nodes(&self) -> NodeApi {
        NodeApi::new(self.clone())
    }

    pub fn zookeepers(&self) -> ServiceApi {
        ServiceApi::new(self.clone(), ResourceKind::Zookeeper)
    }

    pub fn brokers(&self) -> ServiceApi {
        ServiceApi::new(self.clone(), ResourceKind::Broker)
    }

    pub fn workers(&self) -> ServiceApi {
        ServiceApi::new(self.clone(), ResourceKind::Worker)
    }

    pub fn topics(&self) -> ServiceApi {
        ServiceApi::new(self.clone(), ResourceKind::Topic)
    }

    pub fn connectors(&self) -> ServiceApi {
        ServiceApi::new(self.clone(), ResourceKind::Connector)
    }

    pub fn streams(&self) -> ServiceApi {
        ServiceApi::new(self.clone(), ResourceKind::Stream)
    }

    /// Service API for any of [`ResourceKind::SERVICES`].
    pub fn service(&self, kind: ResourceKind) -> Result<ServiceApi, ClientError> {
        if ResourceKind::SERVICES.contains(&kind) {
            Ok(ServiceApi::new(self.clone(), kind))
        } else {
            Err(ClientError::Unsupported("service api", kind))
        }
    }

    pub fn pipelines(&self) -> PipelineApi {
        PipelineApi::new(self.clone())
    }

    pub fn inspect(&self) -> InspectApi {
        InspectApi::new(self.clone())
    }
}

pub type KeyOf<A> = <<A as ResourceApi>::Data as Resource>::Key;

/// Action creators shared by every resource type.
///
/// Lifecycle operations a type lacks answer `ClientError::Unsupported`.
#[async_trait]
pub trait ResourceApi: Send + Sync + 'static {
    type Data: Resource;

    fn kind(&self) -> ResourceKind;

    /// Key named by creation parameters, if they name one.
    fn key_of(&self, params: &Map<String, Value>) -> Option<KeyOf<Self>>;

    async fn get(&self, key: &KeyOf<Self>) -> Result<ActionResult<Self::Data>, ClientError>;

    async fn get_all(
        &self,
        query: &Map<String, Value>,
    ) -> Result<ActionResult<Vec<Self::Data>>, ClientError>;

    async fn create(
        &self,
        params: &Map<String, Value>,
    ) -> Result<ActionResult<Self::Data>, ClientError>;

    async fn update(
        &self,
        key: &KeyOf<Self>,
        params: &Map<String, Value>,
    ) -> Result<ActionResult<Self::Data>, ClientError>;

    /// Deletes and answers the remaining list.
    async fn remove(&self, key: &KeyOf<Self>)
        -> Result<ActionResult<Vec<Self::Data>>, ClientError>;

    async fn start(&self, _key: &KeyOf<Self>) -> Result<ActionResult<Self::Data>, ClientError> {
        Err(ClientError::Unsupported("start", self.kind()))
    }

    async fn stop(&self, _key: &KeyOf<Self>) -> Result<ActionResult<Self::Data>, ClientError> {
        Err(ClientError::Unsupported("stop", self.kind()))
    }

    async fn add_node(
        &self,
        _key: &KeyOf<Self>,
        _hostname: &str,
    ) -> Result<ActionResult<Self::Data>, ClientError> {
        Err(ClientError::Unsupported("add node", self.kind()))
    }

    async fn remove_node(
        &self,
        _key: &KeyOf<Self>,
        _hostname: &str,
    ) -> Result<ActionResult<Self::Data>, ClientError> {
        Err(ClientError::Unsupported("remove node", self.kind()))
    }
}
