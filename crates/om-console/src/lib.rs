//! # om-console — state containers of the ohara console
//!
//! [`Console`] is the composition root: built from a configurator client,
//! it owns one [`Store`] per resource type and the [`Notifier`] they report
//! to. Call [`Console::close`] to drop every cached state.

pub mod deleter;
pub mod error;
pub mod notify;
pub mod store;

pub use deleter::{DeletionProgress, ServiceDeleter};
pub use error::StoreError;
pub use notify::{Notification, Notifier, Severity};
pub use store::Store;

use om_client::{ClientConfig, Configurator, NodeApi, PipelineApi, ResourceApi, ServiceApi};
use om_core::{ObjectKey, Pipeline, ResourceKind};
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct Console {
    configurator: Configurator,
    notifier: Notifier,
    pub nodes: Arc<Store<NodeApi>>,
    pub zookeepers: Arc<Store<ServiceApi>>,
    pub brokers: Arc<Store<ServiceApi>>,
    pub workers: Arc<Store<ServiceApi>>,
    pub topics: Arc<Store<ServiceApi>>,
    pub connectors: Arc<Store<ServiceApi>>,
    pub streams: Arc<Store<ServiceApi>>,
    pub pipelines: Arc<Store<PipelineApi>>,
}

impl Console {
    pub fn new(configurator: Configurator) -> Self {
        let notifier = Notifier::default();
        let store = |api: ServiceApi| Arc::new(Store::new(api, notifier.clone()));
        Self {
            nodes: Arc::new(Store::new(configurator.nodes(), notifier.clone())),
            zookeepers: store(configurator.zookeepers()),
            brokers: store(configurator.brokers()),
            workers: store(configurator.workers()),
            topics: store(configurator.topics()),
            connectors: store(configurator.connectors()),
            streams: store(configurator.streams()),
            pipelines: Arc::new(Store::new(configurator.pipelines(), notifier.clone())),
            configurator,
            notifier,
        }
    }

    pub fn connect(config: &ClientConfig) -> Result<Self, StoreError> {
        Ok(Self::new(Configurator::new(config)?))
    }

    pub fn configurator(&self) -> &Configurator {
        &self.configurator
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Store of a service kind; `None` for nodes and pipelines.
    pub fn services(&self, kind: ResourceKind) -> Option<&Arc<Store<ServiceApi>>> {
        match kind {
            ResourceKind::Zookeeper => Some(&self.zookeepers),
            ResourceKind::Broker => Some(&self.brokers),
            ResourceKind::Worker => Some(&self.workers),
            ResourceKind::Topic => Some(&self.topics),
            ResourceKind::Connector => Some(&self.connectors),
            ResourceKind::Stream => Some(&self.streams),
            ResourceKind::Node | ResourceKind::Pipeline => None,
        }
    }

    pub fn deleter(&self) -> ServiceDeleter {
        ServiceDeleter::new(
            self.connectors.clone(),
            self.topics.clone(),
            self.streams.clone(),
        )
    }

    /// Removes a pipeline, first tearing down its services when
    /// `with_services` is set. Answers the remaining pipelines.
    pub async fn delete_pipeline(
        &self,
        key: &ObjectKey,
        with_services: bool,
        deleter: &ServiceDeleter,
    ) -> Result<Option<Vec<Pipeline>>, StoreError> {
        if with_services {
            let pipeline = self.pipelines.api().get(key).await?.into_result()?;
            // Topic tags decide what belongs to the pipeline; without a
            // fresh list every private topic would look shared.
            self.topics
                .refresh()
                .await?
                .ok_or(StoreError::Busy(ResourceKind::Topic))?;
            let services = pipeline.services(&self.topics.data().await);
            deleter.delete_services(&services).await?;
        }
        self.pipelines.remove(key).await
    }

    /// Teardown boundary: forgets every cached state.
    pub async fn close(&self) {
        self.nodes.reset().await;
        for kind in ResourceKind::SERVICES {
            if let Some(store) = self.services(kind) {
                store.reset().await;
            }
        }
        self.pipelines.reset().await;
        tracing::debug!("console closed");
    }
}
