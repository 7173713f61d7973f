//! # Pipeline Teardown
//!
//! Deletes the services of a pipeline strictly one after another, stopping
//! each first when it reports any state. Only topics tagged private belong
//! to the pipeline; shared topics are left alone. Progress is published on
//! a watch channel as `steps` (service names) and `active_step` (services
//! handled so far).
//!
//! The first failing stop or delete aborts the sequence. Nothing already
//! deleted is restored.

use crate::error::StoreError;
use crate::store::Store;
use om_client::{ResourceApi, ServiceApi};
use om_core::{ElementKind, ObjectKey, PipelineService, ResourceKind};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionProgress {
    pub steps: Vec<String>,
    pub active_step: usize,
}

impl DeletionProgress {
    pub fn is_done(&self) -> bool {
        self.active_step >= self.steps.len()
    }
}

pub struct ServiceDeleter {
    connectors: Arc<Store<ServiceApi>>,
    topics: Arc<Store<ServiceApi>>,
    streams: Arc<Store<ServiceApi>>,
    progress: watch::Sender<DeletionProgress>,
}

/// A `None` answer means the store skipped the request.
fn admitted<T>(kind: ResourceKind, answer: Option<T>) -> Result<T, StoreError> {
    answer.ok_or(StoreError::Busy(kind))
}

impl ServiceDeleter {
    pub fn new(
        connectors: Arc<Store<ServiceApi>>,
        topics: Arc<Store<ServiceApi>>,
        streams: Arc<Store<ServiceApi>>,
    ) -> Self {
        let (progress, _) = watch::channel(DeletionProgress::default());
        Self {
            connectors,
            topics,
            streams,
            progress,
        }
    }

    pub fn progress(&self) -> watch::Receiver<DeletionProgress> {
        self.progress.subscribe()
    }

    pub async fn delete_services(&self, services: &[PipelineService]) -> Result<(), StoreError> {
        self.progress.send_replace(DeletionProgress {
            steps: services.iter().map(|s| s.key.name.clone()).collect(),
            active_step: 0,
        });

        for (index, service) in services.iter().enumerate() {
            let store = match service.kind {
                ElementKind::Source | ElementKind::Sink => Some(&self.connectors),
                ElementKind::Topic if service.is_private() => Some(&self.topics),
                ElementKind::Stream => Some(&self.streams),
                ElementKind::Topic | ElementKind::Other => None,
            };

            match store {
                Some(store) => {
                    self.stop_and_delete(store, &service.key, service.is_running())
                        .await?
                }
                None => {
                    tracing::debug!(service = %service.key, kind = ?service.kind, "left in place");
                }
            }

            self.progress.send_modify(|p| p.active_step = index + 1);
        }

        tracing::info!(count = services.len(), "pipeline services deleted");
        Ok(())
    }

    async fn stop_and_delete(
        &self,
        store: &Store<ServiceApi>,
        key: &ObjectKey,
        running: bool,
    ) -> Result<(), StoreError> {
        let kind = store.api().kind();
        if running {
            admitted(kind, store.stop(key).await?)?;
        }
        admitted(kind, store.remove(key).await?)?;
        tracing::debug!(service = %key, %kind, "deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_done() {
        let mut progress = DeletionProgress {
            steps: vec!["a".into(), "b".into()],
            active_step: 1,
        };
        assert!(!progress.is_done());
        progress.active_step = 2;
        assert!(progress.is_done());
        assert!(DeletionProgress::default().is_done());
    }
}
