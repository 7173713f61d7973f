//! # State Containers
//!
//! A [`Store`] caches one resource type and exposes its action creators.
//! Every creator follows the same routine: dispatch `Request`, call the
//! resource API, then dispatch `Success` with the payload or `Failure` with
//! the message. A failed envelope and a transport error are handled the
//! same way: both are recorded in the state and published on the
//! [`Notifier`].
//!
//! Creators other than `fetch_all` answer `Ok(None)` without touching the
//! network while another request of the store is in flight.

use crate::error::StoreError;
use crate::notify::Notifier;
use om_client::{ClientError, KeyOf, ResourceApi};
use om_core::reducer::{self, Routine};
use om_core::{reduce, Action, ActionResult, Payload, Resource, StoreState, Subject, Verb};
use serde_json::{Map, Value};
use std::future::Future;
use tokio::sync::RwLock;

pub struct Store<A: ResourceApi> {
    api: A,
    state: RwLock<StoreState<A::Data>>,
    notifier: Notifier,
}

impl<A: ResourceApi> Store<A> {
    pub fn new(api: A, notifier: Notifier) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
            notifier,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Snapshot of the cached state.
    pub async fn state(&self) -> StoreState<A::Data> {
        self.state.read().await.clone()
    }

    pub async fn data(&self) -> Vec<A::Data> {
        self.state.read().await.data.clone()
    }

    pub async fn find(&self, key: &KeyOf<A>) -> Option<A::Data> {
        self.state.read().await.find(key).cloned()
    }

    pub async fn dispatch(&self, action: Action<A::Data>) {
        let mut state = self.state.write().await;
        *state = reduce(std::mem::take(&mut *state), action);
    }

    /// Dispatches `Request` if `admit` accepts the current state.
    async fn begin(&self, routine: Routine, admit: impl FnOnce(&StoreState<A::Data>) -> bool) -> bool {
        let mut state = self.state.write().await;
        if !admit(&state) {
            tracing::debug!(kind = %self.api.kind(), op = ?routine.0, "request skipped");
            return false;
        }
        *state = reduce(std::mem::take(&mut *state), routine.request());
        true
    }

    async fn run<T, F>(
        &self,
        routine: Routine,
        subject: Subject,
        call: F,
        payload: impl FnOnce(&T) -> Payload<A::Data>,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<ActionResult<T>, ClientError>>,
    {
        let outcome = match call.await {
            Ok(result) => {
                let title = result.title.clone();
                result.into_result().map(|data| (title, data)).map_err(StoreError::from)
            }
            Err(e) => Err(StoreError::Client(e)),
        };

        match outcome {
            Ok((title, data)) => {
                self.dispatch(routine.success(payload(&data))).await;
                self.notifier.success(title);
                Ok(data)
            }
            Err(e) => {
                // Failed envelopes carry their own title.
                let (title, message) = match &e {
                    StoreError::Failed { title, message } => (title.clone(), message.clone()),
                    other => (subject.title(false), other.to_string()),
                };
                tracing::warn!(kind = %self.api.kind(), op = ?routine.0, %message, "action failed");
                self.dispatch(routine.failure(message.clone())).await;
                self.notifier.error(title, message);
                Err(e)
            }
        }
    }

    fn subject(&self, verb: Verb, key: &KeyOf<A>) -> Subject {
        Subject::new(verb, self.api.kind(), key)
    }

    // =========================================================================
    // Action creators
    // =========================================================================

    /// Loads the list once; skipped while loading, once loaded, or while an
    /// error is recorded.
    pub async fn fetch_all(&self) -> Result<Option<Vec<A::Data>>, StoreError> {
        let routine = reducer::FETCH;
        if !self.begin(routine, StoreState::should_fetch).await {
            return Ok(None);
        }
        let query = Map::new();
        self.run(
            routine,
            Subject::list(self.api.kind()),
            self.api.get_all(&query),
            |items| Payload::List(items.clone()),
        )
        .await
        .map(Some)
    }

    /// Forgets the load time and recorded error, then fetches.
    pub async fn refresh(&self) -> Result<Option<Vec<A::Data>>, StoreError> {
        self.dispatch(Action::Invalidate).await;
        self.fetch_all().await
    }

    pub async fn create(&self, params: &Map<String, Value>) -> Result<Option<A::Data>, StoreError> {
        let routine = reducer::CREATE;
        if !self.begin(routine, |s| !s.is_fetching).await {
            return Ok(None);
        }
        let subject = match self.api.key_of(params) {
            Some(key) => self.subject(Verb::Create, &key),
            None => Subject {
                verb: Verb::Create,
                kind: self.api.kind(),
                key: None,
            },
        };
        self.run(routine, subject, self.api.create(params), |item| {
            Payload::One(item.clone())
        })
        .await
        .map(Some)
    }

    /// Creates the object, then starts it and answers the started object.
    /// A failed start leaves the created object cached as stopped.
    pub async fn create_and_start(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Option<A::Data>, StoreError> {
        let Some(created) = self.create(params).await? else {
            return Ok(None);
        };
        self.start(&created.key()).await
    }

    pub async fn update(
        &self,
        key: &KeyOf<A>,
        params: &Map<String, Value>,
    ) -> Result<Option<A::Data>, StoreError> {
        let routine = reducer::UPDATE;
        if !self.begin(routine, |s| !s.is_fetching).await {
            return Ok(None);
        }
        self.run(
            routine,
            self.subject(Verb::Update, key),
            self.api.update(key, params),
            |item| Payload::One(item.clone()),
        )
        .await
        .map(Some)
    }

    /// Merges `settings` into the pending overlay of `key`.
    pub async fn stage(&self, key: &KeyOf<A>, settings: Map<String, Value>) {
        self.dispatch(Action::Stage {
            key: key.clone(),
            settings,
        })
        .await;
    }

    /// Staged settings that differ from the cached entry.
    pub async fn staged(&self, key: &KeyOf<A>) -> Option<Map<String, Value>> {
        self.state.read().await.staged_diff(key)
    }

    pub async fn discard_staged(&self, key: &KeyOf<A>) {
        self.dispatch(Action::Unstage(key.clone())).await;
    }

    /// Sends the staged diff as an update and clears the overlay on success.
    /// Nothing is sent when no staged value differs.
    pub async fn apply_staged(&self, key: &KeyOf<A>) -> Result<Option<A::Data>, StoreError> {
        let Some(diff) = self.staged(key).await else {
            return Ok(None);
        };
        if diff.is_empty() {
            self.discard_staged(key).await;
            return Ok(None);
        }
        let updated = self.update(key, &diff).await?;
        if updated.is_some() {
            self.discard_staged(key).await;
        }
        Ok(updated)
    }

    /// Deletes `key`; answers the remaining list.
    pub async fn remove(&self, key: &KeyOf<A>) -> Result<Option<Vec<A::Data>>, StoreError> {
        let routine = reducer::REMOVE;
        if !self.begin(routine, |s| !s.is_fetching).await {
            return Ok(None);
        }
        let removed = key.clone();
        self.run(
            routine,
            self.subject(Verb::Remove, key),
            self.api.remove(key),
            move |_| Payload::Removed(removed),
        )
        .await
        .map(Some)
    }

    pub async fn start(&self, key: &KeyOf<A>) -> Result<Option<A::Data>, StoreError> {
        let routine = reducer::START;
        if !self.begin(routine, |s| !s.is_fetching).await {
            return Ok(None);
        }
        self.run(
            routine,
            self.subject(Verb::Start, key),
            self.api.start(key),
            |item| Payload::One(item.clone()),
        )
        .await
        .map(Some)
    }

    pub async fn stop(&self, key: &KeyOf<A>) -> Result<Option<A::Data>, StoreError> {
        let routine = reducer::STOP;
        if !self.begin(routine, |s| !s.is_fetching).await {
            return Ok(None);
        }
        self.run(
            routine,
            self.subject(Verb::Stop, key),
            self.api.stop(key),
            |item| Payload::One(item.clone()),
        )
        .await
        .map(Some)
    }

    pub async fn add_node(
        &self,
        key: &KeyOf<A>,
        hostname: &str,
    ) -> Result<Option<A::Data>, StoreError> {
        let routine = reducer::ADD_NODE;
        if !self.begin(routine, |s| !s.is_fetching).await {
            return Ok(None);
        }
        self.run(
            routine,
            self.subject(Verb::AddNode, key),
            self.api.add_node(key, hostname),
            |item| Payload::One(item.clone()),
        )
        .await
        .map(Some)
    }

    pub async fn remove_node(
        &self,
        key: &KeyOf<A>,
        hostname: &str,
    ) -> Result<Option<A::Data>, StoreError> {
        let routine = reducer::REMOVE_NODE;
        if !self.begin(routine, |s| !s.is_fetching).await {
            return Ok(None);
        }
        self.run(
            routine,
            self.subject(Verb::RemoveNode, key),
            self.api.remove_node(key, hostname),
            |item| Payload::One(item.clone()),
        )
        .await
        .map(Some)
    }

    pub async fn reset(&self) {
        self.dispatch(Action::Reset).await;
    }
}

