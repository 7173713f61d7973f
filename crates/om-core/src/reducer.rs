//! # Reducers
//!
//! Cached state of one resource type and the pure transition function
//! `reduce(state, action) -> state` that every container funnels its
//! mutations through. Each operation dispatches a routine triplet:
//! `Request` when it starts, then `Success` or `Failure`.

use crate::model::Resource;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Operations that go through a request/success/failure routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Create,
    Update,
    Remove,
    Start,
    Stop,
    AddNode,
    RemoveNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T: Resource> {
    /// Replaces the cached list.
    List(Vec<T>),
    /// Inserts or replaces one entry.
    One(T),
    /// Drops one entry.
    Removed(T::Key),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action<T: Resource> {
    Request(Operation),
    Success {
        op: Operation,
        payload: Payload<T>,
        at: DateTime<Utc>,
    },
    Failure(Operation, String),
    /// Merges pending settings into the staging overlay of one entry.
    Stage {
        key: T::Key,
        settings: Map<String, Value>,
    },
    Unstage(T::Key),
    /// Forgets the recorded error and load time so the next fetch runs.
    Invalidate,
    Reset,
}

/// Request/success/failure constructors for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routine(pub Operation);

pub const FETCH: Routine = Routine(Operation::Fetch);
pub const CREATE: Routine = Routine(Operation::Create);
pub const UPDATE: Routine = Routine(Operation::Update);
pub const REMOVE: Routine = Routine(Operation::Remove);
pub const START: Routine = Routine(Operation::Start);
pub const STOP: Routine = Routine(Operation::Stop);
pub const ADD_NODE: Routine = Routine(Operation::AddNode);
pub const REMOVE_NODE: Routine = Routine(Operation::RemoveNode);

impl Routine {
    pub fn request<T: Resource>(&self) -> Action<T> {
        Action::Request(self.0)
    }

    pub fn success<T: Resource>(&self, payload: Payload<T>) -> Action<T> {
        Action::Success {
            op: self.0,
            payload,
            at: Utc::now(),
        }
    }

    pub fn failure<T: Resource>(&self, message: impl Into<String>) -> Action<T> {
        Action::Failure(self.0, message.into())
    }
}

/// Cached state of one resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<T: Resource> {
    pub data: Vec<T>,
    /// Pending, uncommitted settings per entry.
    pub staging: HashMap<T::Key, Map<String, Value>>,
    pub is_fetching: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl<T: Resource> Default for StoreState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            staging: HashMap::new(),
            is_fetching: false,
            last_updated: None,
            error: None,
        }
    }
}

impl<T: Resource> StoreState<T> {
    /// Fetch-once guard: false while a request is in flight, once data
    /// has been loaded, or while an error is recorded.
    pub fn should_fetch(&self) -> bool {
        !(self.is_fetching || self.last_updated.is_some() || self.error.is_some())
    }

    pub fn find(&self, key: &T::Key) -> Option<&T> {
        self.data.iter().find(|item| &item.key() == key)
    }

    /// Staged settings whose value differs from the committed entry.
    pub fn staged_diff(&self, key: &T::Key) -> Option<Map<String, Value>> {
        let staged = self.staging.get(key)?;
        let committed = self
            .find(key)
            .and_then(|item| serde_json::to_value(item).ok())
            .unwrap_or(Value::Null);
        Some(diff(&committed, staged))
    }
}

/// Entries of `staged` that are missing from or differ in `committed`.
pub fn diff(committed: &Value, staged: &Map<String, Value>) -> Map<String, Value> {
    staged
        .iter()
        .filter(|(name, value)| committed.get(name.as_str()) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

pub fn reduce<T: Resource>(mut state: StoreState<T>, action: Action<T>) -> StoreState<T> {
    match action {
        Action::Request(_) => {
            state.is_fetching = true;
        }
        Action::Success { op, payload, at } => {
            state.is_fetching = false;
            state.error = None;
            match payload {
                Payload::List(items) => {
                    state.data = items;
                    if op == Operation::Fetch {
                        state.last_updated = Some(at);
                    }
                }
                Payload::One(item) => {
                    let key = item.key();
                    match state.data.iter_mut().find(|existing| existing.key() == key) {
                        Some(existing) => *existing = item,
                        None => state.data.push(item),
                    }
                }
                Payload::Removed(key) => {
                    state.data.retain(|item| item.key() != key);
                    state.staging.remove(&key);
                }
            }
        }
        Action::Failure(_, message) => {
            state.is_fetching = false;
            state.error = Some(message);
        }
        Action::Stage { key, settings } => {
            state.staging.entry(key).or_default().extend(settings);
        }
        Action::Unstage(key) => {
            state.staging.remove(&key);
        }
        Action::Invalidate => {
            state.error = None;
            state.last_updated = None;
        }
        Action::Reset => {
            state = StoreState::default();
        }
    }
    state
}
