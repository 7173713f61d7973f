//! # Lifecycle Waiter
//!
//! The configurator orchestrates clusters asynchronously: a `start` or
//! `delete` is accepted long before its effect is observable. [`wait`]
//! polls a GET endpoint until an [`Expect`] predicate holds. The endpoint
//! is polled at least once, whatever the retry budget.
//!
//! Outcomes:
//! - predicate holds → the matching response;
//! - the GET is rejected → that (failed) response, immediately;
//! - the transport fails → `Err`, immediately;
//! - the retry budget runs out → a failed response (`exceed max retry`).

use crate::config::WaitConfig;
use crate::error::ClientError;
use crate::transport::{Request, Response, Transport};
use om_core::{ApiError, ObjectKey, DEFAULT_GROUP};
use serde_json::Value;

pub const TIMEOUT_MESSAGE: &str = "exceed max retry";

/// Condition a polled response must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    /// Object reports `state == RUNNING`.
    Running,
    /// Object reports no state.
    Stopped,
    /// Listing no longer contains the service.
    ServiceAbsent(ObjectKey),
    /// Node listing no longer contains the host.
    NodeAbsent(String),
    /// Worker inspection lists at least one connector class.
    ConnectReady,
    /// Running cluster lists the host among its nodes.
    NodeJoined(String),
    /// Cluster no longer lists the host.
    NodeLeft(String),
}

fn state_of(result: &Value) -> Option<&str> {
    result.get("state").and_then(Value::as_str)
}

fn lists_node(result: &Value, host: &str) -> bool {
    result
        .get("nodeNames")
        .and_then(Value::as_array)
        .map_or(false, |names| names.iter().any(|n| n.as_str() == Some(host)))
}

fn same_key(item: &Value, key: &ObjectKey) -> bool {
    let group = item
        .get("group")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_GROUP);
    item.get("name").and_then(Value::as_str) == Some(key.name.as_str()) && group == key.group
}

impl Expect {
    pub fn matches(&self, response: &Response) -> bool {
        if !response.is_success {
            return false;
        }
        let result = &response.result;
        match self {
            Self::Running => state_of(result) == Some("RUNNING"),
            Self::Stopped => state_of(result).is_none(),
            Self::ServiceAbsent(key) => result
                .as_array()
                .map_or(false, |items| !items.iter().any(|item| same_key(item, key))),
            Self::NodeAbsent(host) => result.as_array().map_or(false, |items| {
                !items
                    .iter()
                    .any(|item| item.get("hostname").and_then(Value::as_str) == Some(host))
            }),
            Self::ConnectReady => result
                .get("classInfos")
                .and_then(Value::as_array)
                .map_or(false, |classes| !classes.is_empty()),
            Self::NodeJoined(host) => {
                state_of(result) == Some("RUNNING") && lists_node(result, host)
            }
            Self::NodeLeft(host) => !lists_node(result, host),
        }
    }
}

/// What to poll and which condition ends the poll.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub expect: Expect,
}

impl WaitRequest {
    pub fn new(path: impl Into<String>, expect: Expect) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            expect,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Response handed back when the retry budget is exhausted.
pub fn timed_out() -> Response {
    Response::failed(408, vec![ApiError::with_code("WaitTimeout", TIMEOUT_MESSAGE)])
}

pub async fn wait(
    transport: &dyn Transport,
    request: WaitRequest,
    config: &WaitConfig,
) -> Result<Response, ClientError> {
    let max_retry = config.max_retry.max(1);
    for attempt in 1..=max_retry {
        let response = transport
            .send(Request::get(request.path.clone()).with_query(request.query.clone()))
            .await?;

        if request.expect.matches(&response) {
            tracing::debug!(path = %request.path, attempt, expect = ?request.expect, "wait condition met");
            return Ok(response);
        }
        if !response.is_success {
            tracing::warn!(path = %request.path, status = response.status, "wait aborted by failed poll");
            return Ok(response);
        }

        tracing::debug!(path = %request.path, attempt, max = max_retry, "wait condition not met yet");
        if attempt < max_retry {
            tokio::time::sleep(config.interval()).await;
        }
    }

    tracing::warn!(path = %request.path, expect = ?request.expect, "{}", TIMEOUT_MESSAGE);
    Ok(timed_out())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records how often it was polled.
    struct Script {
        responses: Mutex<VecDeque<Result<Response, ClientError>>>,
        calls: Mutex<usize>,
    }

    impl Script {
        fn new(responses: Vec<Result<Response, ClientError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Script {
        async fn send(&self, _request: Request) -> Result<Response, ClientError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Response::ok(200, json!({}))))
        }
    }

    fn fast(max_retry: u32) -> WaitConfig {
        WaitConfig {
            interval_ms: 1,
            max_retry,
        }
    }

    #[test]
    fn test_predicates() {
        let running = Response::ok(200, json!({"state": "RUNNING", "nodeNames": ["n1"]}));
        let stopped = Response::ok(200, json!({"nodeNames": []}));
        assert!(Expect::Running.matches(&running));
        assert!(!Expect::Stopped.matches(&running));
        assert!(Expect::Stopped.matches(&stopped));
        assert!(Expect::NodeJoined("n1".into()).matches(&running));
        assert!(!Expect::NodeJoined("n2".into()).matches(&running));
        assert!(Expect::NodeLeft("n1".into()).matches(&stopped));

        let list = Response::ok(200, json!([{"name": "zk", "group": "g"}, {"name": "bk"}]));
        assert!(!Expect::ServiceAbsent(ObjectKey::new("zk", "g")).matches(&list));
        assert!(!Expect::ServiceAbsent(ObjectKey::of("bk")).matches(&list));
        assert!(Expect::ServiceAbsent(ObjectKey::of("zk")).matches(&list));

        let nodes = Response::ok(200, json!([{"hostname": "n1"}]));
        assert!(!Expect::NodeAbsent("n1".into()).matches(&nodes));
        assert!(Expect::NodeAbsent("n2".into()).matches(&nodes));

        assert!(Expect::ConnectReady.matches(&Response::ok(200, json!({"classInfos": [{}]}))));
        assert!(!Expect::ConnectReady.matches(&Response::ok(200, json!({"classInfos": []}))));
        assert!(!Expect::Stopped.matches(&Response::failed(500, vec![])));
    }

    #[tokio::test]
    async fn test_resolves_once_condition_holds() {
        let script = Script::new(vec![
            Ok(Response::ok(200, json!({}))),
            Ok(Response::ok(200, json!({}))),
            Ok(Response::ok(200, json!({"state": "RUNNING"}))),
        ]);
        let res = wait(&script, WaitRequest::new("/v0/zookeepers/zk", Expect::Running), &fast(10))
            .await
            .unwrap();
        assert!(res.is_success);
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_a_failed_response() {
        let script = Script::new(vec![]);
        let res = wait(&script, WaitRequest::new("/v0/zookeepers/zk", Expect::Running), &fast(3))
            .await
            .unwrap();
        assert!(!res.is_success);
        assert_eq!(res.errors[0].message, TIMEOUT_MESSAGE);
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_budget_still_polls_once() {
        let script = Script::new(vec![Ok(Response::ok(200, json!({"state": "RUNNING"})))]);
        let res = wait(&script, WaitRequest::new("/v0/zookeepers/zk", Expect::Running), &fast(0))
            .await
            .unwrap();
        assert!(res.is_success);
        assert_eq!(script.calls(), 1);

        let script = Script::new(vec![]);
        let res = wait(&script, WaitRequest::new("/v0/zookeepers/zk", Expect::Running), &fast(0))
            .await
            .unwrap();
        assert_eq!(res.errors[0].message, TIMEOUT_MESSAGE);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_poll_stops_immediately() {
        let script = Script::new(vec![Ok(Response::failed(
            404,
            vec![ApiError::new("zk does not exist")],
        ))]);
        let res = wait(&script, WaitRequest::new("/v0/zookeepers/zk", Expect::Running), &fast(10))
            .await
            .unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let script = Script::new(vec![Err(ClientError::Transport("connection reset".into()))]);
        let res = wait(&script, WaitRequest::new("/v0/nodes", Expect::NodeAbsent("n1".into())), &fast(10)).await;
        assert!(matches!(res, Err(ClientError::Transport(_))));
        assert_eq!(script.calls(), 1);
    }
}
