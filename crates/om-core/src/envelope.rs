//! # Action Result Envelope
//!
//! Every action creator answers with `{ data, errors, title }`. Exactly one
//! of `data` / `errors` is populated; `title` is always a human-readable
//! summary such as `"Start worker default/wk successful."`.

use crate::model::ResourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error body produced by the configurator (`{code, message, stack}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            stack: None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// What an action did, used to build titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Get,
    GetList,
    Update,
    Start,
    Stop,
    Remove,
    AddNode,
    RemoveNode,
    Refresh,
}

/// Verb + resource kind + key of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub verb: Verb,
    pub kind: ResourceKind,
    pub key: Option<String>,
}

impl Subject {
    pub fn new(verb: Verb, kind: ResourceKind, key: impl fmt::Display) -> Self {
        Self {
            verb,
            kind,
            key: Some(key.to_string()),
        }
    }

    pub fn list(kind: ResourceKind) -> Self {
        Self {
            verb: Verb::GetList,
            kind,
            key: None,
        }
    }

    pub fn title(&self, success: bool) -> String {
        let outcome = if success { "successful." } else { "failed." };
        let kind = self.kind.label();
        let head = match self.verb {
            Verb::Create => format!("Create {}", kind),
            Verb::Get => format!("Get {}", kind),
            Verb::GetList => return format!("Get {} list {}", kind, outcome),
            Verb::Update => format!("Update {}", kind),
            Verb::Start => format!("Start {}", kind),
            Verb::Stop => format!("Stop {}", kind),
            Verb::Remove => format!("Remove {}", kind),
            Verb::AddNode => format!("Add node to {}", kind),
            Verb::RemoveNode => format!("Remove node from {}", kind),
            Verb::Refresh => format!("Refresh {}", kind),
        };
        match &self.key {
            Some(key) => format!("{} {} {}", head, key, outcome),
            None => format!("{} {}", head, outcome),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ApiError>>,
    pub title: String,
}

impl<T> ActionResult<T> {
    pub fn success(subject: &Subject, data: T) -> Self {
        Self {
            data: Some(data),
            errors: None,
            title: subject.title(true),
        }
    }

    pub fn failure(subject: &Subject, errors: Vec<ApiError>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
            title: subject.title(false),
        }
    }

    pub fn from_outcome(subject: &Subject, outcome: Result<T, Vec<ApiError>>) -> Self {
        match outcome {
            Ok(data) => Self::success(subject, data),
            Err(errors) => Self::failure(subject, errors),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_none()
    }

    /// Error messages joined for display, if the action failed.
    pub fn error_message(&self) -> Option<String> {
        self.errors.as_ref().map(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
        ActionResult {
            data: self.data.map(f),
            errors: self.errors,
            title: self.title,
        }
    }

    /// Splits into the data or a `(title, message)` pair.
    pub fn into_result(self) -> Result<T, (String, String)> {
        match (self.data, self.errors) {
            (Some(data), None) => Ok(data),
            (_, errors) => {
                let message = errors
                    .unwrap_or_default()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                Err((self.title, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectKey;

    #[test]
    fn test_titles() {
        let key = ObjectKey::of("zk");
        assert_eq!(
            Subject::new(Verb::Create, ResourceKind::Zookeeper, &key).title(true),
            "Create zookeeper default/zk successful."
        );
        assert_eq!(
            Subject::new(Verb::AddNode, ResourceKind::Worker, &key).title(false),
            "Add node to worker default/zk failed."
        );
        assert_eq!(
            Subject::new(Verb::RemoveNode, ResourceKind::Broker, &key).title(true),
            "Remove node from broker default/zk successful."
        );
        assert_eq!(
            Subject::list(ResourceKind::Node).title(false),
            "Get node list failed."
        );
    }

    #[test]
    fn test_envelope_exclusivity() {
        let subject = Subject::new(Verb::Get, ResourceKind::Node, "n1");
        let ok = ActionResult::success(&subject, 1);
        assert!(ok.is_success());
        assert_eq!(ok.data, Some(1));
        assert!(ok.errors.is_none());

        let err: ActionResult<i32> = ActionResult::failure(
            &subject,
            vec![ApiError::with_code("NoSuchElement", "n1 does not exist")],
        );
        assert!(!err.is_success());
        assert!(err.data.is_none());
        assert_eq!(err.title, "Get node n1 failed.");
        assert_eq!(
            err.error_message().as_deref(),
            Some("NoSuchElement: n1 does not exist")
        );
    }
}
