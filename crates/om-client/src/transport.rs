//! # Transport
//!
//! The seam between the action creators and the configurator. Every
//! HTTP exchange is normalized into a [`Response`]: `is_success` mirrors a
//! 2xx status, `result` holds the decoded JSON body and `errors` the
//! configurator's `{code, message, stack}` payload for anything else.

use crate::config::ClientConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use om_core::{ActionResult, ApiError, Subject};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Absolute path, e.g. `/v0/workers/wk/start`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A normalized configurator answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub is_success: bool,
    pub result: Value,
    pub errors: Vec<ApiError>,
}

impl Response {
    pub fn ok(status: u16, result: Value) -> Self {
        Self {
            status,
            is_success: true,
            result,
            errors: Vec::new(),
        }
    }

    pub fn failed(status: u16, errors: Vec<ApiError>) -> Self {
        Self {
            status,
            is_success: false,
            result: Value::Null,
            errors,
        }
    }

    /// Builds the action envelope, validating the body against `T`.
    pub fn into_result<T: DeserializeOwned>(self, subject: &Subject) -> ActionResult<T> {
        let result = if self.is_success {
            match serde_json::from_value::<T>(self.result) {
                Ok(data) => ActionResult::success(subject, data),
                Err(e) => ActionResult::failure(
                    subject,
                    vec![ApiError::with_code("ResponseShape", e.to_string())],
                ),
            }
        } else {
            let errors = if self.errors.is_empty() {
                vec![ApiError::new(format!("HTTP status {}", self.status))]
            } else {
                self.errors
            };
            ActionResult::failure(subject, errors)
        };

        match result.error_message() {
            None => tracing::info!("{}", result.title),
            Some(message) => tracing::warn!("{} {}", result.title, message),
        }
        result
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, ClientError>;
}

// =============================================================================
// reqwest transport
// =============================================================================

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.configurator.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!(method = ?request.method, %url, query = ?request.query, "configurator request");

        let mut builder = self.client.request(request.method.into(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status.is_success() {
            let result = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)?
            };
            Ok(Response::ok(status.as_u16(), result))
        } else {
            let error = serde_json::from_str::<ApiError>(&text).unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    ApiError::new(status.to_string())
                } else {
                    ApiError::new(text)
                }
            });
            tracing::debug!(status = status.as_u16(), %error, "configurator rejected request");
            Ok(Response::failed(status.as_u16(), vec![error]))
        }
    }
}
