use om_core::SchemaError;

/// Failures that never reached a configurator verdict.
///
/// A configurator that answers with an error status is not a `ClientError`;
/// that outcome is carried by a failed [`om_core::ActionResult`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    Schema(#[from] SchemaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0} is not supported for {1}")]
    Unsupported(&'static str, om_core::ResourceKind),

    #[error("transport error: {0}")]
    Transport(String),
}
