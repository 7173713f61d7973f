use om_client::ClientError;
use om_core::ResourceKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request never got a configurator verdict.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The configurator rejected the action (or its wait ran out).
    #[error("{title} {message}")]
    Failed { title: String, message: String },

    /// Another request of the store is still in flight.
    #[error("{0} store is busy")]
    Busy(ResourceKind),
}

impl From<(String, String)> for StoreError {
    fn from((title, message): (String, String)) -> Self {
        Self::Failed { title, message }
    }
}
