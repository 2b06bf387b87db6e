//! Error taxonomy for datastore operations.

use lockbox_wire::WireError;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors surfaced by the bridge as `DataStoreEvent::Error`.
///
/// Every variant is a terminal outcome for the call that produced it; the
/// bridge never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataStoreError {
    /// A mutation was attempted on an item without an id.
    #[error("no item id passed")]
    NoIdPassed,

    /// A sensitive operation was attempted while the store is locked.
    #[error("datastore is locked")]
    Locked,

    /// A sensitive operation was attempted before the store was initialized.
    #[error("datastore is not initialized")]
    NotInitialized,

    /// A callback payload did not decode.
    #[error("unexpected payload type")]
    UnexpectedType,

    /// A callback arrived on a channel we never registered.
    #[error("unexpected javascript method")]
    UnexpectedJavaScriptMethod,

    /// The engine could not be bootstrapped.
    #[error("unknown datastore error")]
    Unknown,

    /// The engine reported a failure.
    #[error("engine error: {message}")]
    Engine { message: String },

    /// No completion arrived within the configured callback timeout.
    #[error("timed out waiting for {operation} to complete")]
    Timeout { operation: &'static str },
}

impl From<WireError> for DataStoreError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::UnknownCallback { .. } => DataStoreError::UnexpectedJavaScriptMethod,
            WireError::UnexpectedType { .. } | WireError::Decode(_) | WireError::Encode(_) => {
                DataStoreError::UnexpectedType
            }
        }
    }
}

impl From<EngineError> for DataStoreError {
    fn from(e: EngineError) -> Self {
        DataStoreError::Engine {
            message: e.to_string(),
        }
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, DataStoreError>;
