//! Error types for the SDK core.

use thiserror::Error;

/// Result type alias using [`SdkError`].
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors raised while assembling a pipeline.
#[derive(Error, Debug)]
pub enum SdkError {
    /// A processor chain needs at least one processor.
    #[error("Processor chain requires at least one processor")]
    EmptyChain,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The batching engine was built outside a Tokio runtime.
    #[error("Batch processor requires a running Tokio runtime")]
    NoRuntime,

    /// Error from the common crate (config loading, Zenoh, serialization).
    #[error(transparent)]
    Common(#[from] zenpipe_common::Error),
}

impl SdkError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<zenoh::Error> for SdkError {
    fn from(err: zenoh::Error) -> Self {
        Self::Common(zenpipe_common::Error::Zenoh(err))
    }
}

/// Faults raised by processors during lifecycle calls.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// A processor failed while handling `on_start` / `on_end`.
    #[error("Processor '{processor}' failed to handle notification: {message}")]
    Notification { processor: String, message: String },

    /// A processor failed to shut down.
    #[error("Shutdown failed: {0}")]
    Shutdown(String),

    /// A processor failed to flush.
    #[error("Flush failed: {0}")]
    Flush(String),

    /// A processor failed to release its resources.
    #[error("Dispose failed: {0}")]
    Dispose(String),

    /// The caller's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// Shutdown was already requested.
    #[error("Processor already shut down")]
    AlreadyShutdown,

    /// Several children failed during an aggregate shutdown or flush.
    #[error("{} processors failed: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<ProcessorError>),
}

impl ProcessorError {
    /// Create a notification fault for a named processor.
    pub fn notification(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notification {
            processor: processor.into(),
            message: message.into(),
        }
    }

    /// Collapse collected faults: none is `Ok`, one is returned as is.
    pub fn aggregate(mut errors: Vec<ProcessorError>) -> std::result::Result<(), ProcessorError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Aggregate(errors)),
        }
    }
}

fn join_errors(errors: &[ProcessorError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Causes of a failed export attempt.
///
/// Never escapes [`ExportAdapter::export`](crate::ExportAdapter::export); it is
/// logged and handed to the failure hook.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The adapter has no export client attached.
    #[error("No export client attached")]
    NoClient,

    /// The batch could not be encoded into a request.
    #[error("Failed to encode export request: {0}")]
    Encode(String),

    /// The export client failed.
    #[error("Export client error: {0}")]
    Client(String),

    /// The export client refused the request.
    #[error("Export request rejected by client")]
    Rejected,
}

impl From<zenpipe_common::Error> for ExportError {
    fn from(err: zenpipe_common::Error) -> Self {
        if err.is_serialization() {
            Self::Encode(err.to_string())
        } else {
            Self::Client(err.to_string())
        }
    }
}
