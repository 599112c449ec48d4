//! The processor capability implemented by every lifecycle observer.

use async_trait::async_trait;
use zenpipe_common::{Record, Resource};

use crate::cancel::CancellationToken;
use crate::error::ProcessorError;

/// Result type for processor operations.
pub type ProcessorResult = std::result::Result<(), ProcessorError>;

/// Observer of record lifecycle events.
///
/// `on_start` and `on_end` run synchronously on the emitting thread and must
/// not block for long. `shutdown` and `force_flush` are asynchronous and may
/// suspend until buffered work has been handed to an exporter.
///
/// Implementations include [`SimpleProcessor`](crate::SimpleProcessor),
/// [`BatchProcessor`](crate::BatchProcessor) and
/// [`CompositeProcessor`](crate::CompositeProcessor), which lets chains nest.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Receive the owning provider's resource. Called once, before any
    /// record is emitted.
    fn set_resource(&self, _resource: &Resource) {}

    /// Called when a record starts (spans) or is first emitted.
    fn on_start(&self, record: &Record) -> ProcessorResult;

    /// Called when a record is finished.
    fn on_end(&self, record: &Record) -> ProcessorResult;

    /// Stop accepting records and release the downstream exporter.
    async fn shutdown(&self, cancel: &CancellationToken) -> ProcessorResult;

    /// Export everything buffered so far without shutting down.
    async fn force_flush(&self, cancel: &CancellationToken) -> ProcessorResult;

    /// Release resources that outlive shutdown. Called once, after shutdown.
    fn dispose(&self) -> ProcessorResult {
        Ok(())
    }
}
