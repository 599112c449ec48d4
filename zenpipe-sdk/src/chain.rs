//! Ordered fan-out of lifecycle events to several processors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};
use zenpipe_common::{Record, Resource};

use crate::cancel::CancellationToken;
use crate::error::{ProcessorError, Result, SdkError};
use crate::processor::{Processor, ProcessorResult};

/// A processor that forwards every call to an ordered list of children.
///
/// Children are notified in registration order. The list can only grow:
/// [`append`](Self::append) adds to the tail and nothing is ever removed or
/// reordered. The chain owns its children and disposes them in
/// [`dispose`](Processor::dispose).
///
/// Fault policy:
/// - `on_start` / `on_end`: fail-fast. The first child error is returned and
///   the remaining children do not see the event.
/// - `shutdown` / `force_flush`: sequential, continue-and-aggregate. Every
///   child is driven in order, each one only after the previous future
///   resolved; all errors are returned together.
/// - `dispose`: fully isolated. Errors are logged and skipped.
///
/// Every call works on a snapshot of the child list taken when it starts, so
/// children may re-enter or `append` to the chain; an appended processor sees
/// events from the next call on.
pub struct CompositeProcessor {
    children: RwLock<Vec<Arc<dyn Processor>>>,
    is_shutdown: AtomicBool,
    is_disposed: AtomicBool,
}

impl CompositeProcessor {
    /// Build a chain from a non-empty list of processors.
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Result<Self> {
        if processors.is_empty() {
            return Err(SdkError::EmptyChain);
        }

        Ok(Self {
            children: RwLock::new(processors.into_iter().map(Arc::from).collect()),
            is_shutdown: AtomicBool::new(false),
            is_disposed: AtomicBool::new(false),
        })
    }

    /// Add a processor at the tail of the chain.
    pub fn append(&self, processor: Box<dyn Processor>) -> &Self {
        debug!(processor = processor.name(), "Appending processor to chain");
        self.children.write().push(Arc::from(processor));
        self
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.children.read().len()
    }

    /// Always false: a chain is never empty.
    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty()
    }

    /// Names of the children in registration order.
    pub fn processor_names(&self) -> Vec<String> {
        self.children
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Processor>> {
        self.children.read().clone()
    }
}

impl std::fmt::Debug for CompositeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProcessor")
            .field("processors", &self.processor_names())
            .field("is_shutdown", &self.is_shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl Processor for CompositeProcessor {
    fn name(&self) -> &str {
        "composite"
    }

    fn set_resource(&self, resource: &Resource) {
        for child in self.snapshot() {
            child.set_resource(resource);
        }
    }

    fn on_start(&self, record: &Record) -> ProcessorResult {
        for child in self.snapshot() {
            child.on_start(record)?;
        }
        Ok(())
    }

    fn on_end(&self, record: &Record) -> ProcessorResult {
        for child in self.snapshot() {
            child.on_end(record)?;
        }
        Ok(())
    }

    async fn shutdown(&self, cancel: &CancellationToken) -> ProcessorResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return Err(ProcessorError::AlreadyShutdown);
        }

        let mut errors = Vec::new();
        for child in self.snapshot() {
            if let Err(e) = child.shutdown(cancel).await {
                warn!(processor = child.name(), error = %e, "Processor shutdown failed");
                errors.push(e);
            }
        }
        ProcessorError::aggregate(errors)
    }

    async fn force_flush(&self, cancel: &CancellationToken) -> ProcessorResult {
        let mut errors = Vec::new();
        for child in self.snapshot() {
            if let Err(e) = child.force_flush(cancel).await {
                warn!(processor = child.name(), error = %e, "Processor flush failed");
                errors.push(e);
            }
        }
        ProcessorError::aggregate(errors)
    }

    fn dispose(&self) -> ProcessorResult {
        if self.is_disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        for child in self.snapshot() {
            if let Err(e) = child.dispose() {
                warn!(processor = child.name(), error = %e, "Processor dispose failed");
            }
        }
        Ok(())
    }
}
