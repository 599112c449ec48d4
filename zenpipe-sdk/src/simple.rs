//! Pass-through processor exporting each record as it ends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};
use zenpipe_common::{Record, Resource};

use crate::cancel::CancellationToken;
use crate::error::ProcessorError;
use crate::export::{ExportAdapter, ExportResult};
use crate::processor::{Processor, ProcessorResult};

/// Exports every ended record synchronously on the caller's thread.
///
/// There is no buffering: a slow or failing sink slows the caller down.
/// Export failures are logged by the adapter and never reported to the caller.
pub struct SimpleProcessor {
    adapter: Arc<ExportAdapter>,
    // Serializes exports so the adapter only ever has one caller.
    export_lock: Mutex<()>,
    shutdown_timeout: Duration,
    is_shutdown: AtomicBool,
}

impl SimpleProcessor {
    pub fn new(adapter: Arc<ExportAdapter>, shutdown_timeout: Duration) -> Self {
        Self {
            adapter,
            export_lock: Mutex::new(()),
            shutdown_timeout,
            is_shutdown: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Processor for SimpleProcessor {
    fn name(&self) -> &str {
        "simple"
    }

    fn set_resource(&self, resource: &Resource) {
        self.adapter.bind_resource(resource);
    }

    fn on_start(&self, _record: &Record) -> ProcessorResult {
        Ok(())
    }

    fn on_end(&self, record: &Record) -> ProcessorResult {
        if self.is_shutdown.load(Ordering::Acquire) {
            debug!(record = %record.name, "Record ended after shutdown, dropping");
            return Ok(());
        }

        let _guard = self.export_lock.lock();
        if self.adapter.export(std::slice::from_ref(record)) == ExportResult::Failure {
            debug!(record = %record.name, "Record not exported");
        }
        Ok(())
    }

    async fn shutdown(&self, _cancel: &CancellationToken) -> ProcessorResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return Err(ProcessorError::AlreadyShutdown);
        }

        let _guard = self.export_lock.lock();
        if self.adapter.shutdown(self.shutdown_timeout) {
            Ok(())
        } else {
            warn!(timeout = ?self.shutdown_timeout, "Export client did not shut down cleanly");
            Err(ProcessorError::Shutdown(format!(
                "export client did not shut down within {:?}",
                self.shutdown_timeout
            )))
        }
    }

    async fn force_flush(&self, _cancel: &CancellationToken) -> ProcessorResult {
        // Nothing is ever buffered.
        Ok(())
    }
}
