//! The component that originates records and owns the processor pipeline.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, trace, warn};
use zenpipe_common::{Record, Resource};

use crate::cancel::{CancellationSource, CancellationToken};
use crate::error::ProcessorError;
use crate::processor::{Processor, ProcessorResult};

/// Feeds record lifecycle events into a processor and tears it down once.
///
/// Records started or ended inside a suppression scope are dropped, so an
/// export that emits telemetry of its own cannot feed back into the pipeline.
pub struct TelemetryProvider {
    processor: Box<dyn Processor>,
    resource: Resource,
    is_shutdown: AtomicBool,
}

impl TelemetryProvider {
    /// Take ownership of `processor` and hand it `resource`, which every
    /// export of the pipeline then carries.
    pub fn new(processor: impl Processor + 'static, resource: Resource) -> Self {
        processor.set_resource(&resource);
        Self {
            processor: Box::new(processor),
            resource,
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Notify the pipeline that `record` started.
    pub fn start(&self, record: &Record) -> ProcessorResult {
        if self.should_drop(record) {
            return Ok(());
        }
        self.processor.on_start(record)
    }

    /// Notify the pipeline that `record` ended.
    pub fn end(&self, record: &Record) -> ProcessorResult {
        if self.should_drop(record) {
            return Ok(());
        }
        self.processor.on_end(record)
    }

    fn should_drop(&self, record: &Record) -> bool {
        if crate::suppression::is_suppressed() {
            trace!(record = %record.name, "Suppressed record dropped");
            return true;
        }
        if self.is_shutdown.load(Ordering::Acquire) {
            trace!(record = %record.name, "Provider shut down, record dropped");
            return true;
        }
        false
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Flush the pipeline without shutting it down.
    pub async fn force_flush(&self, cancel: &CancellationToken) -> ProcessorResult {
        self.processor.force_flush(cancel).await
    }

    /// Shut the pipeline down, then dispose it.
    ///
    /// Dispose runs even when shutdown fails. Only the first call does any
    /// work; later calls return [`ProcessorError::AlreadyShutdown`].
    pub async fn shutdown(&self, cancel: &CancellationToken) -> ProcessorResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return Err(ProcessorError::AlreadyShutdown);
        }

        info!(processor = self.processor.name(), "Shutting down telemetry provider");
        let result = self.processor.shutdown(cancel).await;
        if let Err(e) = self.processor.dispose() {
            warn!(error = %e, "Processor dispose failed");
        }
        result
    }

    /// Shut down like [`shutdown`](Self::shutdown), cancelling pending work
    /// if `interrupt` resolves first.
    ///
    /// After an interrupt the pipeline still runs to completion, but every
    /// child sees a cancelled token and gives up waiting on its exporter.
    pub async fn shutdown_interruptible(&self, interrupt: impl Future<Output = ()>) -> ProcessorResult {
        let source = CancellationSource::new();
        let token = source.token();
        let shutdown = self.shutdown(&token);
        tokio::pin!(shutdown);

        tokio::select! {
            result = &mut shutdown => result,
            () = interrupt => {
                warn!("Shutdown interrupted, cancelling pending work");
                source.cancel();
                shutdown.await
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TelemetryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryProvider")
            .field("processor", &self.processor.name())
            .field("resource", &self.resource)
            .field("is_shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suppression::SuppressionGuard;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
        fail_shutdown: bool,
        wait_for_cancel: bool,
    }

    #[async_trait]
    impl Processor for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_start(&self, record: &Record) -> ProcessorResult {
            self.calls.lock().push(format!("start:{}", record.name));
            Ok(())
        }

        fn on_end(&self, record: &Record) -> ProcessorResult {
            self.calls.lock().push(format!("end:{}", record.name));
            Ok(())
        }

        fn set_resource(&self, resource: &Resource) {
            let name = resource.service_name().unwrap_or_default();
            self.calls.lock().push(format!("resource:{name}"));
        }

        async fn shutdown(&self, cancel: &CancellationToken) -> ProcessorResult {
            self.calls.lock().push("shutdown".to_string());
            if self.wait_for_cancel {
                cancel.cancelled().await;
                return Err(ProcessorError::Cancelled);
            }
            if self.fail_shutdown {
                Err(ProcessorError::Shutdown("sink gone".to_string()))
            } else {
                Ok(())
            }
        }

        async fn force_flush(&self, _cancel: &CancellationToken) -> ProcessorResult {
            self.calls.lock().push("flush".to_string());
            Ok(())
        }

        fn dispose(&self) -> ProcessorResult {
            self.calls.lock().push("dispose".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_forwards_lifecycle() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let provider = TelemetryProvider::new(recorder, Resource::new("orders"));

        let record = Record::span("checkout");
        provider.start(&record).unwrap();
        provider.end(&record).unwrap();

        assert_eq!(
            *calls.lock(),
            vec!["resource:orders", "start:checkout", "end:checkout"]
        );
        assert_eq!(provider.resource().service_name(), Some("orders"));
    }

    #[test]
    fn test_drops_suppressed_records() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let provider = TelemetryProvider::new(recorder, Resource::default());

        {
            let _guard = SuppressionGuard::enter();
            provider.end(&Record::span("from-export")).unwrap();
        }
        provider.end(&Record::span("after")).unwrap();

        assert_eq!(*calls.lock(), vec!["resource:", "end:after"]);
    }

    #[test]
    fn test_shutdown_then_dispose_once() {
        let recorder = Recorder {
            fail_shutdown: true,
            ..Default::default()
        };
        let calls = recorder.calls.clone();
        let provider = TelemetryProvider::new(recorder, Resource::default());
        let cancel = CancellationToken::never();

        let first = tokio_test::block_on(provider.shutdown(&cancel));
        assert!(matches!(first, Err(ProcessorError::Shutdown(_))));

        let second = tokio_test::block_on(provider.shutdown(&cancel));
        assert!(matches!(second, Err(ProcessorError::AlreadyShutdown)));

        provider.end(&Record::span("late")).unwrap();
        assert_eq!(*calls.lock(), vec!["resource:", "shutdown", "dispose"]);
        assert!(provider.is_shutdown());
    }

    #[test]
    fn test_force_flush_does_not_shut_down() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let provider = TelemetryProvider::new(recorder, Resource::default());

        tokio_test::block_on(provider.force_flush(&CancellationToken::never())).unwrap();

        assert_eq!(*calls.lock(), vec!["resource:", "flush"]);
        assert!(!provider.is_shutdown());
    }

    #[tokio::test]
    async fn test_interrupt_cancels_pending_shutdown() {
        let recorder = Recorder {
            wait_for_cancel: true,
            ..Default::default()
        };
        let calls = recorder.calls.clone();
        let provider = TelemetryProvider::new(recorder, Resource::default());

        let result = provider.shutdown_interruptible(std::future::ready(())).await;

        assert!(matches!(result, Err(ProcessorError::Cancelled)));
        assert_eq!(*calls.lock(), vec!["resource:", "shutdown", "dispose"]);
    }

    #[tokio::test]
    async fn test_uninterrupted_shutdown_completes() {
        let provider = TelemetryProvider::new(Recorder::default(), Resource::default());

        provider
            .shutdown_interruptible(std::future::pending())
            .await
            .unwrap();
        assert!(provider.is_shutdown());
    }
}
