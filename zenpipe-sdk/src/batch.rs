//! Batching processor: queues ended records and exports them from a worker task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use zenpipe_common::{Record, Resource};

use crate::cancel::CancellationToken;
use crate::config::BatchConfig;
use crate::error::{ProcessorError, Result, SdkError};
use crate::export::{ExportAdapter, ExportResult};
use crate::processor::{Processor, ProcessorResult};

/// Counters kept by a [`BatchProcessor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Records accepted into the queue.
    pub queued: u64,
    /// Records dropped because the queue was full or closed.
    pub dropped: u64,
    /// Records in batches the adapter reported as exported.
    pub exported: u64,
    /// Records in batches that failed or timed out.
    pub failed: u64,
    /// Export calls made.
    pub batches: u64,
}

enum Control {
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<bool>),
}

/// Buffers ended records and exports them in batches.
///
/// `on_end` never blocks: records go into a bounded queue and are dropped
/// when it is full. A worker task exports a batch as soon as
/// `max_export_batch_size` records are pending, and otherwise every
/// `scheduled_delay` if anything is pending. Exports run on the blocking pool
/// one at a time; an export exceeding `export_timeout` is counted as failed
/// and the next export waits for it to finish.
pub struct BatchProcessor {
    adapter: Arc<ExportAdapter>,
    records: mpsc::Sender<Record>,
    control: mpsc::UnboundedSender<Control>,
    stats: Arc<RwLock<BatchStats>>,
    overflowing: AtomicBool,
    is_shutdown: AtomicBool,
    worker: JoinHandle<()>,
}

impl BatchProcessor {
    /// Spawn the worker on the current Tokio runtime.
    pub fn new(
        adapter: Arc<ExportAdapter>,
        config: BatchConfig,
        shutdown_timeout: Duration,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SdkError::NoRuntime)?;

        let (records_tx, records_rx) = mpsc::channel(config.max_queue_size);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(RwLock::new(BatchStats::default()));

        info!(
            max_queue_size = config.max_queue_size,
            max_export_batch_size = config.max_export_batch_size,
            scheduled_delay = ?config.scheduled_delay(),
            export_timeout = ?config.export_timeout(),
            "Starting batch processor"
        );

        let worker = Worker {
            adapter: adapter.clone(),
            config,
            shutdown_timeout,
            stats: stats.clone(),
            buffer: Vec::new(),
            in_flight: None,
        };
        let worker = runtime.spawn(worker.run(records_rx, control_rx));

        Ok(Self {
            adapter,
            records: records_tx,
            control: control_tx,
            stats,
            overflowing: AtomicBool::new(false),
            is_shutdown: AtomicBool::new(false),
            worker,
        })
    }

    /// Snapshot of the processor counters.
    pub fn stats(&self) -> BatchStats {
        self.stats.read().clone()
    }

    fn record_dropped(&self) {
        self.stats.write().dropped += 1;
        if !self.overflowing.swap(true, Ordering::Relaxed) {
            warn!("Batch queue full, dropping records");
        }
    }
}

impl Drop for BatchProcessor {
    fn drop(&mut self) {
        if !self.is_shutdown.load(Ordering::Acquire) {
            self.worker.abort();
        }
    }
}

#[async_trait]
impl Processor for BatchProcessor {
    fn name(&self) -> &str {
        "batch"
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
            self.stats.write().dropped += 1;
            return Ok(());
        }

        match self.records.try_send(record.clone()) {
            Ok(()) => {
                self.stats.write().queued += 1;
                self.overflowing.store(false, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(_)) => self.record_dropped(),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Batch worker stopped, dropping record");
                self.stats.write().dropped += 1;
            }
        }
        Ok(())
    }

    async fn shutdown(&self, cancel: &CancellationToken) -> ProcessorResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return Err(ProcessorError::AlreadyShutdown);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.control
            .send(Control::Shutdown(reply_tx))
            .map_err(|_| ProcessorError::Shutdown("batch worker is not running".to_string()))?;

        tokio::select! {
            reply = reply_rx => match reply {
                Ok(true) => Ok(()),
                Ok(false) => Err(ProcessorError::Shutdown(
                    "export client did not shut down cleanly".to_string(),
                )),
                Err(_) => Err(ProcessorError::Shutdown("batch worker stopped".to_string())),
            },
            _ = cancel.cancelled() => Err(ProcessorError::Cancelled),
        }
    }

    async fn force_flush(&self, cancel: &CancellationToken) -> ProcessorResult {
        if self.is_shutdown.load(Ordering::Acquire) {
            return Err(ProcessorError::AlreadyShutdown);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.control
            .send(Control::Flush(reply_tx))
            .map_err(|_| ProcessorError::Flush("batch worker is not running".to_string()))?;

        tokio::select! {
            reply = reply_rx => reply.map_err(|_| ProcessorError::Flush("batch worker stopped".to_string())),
            _ = cancel.cancelled() => Err(ProcessorError::Cancelled),
        }
    }
}

struct Worker {
    adapter: Arc<ExportAdapter>,
    config: BatchConfig,
    shutdown_timeout: Duration,
    stats: Arc<RwLock<BatchStats>>,
    buffer: Vec<Record>,
    in_flight: Option<JoinHandle<ExportResult>>,
}

impl Worker {
    async fn run(
        mut self,
        mut records: mpsc::Receiver<Record>,
        mut control: mpsc::UnboundedReceiver<Control>,
    ) {
        let delay = self.config.scheduled_delay();
        let mut ticker = tokio::time::interval_at(Instant::now() + delay, delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                Some(message) = control.recv() => match message {
                    Control::Flush(reply) => {
                        self.drain(&mut records).await;
                        self.export_pending().await;
                        self.wait_in_flight().await;
                        let _ = reply.send(());
                    }
                    Control::Shutdown(reply) => {
                        records.close();
                        self.drain(&mut records).await;
                        self.export_pending().await;
                        self.wait_in_flight().await;
                        let _ = reply.send(self.shutdown_adapter().await);
                        break;
                    }
                },

                received = records.recv() => match received {
                    Some(record) => self.push(record).await,
                    None => {
                        self.export_pending().await;
                        break;
                    }
                },

                _ = ticker.tick() => {
                    if !self.buffer.is_empty() {
                        debug!(records = self.buffer.len(), "Scheduled export");
                        self.export_pending().await;
                    }
                }
            }
        }

        debug!("Batch worker stopped");
    }

    async fn push(&mut self, record: Record) {
        self.buffer.push(record);
        if self.buffer.len() >= self.config.max_export_batch_size {
            self.export_pending().await;
        }
    }

    /// Move everything already queued into the buffer, exporting full batches.
    async fn drain(&mut self, records: &mut mpsc::Receiver<Record>) {
        while let Ok(record) = records.try_recv() {
            self.push(record).await;
        }
    }

    async fn export_pending(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.wait_in_flight().await;

        let batch = std::mem::take(&mut self.buffer);
        let count = batch.len() as u64;
        let adapter = self.adapter.clone();
        let mut task = tokio::task::spawn_blocking(move || adapter.export(&batch));
        self.stats.write().batches += 1;

        let timeout = self.config.export_timeout();
        let outcome = tokio::time::timeout(timeout, &mut task).await;
        match outcome {
            Ok(Ok(ExportResult::Success)) => self.stats.write().exported += count,
            Ok(Ok(ExportResult::Failure)) => self.stats.write().failed += count,
            Ok(Err(e)) => {
                warn!(error = %e, records = count, "Export task panicked");
                self.stats.write().failed += count;
            }
            Err(_) => {
                warn!(timeout = ?timeout, records = count, "Export timed out");
                self.stats.write().failed += count;
                self.in_flight = Some(task);
            }
        }
    }

    async fn wait_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            let _ = task.await;
        }
    }

    async fn shutdown_adapter(&self) -> bool {
        let adapter = self.adapter.clone();
        let timeout = self.shutdown_timeout;
        tokio::task::spawn_blocking(move || adapter.shutdown(timeout))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationSource;
    use crate::error::ExportError;
    use crate::export::ExportClient;
    use crate::request::ExportRequest;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingClient {
        batches: Mutex<Vec<usize>>,
        shut_down: AtomicBool,
    }

    impl ExportClient for CountingClient {
        fn send(&self, request: &ExportRequest) -> std::result::Result<bool, ExportError> {
            self.batches.lock().push(request.record_count());
            Ok(true)
        }

        fn shutdown(&self, _timeout: Duration) -> bool {
            self.shut_down.store(true, Ordering::SeqCst);
            true
        }
    }

    fn config(max_queue_size: usize, max_export_batch_size: usize) -> BatchConfig {
        BatchConfig {
            max_queue_size,
            scheduled_delay_ms: 60_000,
            export_timeout_ms: 5_000,
            max_export_batch_size,
        }
    }

    fn processor(config: BatchConfig) -> (BatchProcessor, Arc<CountingClient>) {
        let client = Arc::new(CountingClient::default());
        let adapter = Arc::new(ExportAdapter::new(client.clone()));
        let processor = BatchProcessor::new(adapter, config, Duration::from_secs(1)).unwrap();
        (processor, client)
    }

    #[test]
    fn test_requires_runtime() {
        let adapter = Arc::new(ExportAdapter::builder().build());
        let result = BatchProcessor::new(adapter, BatchConfig::default(), Duration::from_secs(1));
        assert!(matches!(result, Err(SdkError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let adapter = Arc::new(ExportAdapter::builder().build());
        let result = BatchProcessor::new(adapter, config(4, 8), Duration::from_secs(1));
        assert!(matches!(result, Err(SdkError::Config(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_batch_exported_once() {
        let (processor, client) = processor(config(100, 10));

        for i in 0..10 {
            processor.on_end(&Record::span(format!("op-{i}"))).unwrap();
        }
        processor.force_flush(&CancellationToken::never()).await.unwrap();

        assert_eq!(*client.batches.lock(), vec![10]);
        assert_eq!(processor.stats().exported, 10);
    }

    #[tokio::test]
    async fn test_flush_drains_partial_batch() {
        let (processor, client) = processor(config(100, 10));

        for i in 0..13 {
            processor.on_end(&Record::span(format!("op-{i}"))).unwrap();
        }
        processor.force_flush(&CancellationToken::never()).await.unwrap();

        assert_eq!(*client.batches.lock(), vec![10, 3]);
    }

    #[tokio::test]
    async fn test_scheduled_export() {
        let mut cfg = config(100, 10);
        cfg.scheduled_delay_ms = 20;
        let (processor, client) = processor(cfg);

        processor.on_end(&Record::span("lonely")).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(*client.batches.lock(), vec![1]);
        drop(processor);
    }

    #[tokio::test]
    async fn test_queue_overflow_drops() {
        let (processor, client) = processor(config(2, 2));

        // The current-thread worker cannot run until we await.
        for i in 0..5 {
            processor.on_end(&Record::span(format!("op-{i}"))).unwrap();
        }
        processor.force_flush(&CancellationToken::never()).await.unwrap();

        let stats = processor.stats();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.dropped, 3);
        assert_eq!(*client.batches.lock(), vec![2]);
    }

    #[tokio::test]
    async fn test_shutdown_exports_pending_and_closes_client() {
        let (processor, client) = processor(config(100, 10));

        processor.on_end(&Record::span("pending")).unwrap();
        processor.shutdown(&CancellationToken::never()).await.unwrap();

        assert_eq!(*client.batches.lock(), vec![1]);
        assert!(client.shut_down.load(Ordering::SeqCst));

        processor.on_end(&Record::span("late")).unwrap();
        assert_eq!(processor.stats().dropped, 1);
        assert!(matches!(
            processor.force_flush(&CancellationToken::never()).await,
            Err(ProcessorError::AlreadyShutdown)
        ));
        assert!(matches!(
            processor.shutdown(&CancellationToken::never()).await,
            Err(ProcessorError::AlreadyShutdown)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_flush() {
        let (processor, _client) = processor(config(100, 10));
        let source = CancellationSource::new();
        source.cancel();

        let result = processor.force_flush(&source.token()).await;
        assert!(matches!(result, Err(ProcessorError::Cancelled)));
    }
}
