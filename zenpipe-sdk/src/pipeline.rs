//! Building processors and processor chains from configuration.

use std::sync::Arc;

use tracing::info;

use crate::batch::BatchProcessor;
use crate::chain::CompositeProcessor;
use crate::config::{ExporterConfig, ProcessorConfig, ProcessorMode, SdkConfig};
use crate::error::{Result, SdkError};
use crate::export::{ExportAdapter, ExportClient};
use crate::processor::Processor;
use crate::simple::SimpleProcessor;

/// Wrap `adapter` into the processor selected by `config.mode`.
///
/// `Batched` spawns a worker and must be called inside a Tokio runtime.
pub fn build_processor(
    adapter: Arc<ExportAdapter>,
    config: &ProcessorConfig,
    exporter: &ExporterConfig,
) -> Result<Box<dyn Processor>> {
    let processor: Box<dyn Processor> = match config.mode {
        ProcessorMode::Immediate => Box::new(SimpleProcessor::new(
            adapter,
            exporter.shutdown_timeout(),
        )),
        ProcessorMode::Batched => Box::new(BatchProcessor::new(
            adapter,
            config.batch.clone(),
            exporter.shutdown_timeout(),
        )?),
    };

    info!(mode = ?config.mode, processor = processor.name(), "Processor built");
    Ok(processor)
}

/// Build an adapter around `client` using the encoding settings of `config`.
pub fn adapter_from_config(client: impl ExportClient + 'static, config: &SdkConfig) -> ExportAdapter {
    let resource = config.resource.clone();
    ExportAdapter::builder()
        .with_client(client)
        .with_resource_resolver(move || resource.to_resource())
        .with_limits(config.limits)
        .with_experimental(config.experimental)
        .with_format(config.serialization)
        .build()
}

/// Build a chain with one processor per adapter, in the given order.
pub fn build_pipeline(adapters: Vec<Arc<ExportAdapter>>, config: &SdkConfig) -> Result<CompositeProcessor> {
    if adapters.is_empty() {
        return Err(SdkError::EmptyChain);
    }

    let processors = adapters
        .into_iter()
        .map(|adapter| build_processor(adapter, &config.processor, &config.exporter))
        .collect::<Result<Vec<_>>>()?;

    CompositeProcessor::new(processors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::error::ExportError;
    use crate::request::ExportRequest;
    use parking_lot::Mutex;
    use std::time::Duration;
    use zenpipe_common::Record;

    #[derive(Default)]
    struct CountingClient {
        batches: Mutex<Vec<usize>>,
    }

    impl ExportClient for CountingClient {
        fn send(&self, request: &ExportRequest) -> std::result::Result<bool, ExportError> {
            self.batches.lock().push(request.record_count());
            Ok(true)
        }

        fn shutdown(&self, _timeout: Duration) -> bool {
            true
        }
    }

    fn immediate() -> ProcessorConfig {
        ProcessorConfig {
            mode: ProcessorMode::Immediate,
            ..Default::default()
        }
    }

    #[test]
    fn test_immediate_exports_synchronously() {
        let client = Arc::new(CountingClient::default());
        let adapter = Arc::new(ExportAdapter::new(client.clone()));

        let processor = build_processor(adapter, &immediate(), &ExporterConfig::default()).unwrap();
        assert_eq!(processor.name(), "simple");

        processor.on_end(&Record::span("checkout")).unwrap();
        assert_eq!(*client.batches.lock(), vec![1]);
    }

    #[test]
    fn test_batched_outside_runtime_fails() {
        let adapter = Arc::new(ExportAdapter::builder().build());
        let result = build_processor(adapter, &ProcessorConfig::default(), &ExporterConfig::default());
        assert!(matches!(result, Err(SdkError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_batched_mode_builds_batch_processor() {
        let adapter = Arc::new(ExportAdapter::builder().build());
        let processor =
            build_processor(adapter, &ProcessorConfig::default(), &ExporterConfig::default()).unwrap();
        assert_eq!(processor.name(), "batch");
        processor.shutdown(&CancellationToken::never()).await.unwrap();
    }

    #[test]
    fn test_pipeline_one_processor_per_adapter() {
        let mut config = SdkConfig::default();
        config.processor = immediate();

        let first = Arc::new(CountingClient::default());
        let second = Arc::new(CountingClient::default());
        let adapters = vec![
            Arc::new(adapter_from_config(first.clone(), &config)),
            Arc::new(adapter_from_config(second.clone(), &config)),
        ];

        let chain = build_pipeline(adapters, &config).unwrap();
        assert_eq!(chain.processor_names(), vec!["simple", "simple"]);

        chain.on_end(&Record::span("a")).unwrap();
        assert_eq!(*first.batches.lock(), vec![1]);
        assert_eq!(*second.batches.lock(), vec![1]);
    }

    #[test]
    fn test_pipeline_without_adapters() {
        let result = build_pipeline(Vec::new(), &SdkConfig::default());
        assert!(matches!(result, Err(SdkError::EmptyChain)));
    }

    #[test]
    fn test_adapter_uses_configured_resource() {
        let mut config = SdkConfig::default();
        config.resource.service_name = "payments".to_string();

        let adapter = adapter_from_config(CountingClient::default(), &config);
        assert_eq!(adapter.resource().service_name(), Some("payments"));
    }
}
