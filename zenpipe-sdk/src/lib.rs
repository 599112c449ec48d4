//! ZenPipe SDK
//!
//! The notification and export core of the ZenPipe telemetry pipeline:
//!
//! - [`processor`] - The `Processor` capability observing record lifecycles
//! - [`chain`] - `CompositeProcessor`, ordered fan-out to many processors
//! - [`export`] - `ExportAdapter` turning batches into export client calls
//! - [`client`] - `ZenohExportClient`, the Zenoh transport
//! - [`simple`] / [`batch`] - Immediate and batching processors
//! - [`pipeline`] - Building processors and chains from configuration
//! - [`provider`] - `TelemetryProvider`, the entry point for emitting records
//! - [`suppression`] - Scope in which emitted records are dropped
//! - [`config`] - SDK configuration (JSON5 format)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zenpipe_sdk::{
//!     CancellationToken, SdkConfig, TelemetryProvider, ZenohExportClient,
//!     adapter_from_config, build_pipeline,
//! };
//!
//! let config = SdkConfig::load_from_file("zenpipe.json5")?;
//! let session = Arc::new(zenpipe_common::connect(&config.zenoh).await?);
//! let client = ZenohExportClient::from_config(session, &config)?;
//!
//! let adapter = Arc::new(adapter_from_config(client, &config));
//! let provider = TelemetryProvider::new(
//!     build_pipeline(vec![adapter], &config)?,
//!     config.resource.to_resource(),
//! );
//!
//! let record = zenpipe_common::Record::span("checkout");
//! provider.start(&record)?;
//! provider.end(&record)?;
//! provider.shutdown(&CancellationToken::never()).await?;
//! ```

pub mod batch;
pub mod cancel;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod pool;
pub mod processor;
pub mod provider;
pub mod request;
pub mod resource;
pub mod simple;
pub mod suppression;

pub use batch::{BatchProcessor, BatchStats};
pub use cancel::{CancellationSource, CancellationToken};
pub use chain::CompositeProcessor;
pub use client::ZenohExportClient;
pub use config::{
    BatchConfig, ExperimentalConfig, ExporterConfig, ProcessorConfig, ProcessorMode,
    ResourceConfig, SdkConfig, SdkLimits,
};
pub use error::{ExportError, ProcessorError, Result, SdkError};
pub use export::{ExportAdapter, ExportAdapterBuilder, ExportClient, ExportResult, FailureHook};
pub use pipeline::{adapter_from_config, build_pipeline, build_processor};
pub use pool::{BufferPool, PooledBuffer};
pub use processor::{Processor, ProcessorResult};
pub use provider::TelemetryProvider;
pub use request::ExportRequest;
pub use resource::LazyResource;
pub use simple::SimpleProcessor;
pub use suppression::{SuppressionGuard, is_suppressed, suppressed};
