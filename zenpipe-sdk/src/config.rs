//! Configuration for the SDK pipeline.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zenpipe_common::{Format, LoggingConfig, Resource, ZenohConfig};

use crate::error::{Result, SdkError};

/// Complete SDK configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Zenoh connection settings for the export transport.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Wire format of export requests.
    #[serde(default)]
    pub serialization: Format,

    /// Resource attached to every export request.
    #[serde(default)]
    pub resource: ResourceConfig,

    /// Limits applied while encoding records.
    #[serde(default)]
    pub limits: SdkLimits,

    /// Processor selection and batching parameters.
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Export client settings.
    #[serde(default)]
    pub exporter: ExporterConfig,

    /// Experimental switches.
    #[serde(default)]
    pub experimental: ExperimentalConfig,
}

impl SdkConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: SdkConfig = zenpipe_common::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: SdkConfig = zenpipe_common::parse_config(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.resource.service_name.trim().is_empty() {
            return Err(SdkError::config("resource.service_name cannot be empty"));
        }

        if let Some(0) = self.limits.attribute_count_limit {
            return Err(SdkError::config("limits.attribute_count_limit must be > 0"));
        }

        if let Some(0) = self.limits.attribute_value_length_limit {
            return Err(SdkError::config(
                "limits.attribute_value_length_limit must be > 0",
            ));
        }

        if self.exporter.shutdown_timeout_ms == 0 {
            return Err(SdkError::config("exporter.shutdown_timeout_ms must be > 0"));
        }

        self.processor.batch.validate()
    }
}

/// Resource attributes from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Value of `service.name`.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Value of `service.version`.
    #[serde(default)]
    pub service_version: Option<String>,

    /// Extra resource attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

fn default_service_name() -> String {
    "zenpipe".to_string()
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_version: None,
            attributes: BTreeMap::new(),
        }
    }
}

impl ResourceConfig {
    /// Build the resource described by this configuration.
    pub fn to_resource(&self) -> Resource {
        let mut builder = Resource::builder()
            .with_attributes(self.attributes.clone())
            .with_service_name(&self.service_name);
        if let Some(version) = &self.service_version {
            builder = builder.with_service_version(version);
        }
        builder.build()
    }
}

/// Limits applied to records while building export requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkLimits {
    /// Maximum attributes kept per record (`null` = unlimited).
    #[serde(default = "default_attribute_count_limit")]
    pub attribute_count_limit: Option<usize>,

    /// Maximum characters kept per text attribute (`null` = unlimited).
    #[serde(default)]
    pub attribute_value_length_limit: Option<usize>,
}

fn default_attribute_count_limit() -> Option<usize> {
    Some(128)
}

impl Default for SdkLimits {
    fn default() -> Self {
        Self {
            attribute_count_limit: default_attribute_count_limit(),
            attribute_value_length_limit: None,
        }
    }
}

impl SdkLimits {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self {
            attribute_count_limit: None,
            attribute_value_length_limit: None,
        }
    }
}

/// How ended records reach the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorMode {
    /// Export every ended record synchronously on the caller's thread.
    Immediate,
    /// Queue records and export them in batches from a background task.
    #[default]
    Batched,
}

/// Processor selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default)]
    pub mode: ProcessorMode,

    /// Batching parameters, used in `Batched` mode.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Batching engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Records buffered before new ones are dropped.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Delay between two scheduled exports, in milliseconds.
    #[serde(default = "default_scheduled_delay")]
    pub scheduled_delay_ms: u64,

    /// Time allowed for one export, in milliseconds.
    #[serde(default = "default_export_timeout")]
    pub export_timeout_ms: u64,

    /// Maximum records per export call.
    #[serde(default = "default_max_export_batch_size")]
    pub max_export_batch_size: usize,
}

fn default_max_queue_size() -> usize {
    2048
}

fn default_scheduled_delay() -> u64 {
    5000
}

fn default_export_timeout() -> u64 {
    30000
}

fn default_max_export_batch_size() -> usize {
    512
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            scheduled_delay_ms: default_scheduled_delay(),
            export_timeout_ms: default_export_timeout(),
            max_export_batch_size: default_max_export_batch_size(),
        }
    }
}

impl BatchConfig {
    pub fn scheduled_delay(&self) -> Duration {
        Duration::from_millis(self.scheduled_delay_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(SdkError::config("batch.max_queue_size must be > 0"));
        }
        if self.max_export_batch_size == 0 {
            return Err(SdkError::config("batch.max_export_batch_size must be > 0"));
        }
        if self.max_export_batch_size > self.max_queue_size {
            return Err(SdkError::config(format!(
                "batch.max_export_batch_size ({}) must not exceed batch.max_queue_size ({})",
                self.max_export_batch_size, self.max_queue_size
            )));
        }
        if self.scheduled_delay_ms == 0 {
            return Err(SdkError::config("batch.scheduled_delay_ms must be > 0"));
        }
        if self.export_timeout_ms == 0 {
            return Err(SdkError::config("batch.export_timeout_ms must be > 0"));
        }
        Ok(())
    }
}

/// Export client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Key expression to publish on (defaults to `zenpipe/<service>/export`).
    #[serde(default)]
    pub key_expr: Option<String>,

    /// Time allowed for the export client to shut down, in milliseconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
}

fn default_shutdown_timeout() -> u64 {
    5000
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            key_expr: None,
            shutdown_timeout_ms: default_shutdown_timeout(),
        }
    }
}

impl ExporterConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Experimental switches. Defaults keep the stable behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentalConfig {
    /// Keep `event.name` / `event.id` attributes on exported log records.
    #[serde(default)]
    pub emit_log_event_attributes: bool,
}
