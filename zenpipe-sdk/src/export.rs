//! Adapting record batches into export calls.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};
use zenpipe_common::{Format, Record, Resource};

use crate::config::{ExperimentalConfig, SdkLimits};
use crate::error::ExportError;
use crate::pool::BufferPool;
use crate::request::ExportRequest;
use crate::resource::LazyResource;
use crate::suppression::SuppressionGuard;

/// Boundary object that transmits encoded requests to a remote sink.
pub trait ExportClient: Send + Sync {
    /// Send one request. `Ok(true)` means the sink accepted it.
    fn send(&self, request: &ExportRequest) -> Result<bool, ExportError>;

    /// Release the transport. Returns `true` once fully shut down.
    fn shutdown(&self, timeout: Duration) -> bool;
}

impl<T: ExportClient + ?Sized> ExportClient for Arc<T> {
    fn send(&self, request: &ExportRequest) -> Result<bool, ExportError> {
        (**self).send(request)
    }

    fn shutdown(&self, timeout: Duration) -> bool {
        (**self).shutdown(timeout)
    }
}

/// Outcome of one export attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    Success,
    Failure,
}

impl ExportResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportResult::Success)
    }
}

/// Callback invoked with the cause of every failed export.
pub type FailureHook = Arc<dyn Fn(&ExportError) + Send + Sync>;

/// Turns a batch of records into one call on an [`ExportClient`].
///
/// `export` never returns an error: every fault is logged, handed to the
/// failure hook and reported as [`ExportResult::Failure`]. There is no retry.
///
/// The adapter is meant to be driven by one caller at a time (a
/// [`SimpleProcessor`](crate::SimpleProcessor) or the drain loop of a
/// [`BatchProcessor`](crate::BatchProcessor)).
pub struct ExportAdapter {
    client: Option<Box<dyn ExportClient>>,
    resource: LazyResource,
    limits: SdkLimits,
    experimental: ExperimentalConfig,
    format: Format,
    pool: BufferPool,
    on_failure: Option<FailureHook>,
}

impl ExportAdapter {
    /// Create an adapter around a client with default settings.
    pub fn new(client: impl ExportClient + 'static) -> Self {
        Self::builder().with_client(client).build()
    }

    pub fn builder() -> ExportAdapterBuilder {
        ExportAdapterBuilder::default()
    }

    /// Export one batch.
    pub fn export(&self, batch: &[Record]) -> ExportResult {
        let _suppressed = SuppressionGuard::enter();

        match self.try_export(batch) {
            Ok(()) => {
                trace!(records = batch.len(), "Batch exported");
                ExportResult::Success
            }
            Err(e) => {
                warn!(records = batch.len(), error = %e, "Export failed");
                if let Some(hook) = &self.on_failure {
                    hook(&e);
                }
                ExportResult::Failure
            }
        }
    }

    fn try_export(&self, batch: &[Record]) -> Result<(), ExportError> {
        let client = self.client.as_deref().ok_or(ExportError::NoClient)?;
        let request = ExportRequest::encode(
            batch,
            self.resource(),
            &self.limits,
            &self.experimental,
            self.format,
            self.pool.acquire(),
        )?;

        if client.send(&request)? {
            Ok(())
        } else {
            Err(ExportError::Rejected)
        }
    }

    /// Shut the client down. Without a client there is nothing to release.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        match &self.client {
            Some(client) => {
                debug!(timeout = ?timeout, "Shutting down export client");
                client.shutdown(timeout)
            }
            None => true,
        }
    }

    /// The resource sent with every request, resolved on first use.
    pub fn resource(&self) -> &Resource {
        self.resource.get()
    }

    /// Adopt the owning provider's resource.
    ///
    /// Has no effect once the resource was resolved by an earlier export.
    pub fn bind_resource(&self, resource: &Resource) {
        if !self.resource.bind(resource) {
            debug!("Adapter resource already resolved, keeping it");
        }
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Pool backing request payloads.
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }
}

impl std::fmt::Debug for ExportAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportAdapter")
            .field("has_client", &self.client.is_some())
            .field("resource", &self.resource)
            .field("limits", &self.limits)
            .field("format", &self.format)
            .finish()
    }
}

/// Builder for [`ExportAdapter`].
#[derive(Default)]
pub struct ExportAdapterBuilder {
    client: Option<Box<dyn ExportClient>>,
    resource: Option<LazyResource>,
    limits: SdkLimits,
    experimental: ExperimentalConfig,
    format: Format,
    pool: Option<BufferPool>,
    on_failure: Option<FailureHook>,
}

impl ExportAdapterBuilder {
    pub fn with_client(mut self, client: impl ExportClient + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    /// Fallback resource, used when no provider binds one.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(LazyResource::new(move || resource.clone()));
        self
    }

    /// Fallback resolver, run on first export when no provider bound a
    /// resource. `resolver` must be pure.
    pub fn with_resource_resolver(
        mut self,
        resolver: impl Fn() -> Resource + Send + Sync + 'static,
    ) -> Self {
        self.resource = Some(LazyResource::new(resolver));
        self
    }

    pub fn with_limits(mut self, limits: SdkLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_experimental(mut self, experimental: ExperimentalConfig) -> Self {
        self.experimental = experimental;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_buffer_pool(mut self, pool: BufferPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Called with the cause of each failed export, after it is logged.
    pub fn on_failure(mut self, hook: impl Fn(&ExportError) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> ExportAdapter {
        ExportAdapter {
            client: self.client,
            resource: self
                .resource
                .unwrap_or_else(|| LazyResource::new(Resource::default)),
            limits: self.limits,
            experimental: self.experimental,
            format: self.format,
            pool: self.pool.unwrap_or_default(),
            on_failure: self.on_failure,
        }
    }
}
