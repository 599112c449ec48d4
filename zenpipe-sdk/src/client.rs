//! Export client publishing requests on a Zenoh key expression.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};
use zenoh::Wait;
use zenoh::bytes::Encoding;
use zenoh::key_expr::KeyExpr;
use zenpipe_common::KeyExprBuilder;

use crate::config::SdkConfig;
use crate::error::{ExportError, Result};
use crate::export::ExportClient;
use crate::request::ExportRequest;

/// Publishes each export request with a blocking `put`.
///
/// The session is shared: shutting the client down stops publishing but
/// leaves the session open for its other users.
#[derive(Debug)]
pub struct ZenohExportClient {
    session: Arc<zenoh::Session>,
    key_expr: KeyExpr<'static>,
    is_shutdown: AtomicBool,
}

impl ZenohExportClient {
    pub fn new(session: Arc<zenoh::Session>, key_expr: impl Into<String>) -> Result<Self> {
        let key_expr = KeyExpr::try_from(key_expr.into())?;
        info!(key_expr = %key_expr, "Export client ready");

        Ok(Self {
            session,
            key_expr,
            is_shutdown: AtomicBool::new(false),
        })
    }

    /// Use `exporter.key_expr`, or `zenpipe/<service>/export` when unset.
    pub fn from_config(session: Arc<zenoh::Session>, config: &SdkConfig) -> Result<Self> {
        let key_expr = match &config.exporter.key_expr {
            Some(key_expr) => key_expr.clone(),
            None => KeyExprBuilder::new(&config.resource.service_name)?.export_key(),
        };
        Self::new(session, key_expr)
    }

    pub fn key_expr(&self) -> &str {
        self.key_expr.as_str()
    }
}

impl ExportClient for ZenohExportClient {
    fn send(&self, request: &ExportRequest) -> std::result::Result<bool, ExportError> {
        if self.is_shutdown.load(Ordering::Acquire) {
            return Err(ExportError::Client("export client is shut down".to_string()));
        }

        self.session
            .put(&self.key_expr, request.payload().to_vec())
            .encoding(Encoding::from(request.format().mime_type()))
            .wait()
            .map_err(|e| ExportError::Client(format!("put on '{}' failed: {}", self.key_expr, e)))?;

        debug!(
            key_expr = %self.key_expr,
            records = request.record_count(),
            bytes = request.payload().len(),
            "Published export request"
        );
        Ok(true)
    }

    fn shutdown(&self, _timeout: Duration) -> bool {
        if !self.is_shutdown.swap(true, Ordering::AcqRel) {
            info!(key_expr = %self.key_expr, "Export client shut down");
        }
        true
    }
}
