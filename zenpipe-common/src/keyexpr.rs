use crate::error::{Error, Result};

/// Default key expression prefix for all ZenPipe exports.
pub const KEY_PREFIX: &str = "zenpipe";

/// Builder for a service's export key expression.
///
/// Key expressions follow the pattern `zenpipe/<service>/export`.
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    service: String,
}

impl KeyExprBuilder {
    /// Create a builder for a service, validating the service segment.
    pub fn new(service: impl Into<String>) -> Result<Self> {
        let service = service.into();
        validate_segment(&service)?;
        Ok(Self { service })
    }

    /// Key expression for batches that may mix spans and logs.
    ///
    /// # Example
    /// ```
    /// use zenpipe_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::new("checkout").unwrap();
    /// assert_eq!(builder.export_key(), "zenpipe/checkout/export");
    /// ```
    pub fn export_key(&self) -> String {
        format!("{}/{}/export", KEY_PREFIX, self.service)
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::KeyExpr("service segment must not be empty".to_string()));
    }
    if let Some(c) = segment.chars().find(|c| matches!(c, '/' | '*' | '$' | '?' | '#')) {
        return Err(Error::KeyExpr(format!(
            "service segment '{}' contains reserved character '{}'",
            segment, c
        )));
    }
    Ok(())
}
