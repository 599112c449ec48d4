use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Serialization format for export payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON format (human-readable, good for debugging).
    #[default]
    Json,

    /// CBOR format (compact binary, better for high-volume telemetry).
    Cbor,
}

impl Format {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Cbor => "application/cbor",
        }
    }
}

/// Encode a value to bytes using the specified format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(value, format, &mut buf)?;
    Ok(buf)
}

/// Encode a value, appending to an existing buffer.
///
/// Used with pooled buffers to avoid one allocation per export.
pub fn encode_into<T: Serialize>(value: &T, format: Format, buf: &mut Vec<u8>) -> Result<()> {
    match format {
        Format::Json => serde_json::to_writer(&mut *buf, value).map_err(Error::from),
        Format::Cbor => {
            ciborium::into_writer(value, &mut *buf)?;
            Ok(())
        }
    }
}

/// Decode bytes to a value using the specified format.
pub fn decode<T: DeserializeOwned>(data: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => serde_json::from_slice(data).map_err(Error::from),
        Format::Cbor => ciborium::from_reader(data).map_err(|e| Error::Cbor(e.to_string())),
    }
}
