//! Error types shared by ZenPipe crates.

use thiserror::Error;

/// Result type alias using ZenPipe's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration, encoding payloads or talking to Zenoh.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read, parsed or validated.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Zenoh session or publication failure.
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    /// JSON payload encoding/decoding failure.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CBOR payload encoding/decoding failure.
    #[error("CBOR serialization error: {0}")]
    Cbor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A key expression segment was empty or contained reserved characters.
    #[error("Invalid key expression: {0}")]
    KeyExpr(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by encoding or decoding a payload.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Json(_) | Error::Cbor(_))
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Cbor(e.to_string())
    }
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        Error::Cbor(e.to_string())
    }
}
