// error.rs - Error types for the compression pipeline

/// Error types for compression
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// Payload is not a decodable image (bad base64, bad data URL, truncated bitmap).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Output format outside png/jpeg/webp. Raised while loading configuration.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The codec failed for any other reason.
    #[error("Compression failed: {0}")]
    CompressionFailed(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Cancelled or timed out before any candidate was produced.
    #[error("Compression cancelled")]
    Cancelled,
}

impl CompressionError {
    /// Short machine-readable tag used in log metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            CompressionError::InvalidInput(_) => "invalid_input",
            CompressionError::UnsupportedFormat(_) => "unsupported_format",
            CompressionError::CompressionFailed(_) => "compression_failed",
            CompressionError::InvalidConfig(_) => "invalid_config",
            CompressionError::Cancelled => "cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
