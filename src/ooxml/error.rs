/// Error types for OOXML part binding.
use thiserror::Error;

/// Result type for OOXML operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Error types for OOXML operations.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// OPC naming or part metadata error
    #[error("OPC error: {0}")]
    Opc(#[from] crate::ooxml::opc::error::OpcError),

    /// Invalid format, e.g. a malformed part name or property value
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Writing a content tree failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Building a content tree from input failed
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Binding configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OoxmlError {
    /// True for errors that come from constructing a part with bad metadata.
    pub fn is_format_error(&self) -> bool {
        matches!(self, OoxmlError::InvalidFormat(_) | OoxmlError::Opc(_))
    }

    /// True when the error was produced while writing a content tree.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, OoxmlError::Serialization(_))
    }

    /// True when the error was produced while reading a content tree.
    pub fn is_deserialization_error(&self) -> bool {
        matches!(self, OoxmlError::Deserialization(_))
    }
}
