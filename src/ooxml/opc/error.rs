/// Error types for OPC part naming and part metadata.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpcError {
    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("Content type not supported for partname {partname}: {content_type}")]
    UnsupportedContentType {
        partname: String,
        content_type: String,
    },
}

pub type Result<T> = std::result::Result<T, OpcError>;
