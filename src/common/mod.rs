//! Common utilities shared across the crate.
//!
//! This module provides the encoding and escaping helpers used by the XML
//! binding layer.

// Submodule declarations
pub mod bom;
pub mod xml;

// Re-exports for convenience
pub use bom::{BomKind, EncodingError, decode_to_utf8, detect_bom};
