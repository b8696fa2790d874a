//! Open Packaging Conventions (OPC) naming layer.
//!
//! Provides the pieces of the OPC specification that bound XML parts need:
//!
//! - Validated part names (`PackURI`)
//! - Content type and namespace constants
//! - The `Part` trait shared by every part type

pub mod constants;
pub mod error;
pub mod packuri;
pub mod part;

// Re-export commonly used types
pub use error::OpcError;
pub use packuri::PackURI;
pub use part::Part;
