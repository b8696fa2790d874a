//! Office Open XML (OOXML) part binding.
//!
//! This module moves the XML parts of an OOXML package between their byte
//! form and typed content trees.
//!
//! # Architecture
//!
//! The module is organized into several layers:
//!
//! 1. **OPC Layer** (`opc`): part names, content types and namespace constants
//! 2. **Binding Layer** (`bind`): element trees, binding context, marshalling
//!    and unmarshalling with pluggable namespace prefixes
//! 3. **Parts** (`parts`): the `XmlContentPart<T>` adapter, the bound content
//!    types and content-type dispatch
//!
//! # Example: Reading core properties
//!
//! ```rust
//! use ooxml_bind::ooxml::parts::{CoreProperties, XmlContentPart};
//!
//! let xml = r#"<cp:coreProperties
//!     xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
//!     xmlns:dc="http://purl.org/dc/elements/1.1/">
//!   <dc:title>Budget</dc:title>
//! </cp:coreProperties>"#;
//!
//! let mut part = XmlContentPart::<CoreProperties>::new("/docProps/core.xml")?;
//! part.load(xml.as_bytes())?;
//! assert_eq!(part.content_tree().unwrap().title.as_deref(), Some("Budget"));
//! # Ok::<(), ooxml_bind::ooxml::OoxmlError>(())
//! ```
pub mod bind;
pub mod error;
pub mod opc;
pub mod parts;

pub use bind::{BindingConfig, BindingContext, SerializationFailurePolicy};
pub use error::{OoxmlError, Result};
pub use opc::{PackURI, Part};
pub use parts::{BoundPart, PartFactory, XmlContentPart};
