//! ooxml-bind - XML data binding for Office Open XML package parts
//!
//! This library serializes typed content trees of OOXML parts to XML and
//! parses them back, with conventional namespace prefixes and explicit,
//! shareable binding configuration.
//!
//! # Features
//!
//! - **Part adapter**: `XmlContentPart<T>` pairs a validated part name with a
//!   content tree and serializes it to bytes or into an element tree
//! - **Bound parts**: core properties, custom properties and the main Word
//!   document, plus a generic element binding for any other XML part
//! - **Namespace prefixes**: standard OOXML prefixes by default, overridable
//!   per context or per part
//! - **Configuration**: binding settings loadable from YAML
//! - **Failure policy**: serialization errors are returned by default and can
//!   be logged and swallowed instead
//!
//! # Example - Writing a document part
//!
//! ```
//! use ooxml_bind::ooxml::parts::{WordDocument, XmlContentPart};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = WordDocument::new();
//! doc.add_paragraph("Hello, world").set_style("Title");
//!
//! let mut part = XmlContentPart::<WordDocument>::new("/word/document.xml")?;
//! part.set_content_tree(doc);
//!
//! let xml = String::from_utf8(part.to_bytes()?)?;
//! assert!(xml.contains("<w:t>Hello, world</w:t>"));
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Loading configuration
//!
//! ```
//! use std::sync::Arc;
//! use ooxml_bind::ooxml::{BindingConfig, BindingContext, PartFactory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BindingConfig::from_yaml_str("indent: 2\nstandalone: false\n")?;
//! let factory = PartFactory::new(Arc::new(BindingContext::new(config)?));
//! let part = factory.create("/docProps/core.xml", "application/vnd.openxmlformats-package.core-properties+xml")?;
//! # let _ = part;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod ooxml;
