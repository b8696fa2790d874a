//! Traits connecting typed content trees to element trees.

use super::context::BindingContext;
use super::tree::Element;
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::content_type as ct;
use std::fmt;
use std::io::Read;

/// The qualified name of a bound root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootName {
    pub namespace: Option<&'static str>,
    pub local: &'static str,
}

impl RootName {
    pub const fn new(namespace: &'static str, local: &'static str) -> Self {
        Self {
            namespace: Some(namespace),
            local,
        }
    }
}

impl fmt::Display for RootName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(self.local),
        }
    }
}

/// A content tree type that maps to and from an element tree.
///
/// `to_element` must report failures as `OoxmlError::Serialization` and
/// `from_element` as `OoxmlError::Deserialization`.
pub trait XmlBinding: Sized {
    /// Root element this type binds to; `None` accepts any root.
    fn root_name() -> Option<RootName>;

    /// Content type of parts holding this type.
    fn content_type() -> &'static str {
        ct::XML
    }

    /// Build the element tree for this value.
    fn to_element(&self) -> Result<Element>;

    /// Build a value from a parsed element tree.
    fn from_element(element: &Element) -> Result<Self>;
}

/// Per-type deserialization entry point.
///
/// The provided method parses with a fresh unmarshaller from `context` and
/// binds through `XmlBinding`; types override it when they need to inspect
/// the raw input.
pub trait Deserializable: XmlBinding {
    fn deserialize<R: Read>(input: R, context: &BindingContext) -> Result<Self> {
        context.create_unmarshaller().unmarshal_as::<Self, R>(input)
    }
}

impl XmlBinding for Element {
    fn root_name() -> Option<RootName> {
        None
    }

    fn to_element(&self) -> Result<Element> {
        Ok(self.clone())
    }

    fn from_element(element: &Element) -> Result<Self> {
        Ok(element.clone())
    }
}

impl Deserializable for Element {}
