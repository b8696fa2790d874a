//! Content-type based dispatch to bound parts.

use super::{CoreProperties, CustomProperties, WordDocument, XmlContentPart};
use crate::ooxml::bind::{BindingContext, Element, TreeSink};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::part::is_xml_content_type;
use crate::ooxml::opc::{OpcError, PackURI, Part};
use std::io::{Read, Write};
use std::sync::Arc;

/// An XML part bound to the content tree its content type calls for.
#[derive(Debug)]
pub enum BoundPart {
    CoreProperties(XmlContentPart<CoreProperties>),
    CustomProperties(XmlContentPart<CustomProperties>),
    Document(XmlContentPart<WordDocument>),
    /// Any other XML part, kept as a plain element tree.
    Generic(XmlContentPart<Element>),
}

macro_rules! each_part {
    ($self:expr, $part:ident => $body:expr) => {
        match $self {
            BoundPart::CoreProperties($part) => $body,
            BoundPart::CustomProperties($part) => $body,
            BoundPart::Document($part) => $body,
            BoundPart::Generic($part) => $body,
        }
    };
}

impl BoundPart {
    pub fn serialize_to_bytes<W: Write>(&self, out: W) -> Result<()> {
        each_part!(self, part => part.serialize_to_bytes(out))
    }

    pub fn serialize_to_tree(&self, sink: &mut dyn TreeSink) -> Result<()> {
        each_part!(self, part => part.serialize_to_tree(sink))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        each_part!(self, part => part.to_bytes())
    }

    /// Whether the part holds a content tree.
    pub fn has_content(&self) -> bool {
        each_part!(self, part => part.content_tree().is_some())
    }

    pub fn as_core_properties(&self) -> Option<&XmlContentPart<CoreProperties>> {
        match self {
            BoundPart::CoreProperties(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_custom_properties(&self) -> Option<&XmlContentPart<CustomProperties>> {
        match self {
            BoundPart::CustomProperties(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&XmlContentPart<WordDocument>> {
        match self {
            BoundPart::Document(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_generic(&self) -> Option<&XmlContentPart<Element>> {
        match self {
            BoundPart::Generic(part) => Some(part),
            _ => None,
        }
    }
}

impl Part for BoundPart {
    fn partname(&self) -> &PackURI {
        each_part!(self, part => part.partname())
    }

    fn content_type(&self) -> &str {
        each_part!(self, part => part.content_type())
    }
}

/// Creates bound parts for XML content types.
///
/// Every part the factory creates shares the factory's binding context.
#[derive(Debug, Clone)]
pub struct PartFactory {
    context: Arc<BindingContext>,
}

impl PartFactory {
    pub fn new(context: Arc<BindingContext>) -> Self {
        Self { context }
    }

    pub fn binding_context(&self) -> &Arc<BindingContext> {
        &self.context
    }

    /// Create an empty part for `content_type`.
    ///
    /// Fails with a format error when `partname` is invalid or
    /// `content_type` is not an XML content type.
    pub fn create(&self, partname: &str, content_type: &str) -> Result<BoundPart> {
        let partname = PackURI::new(partname).map_err(|e| OoxmlError::InvalidFormat(e.to_string()))?;
        if !is_xml_content_type(content_type) {
            return Err(OpcError::UnsupportedContentType {
                partname: partname.to_string(),
                content_type: content_type.to_string(),
            }
            .into());
        }

        let context = Arc::clone(&self.context);
        let part = match content_type {
            ct::OPC_CORE_PROPERTIES => {
                BoundPart::CoreProperties(XmlContentPart::from_partname(partname, context))
            },
            ct::OFC_CUSTOM_PROPERTIES => {
                BoundPart::CustomProperties(XmlContentPart::from_partname(partname, context))
            },
            ct::WML_DOCUMENT_MAIN => BoundPart::Document(XmlContentPart::from_partname(partname, context)),
            _ => BoundPart::Generic(
                XmlContentPart::from_partname(partname, context).with_content_type(content_type),
            ),
        };
        Ok(part)
    }

    /// Create a part for `content_type` and load its content from `input`.
    pub fn load<R: Read>(&self, partname: &str, content_type: &str, input: R) -> Result<BoundPart> {
        let mut part = self.create(partname, content_type)?;
        tracing::debug!(partname, content_type, "loading part");
        each_part!(&mut part, inner => inner.load(input))?;
        Ok(part)
    }
}

impl Default for PartFactory {
    fn default() -> Self {
        Self::new(BindingContext::standard())
    }
}
