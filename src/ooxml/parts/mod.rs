//! XML-backed package parts.
//!
//! `XmlContentPart<T>` joins a part identity (name and content type) to a
//! typed content tree, and moves that tree to and from XML using the
//! binding layer. The concrete content types live in the submodules:
//!
//! - `core_properties`: `CoreProperties` (`/docProps/core.xml`)
//! - `custom_properties`: `CustomProperties` (`/docProps/custom.xml`)
//! - `document`: `WordDocument` (`/word/document.xml`)
//!
//! Any other XML part binds to a plain `Element`. `PartFactory` picks the
//! binding from a content type.
//!
//! # Example
//!
//! ```rust
//! use ooxml_bind::ooxml::parts::{WordDocument, XmlContentPart};
//!
//! let mut doc = WordDocument::new();
//! doc.add_paragraph("Hello");
//!
//! let mut part = XmlContentPart::<WordDocument>::new("/word/document.xml")?;
//! part.set_content_tree(doc);
//!
//! let mut bytes = Vec::new();
//! part.serialize_to_bytes(&mut bytes)?;
//!
//! let back = part.deserialize(&bytes[..])?;
//! assert_eq!(back.text(), "Hello");
//! # Ok::<(), ooxml_bind::ooxml::OoxmlError>(())
//! ```

pub mod core_properties;
pub mod custom_properties;
pub mod document;
pub mod factory;

pub use core_properties::{CORE_PROPERTIES_PARTNAME, CoreProperties};
pub use custom_properties::{CUSTOM_PROPERTIES_PARTNAME, CustomProperties, CustomProperty, PropertyValue};
pub use document::{DOCUMENT_PARTNAME, Paragraph, Run, WordDocument};
pub use factory::{BoundPart, PartFactory};

use crate::ooxml::bind::{
    BindingContext, Deserializable, Element, Marshaller, NamespacePrefixMapper,
    SerializationFailurePolicy, TreeSink, XmlBinding,
};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::{PackURI, Part};
use std::io::{Read, Write};
use std::sync::Arc;

/// A package part whose content is an XML document bound to `T`.
///
/// The part owns its content tree and holds a shared, read-only
/// `BindingContext`. Every serialize call builds its own marshaller, so
/// parts on different threads can share one context.
#[derive(Debug)]
pub struct XmlContentPart<T> {
    partname: PackURI,
    content_type: String,
    context: Arc<BindingContext>,
    prefix_mapper: Option<Arc<dyn NamespacePrefixMapper>>,
    failure_policy: Option<SerializationFailurePolicy>,
    content: Option<T>,
}

impl<T: XmlBinding> XmlContentPart<T> {
    /// Create an empty part using the standard binding context.
    ///
    /// Fails with `OoxmlError::InvalidFormat` when `partname` is not a valid
    /// part name.
    pub fn new(partname: &str) -> Result<Self> {
        Self::with_context(partname, BindingContext::standard())
    }

    /// Create an empty part bound through `context`.
    pub fn with_context(partname: &str, context: Arc<BindingContext>) -> Result<Self> {
        let partname = PackURI::new(partname).map_err(|e| OoxmlError::InvalidFormat(e.to_string()))?;
        Ok(Self::from_partname(partname, context))
    }

    /// Create an empty part from an already validated name.
    pub fn from_partname(partname: PackURI, context: Arc<BindingContext>) -> Self {
        Self {
            partname,
            content_type: T::content_type().to_string(),
            context,
            prefix_mapper: None,
            failure_policy: None,
            content: None,
        }
    }

    /// Serialize the content tree as a child of `sink`.
    ///
    /// The appended element carries the namespace declarations chosen by the
    /// prefix mapper.
    pub fn serialize_to_tree(&self, sink: &mut dyn TreeSink) -> Result<()> {
        let result = self
            .bound_tree()
            .and_then(|element| self.marshaller().marshal_to_node(&element, sink));
        self.apply_failure_policy(result)
    }

    /// Serialize the content tree as a complete XML document into `out`.
    ///
    /// `out` is flushed but not closed.
    pub fn serialize_to_bytes<W: Write>(&self, out: W) -> Result<()> {
        let result = self.write_bytes(out);
        self.apply_failure_policy(result)
    }

    /// Serialize the content tree into a new byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize_to_bytes(&mut out)?;
        Ok(out)
    }

    fn write_bytes<W: Write>(&self, out: W) -> Result<()> {
        let type_name = short_type_name::<T>();
        tracing::debug!(partname = %self.partname, "marshalling {} ...", type_name);

        let element = self.bound_tree()?;
        self.marshaller().marshal_to_writer(&element, out)?;

        tracing::debug!(partname = %self.partname, "{} marshalled", type_name);
        Ok(())
    }

    fn bound_tree(&self) -> Result<Element> {
        let content = self.content.as_ref().ok_or_else(|| {
            OoxmlError::Serialization(format!("part {} has no content tree", self.partname))
        })?;
        content.to_element().map_err(|e| match e {
            OoxmlError::Serialization(_) => e,
            other => OoxmlError::Serialization(other.to_string()),
        })
    }

    fn marshaller(&self) -> Marshaller {
        let mut marshaller = self.context.create_marshaller();
        if let Some(mapper) = &self.prefix_mapper {
            marshaller.set_prefix_mapper(Arc::clone(mapper));
        }
        marshaller
    }

    fn apply_failure_policy(&self, result: Result<()>) -> Result<()> {
        match (result, self.failure_policy()) {
            (Err(e), SerializationFailurePolicy::LogAndSwallow) => {
                tracing::error!(partname = %self.partname, error = %e, "failed to serialize part");
                Ok(())
            },
            (result, _) => result,
        }
    }
}

impl<T: Deserializable> XmlContentPart<T> {
    /// Parse `input` into a new content tree using this part's context.
    ///
    /// The part itself is unchanged; see [`XmlContentPart::load`].
    pub fn deserialize<R: Read>(&self, input: R) -> Result<T> {
        T::deserialize(input, &self.context)
    }

    /// Parse `input` and make the result this part's content tree.
    ///
    /// On failure the current content tree is kept.
    pub fn load<R: Read>(&mut self, input: R) -> Result<()> {
        let content = self.deserialize(input)?;
        self.content = Some(content);
        Ok(())
    }
}

impl<T> XmlContentPart<T> {
    /// Override the content type, for generic parts.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn binding_context(&self) -> &Arc<BindingContext> {
        &self.context
    }

    pub fn set_binding_context(&mut self, context: Arc<BindingContext>) {
        self.context = context;
    }

    pub fn content_tree(&self) -> Option<&T> {
        self.content.as_ref()
    }

    pub fn content_tree_mut(&mut self) -> Option<&mut T> {
        self.content.as_mut()
    }

    pub fn set_content_tree(&mut self, content: T) {
        self.content = Some(content);
    }

    pub fn take_content_tree(&mut self) -> Option<T> {
        self.content.take()
    }

    /// Use `mapper` instead of the context's prefix mapper when serializing.
    pub fn set_prefix_mapper(&mut self, mapper: Arc<dyn NamespacePrefixMapper>) {
        self.prefix_mapper = Some(mapper);
    }

    /// Override the context's serialization failure policy for this part.
    pub fn set_failure_policy(&mut self, policy: SerializationFailurePolicy) {
        self.failure_policy = Some(policy);
    }

    pub fn failure_policy(&self) -> SerializationFailurePolicy {
        self.failure_policy
            .unwrap_or(self.context.config().failure_policy)
    }
}

impl<T> Part for XmlContentPart<T> {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
