//! Namespace-aware XML element tree.
//!
//! Every content tree is converted to this form before it is written, and
//! every part is parsed into it before it is bound. Names carry their
//! namespace URI; prefixes are kept only as presentation hints and do not
//! take part in equality.
//!
//! `Document`, `DocumentFragment` and `Element` are the tree sinks a
//! marshaller can append to.

use crate::ooxml::error::{OoxmlError, Result};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A qualified name: namespace URI plus local name.
#[derive(Debug, Clone, Eq)]
pub struct QName {
    /// Namespace URI, `None` for names in no namespace.
    pub namespace: Option<String>,
    /// Local part of the name.
    pub local: String,
    /// Prefix the name was read with or will be written with.
    pub prefix: Option<String>,
}

impl QName {
    /// A name in no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
            prefix: None,
        }
    }

    /// A name in the given namespace.
    pub fn ns(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
            prefix: None,
        }
    }

    /// Same name with a prefix hint attached.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Whether this name is `{namespace}local`.
    #[inline]
    pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }

    /// The name as written, `prefix:local` or just `local`.
    pub fn prefixed(&self) -> String {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, self.local),
            _ => self.local.clone(),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local == other.local
    }
}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An attribute of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A namespace declaration (`xmlns:prefix="uri"`) carried by an element.
///
/// An empty prefix declares the default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: String,
    pub uri: String,
}

/// A child node of an element, document or fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

impl Node {
    /// The element, if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    fn is_whitespace_text(&self) -> bool {
        matches!(self, Node::Text(text) if text.chars().all(char::is_whitespace))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// An XML element.
///
/// Equality compares names, attributes and children; namespace declarations
/// and prefixes are presentation only.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: QName,
    pub attributes: SmallVec<[Attribute; 4]>,
    pub namespaces: Vec<NamespaceDecl>,
    pub children: Vec<Node>,
}

impl Default for QName {
    fn default() -> Self {
        QName::local("")
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attribute(mut self, name: QName, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`Element::push_child`].
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.push_child(child);
        self
    }

    /// Builder that appends a text node.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Set an attribute, replacing any existing attribute with the same name.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn push_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// Look up an attribute value by namespace and local name.
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.is(namespace, local))
            .map(|attr| attr.value.as_str())
    }

    /// Iterate over child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First child element with the given name.
    pub fn child(&self, namespace: Option<&str>, local: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.name.is(namespace, local))
    }

    /// Concatenated text and CDATA content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) | Node::CData(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
                Node::Comment(_) => {},
            }
        }
    }
}

/// A node that accepts children: the destination of tree serialization.
pub trait TreeSink {
    /// Append a node as the last child.
    fn append_child(&mut self, node: Node) -> Result<()>;
}

impl TreeSink for Element {
    fn append_child(&mut self, node: Node) -> Result<()> {
        self.children.push(node);
        Ok(())
    }
}

/// An ordered list of nodes with no single root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFragment {
    pub children: Vec<Node>,
}

impl DocumentFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }
}

impl TreeSink for DocumentFragment {
    fn append_child(&mut self, node: Node) -> Result<()> {
        self.children.push(node);
        Ok(())
    }
}

/// A document: prologue comments plus at most one root element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document element, if one has been appended.
    pub fn root(&self) -> Option<&Element> {
        self.children.iter().find_map(Node::as_element)
    }

    /// Take the document element out of the document.
    pub fn into_root(self) -> Option<Element> {
        self.children.into_iter().find_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }
}

impl TreeSink for Document {
    fn append_child(&mut self, node: Node) -> Result<()> {
        match &node {
            Node::Element(element) if self.root().is_some() => {
                return Err(OoxmlError::Serialization(format!(
                    "document already has a root element, cannot append {}",
                    element.name
                )));
            },
            Node::Text(_) if !node.is_whitespace_text() => {
                return Err(OoxmlError::Serialization(
                    "text is not allowed at document level".to_string(),
                ));
            },
            Node::CData(_) => {
                return Err(OoxmlError::Serialization(
                    "CDATA is not allowed at document level".to_string(),
                ));
            },
            _ => {},
        }
        self.children.push(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    #[test]
    fn test_qname_equality_ignores_prefix() {
        let a = QName::ns(NS, "p").with_prefix("a");
        let b = QName::ns(NS, "p").with_prefix("b");
        assert_eq!(a, b);
        assert_ne!(a, QName::local("p"));
        assert_eq!(a.prefixed(), "a:p");
        assert_eq!(QName::local("p").prefixed(), "p");
    }

    #[test]
    fn test_element_accessors() {
        let el = Element::new(QName::ns(NS, "root"))
            .with_attribute(QName::local("id"), "1")
            .with_child(Element::new(QName::ns(NS, "a")).with_text("x"))
            .with_child(Node::Comment("c".into()))
            .with_child(Element::new(QName::ns(NS, "b")).with_text("y"));

        assert_eq!(el.attribute(None, "id"), Some("1"));
        assert_eq!(el.child_elements().count(), 2);
        assert_eq!(el.child(Some(NS), "b").unwrap().text(), "y");
        assert_eq!(el.text(), "xy");
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut el = Element::new(QName::local("a"));
        el.set_attribute(QName::local("k"), "1");
        el.set_attribute(QName::local("k"), "2");
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.attribute(None, "k"), Some("2"));
    }

    #[test]
    fn test_document_single_root() {
        let mut doc = Document::new();
        doc.append_child(Node::Comment("prologue".into())).unwrap();
        doc.append_child(Element::new(QName::local("a")).into()).unwrap();
        let err = doc
            .append_child(Element::new(QName::local("b")).into())
            .unwrap_err();
        assert!(err.is_serialization_error());
        assert!(doc.append_child(Node::Text("x".into())).is_err());
        assert_eq!(doc.root().unwrap().name.local, "a");
    }

    #[test]
    fn test_fragment_accepts_many() {
        let mut frag = DocumentFragment::new();
        frag.append_child(Element::new(QName::local("a")).into()).unwrap();
        frag.append_child(Element::new(QName::local("b")).into()).unwrap();
        assert_eq!(frag.child_elements().count(), 2);
    }
}
