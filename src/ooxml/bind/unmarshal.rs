//! Parsing XML into element trees.

use super::binding::XmlBinding;
use super::tree::{Attribute, Document, Element, NamespaceDecl, Node, QName};
use crate::common::decode_to_utf8;
use crate::common::xml::{resolve_reference, unescape_xml};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::namespace as ns;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{LocalName, Namespace, NamespaceResolver, Prefix, PrefixDeclaration, ResolveResult};
use std::borrow::Cow;
use std::fmt::Display;
use std::io::Read;

#[inline]
fn deserialization_error(what: &str, err: impl Display) -> OoxmlError {
    OoxmlError::Deserialization(format!("{}: {}", what, err))
}

#[inline]
fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| deserialization_error("Invalid UTF-8 in XML", e))
}

/// A one-shot parser created by a `BindingContext`.
///
/// Input is read completely before parsing starts. A tree is only returned
/// when the whole input is a well-formed document; there is no partial result.
#[derive(Debug, Clone)]
pub struct Unmarshaller {
    max_depth: usize,
}

impl Unmarshaller {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Read `input` to the end and parse it into a document.
    pub fn unmarshal_document<R: Read>(&self, mut input: R) -> Result<Document> {
        let mut bytes = Vec::new();
        input
            .read_to_end(&mut bytes)
            .map_err(|e| deserialization_error("Failed to read input", e))?;
        self.unmarshal_document_from_bytes(&bytes)
    }

    /// Parse a document held in memory.
    pub fn unmarshal_document_from_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let text = decode_to_utf8(bytes).map_err(|e| deserialization_error("Cannot decode input", e))?;
        TreeBuilder::new(self.max_depth).build(&text)
    }

    /// Read `input` to the end and return its document element.
    pub fn unmarshal_from_reader<R: Read>(&self, input: R) -> Result<Element> {
        self.unmarshal_document(input)?
            .into_root()
            .ok_or_else(|| OoxmlError::Deserialization("document has no root element".to_string()))
    }

    /// Parse bytes held in memory and return the document element.
    pub fn unmarshal_from_bytes(&self, bytes: &[u8]) -> Result<Element> {
        self.unmarshal_from_reader(bytes)
    }

    /// Parse `input` and bind its document element to `T`.
    ///
    /// The root element must match `T::root_name()` when `T` declares one.
    pub fn unmarshal_as<T: XmlBinding, R: Read>(&self, input: R) -> Result<T> {
        let root = self.unmarshal_from_reader(input)?;

        if let Some(expected) = T::root_name()
            && !root.name.is(expected.namespace, expected.local)
        {
            return Err(OoxmlError::Deserialization(format!(
                "unexpected root element {}, expected {}",
                root.name, expected
            )));
        }

        T::from_element(&root).map_err(|e| match e {
            OoxmlError::Deserialization(_) => e,
            other => OoxmlError::Deserialization(other.to_string()),
        })
    }
}

/// Event-driven construction of a `Document`.
///
/// Namespace scopes are tracked by `NsReader`; the builder only records the
/// declarations each element carries so they can be reused on output.
struct TreeBuilder {
    max_depth: usize,
    document: Document,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            document: Document::new(),
            open: Vec::new(),
        }
    }

    fn build(mut self, xml: &str) -> Result<Document> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(false);

        loop {
            let event = reader.read_event().map_err(|e| {
                deserialization_error(
                    &format!("XML parse error at byte {}", reader.buffer_position()),
                    e,
                )
            })?;

            match event {
                Event::Start(ref e) => {
                    let element = self.open_element(reader.resolver(), e)?;
                    self.open.push(element);
                },
                Event::Empty(ref e) => {
                    let element = self.open_element(reader.resolver(), e)?;
                    self.attach(Node::Element(element))?;
                },
                Event::End(_) => {
                    let element = self.open.pop().ok_or_else(|| {
                        OoxmlError::Deserialization("unmatched end tag".to_string())
                    })?;
                    self.attach(Node::Element(element))?;
                },
                Event::Text(ref e) => {
                    let raw = e
                        .xml10_content()
                        .map_err(|e| deserialization_error("Invalid text", e))?;
                    let text =
                        unescape_xml(&raw).map_err(|e| deserialization_error("Bad reference", e))?;
                    self.push_text(&text)?;
                },
                Event::GeneralRef(ref e) => {
                    let name = utf8(e)?;
                    let c = resolve_reference(name).ok_or_else(|| {
                        OoxmlError::Deserialization(format!("unresolvable reference '&{};'", name))
                    })?;
                    self.push_text(c.encode_utf8(&mut [0u8; 4]))?;
                },
                Event::CData(ref e) => {
                    let text = e
                        .xml10_content()
                        .map_err(|e| deserialization_error("Invalid CDATA", e))?
                        .into_owned();
                    match self.open.last_mut() {
                        Some(parent) => parent.children.push(Node::CData(text)),
                        None => {
                            return Err(OoxmlError::Deserialization(
                                "CDATA outside the root element".to_string(),
                            ));
                        },
                    }
                },
                Event::Comment(ref e) => {
                    let text = e
                        .xml10_content()
                        .map_err(|e| deserialization_error("Invalid comment", e))?
                        .into_owned();
                    self.attach(Node::Comment(text))?;
                },
                Event::DocType(_) => {
                    return Err(OoxmlError::Deserialization(
                        "document type declarations are not allowed in OOXML parts".to_string(),
                    ));
                },
                Event::Decl(_) | Event::PI(_) => {},
                Event::Eof => break,
            }
        }

        if let Some(unclosed) = self.open.last() {
            return Err(OoxmlError::Deserialization(format!(
                "unexpected end of input, <{}> is not closed",
                unclosed.name.prefixed()
            )));
        }
        if self.document.root().is_none() {
            return Err(OoxmlError::Deserialization("document has no root element".to_string()));
        }
        Ok(self.document)
    }

    /// Resolve the start tag into an element against the scope `resolver`
    /// holds for it.
    fn open_element(&mut self, resolver: &NamespaceResolver, start: &BytesStart<'_>) -> Result<Element> {
        if self.open.len() >= self.max_depth {
            return Err(OoxmlError::Deserialization(format!(
                "element nesting exceeds the limit of {}",
                self.max_depth
            )));
        }
        if self.open.is_empty() && self.document.root().is_some() {
            return Err(OoxmlError::Deserialization("multiple root elements".to_string()));
        }

        let (namespace, local) = resolver.resolve_element(start.name());
        let mut element = Element::new(qualified_name(namespace, local, start.name().prefix())?);

        for attr in start.attributes() {
            let attr = attr.map_err(|e| deserialization_error("Malformed attribute", e))?;
            let value = normalize_attribute_value(utf8(&attr.value)?);
            let value = unescape_xml(&value)
                .map_err(|e| deserialization_error("Bad reference in attribute", e))?
                .into_owned();

            if let Some(declaration) = attr.key.as_namespace_binding() {
                let prefix = match declaration {
                    PrefixDeclaration::Default => String::new(),
                    PrefixDeclaration::Named(prefix) => {
                        let prefix = utf8(prefix)?;
                        if value.is_empty() {
                            return Err(OoxmlError::Deserialization(format!(
                                "prefix '{}' cannot be bound to an empty namespace",
                                prefix
                            )));
                        }
                        prefix.to_string()
                    },
                };
                element.namespaces.push(NamespaceDecl { prefix, uri: value });
                continue;
            }

            let (namespace, local) = resolver.resolve_attribute(attr.key);
            let name = qualified_name(namespace, local, attr.key.prefix())?;
            if element.attributes.iter().any(|attr| attr.name == name) {
                return Err(OoxmlError::Deserialization(format!(
                    "duplicate attribute {} on <{}>",
                    name,
                    element.name.prefixed()
                )));
            }
            element.attributes.push(Attribute { name, value });
        }

        Ok(element)
    }

    fn push_text(&mut self, text: &str) -> Result<()> {
        match self.open.last_mut() {
            Some(parent) => {
                if let Some(Node::Text(last)) = parent.children.last_mut() {
                    last.push_str(text);
                } else {
                    parent.children.push(Node::Text(text.to_string()));
                }
                Ok(())
            },
            None if text.chars().all(char::is_whitespace) => Ok(()),
            None => Err(OoxmlError::Deserialization(
                "text outside the root element".to_string(),
            )),
        }
    }

    fn attach(&mut self, node: Node) -> Result<()> {
        match self.open.last_mut() {
            Some(parent) => {
                parent.children.push(node);
                Ok(())
            },
            None => {
                if matches!(node, Node::Element(_)) && self.document.root().is_some() {
                    return Err(OoxmlError::Deserialization("multiple root elements".to_string()));
                }
                self.document.children.push(node);
                Ok(())
            },
        }
    }
}

/// Build a `QName` from a resolved name, keeping the prefix as a hint.
fn qualified_name(
    namespace: ResolveResult<'_>,
    local: LocalName<'_>,
    prefix: Option<Prefix<'_>>,
) -> Result<QName> {
    let local = utf8(local.into_inner())?;
    let prefix = prefix.map(|p| utf8(p.into_inner())).transpose()?;
    if local.is_empty() || local.contains(':') || prefix == Some("") {
        let raw = match prefix {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        };
        return Err(OoxmlError::Deserialization(format!("invalid name '{}'", raw)));
    }

    match namespace {
        ResolveResult::Bound(Namespace(uri)) if !uri.is_empty() => {
            let uri = utf8(uri)?;
            if uri == ns::XMLNS {
                return Err(OoxmlError::Deserialization(format!(
                    "the xmlns prefix cannot qualify '{}'",
                    local
                )));
            }
            let name = QName::ns(uri, local);
            Ok(match prefix {
                Some(prefix) => name.with_prefix(prefix),
                None => name,
            })
        },
        ResolveResult::Bound(_) | ResolveResult::Unbound => Ok(QName::local(local)),
        ResolveResult::Unknown(prefix) => Err(OoxmlError::Deserialization(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

/// Attribute-value normalization for undeclared (CDATA) attributes: every
/// literal line end, tab or newline becomes a space. Character references
/// such as `&#10;` are resolved afterwards and survive.
fn normalize_attribute_value(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\t', '\n', '\r']) {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(raw.replace("\r\n", " ").replace(['\t', '\n', '\r'], " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::bom::UTF8_BOM;

    fn parse(xml: &str) -> Result<Element> {
        Unmarshaller::new(256).unmarshal_from_bytes(xml.as_bytes())
    }

    #[test]
    fn test_namespaces_resolved() {
        let root = parse(
            r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:t xml:space="preserve"> hi </w:t></w:p>
  </w:body>
</w:document>"#,
        )
        .unwrap();

        assert!(root.name.is(Some(ns::WML_MAIN), "document"));
        assert_eq!(root.name.prefix.as_deref(), Some("w"));
        assert_eq!(root.namespaces.len(), 1);

        let body = root.child(Some(ns::WML_MAIN), "body").unwrap();
        assert_eq!(body.child_elements().count(), 1);
        let t = body
            .child(Some(ns::WML_MAIN), "p")
            .unwrap()
            .child(Some(ns::WML_MAIN), "t")
            .unwrap();
        assert_eq!(t.attribute(Some(ns::XML), "space"), Some("preserve"));
        assert_eq!(t.text(), " hi ");
    }

    #[test]
    fn test_default_namespace_and_unprefixed_attributes() {
        let root = parse(r#"<a xmlns="urn:a" k="v"><b xmlns=""/></a>"#).unwrap();
        assert!(root.name.is(Some("urn:a"), "a"));
        assert_eq!(root.attribute(None, "k"), Some("v"));
        assert!(root.child_elements().next().unwrap().name.is(None, "b"));
    }

    #[test]
    fn test_references_resolved() {
        let root = parse(r#"<a v="&lt;&#x41;&quot;">x &amp; y &#169;</a>"#).unwrap();
        assert_eq!(root.attribute(None, "v"), Some("<A\""));
        assert_eq!(root.text(), "x & y ©");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_whitespace_between_elements_is_kept() {
        let root = parse("<name><first>Ada</first> <last>Lovelace</last></name>").unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[1], Node::Text(" ".to_string()));
        assert_eq!(root.text(), "Ada Lovelace");

        let root = parse(r#"<a xml:space="preserve"><b/>   <c/></a>"#).unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[1], Node::Text("   ".to_string()));
    }

    #[test]
    fn test_line_ends_are_normalized() {
        let root = parse("<a>one\r\ntwo\rthree<![CDATA[x\r\ny]]></a>").unwrap();
        assert_eq!(root.children[0], Node::Text("one\ntwo\nthree".to_string()));
        assert_eq!(root.children[1], Node::CData("x\ny".to_string()));
    }

    #[test]
    fn test_attribute_values_are_normalized() {
        let root = parse("<a v=\"x\r\ny\tz\nw\" k=\"1&#10;2&#9;3\"/>").unwrap();
        assert_eq!(root.attribute(None, "v"), Some("x y z w"));
        assert_eq!(root.attribute(None, "k"), Some("1\n2\t3"));
    }

    #[test]
    fn test_declarations_are_recorded() {
        let root = parse(
            r#"<w:document xmlns:w="urn:w" xmlns:wp14="urn:wp14" xmlns:mc="urn:mc" mc:Ignorable="wp14"/>"#,
        )
        .unwrap();
        let prefixes: Vec<_> = root.namespaces.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(prefixes, ["w", "wp14", "mc"]);
        assert_eq!(root.attribute(Some("urn:mc"), "Ignorable"), Some("wp14"));
    }

    #[test]
    fn test_cdata_and_comments() {
        let root = parse("<!-- before --><a><![CDATA[<raw>]]><!--c--></a>").unwrap();
        assert_eq!(root.children[0], Node::CData("<raw>".to_string()));
        assert_eq!(root.children[1], Node::Comment("c".to_string()));
    }

    #[test]
    fn test_bom_and_utf16() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<a>x</a>");
        let from_bom = Unmarshaller::new(8).unmarshal_from_bytes(&bytes).unwrap();

        let mut utf16 = vec![0xFF, 0xFE];
        for unit in "<a>x</a>".encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }
        let from_utf16 = Unmarshaller::new(8).unmarshal_from_bytes(&utf16).unwrap();

        assert_eq!(from_bom, parse("<a>x</a>").unwrap());
        assert_eq!(from_utf16, from_bom);
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        for bad in [
            "",
            "   ",
            "<a>",
            "<a><b></a>",
            "<a></b>",
            "<a/><b/>",
            "text<a/>",
            "<a/>trailing",
            "<p:a/>",
            "<a xmlns:p=\"\"/>",
            "<a>&unknown;</a>",
            "<a k=\"1\" k=\"2\"/>",
            "<a xmlns:p=\"urn:x\" xmlns:q=\"urn:x\" p:k=\"1\" q:k=\"2\"/>",
            "<!DOCTYPE a [<!ENTITY e \"x\">]><a>&e;</a>",
            "<w:document xmlns:w=\"urn:w\"><w:body>",
            "<xmlns:a/>",
            "<a xmlns:p=\"urn:x\"><p:b/><p:c xmlns:p=\"urn:y\"/><q:d/></a>",
        ] {
            let err = parse(bad).unwrap_err();
            assert!(err.is_deserialization_error(), "{bad:?}: {err}");
        }
    }

    #[test]
    fn test_depth_limit() {
        let deep = "<a>".repeat(5) + &"</a>".repeat(5);
        assert!(Unmarshaller::new(5).unmarshal_from_bytes(deep.as_bytes()).is_ok());
        let err = Unmarshaller::new(4).unmarshal_from_bytes(deep.as_bytes()).unwrap_err();
        assert!(err.is_deserialization_error());
    }

    #[test]
    fn test_read_failure_is_deserialization_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }
        let err = Unmarshaller::new(8).unmarshal_from_reader(Broken).unwrap_err();
        assert!(err.is_deserialization_error());
    }

    #[test]
    fn test_unmarshal_as_checks_root() {
        let err = Unmarshaller::new(8)
            .unmarshal_as::<crate::ooxml::parts::CoreProperties, _>("<other/>".as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("unexpected root element"));
    }
}
