//! Writing element trees as XML.

use super::config::BindingConfig;
use super::namespace::{Binding, NamespacePrefixMapper, NamespaceUse, PrefixAssignment};
use super::tree::{Element, NamespaceDecl, Node, TreeSink};
use crate::common::xml::escape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::namespace as ns;
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;

#[inline]
fn serialization_error(what: &str, err: impl Display) -> OoxmlError {
    OoxmlError::Serialization(format!("{}: {}", what, err))
}

/// A one-shot serializer created by a `BindingContext`.
///
/// Each marshaller owns its settings and prefix mapper; nothing it does is
/// visible to other marshallers of the same context.
#[derive(Debug, Clone)]
pub struct Marshaller {
    config: BindingConfig,
    prefix_mapper: Arc<dyn NamespacePrefixMapper>,
}

impl Marshaller {
    pub(crate) fn new(config: BindingConfig, prefix_mapper: Arc<dyn NamespacePrefixMapper>) -> Self {
        Self {
            config,
            prefix_mapper,
        }
    }

    /// Install the namespace-prefix strategy for this marshaller.
    pub fn set_prefix_mapper(&mut self, mapper: Arc<dyn NamespacePrefixMapper>) {
        self.prefix_mapper = mapper;
    }

    pub fn prefix_mapper(&self) -> &Arc<dyn NamespacePrefixMapper> {
        &self.prefix_mapper
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Serialize `element` as a complete XML document into `out`.
    ///
    /// The whole tree is validated and prefixed before the first byte is
    /// written. `out` is flushed but not closed.
    pub fn marshal_to_writer<W: Write>(&self, element: &Element, out: W) -> Result<()> {
        let prepared = self.prepare(element)?;

        let mut writer = match self.config.indent {
            Some(width) => Writer::new_with_indent(out, b' ', width),
            None => Writer::new(out),
        };

        if self.config.xml_declaration {
            let standalone = self.config.standalone.then_some("yes");
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), standalone)))
                .map_err(|e| serialization_error("Failed to write XML declaration", e))?;
        }

        write_element(&mut writer, &prepared)?;

        writer
            .into_inner()
            .flush()
            .map_err(|e| serialization_error("Failed to flush output", e))
    }

    /// Serialize `element` into a new byte vector.
    pub fn marshal_to_vec(&self, element: &Element) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.marshal_to_writer(element, &mut out)?;
        Ok(out)
    }

    /// Append a prefixed copy of `element` to `sink`.
    ///
    /// The copy carries every namespace declaration on its root, so it is
    /// self-contained wherever it ends up. The sink is left untouched when
    /// preparing the copy fails.
    pub fn marshal_to_node(&self, element: &Element, sink: &mut dyn TreeSink) -> Result<()> {
        let prepared = self.prepare(element)?;
        sink.append_child(Node::Element(prepared))
    }

    /// Validate the tree, assign prefixes and return the copy to write.
    ///
    /// Declarations found anywhere in the tree are hoisted to the root of the
    /// copy together with the namespaces its names use.
    fn prepare(&self, element: &Element) -> Result<Element> {
        let predeclared = self.prefix_mapper.predeclared_uris();
        let mut collector = UseCollector::default();
        collector.visit(element)?;
        for uri in &predeclared {
            check_namespace(uri)?;
            collector.record(uri, None, false);
        }

        let assignment = PrefixAssignment::assign(
            &collector.uses,
            self.prefix_mapper.as_ref(),
            !collector.has_unqualified_elements,
        );

        let mut prepared = apply_prefixes(element, &assignment)?;
        prepared.namespaces = assignment
            .declarations()
            .into_iter()
            .map(|(prefix, uri)| NamespaceDecl { prefix, uri })
            .collect();
        Ok(prepared)
    }
}

/// Namespace usage gathered in document order.
#[derive(Default)]
struct UseCollector<'a> {
    uses: Vec<NamespaceUse<'a>>,
    index: HashMap<&'a str, usize>,
    has_unqualified_elements: bool,
}

impl<'a> UseCollector<'a> {
    fn record(&mut self, uri: &'a str, hint: Option<&'a str>, by_attribute: bool) {
        match self.index.get(uri) {
            Some(&i) => {
                let usage = &mut self.uses[i];
                usage.used_by_attribute |= by_attribute;
                if usage.hint.is_none() {
                    usage.hint = hint;
                }
            },
            None => {
                self.index.insert(uri, self.uses.len());
                self.uses.push(NamespaceUse {
                    uri,
                    hint,
                    used_by_attribute: by_attribute,
                });
            },
        }
    }

    fn visit(&mut self, element: &'a Element) -> Result<()> {
        check_local_name(&element.name.local)?;
        match element.name.namespace.as_deref() {
            Some(uri) => {
                check_namespace(uri)?;
                self.record(uri, element.name.prefix.as_deref(), false);
            },
            None => self.has_unqualified_elements = true,
        }

        for attr in &element.attributes {
            check_local_name(&attr.name.local)?;
            check_chars(&attr.value)?;
            match attr.name.namespace.as_deref() {
                Some(uri) => {
                    check_namespace(uri)?;
                    self.record(uri, attr.name.prefix.as_deref(), true);
                },
                None if attr.name.local == "xmlns" => {
                    return Err(OoxmlError::Serialization(
                        "namespace declarations cannot be attributes".to_string(),
                    ));
                },
                None => {},
            }
        }

        // Declarations are kept even when no name uses them: values such as
        // `mc:Ignorable` and `xsi:type` refer to their prefixes.
        for decl in &element.namespaces {
            if decl.uri.is_empty() || decl.uri == ns::XMLNS {
                continue;
            }
            let hint = (!decl.prefix.is_empty()).then_some(decl.prefix.as_str());
            self.record(&decl.uri, hint, false);
        }

        for child in &element.children {
            match child {
                Node::Element(child) => self.visit(child)?,
                Node::Text(text) => check_chars(text)?,
                Node::CData(text) => {
                    check_chars(text)?;
                    if text.contains("]]>") {
                        return Err(OoxmlError::Serialization(
                            "CDATA section contains ']]>'".to_string(),
                        ));
                    }
                },
                Node::Comment(text) => {
                    check_chars(text)?;
                    if text.contains("--") || text.ends_with('-') {
                        return Err(OoxmlError::Serialization(
                            "comment contains '--' or ends with '-'".to_string(),
                        ));
                    }
                },
            }
        }
        Ok(())
    }
}

fn check_local_name(local: &str) -> Result<()> {
    let valid = local
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(OoxmlError::Serialization(format!("invalid XML name '{}'", local)))
    }
}

fn check_namespace(uri: &str) -> Result<()> {
    if uri.is_empty() || uri == ns::XMLNS {
        return Err(OoxmlError::Serialization(format!(
            "namespace URI '{}' cannot be used for names",
            uri
        )));
    }
    Ok(())
}

/// Reject characters XML 1.0 cannot represent, even as references.
fn check_chars(text: &str) -> Result<()> {
    match text
        .chars()
        .find(|&c| (c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')) || matches!(c, '\u{FFFE}' | '\u{FFFF}'))
    {
        Some(c) => Err(OoxmlError::Serialization(format!(
            "character U+{:04X} is not allowed in XML",
            c as u32
        ))),
        None => Ok(()),
    }
}

fn apply_prefixes(element: &Element, assignment: &PrefixAssignment) -> Result<Element> {
    let prefix_for = |namespace: Option<&str>, is_attribute: bool| -> Result<Option<String>> {
        let Some(uri) = namespace else {
            return Ok(None);
        };
        match assignment.binding(uri) {
            Some(Binding::Prefix(prefix)) => Ok(Some(prefix.to_string())),
            Some(Binding::Default) if !is_attribute => Ok(None),
            _ => Err(OoxmlError::Serialization(format!(
                "no prefix assigned for namespace {}",
                uri
            ))),
        }
    };

    let mut out = Element::new(element.name.clone());
    out.name.prefix = prefix_for(element.name.namespace.as_deref(), false)?;

    for attr in &element.attributes {
        let mut attr = attr.clone();
        attr.name.prefix = prefix_for(attr.name.namespace.as_deref(), true)?;
        out.attributes.push(attr);
    }

    out.children = element
        .children
        .iter()
        .map(|child| match child {
            Node::Element(child) => apply_prefixes(child, assignment).map(Node::Element),
            other => Ok(other.clone()),
        })
        .collect::<Result<_>>()?;

    Ok(out)
}

/// Attribute values additionally keep whitespace characters that parsers
/// would otherwise normalize to spaces.
fn escape_attribute(value: &str) -> String {
    let escaped = escape_xml(value);
    if !escaped.contains(['\t', '\n', '\r']) {
        return escaped;
    }
    escaped
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let name = element.name.prefixed();
    let mut start = BytesStart::new(name.as_str());

    for decl in &element.namespaces {
        let key = if decl.prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", decl.prefix)
        };
        push_attribute(&mut start, &key, &decl.uri);
    }
    for attr in &element.attributes {
        push_attribute(&mut start, &attr.name.prefixed(), &attr.value);
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| serialization_error("Failed to write element", e));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| serialization_error("Failed to write element", e))?;

    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::from_escaped(escape_xml(text))))
                .map_err(|e| serialization_error("Failed to write text", e))?,
            Node::CData(text) => writer
                .write_event(Event::CData(quick_xml::events::BytesCData::new(text.as_str())))
                .map_err(|e| serialization_error("Failed to write CDATA", e))?,
            Node::Comment(text) => writer
                .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                .map_err(|e| serialization_error("Failed to write comment", e))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(|e| serialization_error("Failed to close element", e))
}

fn push_attribute(start: &mut BytesStart<'_>, key: &str, value: &str) {
    start.push_attribute(XmlAttribute {
        key: quick_xml::name::QName(key.as_bytes()),
        value: Cow::Owned(escape_attribute(value).into_bytes()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::bind::context::BindingContext;
    use crate::ooxml::bind::namespace::StandardPrefixMapper;
    use crate::ooxml::bind::tree::{Document, DocumentFragment, QName};

    fn paragraph(text: &str) -> Element {
        Element::new(QName::ns(ns::WML_MAIN, "document")).with_child(
            Element::new(QName::ns(ns::WML_MAIN, "body")).with_child(
                Element::new(QName::ns(ns::WML_MAIN, "p"))
                    .with_attribute(QName::ns(ns::W14, "paraId"), "1A2B")
                    .with_child(
                        Element::new(QName::ns(ns::WML_MAIN, "t"))
                            .with_attribute(QName::ns(ns::XML, "space"), "preserve")
                            .with_text(text),
                    ),
            ),
        )
    }

    fn compact() -> Marshaller {
        BindingContext::standard().create_marshaller()
    }

    #[test]
    fn test_marshal_to_writer_uses_conventional_prefixes() {
        let xml = String::from_utf8(compact().marshal_to_vec(&paragraph("a < b")).unwrap()).unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
                r#"xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml">"#,
                r#"<w:body><w:p w14:paraId="1A2B"><w:t xml:space="preserve">a &lt; b</w:t></w:p></w:body>"#,
                r#"</w:document>"#
            )
        );
    }

    #[test]
    fn test_marshal_to_node_declares_on_root() {
        let mut doc = Document::new();
        compact().marshal_to_node(&paragraph("x"), &mut doc).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.name.prefix.as_deref(), Some("w"));
        assert!(root.namespaces.contains(&NamespaceDecl {
            prefix: "w".to_string(),
            uri: ns::WML_MAIN.to_string(),
        }));
        let p = root.child(Some(ns::WML_MAIN), "body").unwrap().child(Some(ns::WML_MAIN), "p").unwrap();
        assert_eq!(p.attributes[0].name.prefix.as_deref(), Some("w14"));
        assert!(p.namespaces.is_empty());
    }

    #[test]
    fn test_default_namespace_from_mapper() {
        let el = Element::new(QName::ns(ns::OFC_CUSTOM_PROPERTIES, "Properties"))
            .with_child(Element::new(QName::ns(ns::OFC_DOC_PROPS_VTYPES, "lpwstr")).with_text("v"));
        let xml = String::from_utf8(compact().marshal_to_vec(&el).unwrap()).unwrap();
        assert!(xml.contains(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties""#));
        assert!(xml.contains("<vt:lpwstr>v</vt:lpwstr>"));
    }

    #[test]
    fn test_unqualified_elements_block_default_namespace() {
        let el = Element::new(QName::ns(ns::OFC_CUSTOM_PROPERTIES, "Properties"))
            .with_child(Element::new(QName::local("plain")));
        let xml = String::from_utf8(compact().marshal_to_vec(&el).unwrap()).unwrap();
        assert!(xml.contains("<ns0:Properties xmlns:ns0="));
        assert!(xml.contains("<plain/>"));
    }

    #[test]
    fn test_unknown_namespace_keeps_hint_or_generates() {
        let el = Element::new(QName::ns("urn:one", "a").with_prefix("one"))
            .with_child(Element::new(QName::ns("urn:two", "b")));
        let xml = String::from_utf8(compact().marshal_to_vec(&el).unwrap()).unwrap();
        assert!(xml.contains(r#"<one:a xmlns:one="urn:one" xmlns:ns0="urn:two"><ns0:b/></one:a>"#));
    }

    #[test]
    fn test_custom_mapper_is_used() {
        #[derive(Debug)]
        struct Upper;
        impl NamespacePrefixMapper for Upper {
            fn preferred_prefix(&self, _uri: &str, _suggestion: Option<&str>) -> Option<String> {
                Some("W".to_string())
            }
        }

        let mut marshaller = compact();
        marshaller.set_prefix_mapper(Arc::new(Upper));
        let mut frag = DocumentFragment::new();
        marshaller.marshal_to_node(&paragraph("x"), &mut frag).unwrap();
        let root = frag.child_elements().next().unwrap();
        assert_eq!(root.name.prefix.as_deref(), Some("W"));
        // second namespace cannot reuse "W"
        assert_eq!(root.namespaces[1].prefix, "ns0");
    }

    #[test]
    fn test_declarations_referenced_from_values_survive() {
        let source = concat!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
            r#"xmlns:wp14="http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing" "#,
            r#"mc:Ignorable="wp14"><w:body><w:p xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="xsd:string"/></w:body></w:document>"#
        );
        let tree = BindingContext::standard()
            .create_unmarshaller()
            .unmarshal_from_bytes(source.as_bytes())
            .unwrap();

        let xml = String::from_utf8(compact().marshal_to_vec(&tree).unwrap()).unwrap();
        assert!(xml.contains(r#"mc:Ignorable="wp14""#));
        assert!(xml.contains(
            r#"xmlns:wp14="http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing""#
        ));
        assert!(xml.contains(r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema""#));
        assert!(xml.contains(r#"<w:p xsi:type="xsd:string"/>"#));
        assert!(!xml.contains("xmlns:ns0"));
    }

    #[derive(Debug)]
    struct Predeclaring(&'static str);

    impl NamespacePrefixMapper for Predeclaring {
        fn preferred_prefix(&self, namespace_uri: &str, _suggestion: Option<&str>) -> Option<String> {
            (namespace_uri == "urn:extra").then(|| "x".to_string())
        }

        fn predeclared_uris(&self) -> Vec<String> {
            vec![self.0.to_string()]
        }
    }

    #[test]
    fn test_predeclared_namespaces() {
        let mut marshaller = compact();
        marshaller.set_prefix_mapper(Arc::new(Predeclaring("urn:extra")));
        let xml = String::from_utf8(marshaller.marshal_to_vec(&Element::new(QName::local("a"))).unwrap()).unwrap();
        assert!(xml.ends_with(r#"<a xmlns:x="urn:extra"/>"#));

        for bad in ["", ns::XMLNS] {
            marshaller.set_prefix_mapper(Arc::new(Predeclaring(bad)));
            let err = marshaller.marshal_to_vec(&Element::new(QName::local("a"))).unwrap_err();
            assert!(err.is_serialization_error(), "{bad:?}: {err}");
        }
    }

    #[test]
    fn test_attribute_whitespace_is_preserved_as_references() {
        let el = Element::new(QName::local("a")).with_attribute(QName::local("v"), "x\ny\t\"");
        let xml = String::from_utf8(compact().marshal_to_vec(&el).unwrap()).unwrap();
        assert!(xml.contains(r#"v="x&#10;y&#9;&quot;""#));
    }

    #[test]
    fn test_invalid_trees_are_serialization_errors() {
        let bad_char = Element::new(QName::local("a")).with_text("\u{1}");
        let bad_name = Element::new(QName::local("1a"));
        let bad_comment = Element::new(QName::local("a")).with_child(Node::Comment("a--b".into()));
        let bad_cdata = Element::new(QName::local("a")).with_child(Node::CData("]]>".into()));
        let xmlns_attr = Element::new(QName::local("a")).with_attribute(QName::local("xmlns"), "urn:x");

        for el in [bad_char, bad_name, bad_comment, bad_cdata, xmlns_attr] {
            let err = compact().marshal_to_vec(&el).unwrap_err();
            assert!(err.is_serialization_error(), "{err}");
        }
    }

    #[test]
    fn test_failed_prepare_leaves_sink_untouched() {
        let mut frag = DocumentFragment::new();
        let bad = Element::new(QName::local("a")).with_text("\u{0}");
        assert!(compact().marshal_to_node(&bad, &mut frag).is_err());
        assert!(frag.children.is_empty());
    }

    #[test]
    fn test_indent_and_no_declaration() {
        let config = BindingConfig {
            indent: Some(2),
            xml_declaration: false,
            ..Default::default()
        };
        let marshaller = Marshaller::new(config, Arc::new(StandardPrefixMapper));
        let el = Element::new(QName::local("a")).with_child(Element::new(QName::local("b")));
        let xml = String::from_utf8(marshaller.marshal_to_vec(&el).unwrap()).unwrap();
        assert_eq!(xml, "<a>\n  <b/>\n</a>");
    }

    #[test]
    fn test_non_standalone_declaration() {
        let config = BindingConfig {
            standalone: false,
            ..Default::default()
        };
        let marshaller = Marshaller::new(config, Arc::new(StandardPrefixMapper));
        let xml = String::from_utf8(marshaller.marshal_to_vec(&Element::new(QName::local("a"))).unwrap()).unwrap();
        assert_eq!(xml, r#"<?xml version="1.0" encoding="UTF-8"?><a/>"#);
    }
}
