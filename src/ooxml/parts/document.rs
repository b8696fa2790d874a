//! Main document part of a Word package (`/word/document.xml`).
//!
//! The binding covers the text layer of a document: paragraphs with an
//! optional style, and runs with bold/italic flags. Tables, section
//! properties and drawings are skipped on load; use the generic `Element`
//! binding when a part must round-trip unchanged.

use crate::ooxml::bind::{Deserializable, Element, Node, QName, RootName, XmlBinding};
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::{content_type as ct, namespace as ns};

/// Conventional location of the main document part.
pub const DOCUMENT_PARTNAME: &str = "/word/document.xml";

/// A Word document body reduced to paragraphs and runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordDocument {
    pub paragraphs: Vec<Paragraph>,
}

/// A paragraph (`<w:p>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    /// Style ID from `<w:pPr><w:pStyle w:val="..."/>`.
    pub style: Option<String>,
    pub runs: Vec<Run>,
}

/// A run of uniformly formatted text (`<w:r>`).
///
/// Tabs and line breaks in `text` map to `<w:tab/>` and `<w:br/>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl WordDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a paragraph holding a single plain run.
    pub fn add_paragraph(&mut self, text: impl Into<String>) -> &mut Paragraph {
        let mut paragraph = Paragraph::default();
        let text = text.into();
        if !text.is_empty() {
            paragraph.add_run(text);
        }
        self.paragraphs.push(paragraph);
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// Document text, one line per paragraph.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Paragraph {
    pub fn add_run(&mut self, text: impl Into<String>) -> &mut Run {
        self.runs.push(Run {
            text: text.into(),
            ..Default::default()
        });
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }

    pub fn set_style(&mut self, style: impl Into<String>) -> &mut Self {
        self.style = Some(style.into());
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    fn to_element(&self) -> Element {
        let mut p = Element::new(w("p"));
        if let Some(style) = &self.style {
            p.push_child(
                Element::new(w("pPr"))
                    .with_child(Element::new(w("pStyle")).with_attribute(w("val"), style.as_str())),
            );
        }
        for run in &self.runs {
            p.push_child(run.to_element());
        }
        p
    }

    fn from_element(element: &Element) -> Self {
        let mut paragraph = Paragraph::default();
        for child in element.child_elements() {
            if !is_w(child) {
                continue;
            }
            match child.name.local.as_str() {
                "pPr" => {
                    paragraph.style = child
                        .child(Some(ns::WML_MAIN), "pStyle")
                        .and_then(|style| style.attribute(Some(ns::WML_MAIN), "val"))
                        .map(str::to_string);
                },
                "r" => paragraph.runs.push(Run::from_element(child)),
                // Hyperlinks and inserted text wrap ordinary runs.
                "hyperlink" | "ins" | "smartTag" => paragraph.runs.extend(
                    child
                        .child_elements()
                        .filter(|el| el.name.is(Some(ns::WML_MAIN), "r"))
                        .map(Run::from_element),
                ),
                other => tracing::debug!(element = other, "skipping paragraph content"),
            }
        }
        paragraph
    }
}

impl Run {
    pub fn bold(&mut self, bold: bool) -> &mut Self {
        self.bold = bold;
        self
    }

    pub fn italic(&mut self, italic: bool) -> &mut Self {
        self.italic = italic;
        self
    }

    fn to_element(&self) -> Element {
        let mut r = Element::new(w("r"));
        if self.bold || self.italic {
            let mut r_pr = Element::new(w("rPr"));
            if self.bold {
                r_pr.push_child(Element::new(w("b")));
            }
            if self.italic {
                r_pr.push_child(Element::new(w("i")));
            }
            r.push_child(r_pr);
        }

        let mut segment = String::new();
        for ch in self.text.chars() {
            match ch {
                '\t' | '\n' => {
                    push_text(&mut r, &mut segment);
                    r.push_child(Element::new(w(if ch == '\t' { "tab" } else { "br" })));
                },
                _ => segment.push(ch),
            }
        }
        push_text(&mut r, &mut segment);
        r
    }

    fn from_element(element: &Element) -> Self {
        let mut run = Run::default();
        for child in element.child_elements() {
            if !is_w(child) {
                continue;
            }
            match child.name.local.as_str() {
                "rPr" => {
                    for prop in child.child_elements().filter(|el| is_w(el)) {
                        match prop.name.local.as_str() {
                            "b" => run.bold = toggle_value(prop),
                            "i" => run.italic = toggle_value(prop),
                            _ => {},
                        }
                    }
                },
                "t" => run.text.push_str(&child.text()),
                "tab" => run.text.push('\t'),
                "br" | "cr" => run.text.push('\n'),
                _ => {},
            }
        }
        run
    }
}

fn w(local: &str) -> QName {
    QName::ns(ns::WML_MAIN, local)
}

fn is_w(element: &Element) -> bool {
    element.name.namespace.as_deref() == Some(ns::WML_MAIN)
}

/// `<w:b/>` is on; `w:val` of `false`, `0` or `off` turns it off.
fn toggle_value(element: &Element) -> bool {
    !matches!(
        element.attribute(Some(ns::WML_MAIN), "val"),
        Some("false" | "0" | "off")
    )
}

/// Flush pending text as a `<w:t>`, preserving edge whitespace.
fn push_text(run: &mut Element, segment: &mut String) {
    if segment.is_empty() {
        return;
    }
    let mut t = Element::new(w("t"));
    if segment.starts_with(char::is_whitespace) || segment.ends_with(char::is_whitespace) {
        t.set_attribute(QName::ns(ns::XML, "space"), "preserve");
    }
    t.children.push(Node::Text(std::mem::take(segment)));
    run.push_child(t);
}

impl XmlBinding for WordDocument {
    fn root_name() -> Option<RootName> {
        Some(RootName::new(ns::WML_MAIN, "document"))
    }

    fn content_type() -> &'static str {
        ct::WML_DOCUMENT_MAIN
    }

    fn to_element(&self) -> Result<Element> {
        let mut body = Element::new(w("body"));
        for paragraph in &self.paragraphs {
            body.push_child(paragraph.to_element());
        }
        Ok(Element::new(w("document")).with_child(body))
    }

    fn from_element(element: &Element) -> Result<Self> {
        let mut doc = WordDocument::default();
        let Some(body) = element.child(Some(ns::WML_MAIN), "body") else {
            tracing::warn!("document has no body");
            return Ok(doc);
        };

        for child in body.child_elements() {
            if child.name.is(Some(ns::WML_MAIN), "p") {
                doc.paragraphs.push(Paragraph::from_element(child));
            } else {
                tracing::debug!(element = %child.name, "skipping body content");
            }
        }
        Ok(doc)
    }
}

impl Deserializable for WordDocument {}
