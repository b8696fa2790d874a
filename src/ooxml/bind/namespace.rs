//! Namespace-prefix strategies.
//!
//! A marshaller asks its `NamespacePrefixMapper` which prefix to use for each
//! namespace URI that occurs in a content tree. Office applications expect the
//! conventional prefixes (`w`, `r`, `cp`, ...), and markup-compatibility
//! attributes such as `mc:Ignorable` name prefixes in their values, so the
//! standard mapper reproduces them.

use crate::ooxml::opc::constants::namespace as ns;
use phf::phf_map;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Conventional prefixes for namespaces found in OOXML parts.
///
/// An empty prefix means the namespace is normally the default namespace.
static STANDARD_PREFIXES: phf::Map<&'static str, &'static str> = phf_map! {
    "http://schemas.openxmlformats.org/wordprocessingml/2006/main" => "w",
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships" => "r",
    "http://schemas.openxmlformats.org/drawingml/2006/main" => "a",
    "http://schemas.openxmlformats.org/drawingml/2006/picture" => "pic",
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" => "wp",
    "http://schemas.openxmlformats.org/markup-compatibility/2006" => "mc",
    "http://schemas.openxmlformats.org/officeDocument/2006/math" => "m",
    "http://schemas.microsoft.com/office/word/2010/wordml" => "w14",
    "urn:schemas-microsoft-com:vml" => "v",
    "urn:schemas-microsoft-com:office:office" => "o",
    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties" => "cp",
    "http://purl.org/dc/elements/1.1/" => "dc",
    "http://purl.org/dc/terms/" => "dcterms",
    "http://purl.org/dc/dcmitype/" => "dcmitype",
    "http://www.w3.org/2001/XMLSchema-instance" => "xsi",
    "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes" => "vt",
    "http://schemas.openxmlformats.org/officeDocument/2006/custom-properties" => "",
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" => "",
    "http://schemas.openxmlformats.org/package/2006/relationships" => "",
    "http://schemas.openxmlformats.org/package/2006/content-types" => "",
    "http://schemas.openxmlformats.org/spreadsheetml/2006/main" => "",
    "http://schemas.openxmlformats.org/presentationml/2006/main" => "p",
};

/// Policy controlling which prefixes are emitted for namespace URIs.
///
/// Implementations must be cheap to call; a mapper is consulted once per
/// namespace per marshal call.
pub trait NamespacePrefixMapper: Send + Sync + fmt::Debug {
    /// Preferred prefix for `namespace_uri`.
    ///
    /// `suggestion` is the prefix the tree itself carries for the namespace,
    /// if any. Returning `Some("")` requests the default namespace; returning
    /// `None` lets the marshaller fall back to the suggestion or a generated
    /// prefix.
    fn preferred_prefix(&self, namespace_uri: &str, suggestion: Option<&str>) -> Option<String>;

    /// Namespace URIs to declare on the root element even when unused.
    fn predeclared_uris(&self) -> Vec<String> {
        Vec::new()
    }
}

/// The conventional OOXML prefix table.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPrefixMapper;

impl StandardPrefixMapper {
    /// Look up the conventional prefix for a namespace.
    pub fn lookup(namespace_uri: &str) -> Option<&'static str> {
        STANDARD_PREFIXES.get(namespace_uri).copied()
    }
}

impl NamespacePrefixMapper for StandardPrefixMapper {
    fn preferred_prefix(&self, namespace_uri: &str, _suggestion: Option<&str>) -> Option<String> {
        Self::lookup(namespace_uri).map(str::to_string)
    }
}

/// Explicit URI-to-prefix overrides consulted before a fallback mapper.
#[derive(Debug, Clone)]
pub struct OverridePrefixMapper {
    overrides: BTreeMap<String, String>,
    fallback: Arc<dyn NamespacePrefixMapper>,
}

impl OverridePrefixMapper {
    pub fn new(overrides: BTreeMap<String, String>, fallback: Arc<dyn NamespacePrefixMapper>) -> Self {
        Self { overrides, fallback }
    }
}

impl NamespacePrefixMapper for OverridePrefixMapper {
    fn preferred_prefix(&self, namespace_uri: &str, suggestion: Option<&str>) -> Option<String> {
        self.overrides
            .get(namespace_uri)
            .cloned()
            .or_else(|| self.fallback.preferred_prefix(namespace_uri, suggestion))
    }

    fn predeclared_uris(&self) -> Vec<String> {
        self.fallback.predeclared_uris()
    }
}

/// Whether `prefix` can be declared: an NCName not starting with `xml`.
pub fn is_declarable_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if prefix.get(..3).is_some_and(|head| head.eq_ignore_ascii_case("xml")) {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// How one namespace URI is bound during a marshal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding<'a> {
    /// Written without a prefix through the default namespace.
    Default,
    Prefix(&'a str),
}

/// Prefix assignments for a single marshal call.
///
/// Built once per call from the namespaces a tree uses; never shared.
#[derive(Debug, Default)]
pub(crate) struct PrefixAssignment {
    order: Vec<String>,
    prefixes: HashMap<String, String>,
    taken: HashSet<String>,
    default_uri: Option<String>,
    next_generated: usize,
}

/// What the marshaller needs to know about one namespace before assigning it.
#[derive(Debug)]
pub(crate) struct NamespaceUse<'a> {
    pub uri: &'a str,
    pub hint: Option<&'a str>,
    pub used_by_attribute: bool,
}

impl PrefixAssignment {
    /// Assign prefixes to `uses`, given in document order.
    ///
    /// The default namespace is granted at most once, and never when the tree
    /// has elements in no namespace (they would be captured by it) or when
    /// the namespace is needed for an attribute (attributes cannot use it).
    pub fn assign(
        uses: &[NamespaceUse<'_>],
        mapper: &dyn NamespacePrefixMapper,
        allow_default: bool,
    ) -> Self {
        let mut assignment = Self::default();

        for usage in uses {
            if usage.uri == ns::XML || assignment.prefixes.contains_key(usage.uri) {
                continue;
            }

            let preferred = mapper.preferred_prefix(usage.uri, usage.hint);

            if preferred.as_deref() == Some("")
                && allow_default
                && !usage.used_by_attribute
                && assignment.default_uri.is_none()
            {
                assignment.default_uri = Some(usage.uri.to_string());
                assignment.order.push(usage.uri.to_string());
                continue;
            }

            let prefix = [preferred.as_deref(), usage.hint]
                .into_iter()
                .flatten()
                .find(|candidate| {
                    is_declarable_prefix(candidate) && !assignment.taken.contains(*candidate)
                })
                .map(str::to_string)
                .unwrap_or_else(|| assignment.generate());

            assignment.taken.insert(prefix.clone());
            assignment.prefixes.insert(usage.uri.to_string(), prefix);
            assignment.order.push(usage.uri.to_string());
        }

        assignment
    }

    fn generate(&mut self) -> String {
        loop {
            let candidate = format!("ns{}", self.next_generated);
            self.next_generated += 1;
            if !self.taken.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// How `uri` is written; `None` if it was never assigned.
    pub fn binding(&self, uri: &str) -> Option<Binding<'_>> {
        if uri == ns::XML {
            return Some(Binding::Prefix("xml"));
        }
        if self.default_uri.as_deref() == Some(uri) {
            return Some(Binding::Default);
        }
        self.prefixes.get(uri).map(|prefix| Binding::Prefix(prefix.as_str()))
    }

    /// Declarations in assignment order, ready to put on the root element.
    pub fn declarations(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|uri| match self.binding(uri)? {
                Binding::Default => Some((String::new(), uri.clone())),
                Binding::Prefix(prefix) => Some((prefix.to_string(), uri.clone())),
            })
            .collect()
    }
}
