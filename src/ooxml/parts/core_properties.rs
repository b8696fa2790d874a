//! Core properties part (`/docProps/core.xml`).
//!
//! Core properties follow the Dublin Core metadata standard plus a few
//! OPC-specific extensions, and are shared by Word, Excel and PowerPoint
//! packages.

use crate::ooxml::bind::{Deserializable, Element, QName, RootName, XmlBinding};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, namespace as ns};
use chrono::{DateTime, SecondsFormat, Utc};

/// Conventional location of the core properties part.
pub const CORE_PROPERTIES_PARTNAME: &str = "/docProps/core.xml";

/// Document metadata from the core properties part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub revision: Option<String>,
    pub last_printed: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub content_status: Option<String>,
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
}

impl CoreProperties {
    pub fn new() -> Self {
        Self::default()
    }
}

fn text_element(namespace: &str, local: &str, value: &str) -> Element {
    Element::new(QName::ns(namespace, local)).with_text(value)
}

/// `dcterms:created` and `dcterms:modified` carry `xsi:type="dcterms:W3CDTF"`.
fn w3cdtf_element(local: &str, value: &DateTime<Utc>) -> Element {
    Element::new(QName::ns(ns::DC_TERMS, local))
        .with_attribute(QName::ns(ns::XSI, "type"), "dcterms:W3CDTF")
        .with_text(format_datetime(value))
}

fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an ISO 8601 datetime string into a DateTime<Utc>.
///
/// Supports formats like:
/// - 2023-10-10T14:30:00Z
/// - 2023-10-10T14:30:00.1234567Z
/// - 2023-10-10T14:30:00+02:00
/// - 2023-10-10T14:30:00
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
    }

    Err(OoxmlError::Deserialization(format!(
        "Invalid datetime format: {}",
        s
    )))
}

impl XmlBinding for CoreProperties {
    fn root_name() -> Option<RootName> {
        Some(RootName::new(ns::OPC_CORE_PROPERTIES, "coreProperties"))
    }

    fn content_type() -> &'static str {
        ct::OPC_CORE_PROPERTIES
    }

    fn to_element(&self) -> Result<Element> {
        let mut root = Element::new(QName::ns(ns::OPC_CORE_PROPERTIES, "coreProperties"));

        let texts = [
            (ns::DC, "title", &self.title),
            (ns::DC, "subject", &self.subject),
            (ns::DC, "creator", &self.creator),
            (ns::OPC_CORE_PROPERTIES, "keywords", &self.keywords),
            (ns::DC, "description", &self.description),
            (ns::OPC_CORE_PROPERTIES, "lastModifiedBy", &self.last_modified_by),
            (ns::OPC_CORE_PROPERTIES, "revision", &self.revision),
        ];
        for (namespace, local, value) in texts {
            if let Some(value) = value {
                root.push_child(text_element(namespace, local, value));
            }
        }

        if let Some(printed) = &self.last_printed {
            root.push_child(text_element(
                ns::OPC_CORE_PROPERTIES,
                "lastPrinted",
                &format_datetime(printed),
            ));
        }
        if let Some(created) = &self.created {
            root.push_child(w3cdtf_element("created", created));
        }
        if let Some(modified) = &self.modified {
            root.push_child(w3cdtf_element("modified", modified));
        }

        let trailing = [
            (ns::OPC_CORE_PROPERTIES, "category", &self.category),
            (ns::OPC_CORE_PROPERTIES, "contentStatus", &self.content_status),
            (ns::DC, "identifier", &self.identifier),
            (ns::DC, "language", &self.language),
            (ns::OPC_CORE_PROPERTIES, "version", &self.version),
        ];
        for (namespace, local, value) in trailing {
            if let Some(value) = value {
                root.push_child(text_element(namespace, local, value));
            }
        }

        Ok(root)
    }

    fn from_element(element: &Element) -> Result<Self> {
        let mut props = CoreProperties::default();

        for child in element.child_elements() {
            let text = child.text();
            let namespace = child.name.namespace.as_deref();

            match (namespace, child.name.local.as_str()) {
                (Some(ns::DC), "title") => props.title = Some(text),
                (Some(ns::DC), "subject") => props.subject = Some(text),
                (Some(ns::DC), "creator") => props.creator = Some(text),
                (Some(ns::DC), "description") => props.description = Some(text),
                (Some(ns::DC), "identifier") => props.identifier = Some(text),
                (Some(ns::DC), "language") => props.language = Some(text),
                (Some(ns::DC_TERMS), "created") => props.created = Some(parse_datetime(&text)?),
                (Some(ns::DC_TERMS), "modified") => props.modified = Some(parse_datetime(&text)?),
                (Some(ns::OPC_CORE_PROPERTIES), local) => match local {
                    "keywords" => props.keywords = Some(text),
                    "lastModifiedBy" => props.last_modified_by = Some(text),
                    "revision" => props.revision = Some(text),
                    "lastPrinted" => props.last_printed = Some(parse_datetime(&text)?),
                    "category" => props.category = Some(text),
                    "contentStatus" => props.content_status = Some(text),
                    "version" => props.version = Some(text),
                    _ => tracing::debug!(element = %child.name, "skipping unknown core property"),
                },
                _ => tracing::debug!(element = %child.name, "skipping unknown core property"),
            }
        }

        Ok(props)
    }
}

impl Deserializable for CoreProperties {}
