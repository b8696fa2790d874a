//! OOXML custom document properties (`/docProps/custom.xml`).
//!
//! Custom properties allow users to attach arbitrary metadata with typed
//! values to documents.
//!
//! # Supported Property Types
//!
//! - **String** (`lpwstr` in OOXML)
//! - **Integer** (`i4` in OOXML) - 32-bit signed integer
//! - **Long** (`i8` in OOXML) - 64-bit signed integer
//! - **Float** (`r4` in OOXML) - 32-bit floating point
//! - **Double** (`r8` in OOXML) - 64-bit floating point
//! - **Boolean** (`bool` in OOXML)
//! - **DateTime** (`filetime` in OOXML)
//!
//! # Example Usage
//!
//! ```rust
//! use ooxml_bind::ooxml::parts::{CustomProperties, PropertyValue};
//!
//! let mut props = CustomProperties::new();
//! props.add_property("ProjectName", PropertyValue::String("MyProject".to_string()));
//! props.add_property("Version", PropertyValue::Integer(42));
//!
//! props.set_property("Version", PropertyValue::Integer(43));
//! assert_eq!(props.get_property("Version"), Some(&PropertyValue::Integer(43)));
//!
//! props.remove_property("ProjectName");
//! assert_eq!(props.len(), 1);
//! ```

use super::core_properties::parse_datetime;
use crate::ooxml::bind::{Deserializable, Element, QName, RootName, XmlBinding};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, namespace as ns};
use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed GUID format ID for custom properties as per OOXML specification.
///
/// All custom properties must use this format ID.
pub const FORMAT_ID: &str = "{D5CDD505-2E9C-101B-9397-08002B2CF9AE}";

/// Conventional location of the custom properties part.
pub const CUSTOM_PROPERTIES_PARTNAME: &str = "/docProps/custom.xml";

/// PIDs 0 and 1 are reserved.
const FIRST_PID: i32 = 2;

/// A custom document property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// String value (lpwstr in OOXML)
    String(String),
    /// 32-bit signed integer (i4 in OOXML)
    Integer(i32),
    /// 64-bit signed integer (i8 in OOXML)
    Long(i64),
    /// 32-bit floating point (r4 in OOXML)
    Float(f32),
    /// 64-bit floating point (r8 in OOXML)
    Double(f64),
    /// Boolean value (bool in OOXML)
    Boolean(bool),
    /// DateTime value (filetime in OOXML)
    DateTime(DateTime<Utc>),
}

impl PropertyValue {
    /// Get the OOXML element name for this property type.
    fn element_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "lpwstr",
            PropertyValue::Integer(_) => "i4",
            PropertyValue::Long(_) => "i8",
            PropertyValue::Float(_) => "r4",
            PropertyValue::Double(_) => "r8",
            PropertyValue::Boolean(_) => "bool",
            PropertyValue::DateTime(_) => "filetime",
        }
    }

    /// Convert the value to its string representation for XML.
    fn to_xml_string(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Long(l) => l.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::Double(d) => d.to_string(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    /// Parse a property value from XML text content.
    fn from_xml_string(element: &str, text: &str) -> Result<Self> {
        let invalid = |e: &dyn std::fmt::Display| {
            OoxmlError::Deserialization(format!("Invalid {} value '{}': {}", element, text, e))
        };

        match element {
            "lpwstr" | "lpstr" | "bstr" => Ok(PropertyValue::String(text.to_string())),
            "i4" | "int" => text.trim().parse().map(PropertyValue::Integer).map_err(|e| invalid(&e)),
            "i8" => text.trim().parse().map(PropertyValue::Long).map_err(|e| invalid(&e)),
            "r4" => text.trim().parse().map(PropertyValue::Float).map_err(|e| invalid(&e)),
            "r8" => text.trim().parse().map(PropertyValue::Double).map_err(|e| invalid(&e)),
            "bool" => match text.trim().to_lowercase().as_str() {
                "true" | "1" => Ok(PropertyValue::Boolean(true)),
                "false" | "0" => Ok(PropertyValue::Boolean(false)),
                _ => Err(invalid(&"expected true, false, 1 or 0")),
            },
            "filetime" | "date" => parse_datetime(text).map(PropertyValue::DateTime),
            _ => Err(OoxmlError::Deserialization(format!(
                "Unsupported property type: vt:{}",
                element
            ))),
        }
    }
}

/// A single custom property with name, value, and internal ID.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomProperty {
    pub name: String,
    pub value: PropertyValue,
    /// Property ID (pid attribute)
    pub pid: i32,
    /// Format ID (fmtid attribute)
    pub fmtid: String,
}

/// Collection of custom document properties, kept in PID order.
#[derive(Debug, Clone)]
pub struct CustomProperties {
    properties: Vec<CustomProperty>,
    /// Next available property ID
    next_pid: i32,
}

impl Default for CustomProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CustomProperties {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
    }
}

impl CustomProperties {
    /// Create a new empty custom properties collection.
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            next_pid: FIRST_PID,
        }
    }

    /// The next PID in sequence; once `i32::MAX` is reached, the lowest
    /// unused PID instead.
    fn allocate_pid(&mut self) -> i32 {
        if let Some(next) = self.next_pid.checked_add(1) {
            let pid = self.next_pid;
            self.next_pid = next;
            return pid;
        }
        (FIRST_PID..=i32::MAX)
            .find(|pid| self.properties.iter().all(|p| p.pid != *pid))
            .unwrap_or(i32::MAX)
    }

    /// Add a new custom property.
    ///
    /// If a property with the same name already exists, its value is
    /// replaced, its PID kept, and the old value returned.
    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        let name = name.into();

        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == name) {
            return Some(std::mem::replace(&mut existing.value, value));
        }

        let pid = self.allocate_pid();
        self.properties.push(CustomProperty {
            name,
            value,
            pid,
            fmtid: FORMAT_ID.to_string(),
        });
        None
    }

    /// Set a property value (alias for `add_property`).
    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        self.add_property(name, value)
    }

    /// Get a property value by name.
    pub fn get_property(&self, name: &str) -> Option<&PropertyValue> {
        self.get(name).map(|p| &p.value)
    }

    /// Get the full property entry by name.
    pub fn get(&self, name: &str) -> Option<&CustomProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Remove a property by name, returning its value.
    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        let index = self.properties.iter().position(|p| p.name == name)?;
        Some(self.properties.remove(index).value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|p| (p.name.as_str(), &p.value))
    }

    /// Clear all custom properties.
    pub fn clear(&mut self) {
        self.properties.clear();
        self.next_pid = FIRST_PID;
    }
}

impl XmlBinding for CustomProperties {
    fn root_name() -> Option<RootName> {
        Some(RootName::new(ns::OFC_CUSTOM_PROPERTIES, "Properties"))
    }

    fn content_type() -> &'static str {
        ct::OFC_CUSTOM_PROPERTIES
    }

    fn to_element(&self) -> Result<Element> {
        let mut root = Element::new(QName::ns(ns::OFC_CUSTOM_PROPERTIES, "Properties"));

        for prop in &self.properties {
            if prop.name.is_empty() {
                return Err(OoxmlError::Serialization(format!(
                    "custom property with pid {} has no name",
                    prop.pid
                )));
            }
            let value = Element::new(QName::ns(ns::OFC_DOC_PROPS_VTYPES, prop.value.element_name()))
                .with_text(prop.value.to_xml_string());

            root.push_child(
                Element::new(QName::ns(ns::OFC_CUSTOM_PROPERTIES, "property"))
                    .with_attribute(QName::local("fmtid"), prop.fmtid.as_str())
                    .with_attribute(QName::local("pid"), prop.pid.to_string())
                    .with_attribute(QName::local("name"), prop.name.as_str())
                    .with_child(value),
            );
        }

        Ok(root)
    }

    fn from_element(element: &Element) -> Result<Self> {
        let mut props = CustomProperties::new();
        let mut max_pid = FIRST_PID - 1;

        for property in element.child_elements() {
            if !property.name.is(Some(ns::OFC_CUSTOM_PROPERTIES), "property") {
                tracing::debug!(element = %property.name, "skipping unknown element in custom properties");
                continue;
            }

            let name = property.attribute(None, "name").ok_or_else(|| {
                OoxmlError::Deserialization("custom property without a name".to_string())
            })?;
            let pid = property
                .attribute(None, "pid")
                .ok_or_else(|| {
                    OoxmlError::Deserialization(format!("custom property '{}' has no pid", name))
                })?
                .trim()
                .parse::<i32>()
                .map_err(|e| {
                    OoxmlError::Deserialization(format!("Invalid pid for '{}': {}", name, e))
                })?;
            let fmtid = property.attribute(None, "fmtid").unwrap_or(FORMAT_ID);

            let value_element = property
                .child_elements()
                .find(|el| el.name.namespace.as_deref() == Some(ns::OFC_DOC_PROPS_VTYPES))
                .ok_or_else(|| {
                    OoxmlError::Deserialization(format!("custom property '{}' has no value", name))
                })?;
            let value = PropertyValue::from_xml_string(&value_element.name.local, &value_element.text())?;

            max_pid = max_pid.max(pid);
            props.properties.push(CustomProperty {
                name: name.to_string(),
                value,
                pid,
                fmtid: fmtid.to_string(),
            });
        }

        props.properties.sort_by_key(|p| p.pid);
        props.next_pid = max_pid.saturating_add(1);
        Ok(props)
    }
}

impl Deserializable for CustomProperties {}
