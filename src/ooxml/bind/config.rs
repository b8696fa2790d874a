//! Binding configuration.
//!
//! A `BindingConfig` is plain data: it can be built in code, or loaded from
//! YAML when an application wants output settings outside its binary.
//!
//! ```yaml
//! indent: 2
//! standalone: true
//! failure_policy: log_and_swallow
//! prefixes:
//!   "http://schemas.openxmlformats.org/wordprocessingml/2006/main": word
//! ```

use crate::ooxml::error::{OoxmlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What a part does when writing its content tree fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFailurePolicy {
    /// Return the `Serialization` error to the caller.
    #[default]
    Propagate,
    /// Log the error and report success; the sink may hold no output.
    ///
    /// For callers that expect serialize to never fail.
    LogAndSwallow,
}

/// Settings shared by every marshaller and unmarshaller of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// Indentation width for pretty-printed output; compact when `None`.
    pub indent: Option<usize>,
    /// Emit an XML declaration before the root element.
    pub xml_declaration: bool,
    /// Mark the declaration `standalone="yes"`.
    pub standalone: bool,
    /// Default failure policy for parts using this context.
    pub failure_policy: SerializationFailurePolicy,
    /// Deepest element nesting accepted when unmarshalling.
    pub max_depth: usize,
    /// Namespace URI to prefix overrides, applied over the standard table.
    pub prefixes: BTreeMap<String, String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            indent: None,
            xml_declaration: true,
            standalone: true,
            failure_policy: SerializationFailurePolicy::Propagate,
            max_depth: 256,
            prefixes: BTreeMap::new(),
        }
    }
}

impl BindingConfig {
    /// Parse a configuration from YAML text. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_saphyr::from_str(yaml)
            .map_err(|e| OoxmlError::Config(format!("Invalid binding configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| OoxmlError::Config(format!("Failed to serialize configuration: {}", e)))
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(OoxmlError::Config("max_depth must be at least 1".to_string()));
        }
        for (uri, prefix) in &self.prefixes {
            if uri.is_empty() {
                return Err(OoxmlError::Config(
                    "prefix override for an empty namespace URI".to_string(),
                ));
            }
            if !prefix.is_empty() && !super::namespace::is_declarable_prefix(prefix) {
                return Err(OoxmlError::Config(format!(
                    "'{}' is not a valid prefix for {}",
                    prefix, uri
                )));
            }
        }
        Ok(())
    }
}
