//! The binding context: immutable factory for marshallers and unmarshallers.

use super::config::BindingConfig;
use super::marshal::Marshaller;
use super::namespace::{NamespacePrefixMapper, OverridePrefixMapper, StandardPrefixMapper};
use super::unmarshal::Unmarshaller;
use crate::ooxml::error::Result;
use once_cell::sync::Lazy;
use std::sync::Arc;

static STANDARD_CONTEXT: Lazy<Arc<BindingContext>> =
    Lazy::new(|| Arc::new(BindingContext::from_valid_config(BindingConfig::default())));

/// Shared, read-only binding settings.
///
/// A context is built once, typically when the application starts, and
/// handed to parts through an `Arc`. Every marshal or unmarshal call gets its
/// own `Marshaller` or `Unmarshaller`, so a context can serve any number of
/// threads at once.
#[derive(Debug)]
pub struct BindingContext {
    config: BindingConfig,
    prefix_mapper: Arc<dyn NamespacePrefixMapper>,
}

impl BindingContext {
    /// Build a context from a configuration.
    pub fn new(config: BindingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: BindingConfig) -> Self {
        let standard: Arc<dyn NamespacePrefixMapper> = Arc::new(StandardPrefixMapper);
        let prefix_mapper: Arc<dyn NamespacePrefixMapper> = if config.prefixes.is_empty() {
            standard
        } else {
            Arc::new(OverridePrefixMapper::new(config.prefixes.clone(), standard))
        };
        Self {
            config,
            prefix_mapper,
        }
    }

    /// Replace the default prefix mapper handed to new marshallers.
    pub fn with_prefix_mapper(mut self, mapper: Arc<dyn NamespacePrefixMapper>) -> Self {
        self.prefix_mapper = mapper;
        self
    }

    /// The shared context with default settings.
    ///
    /// It is immutable, so sharing it carries no hidden state between users.
    pub fn standard() -> Arc<BindingContext> {
        Arc::clone(&STANDARD_CONTEXT)
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// The prefix mapper marshallers start out with.
    pub fn default_prefix_mapper(&self) -> Arc<dyn NamespacePrefixMapper> {
        Arc::clone(&self.prefix_mapper)
    }

    /// A one-shot marshaller.
    pub fn create_marshaller(&self) -> Marshaller {
        Marshaller::new(self.config.clone(), self.default_prefix_mapper())
    }

    /// A one-shot unmarshaller.
    pub fn create_unmarshaller(&self) -> Unmarshaller {
        Unmarshaller::new(self.config.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::bind::tree::{Element, QName};
    use crate::ooxml::opc::constants::namespace as ns;

    #[test]
    fn test_standard_is_shared() {
        let a = BindingContext::standard();
        let b = BindingContext::standard();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.config(), &BindingConfig::default());
    }

    #[test]
    fn test_config_prefixes_layer_over_standard() {
        let mut config = BindingConfig::default();
        config.prefixes.insert(ns::WML_MAIN.to_string(), "word".to_string());
        let ctx = BindingContext::new(config).unwrap();
        let mapper = ctx.default_prefix_mapper();
        assert_eq!(mapper.preferred_prefix(ns::WML_MAIN, None).as_deref(), Some("word"));
        assert_eq!(mapper.preferred_prefix(ns::DC, None).as_deref(), Some("dc"));
    }

    #[test]
    fn test_with_prefix_mapper_reaches_marshallers() {
        #[derive(Debug)]
        struct Word;
        impl NamespacePrefixMapper for Word {
            fn preferred_prefix(&self, namespace_uri: &str, _suggestion: Option<&str>) -> Option<String> {
                (namespace_uri == ns::WML_MAIN).then(|| "word".to_string())
            }

            fn predeclared_uris(&self) -> Vec<String> {
                vec![ns::OFC_RELATIONSHIPS.to_string()]
            }
        }

        let ctx = BindingContext::new(BindingConfig::default())
            .unwrap()
            .with_prefix_mapper(Arc::new(Word));
        let body = Element::new(QName::ns(ns::WML_MAIN, "body"));
        let xml = String::from_utf8(ctx.create_marshaller().marshal_to_vec(&body).unwrap()).unwrap();
        assert!(xml.contains(r#"<word:body xmlns:word="#));
        assert!(xml.contains(r#"xmlns:ns0="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#));

        // the shared standard context is unaffected
        let standard = BindingContext::standard().create_marshaller().marshal_to_vec(&body).unwrap();
        assert!(String::from_utf8(standard).unwrap().contains("<w:body"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BindingConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(BindingContext::new(config).is_err());
    }

    #[test]
    fn test_context_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BindingContext>();
    }
}
