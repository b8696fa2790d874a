//! XML data binding for OOXML parts.
//!
//! The binding layer has four pieces:
//!
//! 1. **Element tree** (`tree`): namespace-qualified nodes, also used as the
//!    destination of tree serialization
//! 2. **Context** (`context`, `config`): immutable settings shared through
//!    an `Arc`, producing one-shot marshallers and unmarshallers
//! 3. **Marshaller / Unmarshaller** (`marshal`, `unmarshal`): XML writing
//!    and parsing with `quick-xml`
//! 4. **Bindings** (`binding`): traits that convert typed content trees
//!    to and from element trees
//!
//! Prefix selection is pluggable through `NamespacePrefixMapper`.

pub mod binding;
pub mod config;
pub mod context;
pub mod marshal;
pub mod namespace;
pub mod tree;
pub mod unmarshal;

pub use binding::{Deserializable, RootName, XmlBinding};
pub use config::{BindingConfig, SerializationFailurePolicy};
pub use context::BindingContext;
pub use marshal::Marshaller;
pub use namespace::{NamespacePrefixMapper, OverridePrefixMapper, StandardPrefixMapper};
pub use tree::{Attribute, Document, DocumentFragment, Element, NamespaceDecl, Node, QName, TreeSink};
pub use unmarshal::Unmarshaller;
