//! XML text helpers shared by the binding layer.

mod escape;

pub use escape::{UnresolvedReference, escape_xml, resolve_reference, unescape_xml};
