/// Provides the PackURI value type and utilities for working with package URIs.
///
/// A PackURI represents a part name within an OPC package, following the URI format
/// defined by the Open Packaging Conventions specification.
use crate::ooxml::opc::error::{OpcError, Result};

/// Represents a package URI, which is a partname within an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path separators,
/// following the OPC specification. They provide access to various components like
/// the base URI (directory), filename, extension, and index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/word/document.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI naming a part.
    ///
    /// The name must satisfy the OPC part name grammar: it begins with a slash,
    /// has no empty segments, no segment ends with a dot, and it contains no
    /// encoded or literal backslashes, query or fragment components.
    ///
    /// # Arguments
    /// * `uri` - The URI string, which must begin with a forward slash
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        Self::validate(&uri)?;
        Ok(PackURI { uri })
    }

    /// The package pseudo-partname "/", which names the package itself.
    pub fn package() -> Self {
        PackURI {
            uri: PACKAGE_URI.to_string(),
        }
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// This translates a relative reference (like "../styles.xml") onto a base URI
    /// (like "/word") to produce an absolute PackURI (like "/styles.xml").
    ///
    /// # Arguments
    /// * `base_uri` - The base URI to resolve from
    /// * `relative_ref` - The relative reference to resolve
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = Self::join_paths(base_uri, relative_ref);
        let normalized = Self::normalize_path(&joined);
        Self::new(normalized)
    }

    fn validate(uri: &str) -> Result<()> {
        let invalid = |reason: &str| Err(OpcError::InvalidPackUri(format!("'{}': {}", uri, reason)));

        if uri.is_empty() {
            return invalid("part name is empty");
        }
        if !uri.starts_with('/') {
            return invalid("part name must begin with slash");
        }
        if uri == PACKAGE_URI {
            return invalid("the package name is not a part name");
        }
        if uri.ends_with('/') {
            return invalid("part name must not end with slash");
        }
        if let Some(c) = uri.chars().find(|c| matches!(c, '\\' | '?' | '#')) {
            return invalid(&format!("character '{}' is not allowed", c));
        }

        let lower = uri.to_ascii_lowercase();
        if lower.contains("%2f") || lower.contains("%5c") {
            return invalid("percent-encoded slash or backslash");
        }

        for segment in uri[1..].split('/') {
            if segment.is_empty() {
                return invalid("empty segment");
            }
            if segment.ends_with('.') {
                return invalid("segment must not end with a dot");
            }
        }

        Ok(())
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For example, "slide1.xml" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns an empty string.
    pub fn filename(&self) -> &str {
        if let Some(pos) = self.uri.rfind('/') {
            &self.uri[pos + 1..]
        } else {
            ""
        }
    }

    /// Get the extension portion of this PackURI, without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        if let Some(pos) = filename.rfind('.') {
            &filename[pos + 1..]
        } else {
            ""
        }
    }

    /// Get the partname index for tuple partnames, or None for singleton partnames.
    ///
    /// For example, returns 21 for "/ppt/slides/slide21.xml" and None for "/ppt/presentation.xml".
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let name_part = match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        };

        let stem = name_part.trim_end_matches(|c: char| c.is_ascii_digit());
        if stem.is_empty() || stem.len() == name_part.len() {
            return None;
        }
        name_part[stem.len()..].parse::<u32>().ok()
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the Zip file membername for the package item.
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Get the relative reference from a base URI to this PackURI.
    ///
    /// For example, PackURI("/ppt/slideLayouts/slideLayout1.xml") would return
    /// "../slideLayouts/slideLayout1.xml" for base_uri "/ppt/slides".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut result = "../".repeat(from_parts.len() - common);
        result.push_str(&to_parts[common..].join("/"));
        result
    }

    /// Get the PackURI of the .rels part corresponding to this PackURI.
    ///
    /// For example, "/word/_rels/document.xml.rels" for "/word/document.xml"
    /// and "/_rels/.rels" for the package itself.
    pub fn rels_uri(&self) -> Result<PackURI> {
        let rels_filename = format!("{}.rels", self.filename());
        let base_uri = self.base_uri();
        if base_uri == "/" {
            Self::new(format!("/_rels/{}", rels_filename))
        } else {
            Self::new(format!("{}/_rels/{}", base_uri, rels_filename))
        }
    }

    /// Get the full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Resolve "." and ".." segments; the result always starts with a slash.
    fn normalize_path(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();

        for part in path.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    parts.pop();
                },
                _ => parts.push(part),
            }
        }

        format!("/{}", parts.join("/"))
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

impl std::str::FromStr for PackURI {
    type Err = OpcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PackURI {
    type Error = OpcError;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/word/document.xml").is_ok());
        assert!(PackURI::new("/[Content_Types].xml").is_ok());
        assert!(PackURI::new("word/document.xml").is_err());
    }

    #[test]
    fn test_invalid_part_names() {
        for bad in [
            "",
            "/",
            "/word/",
            "/word//document.xml",
            "/word/./document.xml",
            "/word/../document.xml",
            "/word/document.",
            "/word\\document.xml",
            "/word/document.xml?x=1",
            "/word/document.xml#frag",
            "/word%2Fdocument.xml",
            "/word%5cdocument.xml",
        ] {
            let err = PackURI::new(bad).unwrap_err();
            assert!(matches!(err, OpcError::InvalidPackUri(_)), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_package_uri() {
        let pkg = PackURI::package();
        assert_eq!(pkg.as_str(), "/");
        assert_eq!(pkg.base_uri(), "/");
        assert_eq!(pkg.filename(), "");
        assert_eq!(pkg.membername(), "");
        assert_eq!(pkg.rels_uri().unwrap().as_str(), "/_rels/.rels");
    }

    #[test]
    fn test_base_uri() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");

        let top = PackURI::new("/document.xml").unwrap();
        assert_eq!(top.base_uri(), "/");
    }

    #[test]
    fn test_filename_and_ext() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");
    }

    #[test]
    fn test_idx() {
        let uri = PackURI::new("/ppt/slides/slide21.xml").unwrap();
        assert_eq!(uri.idx(), Some(21));

        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(uri.idx(), None);
    }

    #[test]
    fn test_membername() {
        let uri = PackURI::new("/word/document.xml").unwrap();
        assert_eq!(uri.membername(), "word/document.xml");
    }

    #[test]
    fn test_rels_uri() {
        let uri = PackURI::new("/word/document.xml").unwrap();
        assert_eq!(uri.rels_uri().unwrap().as_str(), "/word/_rels/document.xml.rels");
    }

    #[test]
    fn test_relative_ref_and_back() {
        let uri = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        let rel = uri.relative_ref("/ppt/slides");
        assert_eq!(rel, "../slideLayouts/slideLayout1.xml");

        let resolved = PackURI::from_rel_ref("/ppt/slides", &rel).unwrap();
        assert_eq!(resolved, uri);
    }

    #[test]
    fn test_parse() {
        let uri: PackURI = "/docProps/core.xml".parse().unwrap();
        assert_eq!(uri.to_string(), "/docProps/core.xml");
        assert!(PackURI::try_from("docProps/core.xml").is_err());
    }
}
