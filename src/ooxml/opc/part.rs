/// Open Packaging Convention (OPC) objects related to package parts.
use crate::ooxml::opc::packuri::PackURI;

/// Trait representing a part in an OPC package.
///
/// Parts are the fundamental units of content in an OPC package. Each part
/// has a unique partname (PackURI) and a content type.
pub trait Part {
    /// Get the partname of this part.
    fn partname(&self) -> &PackURI;

    /// Get the content type of this part.
    fn content_type(&self) -> &str;
}

/// Check if a content type represents XML content.
#[inline]
pub fn is_xml_content_type(content_type: &str) -> bool {
    content_type.ends_with("+xml") || content_type.ends_with("/xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_xml_content_type() {
        assert!(is_xml_content_type("application/xml"));
        assert!(is_xml_content_type(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"
        ));
        assert!(!is_xml_content_type("image/png"));
    }
}
