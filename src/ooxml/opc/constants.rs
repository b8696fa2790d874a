/// Constant values related to the Open Packaging Convention.
///
/// This module contains content type URIs (like MIME-types) that specify a part's format
/// and the XML namespaces used by the parts this crate binds.

/// Content type URIs (like MIME-types) that specify a part's format
pub mod content_type {
    // Office common content types
    pub const OFC_CUSTOM_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.custom-properties+xml";
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";
    pub const OFC_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

    // OPC core content types
    pub const OPC_CORE_PROPERTIES: &str =
        "application/vnd.openxmlformats-package.core-properties+xml";
    pub const OPC_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

    // WordprocessingML content types
    pub const WML_DOCUMENT_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    pub const WML_STYLES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
    pub const WML_SETTINGS: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";

    // Generic XML
    pub const XML: &str = "application/xml";

    /// Image content type, used as an example of a non-XML part.
    pub const PNG: &str = "image/png";
}

/// XML namespace URIs used in OOXML parts
pub mod namespace {
    /// The `xml:` namespace, bound by definition and never declared
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

    /// The namespace of `xmlns` declarations themselves
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

    /// XML Schema instance namespace
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

    /// Core properties namespace
    pub const OPC_CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";

    /// Dublin Core elements
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";

    /// Dublin Core terms
    pub const DC_TERMS: &str = "http://purl.org/dc/terms/";

    /// Dublin Core DCMI types
    pub const DCMI_TYPE: &str = "http://purl.org/dc/dcmitype/";

    /// Custom properties namespace
    pub const OFC_CUSTOM_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/custom-properties";

    /// Extended (application) properties namespace
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";

    /// Variant types used by custom and extended properties
    pub const OFC_DOC_PROPS_VTYPES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

    /// Office relationships namespace
    pub const OFC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// OPC relationships namespace
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";

    /// OPC content types namespace
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";

    /// Markup compatibility namespace
    pub const MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

    /// Office math namespace
    pub const OFC_MATH: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";

    /// DrawingML main namespace
    pub const DML_MAIN: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

    /// DrawingML picture namespace
    pub const DML_PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

    /// DrawingML wordprocessing drawing namespace
    pub const DML_WORDPROCESSING_DRAWING: &str =
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";

    /// WordprocessingML main namespace
    pub const WML_MAIN: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    /// Word 2010 extensions
    pub const W14: &str = "http://schemas.microsoft.com/office/word/2010/wordml";

    /// SpreadsheetML main namespace
    pub const SML_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    /// PresentationML main namespace
    pub const PML_MAIN: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

    /// VML namespace
    pub const VML: &str = "urn:schemas-microsoft-com:vml";

    /// Office VML extensions
    pub const VML_OFFICE: &str = "urn:schemas-microsoft-com:office:office";
}
