//! Byte Order Mark (BOM) utilities shared across modules.
//!
//! Provides detection and decoding helpers for the Unicode encodings an XML
//! part may arrive in. Parts are always written back as UTF-8.

use std::borrow::Cow;
use thiserror::Error;

/// Supported BOM encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomKind {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl BomKind {
    /// Returns the byte representation of the BOM.
    #[inline]
    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            BomKind::Utf8 => &UTF8_BOM,
            BomKind::Utf16Le => &UTF16_LE_BOM,
            BomKind::Utf16Be => &UTF16_BE_BOM,
            BomKind::Utf32Le => &UTF32_LE_BOM,
            BomKind::Utf32Be => &UTF32_BE_BOM,
        }
    }

    /// Returns the length in bytes of the BOM.
    #[inline]
    #[allow(clippy::len_without_is_empty)] // No need to check for empty BOMs
    pub const fn len(&self) -> usize {
        self.as_bytes().len()
    }
}

/// UTF-8 BOM bytes.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
/// UTF-16 little-endian BOM bytes.
pub const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-16 big-endian BOM bytes.
pub const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
/// UTF-32 little-endian BOM bytes.
pub const UTF32_LE_BOM: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
/// UTF-32 big-endian BOM bytes.
pub const UTF32_BE_BOM: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];

/// Errors raised while turning raw part bytes into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unsupported encoding: {0:?}")]
    Unsupported(BomKind),

    #[error("invalid {encoding} data")]
    Malformed { encoding: &'static str },
}

/// Detects the BOM at the start of `bytes`, if any.
///
/// UTF-32 marks are checked before UTF-16 ones since the UTF-32 LE mark
/// begins with the UTF-16 LE mark.
pub fn detect_bom(bytes: &[u8]) -> Option<BomKind> {
    [
        BomKind::Utf32Be,
        BomKind::Utf32Le,
        BomKind::Utf8,
        BomKind::Utf16Be,
        BomKind::Utf16Le,
    ]
    .into_iter()
    .find(|kind| bytes.starts_with(kind.as_bytes()))
}

/// Decodes XML bytes into UTF-8 text, consuming any BOM.
///
/// Input without a BOM is taken to be UTF-8. UTF-16 input is transcoded;
/// UTF-32 is rejected.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<Cow<'_, str>, EncodingError> {
    match detect_bom(bytes) {
        None => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|_| EncodingError::Malformed { encoding: "UTF-8" }),
        Some(BomKind::Utf8) => std::str::from_utf8(&bytes[UTF8_BOM.len()..])
            .map(Cow::Borrowed)
            .map_err(|_| EncodingError::Malformed { encoding: "UTF-8" }),
        Some(kind @ (BomKind::Utf16Le | BomKind::Utf16Be)) => {
            let encoding = if kind == BomKind::Utf16Le {
                encoding_rs::UTF_16LE
            } else {
                encoding_rs::UTF_16BE
            };
            let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[kind.len()..]);
            if had_errors {
                return Err(EncodingError::Malformed {
                    encoding: encoding.name(),
                });
            }
            Ok(Cow::Owned(text.into_owned()))
        },
        Some(kind) => Err(EncodingError::Unsupported(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bom() {
        assert_eq!(detect_bom(b"\xEF\xBB\xBF<a/>"), Some(BomKind::Utf8));
        assert_eq!(detect_bom(&[0xFF, 0xFE, b'<', 0]), Some(BomKind::Utf16Le));
        assert_eq!(detect_bom(&[0xFF, 0xFE, 0, 0]), Some(BomKind::Utf32Le));
        assert_eq!(detect_bom(b"<a/>"), None);
    }

    #[test]
    fn test_decode_utf16() {
        let mut bytes = UTF16_BE_BOM.to_vec();
        for unit in "<a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_to_utf8(&bytes).unwrap(), "<a/>");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_to_utf8(&[0xC3, 0x28]).is_err());
        assert_eq!(
            decode_to_utf8(&UTF32_BE_BOM),
            Err(EncodingError::Unsupported(BomKind::Utf32Be))
        );
    }
}
