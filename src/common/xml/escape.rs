use aho_corasick::AhoCorasick;
use memchr::memchr;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use thiserror::Error;

// Static initialization: automaton is built only once, thread-safe
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});

/// An entity or character reference that cannot be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolvable reference '&{0};'")]
pub struct UnresolvedReference(pub String);

/// Escape XML special characters.
///
/// # Examples
///
/// ```
/// use ooxml_bind::common::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("<tag>\"hello\"</tag>"), "&lt;tag&gt;&quot;hello&quot;&lt;/tag&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Resolve the name of a reference (the text between `&` and `;`).
///
/// Handles the five predefined entities and decimal or hexadecimal
/// character references. No DTD-declared entities exist in OOXML parts.
pub fn resolve_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value).filter(|c| *c != '\0')
        },
    }
}

/// Unescape entity and character references.
///
/// Borrows the input when it contains no references. Unknown entities and
/// references missing their terminating semicolon are errors.
///
/// # Examples
///
/// ```
/// use ooxml_bind::common::xml::unescape_xml;
/// assert_eq!(unescape_xml("&lt;a &amp; b&gt;").unwrap(), "<a & b>");
/// assert_eq!(unescape_xml("&#65;&#x42;").unwrap(), "AB");
/// assert!(unescape_xml("&invalid;").is_err());
/// ```
pub fn unescape_xml(s: &str) -> Result<Cow<'_, str>, UnresolvedReference> {
    let bytes = s.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return Ok(Cow::Borrowed(s));
    };

    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut pos = first;

    while pos < s.len() {
        let Some(amp) = memchr(b'&', &bytes[pos..]) else {
            out.push_str(&s[pos..]);
            break;
        };
        out.push_str(&s[pos..pos + amp]);
        let start = pos + amp + 1;
        let end = memchr(b';', &bytes[start..])
            .map(|offset| start + offset)
            .ok_or_else(|| UnresolvedReference(s[start..].to_string()))?;
        let name = &s[start..end];
        out.push(resolve_reference(name).ok_or_else(|| UnresolvedReference(name.to_string()))?);
        pos = end + 1;
    }

    Ok(Cow::Owned(out))
}
