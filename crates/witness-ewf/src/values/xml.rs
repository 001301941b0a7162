//! Lenient line-oriented XML used by the xheader and xhash sections
//!
//! The on-disk documents are machine-generated, one `<tag>value</tag>` per
//! line. The scanner deliberately tolerates malformed lines by skipping
//! them, and accepts tags it does not recognize.

/// The UTF-8 byte order mark the XML sections are prefixed with
pub(crate) const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

pub(crate) const XML_HEAD: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Decodes section bytes to text, dropping a leading UTF-8 byte order mark
pub(crate) fn decode_document(data: &[u8]) -> String {
    let data = match data.strip_prefix(&UTF8_BOM) {
        Some(stripped) => stripped,
        None => data,
    };
    String::from_utf8_lossy(data).into_owned()
}

/// Scans a document line by line for `<tag>value</tag>` pairs.
///
/// A line yields a pair when it holds an open tag and, reached by reverse
/// scan from the first `>`, a close tag with content in between. Anything
/// else (the XML declaration, the enclosing element, blank lines) is
/// skipped.
pub(crate) fn scan_tags(document: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in document.split('\n') {
        let Some(open_start) = line.find('<') else {
            continue;
        };
        let Some(open_end) = line.find('>') else {
            continue;
        };
        if open_end < open_start {
            continue;
        }
        let identifier = &line[open_start + 1..open_end];
        if identifier.is_empty() || identifier.starts_with('?') || identifier.starts_with('/') {
            continue;
        }
        let remainder = &line[open_end + 1..];
        if remainder.len() <= 1 {
            continue;
        }
        let Some(close_start) = remainder.rfind('<') else {
            continue;
        };
        if remainder.rfind('>').is_none() {
            continue;
        }
        pairs.push((identifier, &remainder[..close_start]));
    }
    pairs
}

/// Assembles a `<root>` document from `(tag, value)` lines, with the
/// byte order mark, declaration and trailing empty line the sections carry
pub(crate) fn generate_document<'a>(
    root: &str,
    entries: impl Iterator<Item = (String, &'a str)>,
) -> Vec<u8> {
    let mut document = String::new();
    document.push_str(XML_HEAD);
    document.push('\n');
    document.push('<');
    document.push_str(root);
    document.push_str(">\n");

    for (tag, value) in entries {
        document.push('\t');
        document.push('<');
        document.push_str(&tag);
        document.push('>');
        document.push_str(value);
        document.push_str("</");
        document.push_str(&tag);
        document.push_str(">\n");
    }
    document.push_str("</");
    document.push_str(root);
    document.push_str(">\n\n");

    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + document.len());
    bytes.extend_from_slice(&UTF8_BOM);
    bytes.extend_from_slice(document.as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_tags_skips_scaffolding() {
        let document = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xhash>\n\
                        \t<md5>d41d8cd98f00b204e9800998ecf8427e</md5>\n</xhash>\n\n";

        let pairs = scan_tags(document);
        assert_eq!(pairs, vec![("md5", "d41d8cd98f00b204e9800998ecf8427e")]);
    }

    #[test]
    fn test_scan_tags_skips_malformed_lines() {
        let document = "no tags here\n<unclosed\nvalue>\n<empty></empty>\n<ok>yes</ok>\n";
        let pairs = scan_tags(document);
        assert_eq!(pairs, vec![("ok", "yes")]);
    }

    #[test]
    fn test_scan_tags_accepts_unknown_identifiers() {
        let pairs = scan_tags("\t<custom_field>anything at all</custom_field>\n");
        assert_eq!(pairs, vec![("custom_field", "anything at all")]);
    }

    #[test]
    fn test_decode_document_strips_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"<a>b</a>");
        assert_eq!(decode_document(&data), "<a>b</a>");
        assert_eq!(decode_document(b"<a>b</a>"), "<a>b</a>");
    }

    #[test]
    fn test_generate_scan_roundtrip() {
        let document = generate_document(
            "xheader",
            [("case_number".to_string(), "2026-113")].into_iter(),
        );
        assert!(document.starts_with(&UTF8_BOM));

        let text = decode_document(&document);
        assert_eq!(scan_tags(&text), vec![("case_number", "2026-113")]);
    }
}
