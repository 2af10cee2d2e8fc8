//! Best-effort field extraction from namespace-aware XML.
//!
//! Every function here reports parse failures as `None`. Malformed
//! documents, unknown entities, mismatched or unclosed tags and empty buffers
//! all count as failures. Document metadata is advisory, so a bad part must
//! never abort the inspection that asked for it.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

/// Dublin Core elements namespace, used by `docProps/core.xml`.
pub const DUBLIN_CORE_NS: &str = "http://purl.org/dc/elements/1.1/";

/// How an element is selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagMatch<'a> {
    /// Resolved namespace URI plus local name.
    Namespaced { namespace: &'a str, local: &'a str },
    /// Literal tag name as written, prefix included (e.g. `dc:creator`).
    Qualified(&'a str),
    /// Local name in any namespace (or none).
    Local(&'a str),
}

impl TagMatch<'_> {
    fn matches(&self, ns: &ResolveResult<'_>, qname: &[u8], local: &[u8]) -> bool {
        match *self {
            TagMatch::Namespaced { namespace, local: want } => {
                matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == namespace.as_bytes())
                    && local == want.as_bytes()
            }
            TagMatch::Qualified(name) => qname == name.as_bytes(),
            TagMatch::Local(want) => local == want.as_bytes(),
        }
    }
}

/// Parse the whole document and return the text content of every matching
/// element, in document order.
///
/// Text content is the concatenation of all descendant text and CDATA, so
/// nested matches each see their own subtree.
fn collect_matches(xml: &[u8], tag: TagMatch<'_>) -> Option<Vec<String>> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();

    let mut found: Vec<String> = Vec::new();
    // One slot per open element: index into `found` when that element matched.
    let mut open: Vec<Option<usize>> = Vec::new();
    let mut seen_root = false;

    loop {
        let (ns, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok(resolved) => resolved,
            Err(e) => {
                log::debug!("XML error: {}", e);
                return None;
            }
        };

        match event {
            Event::Start(e) => {
                if open.is_empty() && seen_root {
                    // A second root element.
                    return None;
                }
                seen_root = true;
                let slot = if tag.matches(&ns, e.name().as_ref(), e.local_name().as_ref()) {
                    found.push(String::new());
                    Some(found.len() - 1)
                } else {
                    None
                };
                open.push(slot);
            }
            Event::Empty(e) => {
                if open.is_empty() && seen_root {
                    return None;
                }
                seen_root = true;
                if tag.matches(&ns, e.name().as_ref(), e.local_name().as_ref()) {
                    found.push(String::new());
                }
            }
            Event::Text(t) => {
                // Unescape even outside a match so bad entities fail the document.
                let text = t.unescape().ok()?;
                if open.is_empty() && !is_xml_whitespace(&text) {
                    // Character data before or after the root element.
                    return None;
                }
                for idx in open.iter().flatten() {
                    found[*idx].push_str(&text);
                }
            }
            Event::CData(c) => {
                if open.is_empty() {
                    return None;
                }
                if open.iter().any(Option::is_some) {
                    let text = std::str::from_utf8(&c).ok()?;
                    for idx in open.iter().flatten() {
                        found[*idx].push_str(text);
                    }
                }
            }
            Event::End(_) => {
                open.pop()?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root || !open.is_empty() {
        return None;
    }
    Some(found)
}

fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Text content of the first element matching `tag`.
pub fn element_text(xml: &[u8], tag: TagMatch<'_>) -> Option<String> {
    collect_matches(xml, tag)?.into_iter().next()
}

/// Try each lookup in order and return the first one that finds an element.
///
/// Used for producers that do not declare namespaces consistently: a
/// namespaced lookup first, then a literal prefixed name.
pub fn first_element_text(xml: &[u8], tags: &[TagMatch<'_>]) -> Option<String> {
    tags.iter().find_map(|tag| element_text(xml, *tag))
}

/// First matching element's trimmed text, parsed as an unsigned integer.
pub fn element_u32(xml: &[u8], tag: TagMatch<'_>) -> Option<u32> {
    let text = element_text(xml, tag)?;
    match text.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::debug!("non-numeric value {:?} for {:?}", text, tag);
            None
        }
    }
}

/// Number of elements matching `tag` anywhere in the document.
pub fn count_elements(xml: &[u8], tag: TagMatch<'_>) -> Option<usize> {
    collect_matches(xml, tag).map(|found| found.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Quarterly &amp; Annual</dc:title>
  <dc:creator>Jane Roe</dc:creator>
  <cp:lastModifiedBy>John Doe</cp:lastModifiedBy>
</cp:coreProperties>"#;

    const CREATOR: TagMatch<'static> = TagMatch::Namespaced {
        namespace: DUBLIN_CORE_NS,
        local: "creator",
    };

    #[test]
    fn test_namespaced_lookup() {
        assert_eq!(element_text(CORE_XML.as_bytes(), CREATOR), Some("Jane Roe".to_string()));
    }

    #[test]
    fn test_namespaced_lookup_ignores_prefix_spelling() {
        let xml = r#"<props xmlns:x="http://purl.org/dc/elements/1.1/"><x:creator>Alias</x:creator></props>"#;
        assert_eq!(element_text(xml.as_bytes(), CREATOR), Some("Alias".to_string()));
        assert_eq!(element_text(xml.as_bytes(), TagMatch::Qualified("dc:creator")), None);
    }

    #[test]
    fn test_fallback_for_wrong_namespace_uri() {
        // Trailing slash missing from the namespace URI.
        let xml = r#"<cp:coreProperties xmlns:cp="urn:cp" xmlns:dc="http://purl.org/dc/elements/1.1"><dc:creator>Legacy</dc:creator></cp:coreProperties>"#;
        assert_eq!(element_text(xml.as_bytes(), CREATOR), None);
        assert_eq!(
            first_element_text(xml.as_bytes(), &[CREATOR, TagMatch::Qualified("dc:creator")]),
            Some("Legacy".to_string())
        );
    }

    #[test]
    fn test_fallback_for_undeclared_prefix() {
        let xml = r#"<coreProperties><dc:creator>Nobody Declared</dc:creator></coreProperties>"#;
        assert_eq!(
            first_element_text(xml.as_bytes(), &[CREATOR, TagMatch::Qualified("dc:creator")]),
            Some("Nobody Declared".to_string())
        );
    }

    #[test]
    fn test_text_is_unescaped() {
        let title = TagMatch::Namespaced { namespace: DUBLIN_CORE_NS, local: "title" };
        assert_eq!(
            element_text(CORE_XML.as_bytes(), title),
            Some("Quarterly & Annual".to_string())
        );
    }

    #[test]
    fn test_local_lookup_in_default_namespace() {
        let xml = r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Pages> 12 </Pages><Words>3400</Words></Properties>"#;
        assert_eq!(element_u32(xml.as_bytes(), TagMatch::Local("Pages")), Some(12));
        assert_eq!(element_u32(xml.as_bytes(), TagMatch::Local("Words")), Some(3400));
        assert_eq!(element_u32(xml.as_bytes(), TagMatch::Local("Lines")), None);
    }

    #[test]
    fn test_non_numeric_integer_field() {
        let xml = r#"<Properties><Pages>twelve</Pages></Properties>"#;
        assert_eq!(element_u32(xml.as_bytes(), TagMatch::Local("Pages")), None);
        let xml = r#"<Properties><Pages>-3</Pages></Properties>"#;
        assert_eq!(element_u32(xml.as_bytes(), TagMatch::Local("Pages")), None);
    }

    #[test]
    fn test_text_content_spans_children_and_cdata() {
        let xml = r#"<root><name>a<b>b</b><![CDATA[<c>]]></name></root>"#;
        assert_eq!(element_text(xml.as_bytes(), TagMatch::Local("name")), Some("ab<c>".to_string()));
    }

    #[test]
    fn test_empty_element_has_empty_text() {
        let xml = r#"<root><creator/></root>"#;
        assert_eq!(element_text(xml.as_bytes(), TagMatch::Local("creator")), Some(String::new()));
    }

    #[test]
    fn test_count_elements_namespace_agnostic() {
        let xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="urn:r">
<sheets><sheet name="A" sheetId="1" r:id="rId1"/><sheet name="B" sheetId="2" r:id="rId2"/></sheets>
<x:sheet xmlns:x="urn:other"></x:sheet>
</workbook>"#;
        assert_eq!(count_elements(xml.as_bytes(), TagMatch::Local("sheet")), Some(3));
        assert_eq!(count_elements(xml.as_bytes(), TagMatch::Local("sheets")), Some(1));
        assert_eq!(count_elements(xml.as_bytes(), TagMatch::Local("definedName")), Some(0));
    }

    #[test]
    fn test_malformed_documents_are_not_found() {
        let cases: &[&[u8]] = &[
            b"",
            b"   ",
            b"<workbook><sheets><sheet/></sheets>",
            b"<workbook><sheets></workbook>",
            b"<a/><b/>",
            b"<root><creator>&bogus;</creator></root>",
        ];
        for xml in cases {
            assert_eq!(count_elements(xml, TagMatch::Local("sheet")), None, "{:?}", xml);
            assert_eq!(element_text(xml, TagMatch::Local("creator")), None, "{:?}", xml);
        }
    }

    #[test]
    fn test_text_outside_root_is_malformed() {
        let trailing = br#"<cp:coreProperties xmlns:cp="urn:cp" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>Ann</dc:creator></cp:coreProperties>junk"#;
        assert_eq!(element_text(trailing, CREATOR), None);

        let leading = b"junk<root><creator>Ann</creator></root>";
        assert_eq!(element_text(leading, TagMatch::Local("creator")), None);

        let cdata_after = b"<root><creator>Ann</creator></root><![CDATA[x]]>";
        assert_eq!(element_text(cdata_after, TagMatch::Local("creator")), None);

        let whitespace = b"\n<root><creator>Ann</creator></root>\r\n\t ";
        assert_eq!(
            element_text(whitespace, TagMatch::Local("creator")),
            Some("Ann".to_string())
        );
    }

    #[test]
    fn test_match_before_error_is_still_not_found() {
        let xml = b"<root><creator>Early</creator><broken></root>";
        assert_eq!(element_text(xml, TagMatch::Local("creator")), None);
    }
}
