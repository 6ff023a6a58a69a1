//! Namespace-agnostic helpers over [`roxmltree`].
//!
//! Package documents mix default, `dc:` and `opf:` namespaces freely (and
//! not always correctly), so everything here matches on local names only.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use roxmltree::{Document, Node, ParsingOptions};

pub(crate) fn parse<'input>(entry: &str, text: &'input str) -> Result<Document<'input>> {
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    Document::parse_with_options(text, options).or_raise(|| ErrorKind::MalformedXml(entry.to_string()))
}

pub(crate) fn is_element(node: &Node<'_, '_>, local_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == local_name
}

/// Attribute value by local name, whatever its namespace prefix.
pub(crate) fn attribute<'a>(node: &Node<'a, '_>, local_name: &str) -> Option<&'a str> {
    node.attributes().find(|a| a.name() == local_name).map(|a| a.value())
}

/// All text beneath a node, trimmed. `None` when there is nothing but whitespace.
pub(crate) fn text(node: &Node<'_, '_>) -> Option<String> {
    let text = node.descendants().filter(Node::is_text).filter_map(|n| n.text()).collect::<String>();
    let text = text.trim();
    match text.is_empty() {
        true => None,
        false => Some(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_names() {
        let doc = parse(
            "test",
            r#"<package xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
                <dc:date opf:event="publication">2001</dc:date>
            </package>"#,
        )
        .unwrap();
        let date = doc.descendants().find(|n| is_element(n, "date")).unwrap();
        assert_eq!(attribute(&date, "event"), Some("publication"));
        assert_eq!(text(&date).as_deref(), Some("2001"));
    }

    #[test]
    fn test_text_collects_nested_and_trims() {
        let doc = parse("test", "<a>  one <b>two</b>  </a>").unwrap();
        assert_eq!(text(&doc.root_element()).as_deref(), Some("one two"));
        let doc = parse("test", "<a>   </a>").unwrap();
        assert_eq!(text(&doc.root_element()), None);
    }

    #[test]
    fn test_malformed() {
        assert!(parse("broken.opf", "<package><title></package>").is_err());
    }
}
