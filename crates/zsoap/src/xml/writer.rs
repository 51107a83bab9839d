//! XML serialization
//!
//! Elements are always written with an explicit closing tag; some SOAP
//! servers reject self-closed request elements.

use super::model::{Element, Node};

/// XML declaration written ahead of a serialized document
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

impl Element {
    /// Serialize this element (no XML declaration)
    pub fn to_xml_string(&self) -> String {
        let mut output = String::new();
        write_element(self, &mut output);
        output
    }

    /// Serialize as a complete document with XML declaration
    pub fn to_document_string(&self) -> String {
        let mut output = String::from(XML_DECLARATION);
        write_element(self, &mut output);
        output
    }

    /// Serialized document bytes, ready for a transport
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_document_string().into_bytes()
    }
}

fn write_element(element: &Element, output: &mut String) {
    let tag = element.tag();
    output.push('<');
    output.push_str(&tag);

    for (key, value) in element.attributes() {
        output.push(' ');
        output.push_str(key);
        output.push_str("=\"");
        push_escaped(output, value, true);
        output.push('"');
    }
    output.push('>');

    for child in element.nodes() {
        match child {
            Node::Element(child) => write_element(child, output),
            Node::Text(text) => push_escaped(output, text, false),
        }
    }

    output.push_str("</");
    output.push_str(&tag);
    output.push('>');
}

fn push_escaped(output: &mut String, input: &str, attribute: bool) {
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            _ => output.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_childless_element_is_not_self_closed() {
        let e = Element::new("ChildlessRequest");
        assert_eq!(e.to_xml_string(), "<ChildlessRequest></ChildlessRequest>");
    }

    #[test]
    fn test_declarations_written_where_introduced() {
        let mut security = Element::new("qmw:Security");
        security.set_attribute("xmlns:qmw", "http://questionmark.com/QMWISe/");
        security.append_child("qmw:ClientID").set_text("NAME");

        assert_eq!(
            security.to_xml_string(),
            "<qmw:Security xmlns:qmw=\"http://questionmark.com/QMWISe/\">\
             <qmw:ClientID>NAME</qmw:ClientID></qmw:Security>"
        );
    }

    #[test]
    fn test_escaping() {
        let mut e = Element::new("a");
        e.set_attribute("q", "say \"hi\" & <go>");
        e.set_text("1 < 2 & \"3\"");
        assert_eq!(
            e.to_xml_string(),
            "<a q=\"say &quot;hi&quot; &amp; &lt;go&gt;\">1 &lt; 2 &amp; \"3\"</a>"
        );
    }

    #[test]
    fn test_reparse_of_serialized_tree() -> Result<()> {
        let input = "<r xmlns=\"urn:x\"><a k=\"v\">t &amp; u</a><b></b><a>2</a></r>";
        let tree = Element::parse(input)?;
        assert_eq!(tree.to_xml_string(), input);
        assert_eq!(Element::parse(&tree.to_xml_string())?, tree);
        Ok(())
    }

    #[test]
    fn test_document_bytes_have_declaration() {
        let bytes = Element::new("x").to_bytes();
        assert!(bytes.starts_with(XML_DECLARATION.as_bytes()));
        assert!(bytes.ends_with(b"<x></x>"));
    }
}
