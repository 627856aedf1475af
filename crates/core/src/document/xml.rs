//! Minimal XML element tree
//!
//! Built on the streaming `quick_xml` reader. Mixed content is flattened:
//! the text of an element is the concatenation of its direct text nodes.

use std::io::Cursor;

use ledgerbridge_domain::{RestError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), text: String::new(), children: Vec::new() }
    }

    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event().map_err(decode_error)? {
                Event::Start(start) => {
                    stack.push(Self::from_start(&start)?);
                }
                Event::Empty(start) => {
                    let node = Self::from_start(&start)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| RestError::Decode("unbalanced closing tag".into()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(decode_error)?;
                    // Indentation between elements; values keep their padding.
                    if value.trim().is_empty() {
                        continue;
                    }
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&value);
                    }
                }
                Event::CData(data) => {
                    let value = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|e| RestError::Decode(format!("invalid UTF-8 in CDATA: {e}")))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&value);
                    }
                }
                Event::Eof => break,
                // declarations, comments, processing instructions, doctypes
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(RestError::Decode(format!("unclosed element <{}>", stack[0].name)));
        }
        root.ok_or_else(|| RestError::Decode("document has no root element".into()))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8(start.name().as_ref().to_vec())
            .map_err(|e| RestError::Decode(format!("invalid element name: {e}")))?;
        let mut node = Self::new(name);

        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|e| RestError::Decode(format!("malformed attribute: {e}")))?;
            let key = String::from_utf8(attribute.key.as_ref().to_vec())
                .map_err(|e| RestError::Decode(format!("invalid attribute name: {e}")))?;
            let value = attribute.unescape_value().map_err(decode_error)?.into_owned();
            node.attributes.push((key, value));
        }

        Ok(node)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => {
                *existing = value.into();
                true
            }
            None => false,
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlNode> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Serialize the element (and its subtree) without an XML declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write(&mut writer)?;
        bytes_to_string(writer.into_inner().into_inner())
    }

    /// Serialize as a standalone document with a UTF-8 declaration.
    pub fn to_document_string(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(encode_error)?;
        self.write(&mut writer)?;
        bytes_to_string(writer.into_inner().into_inner())
    }

    fn write(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_empty() && self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(encode_error);
        }

        writer.write_event(Event::Start(start)).map_err(encode_error)?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text))).map_err(encode_error)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str()))).map_err(encode_error)
    }
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(RestError::Decode("document has more than one root element".into())),
    }
}

fn decode_error(err: quick_xml::Error) -> RestError {
    RestError::Decode(format!("xml parse: {err}"))
}

fn encode_error(err: quick_xml::Error) -> RestError {
    RestError::Decode(format!("xml write: {err}"))
}

fn bytes_to_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| RestError::Decode(format!("invalid UTF-8 output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elements_attributes_and_text() {
        let node = XmlNode::parse(
            r#"<?xml version="1.0"?>
            <client uri="https://acme.blinksale.com/clients/42">
              <name>Acme &amp; Co</name>
              <people uri="https://acme.blinksale.com/clients/42/people"/>
            </client>"#,
        )
        .unwrap();

        assert_eq!(node.name, "client");
        assert_eq!(node.attribute("uri"), Some("https://acme.blinksale.com/clients/42"));
        assert_eq!(node.child("name").unwrap().text, "Acme & Co");
        assert!(node.child("people").unwrap().children.is_empty());
    }

    #[test]
    fn keeps_padding_inside_values() {
        let node = XmlNode::parse(
            "<client>\n  <name>  Acme  </name>\n  <notes>\n  </notes>\n</client>",
        )
        .unwrap();

        assert!(node.text.is_empty());
        assert_eq!(node.child("name").unwrap().text, "  Acme  ");
        assert!(node.child("notes").unwrap().text.is_empty());
        assert_eq!(
            node.to_xml_string().unwrap(),
            "<client><name>  Acme  </name><notes/></client>"
        );
    }

    #[test]
    fn reads_cdata_as_text() {
        let node = XmlNode::parse("<notes><![CDATA[<b>net 30</b>]]></notes>").unwrap();
        assert_eq!(node.text, "<b>net 30</b>");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(XmlNode::parse("<a><b></a>"), Err(RestError::Decode(_))));
        assert!(matches!(XmlNode::parse("<a>"), Err(RestError::Decode(_))));
        assert!(matches!(XmlNode::parse(""), Err(RestError::Decode(_))));
        assert!(matches!(XmlNode::parse("<a/><b/>"), Err(RestError::Decode(_))));
    }

    #[test]
    fn serialized_form_reparses_to_same_tree() {
        let source = r#"<invoice status="open"><number>1001</number><lines><line><name>Work</name></line></lines><notes/></invoice>"#;
        let node = XmlNode::parse(source).unwrap();
        let reparsed = XmlNode::parse(&node.to_xml_string().unwrap()).unwrap();

        assert_eq!(node, reparsed);
    }

    #[test]
    fn escapes_text_on_write() {
        let mut node = XmlNode::new("name");
        node.text = "Fish & Chips <Ltd>".into();

        let xml = node.to_document_string().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("Fish &amp; Chips &lt;Ltd&gt;"));
        assert_eq!(XmlNode::parse(&xml).unwrap().text, "Fish & Chips <Ltd>");
    }

    #[test]
    fn set_attribute_only_updates_existing() {
        let mut node = XmlNode::parse(r#"<person id="1"/>"#).unwrap();
        assert!(node.set_attribute("id", "2"));
        assert!(!node.set_attribute("missing", "x"));
        assert_eq!(node.attribute("id"), Some("2"));
    }
}
