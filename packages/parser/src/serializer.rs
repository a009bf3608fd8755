use crate::ast::{Document, NodeId};
use quick_xml::escape::escape;
use std::fmt::Write;

/// Serializer converts the element arena back to XML
///
/// Only attached elements are written. Attribute order is preserved, text
/// content is written before child elements, whitespace is normalized.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(), // 2 spaces
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a Document to XML source
    pub fn serialize(&mut self, doc: &Document) -> String {
        let mut output = String::new();
        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.serialize_element(doc, doc.root(), &mut output);
        output
    }

    /// Serialize a single subtree without the XML declaration
    pub fn serialize_subtree(&mut self, doc: &Document, id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_element(doc, id, &mut output);
        output
    }

    fn serialize_element(&mut self, doc: &Document, id: NodeId, output: &mut String) {
        let element = doc.element(id);
        self.write_indent(output);
        let _ = write!(output, "<{}", element.tag);
        for (name, value) in &element.attributes {
            let _ = write!(output, " {}=\"{}\"", name, escape(value.as_str()));
        }

        let text = element.text.as_deref().filter(|t| !t.is_empty());
        match (text, element.children.is_empty()) {
            (None, true) => output.push_str("/>\n"),
            (Some(text), true) => {
                let _ = writeln!(output, ">{}</{}>", escape(text), element.tag);
            }
            (text, false) => {
                output.push_str(">\n");
                self.indent_level += 1;
                if let Some(text) = text {
                    self.write_indent(output);
                    output.push_str(&escape(text));
                    output.push('\n');
                }
                for child in &element.children {
                    self.serialize_element(doc, *child, output);
                }
                self.indent_level -= 1;
                self.write_indent(output);
                let _ = writeln!(output, "</{}>", element.tag);
            }
        }
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

/// Convenience function to serialize a document
pub fn serialize(doc: &Document) -> String {
    Serializer::new().serialize(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_serialize_round_trip() {
        let source = r#"<SCL version="2007" revision="B">
            <Header id="x"/>
            <IED name="IED1">
                <AccessPoint name="P1"><Server/></AccessPoint>
            </IED>
        </SCL>"#;

        let doc = parse(source).unwrap();
        let first = serialize(&doc);
        let reparsed = parse(&first).unwrap();
        assert_eq!(serialize(&reparsed), first);
        assert!(first.contains(r#"<IED name="IED1">"#));
        assert!(first.contains("<Server/>"));
    }

    #[test]
    fn test_serialize_escapes() {
        let doc = parse(r#"<SCL><Text desc="a &quot;b&quot;">x &lt; y</Text></SCL>"#).unwrap();
        let output = serialize(&doc);
        assert!(output.contains(r#"desc="a &quot;b&quot;""#));
        assert!(output.contains("x &lt; y"));
    }

    #[test]
    fn test_serialize_skips_detached() {
        let mut doc = parse(r#"<SCL><IED name="A"/><IED name="B"/></SCL>"#).unwrap();
        let first = doc.children(doc.root())[0];
        doc.detach(first).unwrap();
        let output = serialize(&doc);
        assert!(!output.contains(r#"name="A""#));
        assert!(output.contains(r#"name="B""#));
    }

    #[test]
    fn test_custom_indent() {
        let doc = parse("<SCL><Header/></SCL>").unwrap();
        let output = Serializer::with_indent("\t").serialize(&doc);
        assert!(output.contains("\n\t<Header/>"));
    }
}
