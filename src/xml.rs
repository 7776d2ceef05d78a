//! Minimal XML element tree shared by the SVG and KML renderers.

use std::fmt::Display;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Display) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Sets an attribute, replacing an earlier value in place.
    pub fn set_attr(&mut self, name: &str, value: impl Display) {
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.push(node);
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn text(self, text: impl Display) -> Self {
        self.child(Node::Text(text.to_string()))
    }

    /// Element with a single text child.
    pub fn with_text(name: &str, text: impl Display) -> Self {
        Self::new(name).text(text)
    }

    fn write(&self, out: &mut String, depth: usize, indent: &str) {
        let pad = indent.repeat(depth);
        out.push_str(&pad);
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
        }
        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');
        let inline = self
            .children
            .iter()
            .any(|child| matches!(child, Node::Text(_) | Node::CData(_)));
        if inline {
            for child in &self.children {
                child.write_inline(out);
            }
        } else {
            out.push('\n');
            for child in &self.children {
                child.write(out, depth + 1, indent);
            }
            out.push_str(&pad);
        }
        out.push_str(&format!("</{}>\n", self.name));
    }

    fn write_inline(&self, out: &mut String) {
        let mut buffer = String::new();
        self.write(&mut buffer, 0, "");
        out.push_str(buffer.trim_end_matches('\n'));
    }
}

impl Node {
    fn write(&self, out: &mut String, depth: usize, indent: &str) {
        match self {
            Node::Element(element) => element.write(out, depth, indent),
            other => {
                out.push_str(&indent.repeat(depth));
                other.write_inline(out);
                out.push('\n');
            }
        }
    }

    fn write_inline(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_inline(out),
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::CData(data) => {
                out.push_str("<![CDATA[");
                out.push_str(&data.replace("]]>", "]]]]><![CDATA[>"));
                out.push_str("]]>");
            }
            Node::Comment(comment) => {
                out.push_str("<!-- ");
                out.push_str(&comment.replace("--", "- -"));
                out.push_str(" -->");
            }
        }
    }
}

/// A complete XML document: declaration, optional doctype, root element and
/// trailing comments.
#[derive(Debug, Clone)]
pub struct Document {
    doctype: Option<String>,
    root: Element,
    trailing: Vec<Node>,
    indent: &'static str,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            doctype: None,
            root,
            trailing: Vec::new(),
            indent: "  ",
        }
    }

    pub fn with_doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = Some(doctype.into());
        self
    }

    pub fn push_trailing(&mut self, node: Node) {
        self.trailing.push(node);
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        out.push_str(XML_DECLARATION);
        out.push('\n');
        if let Some(doctype) = &self.doctype {
            out.push_str(doctype);
            out.push('\n');
        }
        self.root.write(&mut out, 0, self.indent);
        for node in &self.trailing {
            node.write(&mut out, 0, self.indent);
        }
        out
    }
}

pub fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Attribute escaping; single quotes are left alone so inline scripts stay readable.
pub fn escape_attr(input: &str) -> String {
    escape_text(input).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_nested_elements_with_indentation() {
        let root = Element::new("Document")
            .child(Element::with_text("name", "Kaart & co"))
            .child(Element::new("Folder").child(Element::new("empty").attr("id", 1)));
        let xml = Document::new(root).to_xml_string();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Document>\n  <name>Kaart &amp; co</name>\n  <Folder>\n    <empty id=\"1\"/>\n  </Folder>\n</Document>\n"
        );
    }

    #[test]
    fn attributes_keep_single_quotes_and_order() {
        let mut element = Element::new("path").attr("id", "a").attr("d", "M 0 0");
        element.set_attr("onclick", "alert('\"x\"');");
        element.set_attr("id", "b");
        let mut out = String::new();
        element.write_inline(&mut out);
        assert_eq!(
            out,
            "<path id=\"b\" d=\"M 0 0\" onclick=\"alert('&quot;x&quot;');\"/>"
        );
    }

    #[test]
    fn cdata_and_trailing_comments() {
        let root = Element::new("description").child(Node::CData("<p>a]]>b</p>".to_string()));
        let mut document = Document::new(root).with_doctype("<!DOCTYPE x>");
        document.push_trailing(Node::Comment("CBS -- Kadaster".to_string()));
        let xml = document.to_xml_string();
        assert!(xml.contains("<!DOCTYPE x>\n<description><![CDATA[<p>a]]]]><![CDATA[>b</p>]]></description>\n"));
        assert!(xml.ends_with("<!-- CBS - - Kadaster -->\n"));
    }
}
