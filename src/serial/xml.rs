//! XML writer.
//!
//! Serializes a subtree of an [`XmlTree`] back into XML text. Namespace
//! declarations are written before attributes, and both keep their stored
//! order. An end-of-input wrapper contributes only its children, wherever it
//! sits in the tree.

use crate::tree::{NodeId, Token, XmlTree};

/// Options controlling writer output.
///
/// # Examples
///
/// ```
/// use xmlnode::reader::FragmentReader;
/// use xmlnode::serial::{write_node, WriteOptions};
///
/// let (tree, root) = FragmentReader::new().read("<notes><p>Hello</p></notes>").unwrap();
/// let xml = write_node(&tree, root, &WriteOptions::default().indent(true));
/// assert!(xml.contains("  <p>"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Whether to indent element-only content. Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl WriteOptions {
    /// Enables or disables indented output.
    ///
    /// Only elements whose children are all elements (or whitespace-only
    /// text) are broken across lines; mixed content is written as is.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }
}

/// Serializes the subtree rooted at `id`.
///
/// Text is escaped; use [`XmlTree::to_xml_string`] to get a bare text
/// node's characters verbatim.
#[must_use]
pub fn write_node(tree: &XmlTree, id: NodeId, options: &WriteOptions) -> String {
    let mut out = String::new();
    if tree.token(id).is_eof() {
        write_children(tree, id, &mut out, options, 0, options.indent && is_element_only(tree, id));
    } else {
        write_one(tree, id, &mut out, options, 0, false);
    }
    out
}

/// Returns the children of `id` with every end-of-input wrapper replaced by
/// its own children.
fn content_of(tree: &XmlTree, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = tree.children(id).rev().collect();
    while let Some(child) = stack.pop() {
        if tree.token(child).is_eof() {
            stack.extend(tree.children(child).rev());
        } else {
            out.push(child);
        }
    }
    out
}

/// Returns `true` if the node has element children and every text child is
/// whitespace, meaning it is safe to add indentation.
fn is_element_only(tree: &XmlTree, id: NodeId) -> bool {
    let mut has_element_child = false;
    for child in content_of(tree, id) {
        let token = tree.token(child);
        if token.is_text() {
            if !token.characters().trim().is_empty() {
                return false;
            }
        } else {
            has_element_child = true;
        }
    }
    has_element_child
}

fn push_indent(out: &mut String, options: &WriteOptions, depth: usize) {
    for _ in 0..depth {
        out.push_str(&options.indent_str);
    }
}

fn write_one(
    tree: &XmlTree,
    id: NodeId,
    out: &mut String,
    options: &WriteOptions,
    depth: usize,
    parent_is_element_only: bool,
) {
    let token = tree.token(id);
    if token.is_text() {
        write_escaped_text(out, token.characters());
        return;
    }

    let pretty = options.indent && parent_is_element_only;
    if pretty {
        push_indent(out, options, depth);
    }
    out.push('<');
    write_start_tag_body(out, token);

    if content_of(tree, id).is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        let element_only = options.indent && is_element_only(tree, id);
        write_children(tree, id, out, options, depth + 1, element_only);
        if element_only {
            push_indent(out, options, depth);
        }
        out.push_str("</");
        out.push_str(&token.qname().prefixed_name());
        out.push('>');
    }
    if pretty {
        out.push('\n');
    }
}

fn write_children(
    tree: &XmlTree,
    id: NodeId,
    out: &mut String,
    options: &WriteOptions,
    depth: usize,
    element_only: bool,
) {
    if element_only && depth > 0 {
        out.push('\n');
    }
    for child in content_of(tree, id) {
        if element_only && tree.token(child).is_text() {
            continue;
        }
        write_one(tree, child, out, options, depth, element_only);
    }
}

fn write_start_tag_body(out: &mut String, token: &Token) {
    out.push_str(&token.qname().prefixed_name());
    for (prefix, uri) in token.namespaces().iter() {
        out.push_str(" xmlns");
        if !prefix.is_empty() {
            out.push(':');
            out.push_str(prefix);
        }
        out.push_str("=\"");
        write_escaped_attr(out, uri);
        out.push('"');
    }
    for (qname, value) in token.attributes().iter() {
        out.push(' ');
        out.push_str(&qname.prefixed_name());
        out.push_str("=\"");
        write_escaped_attr(out, value);
        out.push('"');
    }
}

/// Writes a hexadecimal character reference (`&#xHH;`) for a Unicode code point.
fn write_hex_char_ref(out: &mut String, ch: char) {
    use std::fmt::Write;
    let _ = write!(out, "&#x{:X};", ch as u32);
}

/// Escapes character data.
///
/// `<`, `>` and `&` use named references, `\r` becomes `&#13;`, and other
/// control characters below 0x20 (except tab and newline) are hex-encoded.
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '\t' | '\n' => out.push(ch),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

/// Escapes an attribute value for a double-quoted attribute.
///
/// Whitespace other than space is written as a character reference so it
/// survives attribute-value normalization on the way back in.
fn write_escaped_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::Discard;
    use crate::util::qname::QualifiedName;

    fn element(tree: &mut XmlTree, name: &str) -> NodeId {
        tree.create_node(Token::start(QualifiedName::local(name)))
    }

    #[test]
    fn test_write_empty_element() {
        let mut tree = XmlTree::new();
        let root = tree.create_element(QualifiedName::local("root"));
        assert_eq!(write_node(&tree, root, &WriteOptions::default()), "<root/>");
    }

    #[test]
    fn test_write_element_with_text() {
        let mut tree = XmlTree::new();
        let p = element(&mut tree, "p");
        let text = tree.create_text("Hello");
        tree.add_child(p, text).unwrap();
        assert_eq!(write_node(&tree, p, &WriteOptions::default()), "<p>Hello</p>");
    }

    #[test]
    fn test_namespaces_before_attributes_in_stored_order() {
        let mut tree = XmlTree::new();
        let mut token = Token::start(QualifiedName::new("p", "urn:x", "x"));
        let _ = token.add_attr("b", "2", &mut Discard);
        let _ = token.add_attr_ns("a", "1", "urn:x", "x", &mut Discard);
        let _ = token.add_namespace("urn:x", "x", &mut Discard);
        let _ = token.add_namespace("http://www.w3.org/1999/xhtml", "", &mut Discard);
        let p = tree.create_node(token);

        assert_eq!(
            write_node(&tree, p, &WriteOptions::default()),
            r#"<x:p xmlns:x="urn:x" xmlns="http://www.w3.org/1999/xhtml" b="2" x:a="1"/>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        let mut tree = XmlTree::new();
        let p = element(&mut tree, "p");
        let text = tree.create_text("a < b & c > d");
        tree.add_child(p, text).unwrap();
        assert_eq!(
            write_node(&tree, p, &WriteOptions::default()),
            "<p>a &lt; b &amp; c &gt; d</p>"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let mut tree = XmlTree::new();
        let p = element(&mut tree, "p");
        let _ = tree.update(p, |t, s| t.add_attr("title", "say \"hi\" & <go>\n", s));
        assert_eq!(
            write_node(&tree, p, &WriteOptions::default()),
            r#"<p title="say &quot;hi&quot; &amp; &lt;go&gt;&#10;"/>"#
        );
    }

    #[test]
    fn test_eof_root_writes_only_children() {
        let mut tree = XmlTree::new();
        let root = tree.create_node(Token::end_of_input());
        let a = tree.create_element(QualifiedName::local("a"));
        let b = tree.create_element(QualifiedName::local("b"));
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        assert_eq!(write_node(&tree, root, &WriteOptions::default()), "<a/><b/>");
    }

    #[test]
    fn test_indent_element_only_content() {
        let mut tree = XmlTree::new();
        let root = element(&mut tree, "root");
        let child = element(&mut tree, "child");
        let text = tree.create_text("Hi");
        let leaf = tree.create_element(QualifiedName::local("leaf"));
        tree.add_child(root, child).unwrap();
        tree.add_child(child, text).unwrap();
        tree.add_child(root, leaf).unwrap();

        let xml = write_node(&tree, root, &WriteOptions::default().indent(true));
        assert_eq!(xml, "<root>\n  <child>Hi</child>\n  <leaf/>\n</root>");
    }

    #[test]
    fn test_indent_custom_string() {
        let mut tree = XmlTree::new();
        let root = element(&mut tree, "root");
        let child = tree.create_element(QualifiedName::local("child"));
        tree.add_child(root, child).unwrap();
        let options = WriteOptions::default().indent(true).indent_str("\t");
        assert_eq!(write_node(&tree, root, &options), "<root>\n\t<child/>\n</root>");
    }

    #[test]
    fn test_mixed_content_is_not_indented() {
        let mut tree = XmlTree::new();
        let p = element(&mut tree, "p");
        let t = tree.create_text("a");
        let b = tree.create_element(QualifiedName::local("b"));
        tree.add_child(p, t).unwrap();
        tree.add_child(p, b).unwrap();
        let xml = write_node(&tree, p, &WriteOptions::default().indent(true));
        assert_eq!(xml, "<p>a<b/></p>");
    }

    #[test]
    fn test_write_text_node_is_escaped() {
        let mut tree = XmlTree::new();
        let t = tree.create_text("1 < 2");
        assert_eq!(write_node(&tree, t, &WriteOptions::default()), "1 &lt; 2");
    }

    #[test]
    fn test_nested_eof_wrapper_writes_only_children() {
        let mut tree = XmlTree::new();
        let notes = element(&mut tree, "notes");
        let wrapper = tree.create_node(Token::end_of_input());
        let a = tree.create_element(QualifiedName::local("a"));
        let b = tree.create_element(QualifiedName::local("b"));
        tree.add_child(wrapper, a).unwrap();
        tree.add_child(wrapper, b).unwrap();
        tree.add_child(notes, wrapper).unwrap();

        assert_eq!(
            write_node(&tree, notes, &WriteOptions::default()),
            "<notes><a/><b/></notes>"
        );
        assert_eq!(
            write_node(&tree, notes, &WriteOptions::default().indent(true)),
            "<notes>\n  <a/>\n  <b/>\n</notes>"
        );
    }

    #[test]
    fn test_empty_nested_wrapper_leaves_element_self_closing() {
        let mut tree = XmlTree::new();
        let p = element(&mut tree, "p");
        let wrapper = tree.create_node(Token::end_of_input());
        tree.add_child(p, wrapper).unwrap();
        assert_eq!(write_node(&tree, p, &WriteOptions::default()), "<p/>");
    }
}
