//! Fragment reader.
//!
//! Turns an XML fragment into nodes of an [`XmlTree`]. A fragment is any
//! sequence of elements and text, not necessarily a well-formed document with
//! a single root.
//!
//! When the fragment is exactly one element and its local name is one of the
//! configured root names, that element is returned as is. Otherwise the
//! reader creates a synthetic wrapper root flagged end-of-input and attaches
//! every top-level node under it; callers tell the two apart with
//! [`Token::is_eof`].
//!
//! The reader resolves the five built-in entities and character references,
//! turns CDATA sections into text, and skips comments, processing
//! instructions and a leading XML declaration. Elements written as `<a/>`
//! or `<a></a>` come back flagged as closed.

mod input;

use tracing::debug;

use crate::error::{ParseError, SourceLocation};
use crate::tree::{AttributeSet, NamespaceSet, NodeId, Token, XmlTree};
use crate::util::qname::{split_qname, QualifiedName};

use input::{FragmentInput, NamespaceResolver};

/// Default maximum element nesting depth.
const DEFAULT_MAX_DEPTH: u32 = 256;

/// Root element names returned without a wrapper by default.
const DEFAULT_ROOT_NAMES: [&str; 5] = ["notes", "message", "annotation", "html", "body"];

/// Options controlling the fragment reader.
///
/// ```
/// use xmlnode::reader::ReaderOptions;
///
/// let opts = ReaderOptions::default()
///     .keep_whitespace(false)
///     .max_depth(64)
///     .root_name("listOfNotes");
/// assert!(opts.root_names.iter().any(|n| n == "listOfNotes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// If false, whitespace-only text inside elements is dropped (default: true).
    pub keep_whitespace: bool,
    /// Local names of single top-level elements that are returned unwrapped.
    pub root_names: Vec<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            keep_whitespace: true,
            root_names: DEFAULT_ROOT_NAMES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl ReaderOptions {
    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Keeps or drops whitespace-only text inside elements.
    #[must_use]
    pub fn keep_whitespace(mut self, keep: bool) -> Self {
        self.keep_whitespace = keep;
        self
    }

    /// Adds a name to the set of unwrapped root names.
    #[must_use]
    pub fn root_name(mut self, name: &str) -> Self {
        self.root_names.push(name.to_string());
        self
    }

    /// Replaces the set of unwrapped root names.
    #[must_use]
    pub fn root_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// A reusable fragment reader.
///
/// The reader holds only its options and can be reused for any number of
/// fragments. Each call builds its own input cursor and namespace scope.
///
/// # Examples
///
/// ```
/// use xmlnode::reader::FragmentReader;
///
/// let reader = FragmentReader::new();
///
/// let (tree, root) = reader.read("<a/><b/>").unwrap();
/// assert!(tree.token(root).is_eof());
/// assert_eq!(tree.child_count(root), 2);
///
/// let (tree, root) = reader.read("<notes><p>x</p></notes>").unwrap();
/// assert!(!tree.token(root).is_eof());
/// assert_eq!(tree.token(root).name(), "notes");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FragmentReader {
    options: ReaderOptions,
}

impl FragmentReader {
    /// Creates a reader with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader with the given options.
    #[must_use]
    pub fn with_options(options: ReaderOptions) -> Self {
        Self { options }
    }

    /// The reader's options.
    #[must_use]
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Reads `text` into a fresh tree and returns the tree and the root.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the fragment is not well-formed.
    pub fn read(&self, text: &str) -> Result<(XmlTree, NodeId), ParseError> {
        let mut tree = XmlTree::new();
        let root = self.read_into(&mut tree, text)?;
        Ok((tree, root))
    }

    /// Reads `text` into `tree` and returns the new, detached root.
    ///
    /// Attaching the nodes emits the usual structural events to the tree's
    /// listener, if one is installed.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the fragment is not well-formed. Nodes
    /// created before the error stay in the arena, unattached.
    pub fn read_into(&self, tree: &mut XmlTree, text: &str) -> Result<NodeId, ParseError> {
        self.read_with_namespaces(tree, text, &NamespaceSet::new())
    }

    /// Like [`FragmentReader::read_into`], with `hint` providing prefix
    /// bindings in scope around the fragment.
    ///
    /// The hint only resolves prefixes; it is not copied onto any node.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the fragment is not well-formed.
    pub fn read_with_namespaces(
        &self,
        tree: &mut XmlTree,
        text: &str,
        hint: &NamespaceSet,
    ) -> Result<NodeId, ParseError> {
        debug!("reading fragment of {} bytes", text.len());
        let mut input = FragmentInput::new(text, self.options.max_depth);
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        for (prefix, uri) in hint.iter() {
            resolver.bind(prefix, uri);
        }

        if input.looking_at("\u{FEFF}".as_bytes()) {
            input.advance(3);
        }

        let mut top_level = Vec::new();
        if let Err(e) = self.read_top_level(tree, &mut input, &mut resolver, &mut top_level) {
            discard(tree, &top_level);
            return Err(e);
        }

        if let [single] = top_level.as_slice() {
            let token = tree.token(*single);
            if token.is_element() && self.options.root_names.iter().any(|n| n == token.name()) {
                debug!("read fragment rooted at <{}>", token.qname().prefixed_name());
                return Ok(*single);
            }
        }

        let root = tree.create_node(Token::end_of_input());
        for node in &top_level {
            if let Err(e) = tree.add_child(root, *node) {
                discard(tree, &[root]);
                discard(tree, &top_level);
                return Err(input.fatal(e.to_string()));
            }
        }
        debug!(
            "wrapped {} top-level nodes in an end-of-input root",
            top_level.len()
        );
        Ok(root)
    }

    /// Reads every top-level node into `top_level`. On error the nodes read
    /// so far are left in `top_level` for the caller to free.
    fn read_top_level(
        &self,
        tree: &mut XmlTree,
        input: &mut FragmentInput<'_>,
        resolver: &mut NamespaceResolver,
        top_level: &mut Vec<NodeId>,
    ) -> Result<(), ParseError> {
        let mut text_buf = String::new();
        let mut text_start = input.location();
        while !input.at_end() {
            if input.looking_at(b"<?") {
                input.skip_past(b"?>", "processing instruction")?;
            } else if input.looking_at(b"<!--") {
                input.skip_past(b"-->", "comment")?;
            } else if input.looking_at(b"<![CDATA[") {
                Self::mark_text_start(&text_buf, &mut text_start, input);
                text_buf.push_str(&input.parse_cdata()?);
            } else if input.looking_at(b"<!") {
                return Err(input.fatal("document type declarations are not supported"));
            } else if input.looking_at(b"</") {
                return Err(input.fatal("end tag without a matching start tag"));
            } else if input.peek() == Some(b'<') {
                if !text_buf.trim().is_empty() {
                    top_level.push(Self::create_text(tree, &text_buf, text_start));
                }
                text_buf.clear();
                top_level.push(self.read_element(tree, input, resolver)?);
            } else {
                Self::mark_text_start(&text_buf, &mut text_start, input);
                Self::read_char_data(input, &mut text_buf)?;
            }
        }
        if !text_buf.trim().is_empty() {
            top_level.push(Self::create_text(tree, &text_buf, text_start));
        }
        Ok(())
    }

    fn mark_text_start(
        buf: &str,
        start: &mut SourceLocation,
        input: &FragmentInput<'_>,
    ) {
        if buf.is_empty() {
            *start = input.location();
        }
    }

    fn create_text(
        tree: &mut XmlTree,
        text: &str,
        at: SourceLocation,
    ) -> NodeId {
        tree.create_node(Token::text(text).at(at.line, at.column))
    }

    /// Consumes character data up to the next `<`, resolving references.
    fn read_char_data(input: &mut FragmentInput<'_>, buf: &mut String) -> Result<(), ParseError> {
        while let Some(b) = input.peek() {
            match b {
                b'<' => break,
                b'&' => buf.push(input.parse_reference()?),
                _ => buf.push(input.next_char()?),
            }
        }
        Ok(())
    }

    fn read_element(
        &self,
        tree: &mut XmlTree,
        input: &mut FragmentInput<'_>,
        resolver: &mut NamespaceResolver,
    ) -> Result<NodeId, ParseError> {
        let start = input.location();
        input.expect_byte(b'<')?;
        let raw_name = input.parse_name()?;
        input.increment_depth()?;
        resolver.push_scope();

        let mut raw_attrs: Vec<(String, String)> = Vec::new();
        let mut namespaces = NamespaceSet::new();
        loop {
            let had_space = input.skip_whitespace();
            if matches!(input.peek(), Some(b'/' | b'>')) {
                break;
            }
            if !had_space {
                return Err(input.fatal("expected whitespace between attributes"));
            }
            let name = input.parse_name()?;
            input.skip_whitespace();
            input.expect_byte(b'=')?;
            input.skip_whitespace();
            let value = input.parse_attribute_value()?;

            if name == "xmlns" || name.starts_with("xmlns:") {
                let prefix = name.strip_prefix("xmlns:").unwrap_or_default();
                if namespaces.has_prefix(prefix) {
                    return Err(input.fatal(format!("duplicate namespace declaration '{name}'")));
                }
                resolver.bind(prefix, &value);
                let _ = namespaces.add(&value, prefix);
            } else {
                if raw_attrs.iter().any(|(n, _)| *n == name) {
                    return Err(input.fatal(format!("duplicate attribute '{name}'")));
                }
                raw_attrs.push((name, value));
            }
        }

        let qname = Self::resolve_name(input, resolver, &raw_name, true)?;
        let mut attributes = AttributeSet::new();
        for (name, value) in &raw_attrs {
            let attr_name = Self::resolve_name(input, resolver, name, false)?;
            let _ = attributes.add_qname(attr_name, value);
        }
        let token = Token::element(qname, attributes, namespaces).at(start.line, start.column);
        let id = tree.create_node(token);

        let body = if input.looking_at(b"/>") {
            input.advance(2);
            Ok(())
        } else {
            input
                .expect_byte(b'>')
                .and_then(|()| self.read_content(tree, input, resolver, id, &raw_name))
        };
        if let Err(e) = body {
            discard(tree, &[id]);
            return Err(e);
        }
        if tree.child_count(id) == 0 {
            let _ = tree.update(id, |token, _| token.set_end());
        }

        resolver.pop_scope();
        input.decrement_depth();
        Ok(id)
    }

    fn read_content(
        &self,
        tree: &mut XmlTree,
        input: &mut FragmentInput<'_>,
        resolver: &mut NamespaceResolver,
        parent: NodeId,
        raw_name: &str,
    ) -> Result<(), ParseError> {
        let mut text_buf = String::new();
        let mut text_start = input.location();
        loop {
            if input.at_end() {
                return Err(input.fatal(format!(
                    "unexpected end of input, expected </{raw_name}>"
                )));
            }
            if input.looking_at(b"</") {
                self.flush_text(tree, input, parent, &mut text_buf, text_start)?;
                input.advance(2);
                let end_name = input.parse_name()?;
                if end_name != raw_name {
                    return Err(input.fatal(format!(
                        "mismatched end tag: expected </{raw_name}>, found </{end_name}>"
                    )));
                }
                input.skip_whitespace();
                return input.expect_byte(b'>');
            }
            if input.looking_at(b"<!--") {
                input.skip_past(b"-->", "comment")?;
            } else if input.looking_at(b"<?") {
                input.skip_past(b"?>", "processing instruction")?;
            } else if input.looking_at(b"<![CDATA[") {
                Self::mark_text_start(&text_buf, &mut text_start, input);
                text_buf.push_str(&input.parse_cdata()?);
            } else if input.peek() == Some(b'<') {
                self.flush_text(tree, input, parent, &mut text_buf, text_start)?;
                let child = self.read_element(tree, input, resolver)?;
                if let Err(e) = tree.add_child(parent, child) {
                    discard(tree, &[child]);
                    return Err(input.fatal(e.to_string()));
                }
            } else {
                Self::mark_text_start(&text_buf, &mut text_start, input);
                Self::read_char_data(input, &mut text_buf)?;
            }
        }
    }

    fn flush_text(
        &self,
        tree: &mut XmlTree,
        input: &FragmentInput<'_>,
        parent: NodeId,
        buf: &mut String,
        at: SourceLocation,
    ) -> Result<(), ParseError> {
        if buf.is_empty() || (!self.options.keep_whitespace && buf.trim().is_empty()) {
            buf.clear();
            return Ok(());
        }
        let text = Self::create_text(tree, buf, at);
        buf.clear();
        tree.add_child(parent, text).map_err(|e| {
            discard(tree, &[text]);
            input.fatal(e.to_string())
        })
    }

    /// Splits a lexical name and resolves its prefix. Unprefixed attributes
    /// are in no namespace; unprefixed elements take the default namespace.
    fn resolve_name(
        input: &FragmentInput<'_>,
        resolver: &NamespaceResolver,
        raw: &str,
        is_element: bool,
    ) -> Result<QualifiedName, ParseError> {
        match split_qname(raw) {
            (Some(prefix), local) => {
                if prefix.is_empty() || local.is_empty() || local.contains(':') {
                    return Err(input.fatal(format!("malformed qualified name '{raw}'")));
                }
                let uri = resolver
                    .resolve(prefix)
                    .ok_or_else(|| input.fatal(format!("namespace prefix '{prefix}' is not declared")))?;
                Ok(QualifiedName::new(local, uri, prefix))
            }
            (None, local) if is_element => {
                Ok(QualifiedName::new(local, resolver.resolve("").unwrap_or_default(), ""))
            }
            (None, local) => Ok(QualifiedName::local(local)),
        }
    }
}

/// Frees nodes created for a fragment that failed to read.
fn discard(tree: &mut XmlTree, nodes: &[NodeId]) {
    for &node in nodes {
        if tree.contains(node) {
            let _ = tree.remove_subtree(node);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::{Change, ChangeEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn read(text: &str) -> (XmlTree, NodeId) {
        FragmentReader::new().read(text).unwrap()
    }

    fn names(tree: &XmlTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .map(|c| tree.token(c).name().to_string())
            .collect()
    }

    #[test]
    fn test_multiple_top_level_elements_are_wrapped() {
        let (tree, root) = read("<a/><b/>");
        assert!(tree.token(root).is_eof());
        assert_eq!(names(&tree, root), vec!["a", "b"]);
        assert_eq!(tree.parent(tree.child_at(root, 0).unwrap()), Some(root));
    }

    #[test]
    fn test_known_root_is_returned_directly() {
        let (tree, root) = read("<notes><p>x</p></notes>");
        assert!(!tree.token(root).is_eof());
        assert_eq!(tree.token(root).name(), "notes");
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.text_content(root), "x");
    }

    #[test]
    fn test_unknown_single_root_is_wrapped() {
        let (tree, root) = read("<listOfThings/>");
        assert!(tree.token(root).is_eof());
        assert_eq!(tree.child_count(root), 1);
    }

    #[test]
    fn test_configured_root_name() {
        let reader = FragmentReader::with_options(ReaderOptions::default().root_name("listOfThings"));
        let (tree, root) = reader.read("<listOfThings/>").unwrap();
        assert_eq!(tree.token(root).name(), "listOfThings");
    }

    #[test]
    fn test_top_level_whitespace_is_ignored() {
        let (tree, root) = read("\n  <a/>\n  <b/>\n");
        assert_eq!(tree.child_count(root), 2);
        let (tree, root) = read("  <notes/>  ");
        assert_eq!(tree.token(root).name(), "notes");
    }

    #[test]
    fn test_top_level_text_is_kept() {
        let (tree, root) = read("Hello <b>world</b>");
        assert!(tree.token(root).is_eof());
        assert_eq!(tree.child_count(root), 2);
        assert_eq!(tree.token(tree.child_at(root, 0).unwrap()).characters(), "Hello ");
    }

    #[test]
    fn test_self_closing_and_empty_elements_are_closed() {
        let (tree, root) = read("<notes><a/><b></b><c>x</c></notes>");
        let kids: Vec<NodeId> = tree.children(root).collect();
        assert!(tree.token(kids[0]).is_end());
        assert!(tree.token(kids[1]).is_end());
        assert!(!tree.token(kids[2]).is_end());
        assert!(!tree.token(root).is_end());
    }

    #[test]
    fn test_attributes_in_order_with_namespaces() {
        let (tree, root) = read(
            r#"<notes xmlns="http://www.w3.org/1999/xhtml" xmlns:m="urn:m" id="n1" m:color="green"/>"#,
        );
        let token = tree.token(root);
        assert_eq!(token.uri(), "http://www.w3.org/1999/xhtml");
        assert_eq!(token.namespaces_len(), 2);
        assert_eq!(token.namespace_uri("m"), "urn:m");
        assert_eq!(token.attributes().name(0), "id");
        assert_eq!(token.attributes().uri(0), "");
        assert_eq!(token.attributes().prefixed_name(1), "m:color");
        assert_eq!(token.attr_value_ns("color", "urn:m"), "green");
    }

    #[test]
    fn test_namespace_hint_seeds_prefixes() {
        let mut hint = NamespaceSet::new();
        let _ = hint.add("urn:lsid:mysim.org", "mysim");
        let mut tree = XmlTree::new();
        let root = FragmentReader::new()
            .read_with_namespaces(&mut tree, "<mysim:item/>", &hint)
            .unwrap();
        let item = tree.child_at(root, 0).unwrap();
        assert_eq!(tree.token(item).uri(), "urn:lsid:mysim.org");
        assert!(tree.token(item).is_namespaces_empty());
    }

    #[test]
    fn test_undeclared_prefix_is_an_error() {
        let err = FragmentReader::new().read("<x:item/>").unwrap_err();
        assert!(err.message.contains("'x'"));
    }

    #[test]
    fn test_references_and_cdata_become_text() {
        let (tree, root) = read("<notes>a &amp; b &#x41;<![CDATA[<raw>]]></notes>");
        assert_eq!(tree.child_count(root), 1);
        assert_eq!(tree.text_content(root), "a & b A<raw>");
    }

    #[test]
    fn test_comments_and_pis_are_skipped() {
        let (tree, root) = read("<?xml version=\"1.0\"?><!-- c --><notes><?pi x?>t<!-- y --></notes>");
        assert_eq!(tree.token(root).name(), "notes");
        assert_eq!(tree.child_count(root), 1);
        assert_eq!(tree.text_content(root), "t");
    }

    #[test]
    fn test_whitespace_only_text_can_be_dropped() {
        let text = "<notes>\n  <p>x</p>\n</notes>";
        let (tree, root) = read(text);
        assert_eq!(tree.child_count(root), 3);

        let reader = FragmentReader::with_options(ReaderOptions::default().keep_whitespace(false));
        let (tree, root) = reader.read(text).unwrap();
        assert_eq!(tree.child_count(root), 1);
    }

    #[test]
    fn test_positions_are_recorded() {
        let (tree, root) = read("<notes>\n  <p/></notes>");
        let p = tree.child_element(root, "p", "*").unwrap();
        assert_eq!((tree.token(root).line(), tree.token(root).column()), (1, 1));
        assert_eq!((tree.token(p).line(), tree.token(p).column()), (2, 3));
    }

    #[test]
    fn test_malformed_input_errors() {
        let reader = FragmentReader::new();
        for bad in [
            "<a>",
            "<a></b>",
            "</a>",
            "<a x='1' x='2'/>",
            "<a x=1/>",
            "<a>&bogus;</a>",
            "<!DOCTYPE a><a/>",
        ] {
            assert!(reader.read(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_error_location() {
        let err = FragmentReader::new().read("<a>\n</b>").unwrap_err();
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_depth_limit() {
        let reader = FragmentReader::with_options(ReaderOptions::default().max_depth(2));
        assert!(reader.read("<a><b/></a>").is_ok());
        assert!(reader.read("<a><b><c/></b></a>").is_err());
    }

    #[test]
    fn test_empty_fragment_gives_empty_wrapper() {
        let (tree, root) = read("");
        assert!(tree.token(root).is_eof());
        assert_eq!(tree.child_count(root), 0);
    }

    #[test]
    fn test_read_into_existing_tree_notifies_listener() {
        let mut tree = XmlTree::new();
        let events: Rc<RefCell<Vec<ChangeEvent>>> = Rc::default();
        let sink = Rc::clone(&events);
        tree.set_listener(move |e| sink.borrow_mut().push(e.clone()));

        let root = FragmentReader::new().read_into(&mut tree, "<a/><b/>").unwrap();
        let added = events
            .borrow()
            .iter()
            .filter(|e| e.change == Change::NodeAdded { parent: root })
            .count();
        assert_eq!(added, 2);
    }

    #[test]
    fn test_failed_read_frees_partial_nodes() {
        let mut tree = XmlTree::new();
        let keep = tree.create_text("kept");
        let reader = FragmentReader::new();

        assert!(reader.read_into(&mut tree, "<a><b>x</b><c>").is_err());
        assert!(reader.read_into(&mut tree, "<a/>text<b><c/></d>").is_err());
        assert!(reader.read_into(&mut tree, "<a/><x:b/>").is_err());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.contains(keep));

        let root = reader.read_into(&mut tree, "<a/><b/>").unwrap();
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.child_count(root), 2);
    }
}
