//! XML tokens.
//!
//! A [`Token`] is one XML event: a start tag, an end tag (or an element with
//! no body yet), a run of character data, or the end-of-input marker used by
//! synthetic wrapper roots. It carries the element's qualified name, its
//! attributes and namespace declarations, an optional character buffer and
//! the source position it was read from.
//!
//! Attribute and namespace mutators only apply to start tokens; on any other
//! kind they do nothing and return [`Status::Failed`]. Every mutation reports
//! what it changed to the [`ChangeSink`] passed in.

use super::attributes::AttributeSet;
use super::change::{Change, ChangeSink};
use super::namespaces::NamespaceSet;
use crate::error::TreeError;
use crate::util::qname::QualifiedName;

/// Result code of a mutation or removal that can miss without being an error.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation was applied.
    Success,
    /// The operation does not apply to this token (e.g. attribute mutation
    /// on a text token).
    Failed,
    /// No entry matched the given name.
    NotFound,
    /// The index was past the end of the collection.
    IndexOutOfRange,
}

impl Status {
    /// Returns `true` for [`Status::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// What kind of XML event a token stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// An open element that can take attributes, namespaces and children.
    Start,
    /// An element without a body. Becomes `Start` when reopened.
    End,
    /// Character data.
    Text,
    /// The end-of-input marker; set on synthetic wrapper roots.
    EndOfInput,
}

/// A single XML event with its name, attributes, namespaces and text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    qname: QualifiedName,
    attributes: AttributeSet,
    namespaces: NamespaceSet,
    characters: Option<String>,
    line: u32,
    column: u32,
    kind: TokenKind,
    /// A start tag that is also its own end (`<a/>`).
    also_end: bool,
}

impl Default for Token {
    fn default() -> Self {
        Self::end(QualifiedName::default())
    }
}

impl Token {
    // --- Construction ---

    /// Creates an empty, nameless element token without a body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a text token holding `chars`.
    #[must_use]
    pub fn text(chars: &str) -> Self {
        Self {
            characters: Some(chars.to_string()),
            ..Self::with_kind(QualifiedName::default(), TokenKind::Text)
        }
    }

    /// Creates an element token with no body. Attaching a child reopens it.
    #[must_use]
    pub fn end(qname: QualifiedName) -> Self {
        Self::with_kind(qname, TokenKind::End)
    }

    /// Creates a start token with no attributes or namespaces.
    #[must_use]
    pub fn start(qname: QualifiedName) -> Self {
        Self::with_kind(qname, TokenKind::Start)
    }

    /// Creates a start token with the given attributes and namespaces.
    #[must_use]
    pub fn element(qname: QualifiedName, attributes: AttributeSet, namespaces: NamespaceSet) -> Self {
        Self {
            attributes,
            namespaces,
            ..Self::start(qname)
        }
    }

    /// Creates an end-of-input marker token.
    #[must_use]
    pub fn end_of_input() -> Self {
        Self::with_kind(QualifiedName::default(), TokenKind::EndOfInput)
    }

    fn with_kind(qname: QualifiedName, kind: TokenKind) -> Self {
        Self {
            qname,
            attributes: AttributeSet::new(),
            namespaces: NamespaceSet::new(),
            characters: None,
            line: 0,
            column: 0,
            kind,
            also_end: false,
        }
    }

    /// Sets the source position this token was read from.
    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    // --- Kind ---

    /// The token kind.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Returns `true` for a start token.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.kind == TokenKind::Start
    }

    /// Returns `true` for an end token, or a start token that is also its end.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End || self.also_end
    }

    /// Returns `true` for character data.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }

    /// Returns `true` for anything that is not character data.
    #[must_use]
    pub fn is_element(&self) -> bool {
        self.kind != TokenKind::Text
    }

    /// Returns `true` for the end-of-input marker.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EndOfInput
    }

    /// Returns `true` if this token closes `element`.
    #[must_use]
    pub fn is_end_for(&self, element: &Token) -> bool {
        self.is_end()
            && element.is_start()
            && element.name() == self.name()
            && element.uri() == self.uri()
    }

    /// Marks the token as closed. A start token becomes self-closing.
    pub fn set_end(&mut self) -> Status {
        match self.kind {
            TokenKind::Text => Status::Failed,
            TokenKind::End => Status::Success,
            TokenKind::Start | TokenKind::EndOfInput => {
                self.also_end = true;
                Status::Success
            }
        }
    }

    /// Clears the end flag. An end token is reopened as a start token.
    pub fn unset_end(&mut self) -> Status {
        match self.kind {
            TokenKind::Text => Status::Failed,
            TokenKind::End => {
                self.kind = TokenKind::Start;
                Status::Success
            }
            TokenKind::Start | TokenKind::EndOfInput => {
                self.also_end = false;
                Status::Success
            }
        }
    }

    /// Marks the token as the end-of-input marker. This is terminal.
    pub fn set_eof(&mut self, sink: &mut dyn ChangeSink) -> Status {
        let old = self.is_eof();
        self.kind = TokenKind::EndOfInput;
        sink.emit(Change::Eof { old, new: true });
        Status::Success
    }

    // --- Name and position ---

    /// The qualified name.
    #[must_use]
    pub fn qname(&self) -> &QualifiedName {
        &self.qname
    }

    /// The local name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.qname.name()
    }

    /// The name's prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.qname.prefix()
    }

    /// The name's namespace URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        self.qname.uri()
    }

    /// Replaces the qualified name. Fails on text tokens.
    pub fn set_qname(&mut self, qname: QualifiedName, sink: &mut dyn ChangeSink) -> Status {
        if self.is_text() {
            return Status::Failed;
        }
        let old = std::mem::replace(&mut self.qname, qname);
        sink.emit(Change::QualifiedName {
            old,
            new: self.qname.clone(),
        });
        Status::Success
    }

    /// 1-based source line, 0 when unknown.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based source column, 0 when unknown.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    // --- Characters ---

    /// The character buffer, or `""` when there is none.
    #[must_use]
    pub fn characters(&self) -> &str {
        self.characters.as_deref().unwrap_or_default()
    }

    /// Appends to the character buffer, creating it if needed.
    pub fn append(&mut self, chars: &str, sink: &mut dyn ChangeSink) {
        let old = self.characters.clone();
        let buffer = self.characters.get_or_insert_with(String::new);
        buffer.push_str(chars);
        sink.emit(Change::Text {
            old,
            new: buffer.clone(),
        });
    }

    /// Replaces the character buffer.
    pub fn set_characters(&mut self, chars: &str, sink: &mut dyn ChangeSink) {
        let old = self.characters.replace(chars.to_string());
        sink.emit(Change::Text {
            old,
            new: chars.to_string(),
        });
    }

    // --- Attributes ---

    /// The attribute set.
    #[must_use]
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Adds or replaces the attribute `name` (first match in any namespace).
    pub fn add_attr(&mut self, name: &str, value: &str, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        let existing = self.attributes.index_of(name);
        self.replace_attr(existing, QualifiedName::local(name), value, sink)
    }

    /// Adds or replaces the attribute `name` in namespace `uri`.
    pub fn add_attr_ns(
        &mut self,
        name: &str,
        value: &str,
        uri: &str,
        prefix: &str,
        sink: &mut dyn ChangeSink,
    ) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        let existing = self.attributes.index_of_ns(name, uri);
        self.replace_attr(existing, QualifiedName::new(name, uri, prefix), value, sink)
    }

    /// Adds or replaces an attribute matching `qname`'s name and URI.
    pub fn add_attr_qname(
        &mut self,
        qname: QualifiedName,
        value: &str,
        sink: &mut dyn ChangeSink,
    ) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        let existing = self.attributes.index_of_ns(qname.name(), qname.uri());
        self.replace_attr(existing, qname, value, sink)
    }

    fn replace_attr(
        &mut self,
        existing: Option<usize>,
        qname: QualifiedName,
        value: &str,
        sink: &mut dyn ChangeSink,
    ) -> Status {
        let old = existing.map(|i| self.attributes.value(i).to_string());
        if let Some(i) = existing {
            let _ = self.attributes.remove(i);
        }
        let name = qname.name().to_string();
        let status = self.attributes.add_qname(qname, value);
        if status.is_success() {
            sink.emit(Change::Attribute {
                name,
                old,
                new: Some(value.to_string()),
            });
        }
        status
    }

    /// Removes the attribute at `index`.
    pub fn remove_attr(&mut self, index: usize, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        if !self.attributes.has_index(index) {
            return Status::IndexOutOfRange;
        }
        self.emit_attr_removal(index, sink);
        self.attributes.remove(index)
    }

    /// Removes the first attribute named `name`.
    pub fn remove_attr_named(&mut self, name: &str, sink: &mut dyn ChangeSink) -> Status {
        let index = self.attributes.index_of(name);
        self.remove_found_attr(index, sink)
    }

    /// Removes the attribute `name` in namespace `uri`.
    pub fn remove_attr_ns(&mut self, name: &str, uri: &str, sink: &mut dyn ChangeSink) -> Status {
        let index = self.attributes.index_of_ns(name, uri);
        self.remove_found_attr(index, sink)
    }

    /// Removes the attribute whose qualified name equals `qname`.
    pub fn remove_attr_qname(
        &mut self,
        qname: &QualifiedName,
        sink: &mut dyn ChangeSink,
    ) -> Status {
        let index = self.attributes.index_of_qname(qname);
        self.remove_found_attr(index, sink)
    }

    fn remove_found_attr(&mut self, index: Option<usize>, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        match index {
            Some(i) => self.remove_attr(i, sink),
            None => Status::NotFound,
        }
    }

    fn emit_attr_removal(&self, index: usize, sink: &mut dyn ChangeSink) {
        sink.emit(Change::Attribute {
            name: self.attributes.name(index).to_string(),
            old: Some(self.attributes.value(index).to_string()),
            new: None,
        });
    }

    /// Removes every attribute, reporting each one.
    pub fn clear_attributes(&mut self, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        for index in 0..self.attributes.len() {
            self.emit_attr_removal(index, sink);
        }
        self.attributes.clear()
    }

    /// Replaces the whole attribute set, reporting each removal and addition.
    pub fn set_attributes(&mut self, attributes: AttributeSet, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        for (qname, value) in self.attributes.drain() {
            sink.emit(Change::Attribute {
                name: qname.name().to_string(),
                old: Some(value),
                new: None,
            });
        }
        for (qname, value) in attributes.iter() {
            sink.emit(Change::Attribute {
                name: qname.name().to_string(),
                old: None,
                new: Some(value.to_string()),
            });
        }
        self.attributes = attributes;
        Status::Success
    }

    /// Number of attributes.
    #[must_use]
    pub fn attributes_len(&self) -> usize {
        self.attributes.len()
    }

    /// Index of the first attribute named `name`.
    #[must_use]
    pub fn attr_index(&self, name: &str) -> Option<usize> {
        self.attributes.index_of(name)
    }

    /// Index of the attribute `name` in namespace `uri`.
    #[must_use]
    pub fn attr_index_ns(&self, name: &str, uri: &str) -> Option<usize> {
        self.attributes.index_of_ns(name, uri)
    }

    /// Value of the first attribute named `name`, or `""`.
    #[must_use]
    pub fn attr_value(&self, name: &str) -> &str {
        self.attributes.value_of(name)
    }

    /// Value of the attribute `name` in namespace `uri`, or `""`.
    #[must_use]
    pub fn attr_value_ns(&self, name: &str, uri: &str) -> &str {
        self.attributes.value_of_ns(name, uri)
    }

    /// Value of the attribute at `index`, or `""`.
    #[must_use]
    pub fn attr_value_at(&self, index: usize) -> &str {
        self.attributes.value(index)
    }

    /// Returns `true` if an attribute named `name` exists.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.has(name)
    }

    /// Returns `true` if an attribute named `name` exists in namespace `uri`.
    #[must_use]
    pub fn has_attr_ns(&self, name: &str, uri: &str) -> bool {
        self.attributes.has_ns(name, uri)
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_attributes_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    // --- Namespaces ---

    /// The namespace declarations.
    #[must_use]
    pub fn namespaces(&self) -> &NamespaceSet {
        &self.namespaces
    }

    /// Declares `prefix` for `uri`.
    ///
    /// A leading `xmlns:` is stripped and a bare `xmlns` means the default
    /// namespace, so `"xmlns:foo"` and `"foo"` store the same prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidNamespacePrefix`] if the prefix still
    /// contains `:` after stripping.
    pub fn add_namespace(
        &mut self,
        uri: &str,
        prefix: &str,
        sink: &mut dyn ChangeSink,
    ) -> Result<Status, TreeError> {
        if !self.is_start() {
            return Ok(Status::Failed);
        }
        let prefix = normalize_namespace_prefix(prefix)?;
        let old = if self.namespaces.has_uri(uri) {
            Some(uri.to_string())
        } else if self.namespaces.has_prefix(prefix) {
            Some(self.namespaces.uri_of(prefix).to_string())
        } else {
            None
        };
        let status = self.namespaces.add(uri, prefix);
        if status.is_success() {
            sink.emit(Change::Namespace {
                old,
                new: Some(uri.to_string()),
            });
        }
        Ok(status)
    }

    /// Declares the default namespace.
    pub fn add_default_namespace(&mut self, uri: &str, sink: &mut dyn ChangeSink) -> Status {
        // The empty prefix cannot fail normalization.
        self.add_namespace(uri, "", sink).unwrap_or(Status::Failed)
    }

    /// Removes the namespace declaration at `index`.
    pub fn remove_namespace(&mut self, index: usize, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        if index >= self.namespaces.len() {
            return Status::IndexOutOfRange;
        }
        sink.emit(Change::Namespace {
            old: Some(self.namespaces.uri(index).to_string()),
            new: None,
        });
        self.namespaces.remove(index)
    }

    /// Removes the declaration for `prefix`. Removing an unbound prefix
    /// succeeds without a notification.
    pub fn remove_namespace_prefix(&mut self, prefix: &str, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        match self.namespaces.index_of_prefix(prefix) {
            Some(index) => self.remove_namespace(index, sink),
            None => Status::Success,
        }
    }

    /// Removes every namespace declaration, reporting each one.
    pub fn clear_namespaces(&mut self, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        for (_, uri) in self.namespaces.iter() {
            sink.emit(Change::Namespace {
                old: Some(uri.to_string()),
                new: None,
            });
        }
        self.namespaces.clear()
    }

    /// Replaces all namespace declarations, reporting each removal and addition.
    pub fn set_namespaces(&mut self, namespaces: NamespaceSet, sink: &mut dyn ChangeSink) -> Status {
        if !self.is_start() {
            return Status::Failed;
        }
        for (_, uri) in self.namespaces.drain() {
            sink.emit(Change::Namespace {
                old: Some(uri),
                new: None,
            });
        }
        for (_, uri) in namespaces.iter() {
            sink.emit(Change::Namespace {
                old: None,
                new: Some(uri.to_string()),
            });
        }
        self.namespaces = namespaces;
        Status::Success
    }

    /// Number of namespace declarations.
    #[must_use]
    pub fn namespaces_len(&self) -> usize {
        self.namespaces.len()
    }

    /// URI declared for `prefix`, or `""`.
    #[must_use]
    pub fn namespace_uri(&self, prefix: &str) -> &str {
        self.namespaces.uri_of(prefix)
    }

    /// The default namespace URI declared here, or `""`.
    #[must_use]
    pub fn default_namespace_uri(&self) -> &str {
        self.namespaces.default_uri()
    }

    /// First prefix declared for `uri`, or `""`.
    #[must_use]
    pub fn namespace_prefix_for(&self, uri: &str) -> &str {
        self.namespaces.prefix_for(uri)
    }

    /// Returns `true` if `prefix` is declared as `uri`.
    #[must_use]
    pub fn has_namespace_ns(&self, uri: &str, prefix: &str) -> bool {
        self.namespaces.has_ns(uri, prefix)
    }

    /// Returns `true` if there are no namespace declarations.
    #[must_use]
    pub fn is_namespaces_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Strips `xmlns:` (or maps a bare `xmlns` to the default prefix) and
/// rejects anything still qualified.
fn normalize_namespace_prefix(prefix: &str) -> Result<&str, TreeError> {
    let prefix = if prefix == "xmlns" {
        ""
    } else {
        prefix.strip_prefix("xmlns:").unwrap_or(prefix)
    };
    if prefix.contains(':') {
        return Err(TreeError::InvalidNamespacePrefix(prefix.to_string()));
    }
    Ok(prefix)
}
