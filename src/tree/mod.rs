//! Arena-based XML node tree.
//!
//! All nodes live in a contiguous slot vector owned by an [`XmlTree`] and
//! are referenced by [`NodeId`], a newtype over `NonZeroU32`. Each node holds
//! a [`Token`], a parent link and an ordered list of child ids. Ownership is
//! strictly top-down: a node is attached under at most one parent, and
//! attaching a node under itself or one of its descendants is rejected.
//!
//! Detaching a node keeps it allocated so it can be attached elsewhere.
//! [`XmlTree::remove_subtree`] frees a node and its descendants; freed slots
//! are reused by later allocations, so an id must not be used after its node
//! was freed.
//!
//! Structural queries (`parent`, `child_count`, `children`, ...) treat an id
//! that is not live in this tree as a node with no parent and no children.
//! Accessors that hand out a node's token or data panic on such an id.
//!
//! # Change notification
//!
//! The tree owner may install a listener with [`XmlTree::set_listener`]. Every
//! structural mutation and every token mutation made through
//! [`XmlTree::update`] is delivered to it synchronously as a
//! [`ChangeEvent`]. With no listener installed, events are dropped.

mod attributes;
mod change;
mod namespaces;
mod token;

pub use attributes::AttributeSet;
pub use change::{Change, ChangeEvent, ChangeSink, Discard, Listener};
pub use namespaces::NamespaceSet;
pub use token::{Status, Token, TokenKind};

use std::fmt;
use std::num::NonZeroU32;

use change::NodeSink;

use crate::error::TreeError;
use crate::serial::xml::{write_node, WriteOptions};
use crate::util::qname::QualifiedName;

/// A typed index into the tree's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, so `Option<NodeId>` has the same
/// size as `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Converts this `NodeId` to its raw, always non-zero, value.
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }

    /// Creates a `NodeId` from a raw value, if non-zero.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Application data attached to a node.
///
/// Only these fields exist, and all of them survive [`XmlTree::clone_subtree`]
/// and [`XmlTree::import_subtree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodeExtras {
    /// Identifier of the object this node mirrors in a foreign library.
    pub foreign_link: Option<String>,
    /// Where the fragment came from (file name, element path, ...).
    pub origin: Option<String>,
}

impl NodeExtras {
    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.foreign_link.is_none() && self.origin.is_none()
    }
}

/// Storage for a single node in the tree arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// The XML event this node stands for.
    pub token: Token,
    /// Parent node, `None` for roots and detached nodes.
    pub parent: Option<NodeId>,
    /// Child nodes in document order.
    pub children: Vec<NodeId>,
    /// Attached application data.
    pub extras: NodeExtras,
}

impl NodeData {
    fn new(token: Token) -> Self {
        Self {
            token,
            parent: None,
            children: Vec::new(),
            extras: NodeExtras::default(),
        }
    }
}

/// An arena of XML nodes.
///
/// A tree may hold several unrelated roots; any node without a parent is a
/// root of its own subtree.
///
/// # Examples
///
/// ```
/// use xmlnode::{QualifiedName, Token, XmlTree};
///
/// let mut tree = XmlTree::new();
/// let p = tree.create_node(Token::start(QualifiedName::local("p")));
/// let text = tree.create_text("Hello");
/// tree.add_child(p, text).unwrap();
/// let _ = tree.update(p, |token, sink| token.add_attr("class", "intro", sink));
///
/// assert_eq!(tree.to_xml_string(p), r#"<p class="intro">Hello</p>"#);
/// ```
pub struct XmlTree {
    /// The node arena. Slot 0 is never occupied (`NodeId` is non-zero) and
    /// `None` marks a freed slot.
    nodes: Vec<Option<NodeData>>,
    /// Freed slots, reused last-in first-out.
    free: Vec<NodeId>,
    listener: Option<Listener>,
}

impl XmlTree {
    /// Creates an empty tree with no listener.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![None],
            free: Vec::new(),
            listener: None,
        }
    }

    // --- Listener ---

    /// Installs the callback that receives every change made to this tree,
    /// replacing any previous one.
    pub fn set_listener(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Removes the listener. Later changes are dropped.
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Returns `true` if a listener is installed.
    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    fn notify(&mut self, node: NodeId, change: Change) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&ChangeEvent { node, change });
        }
    }

    // --- Access ---

    /// Returns `true` if `id` refers to a live node of this tree.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Returns the `NodeData` for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node of this tree.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn node(&self, id: NodeId) -> &NodeData {
        self.get(id).expect("NodeId does not refer to a live node")
    }

    /// Returns the `NodeData` for `id`, or `None` if it is not live in this tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.as_index()).and_then(Option::as_ref)
    }

    #[allow(clippy::expect_used)]
    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.nodes
            .get_mut(id.as_index())
            .and_then(Option::as_mut)
            .expect("NodeId does not refer to a live node")
    }

    fn check(&self, id: NodeId) -> Result<(), TreeError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(TreeError::InvalidNode(id.into_raw()))
        }
    }

    /// Returns the token of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node of this tree.
    #[must_use]
    pub fn token(&self, id: NodeId) -> &Token {
        &self.node(id).token
    }

    /// Returns the extras attached to `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node of this tree.
    #[must_use]
    pub fn extras(&self, id: NodeId) -> &NodeExtras {
        &self.node(id).extras
    }

    /// Replaces the extras attached to `id` and emits [`Change::Extras`].
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidNode`] if `id` is not live in this tree.
    pub fn set_extras(&mut self, id: NodeId, extras: NodeExtras) -> Result<(), TreeError> {
        self.check(id)?;
        self.node_mut(id).extras = extras;
        self.notify(id, Change::Extras);
        Ok(())
    }

    /// Returns the number of live nodes, detached ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    // --- Creation and token mutation ---

    /// Allocates a detached node holding `token`, reusing a freed slot if
    /// there is one.
    pub fn create_node(&mut self, token: Token) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.as_index()] = Some(NodeData::new(token));
            return id;
        }
        let index = self.nodes.len();
        self.nodes.push(Some(NodeData::new(token)));
        NodeId::from_index(index)
    }

    /// Allocates an element with no body yet. Adding a child reopens it.
    pub fn create_element(&mut self, qname: QualifiedName) -> NodeId {
        self.create_node(Token::end(qname))
    }

    /// Allocates a text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create_node(Token::text(text))
    }

    /// Runs `f` on the token of `id`, routing its changes to the listener.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node of this tree.
    #[allow(clippy::expect_used)]
    pub fn update<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Token, &mut dyn ChangeSink) -> R,
    ) -> R {
        let data = self
            .nodes
            .get_mut(id.as_index())
            .and_then(Option::as_mut)
            .expect("NodeId does not refer to a live node");
        let mut sink = NodeSink {
            node: id,
            listener: self.listener.as_mut(),
        };
        f(&mut data.token, &mut sink)
    }

    // --- Navigation ---

    fn child_ids(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(data) => &data.children,
            None => &[],
        }
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|data| data.parent)
    }

    /// Returns the number of children of a node.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.child_ids(id).len()
    }

    /// Returns the child at `index`, or `None` if out of range.
    #[must_use]
    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.child_ids(id).get(index).copied()
    }

    /// Returns the position of `child` among the children of `id`.
    #[must_use]
    pub fn index_of_child(&self, id: NodeId, child: NodeId) -> Option<usize> {
        self.child_ids(id).iter().position(|&c| c == child)
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            inner: self.child_ids(id).iter(),
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to the root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).map(|_| id),
        }
    }

    /// Returns an iterator over all descendants of a node in document order.
    /// The node itself is not included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: self.child_ids(id).iter().rev().copied().collect(),
        }
    }

    /// Returns the first direct element child matching `name` and `uri`.
    ///
    /// An empty string or `"*"` matches anything. Text children are skipped.
    #[must_use]
    pub fn child_element(&self, id: NodeId, name: &str, uri: &str) -> Option<NodeId> {
        self.children(id)
            .find(|&child| self.is_matching_element(child, name, uri))
    }

    /// Returns every direct element child matching `name` and `uri`, in order.
    ///
    /// An empty string or `"*"` matches anything. Text children are skipped.
    #[must_use]
    pub fn child_elements(&self, id: NodeId, name: &str, uri: &str) -> Vec<NodeId> {
        self.children(id)
            .filter(|&child| self.is_matching_element(child, name, uri))
            .collect()
    }

    fn is_matching_element(&self, id: NodeId, name: &str, uri: &str) -> bool {
        let token = self.token(id);
        token.is_element()
            && is_wildcard_match(name, token.name())
            && is_wildcard_match(uri, token.uri())
    }

    /// Returns the concatenated characters of a text node, or of all text
    /// nodes below an element.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node of this tree.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let token = self.token(id);
        if token.is_text() {
            return token.characters().to_string();
        }
        self.descendants(id)
            .map(|d| self.token(d))
            .filter(|t| t.is_text())
            .map(Token::characters)
            .collect()
    }

    // --- Structure ---

    /// Appends `child` as the last child of `parent`.
    ///
    /// A parent flagged as closed is reopened first. Emits
    /// [`Change::NodeAdded`] on the child.
    ///
    /// # Errors
    ///
    /// Fails if either id is not in this tree, if `parent` is a text node, if
    /// `child` already has a parent, or if `child` is `parent` or one of its
    /// ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let len = self.check_attachable(parent, child)?;
        self.attach(parent, len, child);
        Ok(())
    }

    /// Inserts `child` at position `index` among the children of `parent`.
    ///
    /// `index` may equal the current child count, which appends.
    ///
    /// # Errors
    ///
    /// Fails with [`TreeError::IndexOutOfRange`] if `index` is past the
    /// child count, and otherwise like [`XmlTree::add_child`].
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        let len = self.check_attachable(parent, child)?;
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        self.attach(parent, index, child);
        Ok(())
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<usize, TreeError> {
        self.check(parent)?;
        self.check(child)?;
        if self.token(parent).is_text() {
            return Err(TreeError::TextParent(parent.into_raw()));
        }
        if self.node(child).parent.is_some() {
            return Err(TreeError::AlreadyAttached(child.into_raw()));
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::CycleDetected {
                child: child.into_raw(),
                parent: parent.into_raw(),
            });
        }
        Ok(self.child_count(parent))
    }

    fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let data = self.node_mut(parent);
        if data.token.is_end() {
            let _ = data.token.unset_end();
        }
        data.children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        tracing::trace!("attached {} under {} at {}", child, parent, index);
        self.notify(child, Change::NodeAdded { parent });
    }

    /// Detaches and returns the child at `index`, or `None` if out of range.
    /// Emits [`Change::NodeRemoved`] on the child.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Option<NodeId> {
        if index >= self.child_count(parent) {
            return None;
        }
        let child = self.node_mut(parent).children.remove(index);
        self.node_mut(child).parent = None;
        tracing::trace!("detached {} from {}", child, parent);
        self.notify(child, Change::NodeRemoved { parent });
        Some(child)
    }

    /// Detaches `child` if it is a child of `parent`. Returns whether it was.
    pub fn remove_child_node(&mut self, parent: NodeId, child: NodeId) -> bool {
        match self.index_of_child(parent, child) {
            Some(index) => self.remove_child(parent, index).is_some(),
            None => false,
        }
    }

    /// Detaches every child of `parent`, in order, and returns them.
    pub fn remove_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        if !self.contains(parent) {
            return Vec::new();
        }
        let children = std::mem::take(&mut self.node_mut(parent).children);
        for &child in &children {
            self.node_mut(child).parent = None;
            self.notify(child, Change::NodeRemoved { parent });
        }
        tracing::trace!("detached {} children from {}", children.len(), parent);
        children
    }

    /// Detaches a node from its parent. Returns `false` if it had none.
    pub fn detach(&mut self, id: NodeId) -> bool {
        match self.parent(id) {
            Some(parent) => self.remove_child_node(parent, id),
            None => false,
        }
    }

    /// Frees `id` and all of its descendants and returns how many nodes were
    /// freed.
    ///
    /// An attached node is detached first, which emits
    /// [`Change::NodeRemoved`]. Freed ids are invalid afterwards and their
    /// slots are handed out again by [`XmlTree::create_node`].
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidNode`] if `id` is not live in this tree.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<usize, TreeError> {
        self.check(id)?;
        self.detach(id);
        let mut stack = vec![id];
        let mut freed = 0;
        while let Some(current) = stack.pop() {
            if let Some(data) = self.nodes[current.as_index()].take() {
                stack.extend(data.children);
                self.free.push(current);
                freed += 1;
            }
        }
        tracing::trace!("freed {} nodes rooted at {}", freed, id);
        Ok(freed)
    }

    // --- Copying and comparison ---

    /// Deep-copies the subtree at `id` into a new detached subtree of this
    /// tree and returns its root. Extras are copied; no events are emitted.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node of this tree.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let snapshot = self.snapshot(id);
        self.build(snapshot)
    }

    /// Deep-copies the subtree at `id` of `source` into this tree as a new
    /// detached subtree and returns its root.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node of `source`.
    pub fn import_subtree(&mut self, source: &XmlTree, id: NodeId) -> NodeId {
        let snapshot = source.snapshot(id);
        self.build(snapshot)
    }

    /// Lists the subtree in document order as `(parent position, token, extras)`.
    fn snapshot(&self, id: NodeId) -> Vec<(Option<usize>, Token, NodeExtras)> {
        let mut out = Vec::new();
        let mut stack = vec![(id, None)];
        while let Some((current, parent_pos)) = stack.pop() {
            let data = self.node(current);
            let pos = out.len();
            out.push((parent_pos, data.token.clone(), data.extras.clone()));
            for &child in data.children.iter().rev() {
                stack.push((child, Some(pos)));
            }
        }
        out
    }

    fn build(&mut self, snapshot: Vec<(Option<usize>, Token, NodeExtras)>) -> NodeId {
        let mut ids: Vec<NodeId> = Vec::with_capacity(snapshot.len());
        for (parent_pos, token, extras) in snapshot {
            let id = self.create_node(token);
            self.node_mut(id).extras = extras;
            if let Some(parent) = parent_pos.and_then(|p| ids.get(p).copied()) {
                self.node_mut(parent).children.push(id);
                self.node_mut(id).parent = Some(parent);
            }
            ids.push(id);
        }
        ids[0]
    }

    /// Compares the subtree at `a` with the subtree at `b` in `other`.
    ///
    /// Tokens must be equal (see [`Token`]'s `PartialEq`) and children must
    /// match pairwise in order. Extras are not compared.
    ///
    /// # Panics
    ///
    /// Panics if `a` or `b` is not a live node of its tree.
    #[must_use]
    pub fn subtree_eq(&self, a: NodeId, other: &XmlTree, b: NodeId) -> bool {
        let mut stack = vec![(a, b)];
        while let Some((x, y)) = stack.pop() {
            let (left, right) = (self.node(x), other.node(y));
            if left.token != right.token || left.children.len() != right.children.len() {
                return false;
            }
            stack.extend(left.children.iter().copied().zip(right.children.iter().copied()));
        }
        true
    }

    // --- Serialization ---

    /// Serializes the subtree at `id`.
    ///
    /// A text node with no children returns its characters unescaped.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node of this tree.
    #[must_use]
    pub fn to_xml_string(&self, id: NodeId) -> String {
        let data = self.node(id);
        if data.token.is_text() && data.children.is_empty() {
            return data.token.characters().to_string();
        }
        write_node(self, id, &WriteOptions::default())
    }
}

fn is_wildcard_match(pattern: &str, value: &str) -> bool {
    pattern.is_empty() || pattern == "*" || pattern == value
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning copies every node but not the listener.
impl Clone for XmlTree {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            free: self.free.clone(),
            listener: None,
        }
    }
}

impl fmt::Debug for XmlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlTree")
            .field("nodes", &&self.nodes[1..])
            .field("free", &self.free.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    inner: std::slice::Iter<'a, NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().copied()
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    tree: &'a XmlTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    tree: &'a XmlTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.child_ids(current).iter().rev().copied());
        Some(current)
    }
}
