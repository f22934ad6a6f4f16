//! Change notifications.
//!
//! Every token and tree mutation reports what it changed through a
//! [`ChangeSink`] passed in by the caller. Sinks are called synchronously,
//! before the mutating method returns. [`XmlTree`](super::XmlTree) forwards
//! the changes of its nodes to the listener its owner installed, tagged with
//! the node they concern; with no listener installed they are dropped.

use super::NodeId;
use crate::util::qname::QualifiedName;

/// A single change made to a token or to the tree structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// An attribute was added, replaced or removed. `old` is `None` for a
    /// fresh attribute and `new` is `None` for a removal.
    Attribute {
        /// Local name of the attribute.
        name: String,
        /// Previous value.
        old: Option<String>,
        /// New value.
        new: Option<String>,
    },
    /// A namespace binding was added, replaced or removed.
    Namespace {
        /// Previous URI.
        old: Option<String>,
        /// New URI.
        new: Option<String>,
    },
    /// The character buffer changed.
    Text {
        /// Buffer content before the change, `None` if there was no buffer.
        old: Option<String>,
        /// Buffer content after the change.
        new: String,
    },
    /// The end-of-input flag changed.
    Eof {
        /// Previous state.
        old: bool,
        /// New state.
        new: bool,
    },
    /// The token's qualified name was replaced.
    QualifiedName {
        /// Previous name.
        old: QualifiedName,
        /// New name.
        new: QualifiedName,
    },
    /// The node's extension data was replaced.
    Extras,
    /// The node was attached under `parent`.
    NodeAdded {
        /// The new parent.
        parent: NodeId,
    },
    /// The node was detached from `parent`.
    NodeRemoved {
        /// The former parent.
        parent: NodeId,
    },
}

/// A [`Change`] tagged with the tree node it happened to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The node that changed. For `NodeAdded`/`NodeRemoved` this is the child.
    pub node: NodeId,
    /// What changed.
    pub change: Change,
}

/// Receives changes from token mutators.
///
/// Any `FnMut(Change)` closure is a sink:
///
/// ```
/// use xmlnode::tree::{Change, Token};
/// use xmlnode::QualifiedName;
///
/// let mut token = Token::start(QualifiedName::local("p"));
/// let mut seen = Vec::new();
/// let _ = token.add_attr("class", "x", &mut |c: Change| seen.push(c));
/// assert_eq!(seen.len(), 1);
/// ```
pub trait ChangeSink {
    /// Called once per change, before the mutator returns.
    fn emit(&mut self, change: Change);
}

impl<F: FnMut(Change)> ChangeSink for F {
    fn emit(&mut self, change: Change) {
        self(change);
    }
}

/// A sink that drops every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl ChangeSink for Discard {
    fn emit(&mut self, _change: Change) {}
}

/// The owner-installed callback that receives tree events.
pub type Listener = Box<dyn FnMut(&ChangeEvent)>;

/// Adapts an optional tree listener into a sink for one node.
pub(crate) struct NodeSink<'a> {
    pub(crate) node: NodeId,
    pub(crate) listener: Option<&'a mut Listener>,
}

impl ChangeSink for NodeSink<'_> {
    fn emit(&mut self, change: Change) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&ChangeEvent {
                node: self.node,
                change,
            });
        }
    }
}
