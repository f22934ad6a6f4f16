//! # xmlnode
//!
//! A mutable XML node tree for round-tripping foreign XML fragments embedded
//! in a host document. Attribute order and namespace prefixes are kept as
//! read, and every mutation is reported to an owner-installed listener.
//!
//! - [`QualifiedName`]: local name, namespace URI and prefix.
//! - [`AttributeSet`] and [`NamespaceSet`]: the ordered collections carried
//!   by a start token.
//! - [`Token`]: a single XML event (start, end, text or end-of-input).
//! - [`XmlTree`]: an arena of nodes, each a token with ordered children.
//! - [`reader::FragmentReader`] and [`serial::write_node`]: text in and out.
//!
//! ## Quick Start
//!
//! ```
//! use xmlnode::reader::FragmentReader;
//!
//! let (mut tree, root) = FragmentReader::new()
//!     .read(r#"<notes><p class="a">Hello</p></notes>"#)
//!     .unwrap();
//! let p = tree.child_element(root, "p", "*").unwrap();
//! let _ = tree.update(p, |token, sink| token.add_attr("class", "b", sink));
//!
//! assert_eq!(tree.to_xml_string(root), r#"<notes><p class="b">Hello</p></notes>"#);
//! ```

pub mod error;
pub mod reader;
pub mod serial;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use error::{ParseError, SourceLocation, TreeError};
pub use tree::{
    AttributeSet, Change, ChangeEvent, ChangeSink, NamespaceSet, NodeExtras, NodeId, Status,
    Token, TokenKind, XmlTree,
};
pub use util::qname::QualifiedName;
