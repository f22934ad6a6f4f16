//! Error types for the node tree and the fragment reader.
//!
//! Two channels exist. Expected misses (an attribute that is not there, an
//! index past the end) are reported through sentinel values such as
//! [`Status`](crate::tree::Status), `Option<usize>` or an empty string.
//! Misuse of the API (attaching a node under its own descendant, inserting a
//! child past the end of the list, a malformed namespace prefix) is reported
//! through [`TreeError`] so the caller fails fast.

use std::fmt;

/// Source location within an XML fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A hard failure raised by tree and token operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The `NodeId` does not belong to this tree.
    #[error("node {0} does not exist in this tree")]
    InvalidNode(u32),

    /// Attaching the node would make it its own ancestor.
    #[error("node {child} is an ancestor of {parent}; attaching it would create a cycle")]
    CycleDetected {
        /// The node that was to be attached.
        child: u32,
        /// The node it was to be attached under.
        parent: u32,
    },

    /// Text nodes cannot take children.
    #[error("node {0} is a text node and cannot take children")]
    TextParent(u32),

    /// The node already has a parent and must be detached first.
    #[error("node {0} already has a parent; detach it first")]
    AlreadyAttached(u32),

    /// A child position outside `[0, len]`.
    #[error("child index {index} out of range (child count {len})")]
    IndexOutOfRange {
        /// The requested position.
        index: usize,
        /// The number of children at the time of the call.
        len: usize,
    },

    /// A namespace prefix that still contains `:` after `xmlns:` stripping.
    #[error("invalid namespace prefix '{0}': the only allowed qualifier is 'xmlns:'")]
    InvalidNamespacePrefix(String),

    /// A delimited qualified-name string with the wrong number of fields.
    #[error("cannot build a qualified name from '{text}' split on '{separator}'")]
    InvalidTriple {
        /// The input text.
        text: String,
        /// The separator it was split on.
        separator: char,
    },
}

/// The error type returned when a fragment cannot be read.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            line: 10,
            column: 5,
            byte_offset: 42,
        };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            message: "unexpected end of input".to_string(),
            location: SourceLocation {
                line: 1,
                column: 15,
                byte_offset: 14,
            },
        };
        assert_eq!(
            err.to_string(),
            "parse error at 1:15: unexpected end of input"
        );
    }

    #[test]
    fn test_tree_error_display() {
        let err = TreeError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "child index 4 out of range (child count 2)"
        );
        let err = TreeError::InvalidNamespacePrefix("a:b".to_string());
        assert!(err.to_string().contains("'a:b'"));
    }

    #[test]
    fn test_errors_are_error_trait() {
        let err = TreeError::AlreadyAttached(3);
        let _: &dyn std::error::Error = &err;
        let err = ParseError {
            message: "test".to_string(),
            location: SourceLocation::default(),
        };
        let _: &dyn std::error::Error = &err;
    }
}
