//! XML serialization.
//!
//! This module writes a node subtree back to XML text.

pub mod xml;

pub use xml::{write_node, WriteOptions};
