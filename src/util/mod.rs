//! Utility modules.
//!
//! Contains qualified-name handling.

pub mod qname;
