//! Namespace declarations carried on a start token.
//!
//! A `NamespaceSet` maps prefixes to URIs in declaration order. The empty
//! prefix stands for the default namespace (`xmlns="..."`). Each prefix is
//! bound at most once; re-adding a prefix overwrites its URI in place.

use super::Status;

/// An insertion-ordered `prefix -> uri` map.
///
/// # Examples
///
/// ```
/// use xmlnode::tree::NamespaceSet;
///
/// let mut ns = NamespaceSet::new();
/// let _ = ns.add("http://www.w3.org/1999/xhtml", "");
/// let _ = ns.add("urn:lsid:mysim.org", "mysim");
///
/// assert_eq!(ns.default_uri(), "http://www.w3.org/1999/xhtml");
/// assert_eq!(ns.uri_of("mysim"), "urn:lsid:mysim.org");
/// assert_eq!(ns.index_of_prefix("nope"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NamespaceSet {
    bindings: Vec<(String, String)>,
}

impl NamespaceSet {
    /// Creates an empty namespace set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`, overwriting any existing binding for `prefix`.
    pub fn add(&mut self, uri: &str, prefix: &str) -> Status {
        match self.bindings.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, existing)) => *existing = uri.to_string(),
            None => self.bindings.push((prefix.to_string(), uri.to_string())),
        }
        Status::Success
    }

    /// Binds the default namespace.
    pub fn add_default(&mut self, uri: &str) -> Status {
        self.add(uri, "")
    }

    /// Removes the binding at `index`.
    pub fn remove(&mut self, index: usize) -> Status {
        if index >= self.bindings.len() {
            return Status::IndexOutOfRange;
        }
        self.bindings.remove(index);
        Status::Success
    }

    /// Removes the binding for `prefix`. Removing an unbound prefix succeeds.
    pub fn remove_prefix(&mut self, prefix: &str) -> Status {
        self.bindings.retain(|(p, _)| p != prefix);
        Status::Success
    }

    /// Removes every binding.
    pub fn clear(&mut self) -> Status {
        self.bindings.clear();
        Status::Success
    }

    /// Index of the first binding whose URI is `uri`.
    #[must_use]
    pub fn index_of(&self, uri: &str) -> Option<usize> {
        self.bindings.iter().position(|(_, u)| u == uri)
    }

    /// Index of the binding for `prefix`.
    #[must_use]
    pub fn index_of_prefix(&self, prefix: &str) -> Option<usize> {
        self.bindings.iter().position(|(p, _)| p == prefix)
    }

    /// The prefix at `index`, or `""`.
    #[must_use]
    pub fn prefix(&self, index: usize) -> &str {
        self.bindings.get(index).map_or("", |(p, _)| p.as_str())
    }

    /// The first prefix bound to `uri`, or `""`.
    #[must_use]
    pub fn prefix_for(&self, uri: &str) -> &str {
        self.index_of(uri).map_or("", |i| self.prefix(i))
    }

    /// The URI at `index`, or `""`.
    #[must_use]
    pub fn uri(&self, index: usize) -> &str {
        self.bindings.get(index).map_or("", |(_, u)| u.as_str())
    }

    /// The URI bound to `prefix`, or `""`.
    #[must_use]
    pub fn uri_of(&self, prefix: &str) -> &str {
        self.index_of_prefix(prefix).map_or("", |i| self.uri(i))
    }

    /// The default namespace URI, or `""`.
    #[must_use]
    pub fn default_uri(&self) -> &str {
        self.uri_of("")
    }

    /// Returns `true` if some prefix is bound to `uri`.
    #[must_use]
    pub fn has_uri(&self, uri: &str) -> bool {
        self.index_of(uri).is_some()
    }

    /// Returns `true` if `prefix` is bound.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.index_of_prefix(prefix).is_some()
    }

    /// Returns `true` if `prefix` is bound to exactly `uri`.
    #[must_use]
    pub fn has_ns(&self, uri: &str, prefix: &str) -> bool {
        self.index_of_prefix(prefix)
            .is_some_and(|i| self.uri(i) == uri)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over `(prefix, uri)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Returns `true` if every prefix bound here resolves to the same URI in
    /// `other`. Prefixes bound only in `other` are not looked at.
    #[must_use]
    pub fn resolves_within(&self, other: &NamespaceSet) -> bool {
        self.bindings
            .iter()
            .all(|(prefix, uri)| other.uri_of(prefix) == uri)
    }

    pub(crate) fn drain(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.bindings)
    }
}

/// Equality is one-directional: `a == b` holds when every prefix of `a`
/// resolves identically in `b`, so `a` may equal `b` while `b` has extra
/// bindings. See [`NamespaceSet::resolves_within`].
impl PartialEq for NamespaceSet {
    fn eq(&self, other: &Self) -> bool {
        self.resolves_within(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_overwrites_prefix_in_place() {
        let mut ns = NamespaceSet::new();
        let _ = ns.add("urn:a", "a");
        let _ = ns.add("urn:b", "b");
        let _ = ns.add("urn:a2", "a");

        assert_eq!(ns.len(), 2);
        assert_eq!(ns.prefix(0), "a");
        assert_eq!(ns.uri(0), "urn:a2");
        assert_eq!(ns.uri_of("b"), "urn:b");
    }

    #[test]
    fn test_default_namespace() {
        let mut ns = NamespaceSet::new();
        assert_eq!(ns.default_uri(), "");
        let _ = ns.add_default("http://www.w3.org/1999/xhtml");
        assert_eq!(ns.default_uri(), "http://www.w3.org/1999/xhtml");
        assert!(ns.has_prefix(""));
    }

    #[test]
    fn test_lookups_and_sentinels() {
        let mut ns = NamespaceSet::new();
        let _ = ns.add("urn:x", "x");
        let _ = ns.add("urn:x", "y");

        assert_eq!(ns.index_of("urn:x"), Some(0));
        assert_eq!(ns.prefix_for("urn:x"), "x");
        assert_eq!(ns.index_of_prefix("y"), Some(1));
        assert_eq!(ns.index_of("urn:nope"), None);
        assert_eq!(ns.prefix(5), "");
        assert_eq!(ns.uri(5), "");
        assert_eq!(ns.uri_of("nope"), "");
        assert_eq!(ns.prefix_for("urn:nope"), "");
    }

    #[test]
    fn test_has_ns() {
        let mut ns = NamespaceSet::new();
        let _ = ns.add("urn:x", "x");
        assert!(ns.has_ns("urn:x", "x"));
        assert!(!ns.has_ns("urn:y", "x"));
        assert!(!ns.has_ns("urn:x", "y"));
        assert!(ns.has_uri("urn:x"));
        assert!(!ns.has_uri("urn:y"));
    }

    #[test]
    fn test_remove() {
        let mut ns = NamespaceSet::new();
        let _ = ns.add("urn:a", "a");
        let _ = ns.add("urn:b", "b");

        assert_eq!(ns.remove(2), Status::IndexOutOfRange);
        assert_eq!(ns.remove(0), Status::Success);
        assert_eq!(ns.prefix(0), "b");
        assert_eq!(ns.remove_prefix("missing"), Status::Success);
        assert_eq!(ns.remove_prefix("b"), Status::Success);
        assert!(ns.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut ns = NamespaceSet::new();
        let _ = ns.add("urn:a", "a");
        let mut copy = ns.clone();
        let _ = copy.add("urn:changed", "a");
        assert_eq!(ns.uri_of("a"), "urn:a");
        assert_eq!(copy.uri_of("a"), "urn:changed");
    }

    #[test]
    fn test_equality_ignores_order() {
        let mut a = NamespaceSet::new();
        let _ = a.add("urn:a", "a");
        let _ = a.add("urn:b", "b");
        let mut b = NamespaceSet::new();
        let _ = b.add("urn:b", "b");
        let _ = b.add("urn:a", "a");
        assert_eq!(a, b);
        assert_eq!(b, a);
    }

    #[test]
    fn test_equality_is_one_directional() {
        // The left-hand side only checks its own prefixes, so a set with an
        // extra binding on the right still compares equal from the left.
        let mut small = NamespaceSet::new();
        let _ = small.add("urn:a", "a");
        let mut large = small.clone();
        let _ = large.add("urn:b", "b");

        assert!(small == large);
        assert!(large != small);
        assert!(NamespaceSet::new() == large);
    }

    #[test]
    fn test_differing_uri_is_unequal() {
        let mut a = NamespaceSet::new();
        let _ = a.add("urn:a", "p");
        let mut b = NamespaceSet::new();
        let _ = b.add("urn:b", "p");
        assert_ne!(a, b);
    }
}
