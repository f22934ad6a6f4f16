//! Ordered attribute storage.
//!
//! `AttributeSet` is a raw ordered multimap of `(QualifiedName, value)`
//! pairs. It never replaces on insert: [`Token`](super::Token) removes an
//! existing entry before re-adding it, which is what gives start tokens their
//! one-entry-per-name behavior.
//!
//! Lookups that miss return `None`, `""` or `false`, and index-based getters
//! never panic; use [`AttributeSet::has_index`] to range-check.

use super::Status;
use crate::util::qname::QualifiedName;

/// An ordered collection of `(QualifiedName, value)` pairs.
///
/// # Examples
///
/// ```
/// use xmlnode::tree::AttributeSet;
///
/// let mut attrs = AttributeSet::new();
/// let _ = attrs.add("id", "n1");
/// let _ = attrs.add_ns("bgcolor", "green", "urn:lsid:mysim.org", "mysim");
///
/// assert_eq!(attrs.len(), 2);
/// assert_eq!(attrs.value_of("id"), "n1");
/// assert_eq!(attrs.prefixed_name(1), "mysim:bgcolor");
/// assert_eq!(attrs.value(7), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributeSet {
    entries: Vec<(QualifiedName, String)>,
}

impl AttributeSet {
    /// Creates an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Insertion ---

    /// Appends an attribute with no namespace.
    pub fn add(&mut self, name: &str, value: &str) -> Status {
        self.add_qname(QualifiedName::local(name), value)
    }

    /// Appends a namespaced attribute.
    pub fn add_ns(&mut self, name: &str, value: &str, uri: &str, prefix: &str) -> Status {
        self.add_qname(QualifiedName::new(name, uri, prefix), value)
    }

    /// Appends an attribute under an existing qualified name.
    pub fn add_qname(&mut self, qname: QualifiedName, value: &str) -> Status {
        self.entries.push((qname, value.to_string()));
        Status::Success
    }

    // --- Removal ---

    /// Removes the attribute at `index`.
    pub fn remove(&mut self, index: usize) -> Status {
        if index >= self.entries.len() {
            return Status::IndexOutOfRange;
        }
        self.entries.remove(index);
        Status::Success
    }

    /// Removes the first attribute with local name `name`.
    pub fn remove_named(&mut self, name: &str) -> Status {
        self.remove_found(self.index_of(name))
    }

    /// Removes the first attribute matching `name` in namespace `uri`.
    pub fn remove_ns(&mut self, name: &str, uri: &str) -> Status {
        self.remove_found(self.index_of_ns(name, uri))
    }

    /// Removes the first attribute whose qualified name equals `qname`.
    pub fn remove_qname(&mut self, qname: &QualifiedName) -> Status {
        self.remove_found(self.index_of_qname(qname))
    }

    fn remove_found(&mut self, index: Option<usize>) -> Status {
        match index {
            Some(i) => self.remove(i),
            None => Status::NotFound,
        }
    }

    /// Removes every attribute.
    pub fn clear(&mut self) -> Status {
        self.entries.clear();
        Status::Success
    }

    // --- Lookup ---

    /// Index of the first attribute with local name `name`, in any namespace.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(q, _)| q.name() == name)
    }

    /// Index of the first attribute with local name `name` in namespace `uri`.
    /// The prefix is not compared.
    #[must_use]
    pub fn index_of_ns(&self, name: &str, uri: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(q, _)| q.name() == name && q.uri() == uri)
    }

    /// Index of the first attribute whose qualified name equals `qname`.
    #[must_use]
    pub fn index_of_qname(&self, qname: &QualifiedName) -> Option<usize> {
        self.entries.iter().position(|(q, _)| q == qname)
    }

    /// Returns `true` if `index` is in range.
    #[must_use]
    pub fn has_index(&self, index: usize) -> bool {
        index < self.entries.len()
    }

    /// Returns `true` if an attribute named `name` exists in any namespace.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Returns `true` if an attribute named `name` exists in namespace `uri`.
    #[must_use]
    pub fn has_ns(&self, name: &str, uri: &str) -> bool {
        self.index_of_ns(name, uri).is_some()
    }

    /// Returns `true` if an attribute with exactly `qname` exists.
    #[must_use]
    pub fn has_qname(&self, qname: &QualifiedName) -> bool {
        self.index_of_qname(qname).is_some()
    }

    // --- Index-based getters (empty string on a miss) ---

    /// The qualified name at `index`.
    #[must_use]
    pub fn qname(&self, index: usize) -> Option<&QualifiedName> {
        self.entries.get(index).map(|(q, _)| q)
    }

    /// The local name at `index`, or `""`.
    #[must_use]
    pub fn name(&self, index: usize) -> &str {
        self.qname(index).map_or("", QualifiedName::name)
    }

    /// The prefix at `index`, or `""`.
    #[must_use]
    pub fn prefix(&self, index: usize) -> &str {
        self.qname(index).map_or("", QualifiedName::prefix)
    }

    /// The namespace URI at `index`, or `""`.
    #[must_use]
    pub fn uri(&self, index: usize) -> &str {
        self.qname(index).map_or("", QualifiedName::uri)
    }

    /// `prefix:name` at `index`, or `""`.
    #[must_use]
    pub fn prefixed_name(&self, index: usize) -> String {
        self.qname(index)
            .map(QualifiedName::prefixed_name)
            .unwrap_or_default()
    }

    /// The value at `index`, or `""`.
    #[must_use]
    pub fn value(&self, index: usize) -> &str {
        self.entries.get(index).map_or("", |(_, v)| v.as_str())
    }

    // --- Name-based getters ---

    /// The value of the first attribute named `name`, or `""`.
    #[must_use]
    pub fn value_of(&self, name: &str) -> &str {
        self.index_of(name).map_or("", |i| self.value(i))
    }

    /// The value of the attribute `name` in namespace `uri`, or `""`.
    #[must_use]
    pub fn value_of_ns(&self, name: &str, uri: &str) -> &str {
        self.index_of_ns(name, uri).map_or("", |i| self.value(i))
    }

    /// The value of the attribute with exactly `qname`, or `""`.
    #[must_use]
    pub fn value_of_qname(&self, qname: &QualifiedName) -> &str {
        self.index_of_qname(qname).map_or("", |i| self.value(i))
    }

    // --- Size and iteration ---

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &str)> {
        self.entries.iter().map(|(q, v)| (q, v.as_str()))
    }

    /// Removes and returns every entry, leaving the set empty.
    pub(crate) fn drain(&mut self) -> Vec<(QualifiedName, String)> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_sentinels() {
        let attrs = AttributeSet::new();
        assert_eq!(attrs.value(0), "");
        assert_eq!(attrs.name(0), "");
        assert_eq!(attrs.prefixed_name(0), "");
        assert_eq!(attrs.index_of("x"), None);
        assert!(!attrs.has_index(0));
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_add_preserves_order() {
        let mut attrs = AttributeSet::new();
        assert_eq!(attrs.add("b", "2"), Status::Success);
        assert_eq!(attrs.add("a", "1"), Status::Success);
        assert_eq!(attrs.add("c", "3"), Status::Success);

        let names: Vec<&str> = attrs.iter().map(|(q, _)| q.name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_add_does_not_replace() {
        let mut attrs = AttributeSet::new();
        let _ = attrs.add("id", "one");
        let _ = attrs.add("id", "two");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.value_of("id"), "one");
    }

    #[test]
    fn test_bare_name_lookup_returns_first_across_namespaces() {
        let mut attrs = AttributeSet::new();
        let _ = attrs.add_ns("color", "green", "urn:a", "a");
        let _ = attrs.add_ns("color", "white", "urn:b", "b");
        assert_eq!(attrs.index_of("color"), Some(0));
        assert_eq!(attrs.index_of_ns("color", "urn:b"), Some(1));
        assert_eq!(attrs.value_of_ns("color", "urn:b"), "white");
        assert_eq!(attrs.value_of_ns("color", "urn:c"), "");
    }

    #[test]
    fn test_namespace_lookup_ignores_prefix() {
        let mut attrs = AttributeSet::new();
        let _ = attrs.add_ns("color", "green", "urn:a", "a");
        assert_eq!(attrs.index_of_ns("color", "urn:a"), Some(0));
        assert_eq!(
            attrs.index_of_qname(&QualifiedName::new("color", "urn:a", "other")),
            None
        );
        assert!(attrs.has_qname(&QualifiedName::new("color", "urn:a", "a")));
    }

    #[test]
    fn test_index_getters() {
        let mut attrs = AttributeSet::new();
        let _ = attrs.add_ns("bgcolor", "green", "urn:lsid:mysim.org", "mysim");
        assert_eq!(attrs.name(0), "bgcolor");
        assert_eq!(attrs.prefix(0), "mysim");
        assert_eq!(attrs.uri(0), "urn:lsid:mysim.org");
        assert_eq!(attrs.prefixed_name(0), "mysim:bgcolor");
        assert_eq!(attrs.value(0), "green");
        assert_eq!(attrs.uri(1), "");
    }

    #[test]
    fn test_remove_variants() {
        let mut attrs = AttributeSet::new();
        let _ = attrs.add("a", "1");
        let _ = attrs.add_ns("b", "2", "urn:x", "x");
        let _ = attrs.add("c", "3");
        let _ = attrs.add("d", "4");

        assert_eq!(attrs.remove(9), Status::IndexOutOfRange);
        assert_eq!(attrs.remove_named("zz"), Status::NotFound);
        assert_eq!(attrs.remove_ns("b", "urn:y"), Status::NotFound);

        assert_eq!(attrs.remove_ns("b", "urn:x"), Status::Success);
        assert_eq!(attrs.remove_named("a"), Status::Success);
        assert_eq!(
            attrs.remove_qname(&QualifiedName::local("d")),
            Status::Success
        );
        assert_eq!(attrs.remove(0), Status::Success);
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut attrs = AttributeSet::new();
        let _ = attrs.add("a", "1");
        let mut copy = attrs.clone();
        let _ = copy.add("b", "2");
        let _ = copy.remove_named("a");

        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.value_of("a"), "1");
        assert_eq!(copy.value_of("a"), "");
    }

    #[test]
    fn test_equality_is_ordered() {
        let mut a = AttributeSet::new();
        let _ = a.add("x", "1");
        let _ = a.add("y", "2");
        let mut b = AttributeSet::new();
        let _ = b.add("y", "2");
        let _ = b.add("x", "1");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_clear() {
        let mut attrs = AttributeSet::new();
        let _ = attrs.add("a", "1");
        assert_eq!(attrs.clear(), Status::Success);
        assert_eq!(attrs.len(), 0);
    }
}
