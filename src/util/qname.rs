//! Qualified name handling.
//!
//! A qualified name is an XML name decomposed into its local part, its
//! namespace URI and the prefix used to write it, e.g. `mysim:bgcolor`
//! bound to `urn:lsid:mysim.org`. Missing parts are always the empty string,
//! never absent, so two names compare structurally over all three fields.
//!
//! See <https://www.w3.org/TR/xml-names/#NT-QName>

use std::fmt;

use crate::error::TreeError;

/// An XML name split into local name, namespace URI and prefix.
///
/// # Examples
///
/// ```
/// use xmlnode::QualifiedName;
///
/// let qname = QualifiedName::new("bgcolor", "urn:lsid:mysim.org", "mysim");
/// assert_eq!(qname.prefixed_name(), "mysim:bgcolor");
/// assert_eq!(qname.to_string(), "mysim:bgcolor (urn:lsid:mysim.org)");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    name: String,
    prefix: String,
    uri: String,
}

impl QualifiedName {
    /// Creates a qualified name from its three parts.
    #[must_use]
    pub fn new(name: &str, uri: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        }
    }

    /// Creates a name with no namespace and no prefix.
    #[must_use]
    pub fn local(name: &str) -> Self {
        Self::new(name, "", "")
    }

    /// Creates a qualified name from optional parts; `None` becomes `""`.
    #[must_use]
    pub fn from_parts(name: Option<&str>, uri: Option<&str>, prefix: Option<&str>) -> Self {
        Self::new(
            name.unwrap_or_default(),
            uri.unwrap_or_default(),
            prefix.unwrap_or_default(),
        )
    }

    /// Parses a delimited `name`, `uri<sep>name` or `uri<sep>name<sep>prefix`
    /// string. Each field is trimmed; trailing empty fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidTriple`] when the text does not split into
    /// one, two or three fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlnode::QualifiedName;
    ///
    /// let qname = QualifiedName::parse("http://www.w3.org/1999/xhtml p h", ' ').unwrap();
    /// assert_eq!(qname.name(), "p");
    /// assert_eq!(qname.prefix(), "h");
    /// assert!(QualifiedName::parse("a b c d", ' ').is_err());
    /// ```
    pub fn parse(text: &str, separator: char) -> Result<Self, TreeError> {
        let mut fields: Vec<&str> = text.split(separator).collect();
        while fields.len() > 1 && fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        match fields.as_slice() {
            [name] => Ok(Self::local(name.trim())),
            [uri, name] => Ok(Self::new(name.trim(), uri.trim(), "")),
            [uri, name, prefix] => Ok(Self::new(name.trim(), uri.trim(), prefix.trim())),
            _ => Err(TreeError::InvalidTriple {
                text: text.to_string(),
                separator,
            }),
        }
    }

    /// The local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The prefix, `""` when unprefixed.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The namespace URI, `""` when not in a namespace.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns `prefix:name`, or just `name` when there is no prefix.
    #[must_use]
    pub fn prefixed_name(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.prefix, self.name)
        }
    }

    /// Returns `true` when all three parts are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.uri.is_empty() && self.prefix.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed_name())?;
        if !self.uri.is_empty() {
            write!(f, " ({})", self.uri)?;
        }
        Ok(())
    }
}

/// Splits a lexical `QName` into its prefix and local name parts.
///
/// Returns `(Some(prefix), localname)` if the name contains a colon,
/// or `(None, localname)` if it does not.
#[must_use]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.find(':') {
        Some(pos) => (Some(&qname[..pos]), &qname[pos + 1..]),
        None => (None, qname),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_defaults_to_empty() {
        let qname = QualifiedName::from_parts(Some("p"), None, None);
        assert_eq!(qname.name(), "p");
        assert_eq!(qname.uri(), "");
        assert_eq!(qname.prefix(), "");
        assert!(QualifiedName::default().is_empty());
    }

    #[test]
    fn test_parse_one_field() {
        let qname = QualifiedName::parse(" notes ", ' ').unwrap();
        assert_eq!(qname, QualifiedName::local("notes"));
    }

    #[test]
    fn test_parse_two_fields() {
        let qname = QualifiedName::parse("urn:x|item", '|').unwrap();
        assert_eq!(qname.uri(), "urn:x");
        assert_eq!(qname.name(), "item");
        assert_eq!(qname.prefix(), "");
    }

    #[test]
    fn test_parse_three_fields() {
        let qname = QualifiedName::parse("urn:x|item|x", '|').unwrap();
        assert_eq!(qname, QualifiedName::new("item", "urn:x", "x"));
    }

    #[test]
    fn test_parse_ignores_trailing_separator() {
        let qname = QualifiedName::parse("urn:x item ", ' ').unwrap();
        assert_eq!(qname, QualifiedName::new("item", "urn:x", ""));
    }

    #[test]
    fn test_parse_too_many_fields() {
        let err = QualifiedName::parse("a|b|c|d", '|').unwrap_err();
        assert_eq!(
            err,
            TreeError::InvalidTriple {
                text: "a|b|c|d".to_string(),
                separator: '|',
            }
        );
    }

    #[test]
    fn test_prefixed_name() {
        assert_eq!(QualifiedName::local("p").prefixed_name(), "p");
        assert_eq!(
            QualifiedName::new("p", "http://www.w3.org/1999/xhtml", "h").prefixed_name(),
            "h:p"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(QualifiedName::local("p").to_string(), "p");
        assert_eq!(
            QualifiedName::new("p", "urn:x", "x").to_string(),
            "x:p (urn:x)"
        );
    }

    #[test]
    fn test_equality_and_hash_are_structural() {
        let a = QualifiedName::new("p", "urn:x", "x");
        let b = QualifiedName::new("p", "urn:x", "x");
        let c = QualifiedName::new("p", "urn:x", "y");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<QualifiedName> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_split_qname_with_prefix() {
        assert_eq!(split_qname("xml:lang"), (Some("xml"), "lang"));
    }

    #[test]
    fn test_split_qname_without_prefix() {
        assert_eq!(split_qname("div"), (None, "div"));
    }

    #[test]
    fn test_split_qname_multiple_colons() {
        // Only splits on first colon
        assert_eq!(split_qname("a:b:c"), (Some("a"), "b:c"));
    }
}
