//! Keyword sets: the filter terms a subscription is scoped to.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// An ordered collection of distinct, non-blank filter terms.
///
/// Order is preserved as supplied (it is what the transport sends), but
/// equality for change detection is by membership: see [`KeywordSet::same_members`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet {
    terms: Vec<String>,
}

impl KeywordSet {
    /// Build a set from caller-supplied terms.
    ///
    /// Terms are trimmed; blank terms are dropped and repeated terms collapse
    /// onto their first occurrence.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let terms = terms
            .into_iter()
            .map(|t| t.into().trim().to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { terms }
    }

    /// Parse a keyword file: one term per line, `#` starts a comment.
    pub fn parse_lines(text: &str) -> Self {
        Self::new(text.lines().map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.terms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    /// Returns `true` if both sets hold the same terms, in any order.
    pub fn same_members(&self, other: &KeywordSet) -> bool {
        self.len() == other.len() && self.terms.iter().all(|t| other.contains(t))
    }

    /// Terms in `self` that are not in `other`, in `self`'s order.
    pub fn difference(&self, other: &KeywordSet) -> Vec<String> {
        self.terms
            .iter()
            .filter(|t| !other.contains(t))
            .cloned()
            .collect()
    }

    /// Comma-joined form used by `track=` style filter parameters.
    pub fn to_track_param(&self) -> String {
        self.terms.join(",")
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(terms: Vec<String>) -> Self {
        Self::new(terms)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.terms
    }
}

impl<'a> IntoIterator for &'a KeywordSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

impl std::fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.terms.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_and_drops_duplicates() {
        let set = KeywordSet::new(["rust", "go", " rust ", "", "zig"]);
        assert_eq!(set.as_slice(), ["rust", "go", "zig"]);
    }

    #[test]
    fn membership_comparison_ignores_order() {
        let a = KeywordSet::new(["go", "rust"]);
        let b = KeywordSet::new(["rust", "go"]);
        assert!(a.same_members(&b));
        assert_ne!(a, b, "structural equality still sees the order");
        assert!(!a.same_members(&KeywordSet::new(["go"])));
    }

    #[test]
    fn difference_is_one_sided() {
        let old = KeywordSet::new(["go", "python"]);
        let new = KeywordSet::new(["go", "rust", "zig"]);
        assert_eq!(new.difference(&old), vec!["rust", "zig"]);
        assert_eq!(old.difference(&new), vec!["python"]);
        assert!(new.difference(&new).is_empty());
    }

    #[test]
    fn parse_keyword_file() {
        let text = "# tracked terms\nrust\n  go  # language\n\nzig\nrust\n";
        let set = KeywordSet::parse_lines(text);
        assert_eq!(set.as_slice(), ["rust", "go", "zig"]);
    }

    #[test]
    fn deserialize_normalises() {
        let set: KeywordSet = serde_json::from_str(r#"["a", "b", "a", " "]"#).unwrap();
        assert_eq!(set.to_track_param(), "a,b");
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["a","b"]"#);
    }
}
