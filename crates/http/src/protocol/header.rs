//! Ordered header storage backing [`Message`](super::Message).
//!
//! Unlike `http::HeaderMap`, the table keeps headers exactly in arrival order and
//! preserves the sender's spelling of every name, so a forwarded message leaves
//! the proxy looking the way it came in. Names are matched ASCII
//! case-insensitively; values are compared byte for byte.

use std::slice::Iter;

/// Result of [`HeaderTable::compare`].
///
/// Three-way so callers can tell a missing header apart from one that is present
/// with some other value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeaderMatch {
    Equal,
    NotEqual,
    Absent,
}

/// An ordered list of `(name, value)` pairs with first-match semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    entries: Vec<(String, String)>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Returns the value of the first header named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.entries[index].1.as_str())
    }

    /// Sets a header.
    ///
    /// With `search_first` the first header named `name` is updated in place and
    /// only appended if there is none; without it the pair is always appended,
    /// which is what the parser wants so repeated headers survive.
    pub fn set<N, V>(&mut self, name: N, value: V, search_first: bool)
    where
        N: Into<String> + AsRef<str>,
        V: Into<String>,
    {
        if search_first {
            if let Some(index) = self.position(name.as_ref()) {
                self.entries[index].1 = value.into();
                return;
            }
        }
        self.entries.push((name.into(), value.into()));
    }

    /// Update-or-append, the common case of [`HeaderTable::set`].
    pub fn insert<N, V>(&mut self, name: N, value: V)
    where
        N: Into<String> + AsRef<str>,
        V: Into<String>,
    {
        self.set(name, value, true);
    }

    /// Removes the first header named `name`, keeping the remaining order.
    ///
    /// Returns false when no such header exists.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn compare(&self, name: &str, value: &str) -> HeaderMatch {
        match self.get(name) {
            Some(current) if current == value => HeaderMatch::Equal,
            Some(_) => HeaderMatch::NotEqual,
            None => HeaderMatch::Absent,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> HeaderIter<'_> {
        HeaderIter { inner: self.entries.iter() }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

/// Iterator over `(name, value)` pairs in table order.
#[derive(Debug)]
pub struct HeaderIter<'a> {
    inner: Iter<'a, (String, String)>,
}

impl<'a> Iterator for HeaderIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<'a> IntoIterator for &'a HeaderTable {
    type Item = (&'a str, &'a str);
    type IntoIter = HeaderIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HeaderTable {
        let mut table = HeaderTable::new();
        table.set("Host", "a.example", false);
        table.set("Accept", "*/*", false);
        table.set("X-Dup", "one", false);
        table.set("X-Dup", "two", false);
        table
    }

    #[test]
    fn get_returns_first_match() {
        let table = table();
        assert_eq!(table.get("X-Dup"), Some("one"));
        assert_eq!(table.get("Missing"), None);
    }

    #[test]
    fn names_match_case_insensitively() {
        let table = table();
        assert_eq!(table.get("host"), Some("a.example"));
        assert_eq!(table.get("ACCEPT"), Some("*/*"));
    }

    #[test]
    fn set_with_search_updates_in_place() {
        let mut table = table();
        table.set("accept", "text/html", true);

        assert_eq!(table.len(), 4);
        let pairs: Vec<_> = table.iter().collect();
        // original spelling of the name is kept
        assert_eq!(pairs[1], ("Accept", "text/html"));
    }

    #[test]
    fn set_without_search_appends() {
        let mut table = table();
        table.set("Accept", "text/html", false);

        assert_eq!(table.len(), 5);
        assert_eq!(table.get("Accept"), Some("*/*"));
    }

    #[test]
    fn remove_keeps_order_dense() {
        let mut table = table();
        assert!(table.remove("x-dup"));
        assert!(!table.remove("Missing"));

        let pairs: Vec<_> = table.iter().collect();
        assert_eq!(pairs, vec![("Host", "a.example"), ("Accept", "*/*"), ("X-Dup", "two")]);
    }

    #[test]
    fn compare_is_three_way() {
        let table = table();
        assert_eq!(table.compare("Host", "a.example"), HeaderMatch::Equal);
        assert_eq!(table.compare("Host", "b.example"), HeaderMatch::NotEqual);
        assert_eq!(table.compare("Connection", "close"), HeaderMatch::Absent);
    }
}
