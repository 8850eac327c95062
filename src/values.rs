//! The flat key/value multimap that form binding reads from.

use std::{
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
};

use indexmap::IndexMap;

/// Read access to an already-decoded form submission.
///
/// Binding only ever needs two things from its input: every value recorded
/// under a key, and the set of keys (to probe for repeated elements such as
/// `items[0].id`). Anything that can answer those questions can be bound from,
/// whether it came from a URL-encoded body, a multipart body or a query string.
pub trait FormSource {
    /// All values recorded under `key`, in submission order.
    fn values(&self, key: &str) -> Option<&[String]>;

    /// Every key present in the submission.
    fn keys(&self) -> impl Iterator<Item = &str>;

    /// The first value recorded under `key`.
    fn first(&self, key: &str) -> Option<&str> {
        self.values(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether `key` is present, even with an empty value list.
    fn contains_key(&self, key: &str) -> bool {
        self.values(key).is_some()
    }

    /// Whether any key addresses `prefix` itself or something nested below it
    /// (`prefix.child` or `prefix[0]`).
    ///
    /// An empty prefix is the root, which is addressed by any key at all.
    fn has_path(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return self.keys().next().is_some();
        }
        self.keys().any(|key| match key.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
            None => false,
        })
    }
}

/// An ordered multimap of form keys to their values.
///
/// Keys keep the order in which they were first seen; values keep the order in
/// which they were appended.
///
/// ```
/// use facet_form::{FormSource, FormValues};
///
/// let mut values = FormValues::new();
/// values.append("tags", "red");
/// values.append("tags", "blue");
/// values.set("name", "Alice");
///
/// assert_eq!(values.get("name"), Some("Alice"));
/// assert_eq!(values.get_all("tags"), ["red", "blue"]);
/// assert!(values.has_path("tags"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    entries: IndexMap<String, Vec<String>>,
}

impl FormValues {
    /// Creates an empty multimap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` after any values already recorded under `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Replaces every value recorded under `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), vec![value.into()]);
    }

    /// The first value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.first(key)
    }

    /// Every value recorded under `key`; empty when the key is absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values(key).unwrap_or_default()
    }

    /// Removes `key`, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(key)
    }

    /// Iterates over keys and their value lists in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FormSource for FormValues {
    fn values(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        values.extend(iter);
        values
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for FormValues {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key, value);
        }
    }
}

impl<S: BuildHasher> FormSource for HashMap<String, Vec<String>, S> {
    fn values(&self, key: &str) -> Option<&[String]> {
        self.get(key).map(Vec::as_slice)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        HashMap::keys(self).map(String::as_str)
    }
}

impl FormSource for BTreeMap<String, Vec<String>> {
    fn values(&self, key: &str) -> Option<&[String]> {
        self.get(key).map(Vec::as_slice)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        BTreeMap::keys(self).map(String::as_str)
    }
}

impl<S: BuildHasher> FormSource for IndexMap<String, Vec<String>, S> {
    fn values(&self, key: &str) -> Option<&[String]> {
        self.get(key).map(Vec::as_slice)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        IndexMap::keys(self).map(String::as_str)
    }
}
