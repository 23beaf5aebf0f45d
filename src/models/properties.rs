//! String-keyed property bag shared by elements, data sources and providers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, multi-valued string property store
///
/// Keys keep the order in which they were first inserted. [`add`](Self::add)
/// appends a value to a key without touching earlier values, while
/// [`set`](Self::set) replaces every value stored under the key. Reading a key
/// that holds several values yields them joined with `,`.
///
/// Keys are case-sensitive.
///
/// # Example
///
/// ```rust
/// use report_composer::models::PropertyContainer;
///
/// let mut props = PropertyContainer::new();
/// props.add("class", "wide");
/// props.add("class", "bold");
/// assert_eq!(props.get("class").as_deref(), Some("wide,bold"));
///
/// props.set("class", "narrow");
/// assert_eq!(props.get("class").as_deref(), Some("narrow"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyContainer {
    entries: Vec<PropertyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PropertyEntry {
    key: String,
    values: Vec<String>,
}

impl PropertyContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`, joining multiple values with `,`
    pub fn get(&self, key: &str) -> Option<String> {
        self.entry(key).map(|e| e.values.join(","))
    }

    /// Get every value stored under `key`, in insertion order
    pub fn get_values(&self, key: &str) -> &[String] {
        self.entry(key).map(|e| e.values.as_slice()).unwrap_or(&[])
    }

    /// Append a value under `key`; earlier values are kept
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.values.push(value),
            None => self.entries.push(PropertyEntry {
                key,
                values: vec![value],
            }),
        }
        self
    }

    /// Replace every value under `key` with `value`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.values = vec![value],
            None => self.entries.push(PropertyEntry {
                key,
                values: vec![value],
            }),
        }
        self
    }

    /// Remove `key` and all its values, returning the joined value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(index).values.join(","))
    }

    /// Check whether `key` holds at least one value
    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Keys in first-insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// `(key, joined value)` pairs in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.values.join(",")))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: &str) -> Option<&PropertyEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

impl fmt::Display for PropertyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyContainer
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = PropertyContainer::new();
        for (k, v) in iter {
            props.add(k, v);
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_previous_values() {
        let mut props = PropertyContainer::new();
        props.add("queries", "SELECT 1");
        props.add("queries", "SELECT 2");

        assert_eq!(props.get_values("queries"), ["SELECT 1", "SELECT 2"]);
        assert_eq!(props.get("queries").as_deref(), Some("SELECT 1,SELECT 2"));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_set_overwrites() {
        let mut props = PropertyContainer::new();
        props.add("height", "1");
        props.add("height", "2");
        props.set("height", "3");

        assert_eq!(props.get("height").as_deref(), Some("3"));
        assert_eq!(props.get_values("height").len(), 1);
    }

    #[test]
    fn test_keys_are_case_sensitive_and_ordered() {
        let mut props = PropertyContainer::new();
        props.set("b", "1");
        props.set("a", "2");
        props.set("B", "3");

        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["b", "a", "B"]);
        assert!(props.get("A").is_none());
    }

    #[test]
    fn test_remove() {
        let mut props: PropertyContainer = [("x", "1"), ("y", "2")].into_iter().collect();
        assert_eq!(props.remove("x").as_deref(), Some("1"));
        assert!(!props.contains_key("x"));
        assert!(props.remove("x").is_none());
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_display() {
        let props: PropertyContainer = [("name", "main"), ("height", "2")].into_iter().collect();
        assert_eq!(props.to_string(), "{name=main, height=2}");
    }
}
