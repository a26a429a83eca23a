//! Label sets and record metadata
//!
//! This module provides:
//! - `LabelSet`: stream identity as a name -> value mapping
//! - `Metadata`: ordered per-record annotations, duplicates allowed

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Well-known label names
pub const LEVEL_LABEL: &str = "level";
pub const SERVICE_NAME_LABEL: &str = "service_name";
pub const CLUSTER_LABEL: &str = "cluster";
pub const NAMESPACE_LABEL: &str = "namespace";
pub const ENV_LABEL: &str = "env";

/// Name -> value label mapping identifying a log stream
///
/// Keys are unique. The set is semantically unordered; it is stored sorted so
/// that display output is deterministic.
///
/// # Example
///
/// ```
/// use rust_log_generator::LabelSet;
///
/// let base = LabelSet::from([("service_name", "api"), ("level", "info")]);
/// let merged = base.merge(&LabelSet::from([("level", "error")]));
///
/// assert_eq!(merged.get("level"), Some("error"));
/// assert_eq!(base.get("level"), Some("info"));
/// ```
/// Serializes as a plain JSON object, the shape of a Loki stream selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label, replacing any previous value
    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Merge two sets into a new one; values from `other` win
    #[must_use]
    pub fn merge(&self, other: &LabelSet) -> LabelSet {
        let mut labels = self.labels.clone();
        for (name, value) in &other.labels {
            labels.insert(name.clone(), value.clone());
        }
        LabelSet { labels }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LabelSet {
            labels: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Prometheus-style rendering: `{cluster="eu-west-1", level="info"}`
impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (name, value)) in self.labels.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", name, value)?;
        }
        f.write_str("}")
    }
}

/// One metadata annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered sequence of name/value annotations attached to one record
///
/// Order is preserved and duplicates are kept; lookups are first-match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Metadata {
    entries: Vec<MetadataEntry>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(MetadataEntry::new(name, value));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(MetadataEntry::new(name, value));
    }

    /// Value of the first entry called `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetadataEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = &'a MetadataEntry;
    type IntoIter = std::slice::Iter<'a, MetadataEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Metadata {
            entries: iter
                .into_iter()
                .map(|(k, v)| MetadataEntry::new(k, v))
                .collect(),
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, entry) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:?}", entry.name, entry.value)?;
        }
        f.write_str("]")
    }
}
