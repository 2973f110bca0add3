//! The immutable key/value catalog produced by a resolver run.

use std::collections::BTreeMap;
use tracing::info;

use crate::injection::Injection;

/// Complete `key → injection` map for one run.
///
/// Built once by the resolver and only read afterwards; output-file tasks
/// share it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, Injection>,
}

impl Catalog {
    /// Catalog over already-resolved entries.
    pub fn from_entries(entries: BTreeMap<String, Injection>) -> Self {
        Self {
            entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Injection> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Injection)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Log every entry with its log-safe value.
    pub fn log_entries(&self) {
        for (key, injection) in &self.entries {
            info!("Resolved key {} with value {}", key, injection.provision_log_value());
        }
    }
}

impl FromIterator<(String, Injection)> for Catalog {
    fn from_iter<T: IntoIterator<Item = (String, Injection)>>(iter: T) -> Self {
        Self::from_entries(iter.into_iter().collect())
    }
}
