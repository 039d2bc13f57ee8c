//! In-memory response cache used by the cache policies.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use serde_json::Value;

/// Cache of successful response `data` keyed by document and variables.
#[derive(Debug, Default)]
pub struct ResponseCache {
    inner: Mutex<HashMap<u64, Value>>,
}

impl ResponseCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached data for a document/variables pair.
    #[must_use]
    pub fn get(&self, document: &str, variables: &Value) -> Option<Value> {
        let key = cache_key(document, variables);
        self.inner.lock().get(&key).cloned()
    }

    /// Store data for a document/variables pair.
    pub fn insert(&self, document: &str, variables: &Value, data: Value) {
        let key = cache_key(document, variables);
        self.inner.lock().insert(key, data);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

fn cache_key(document: &str, variables: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    document.hash(&mut hasher);
    // serde_json maps are ordered, so equal variables serialize identically.
    variables.to_string().hash(&mut hasher);
    hasher.finish()
}
