//! In-memory [`DocumentEngine`] backed by [`DashMap`].
//!
//! Provides concurrent read/write access without external locking.

use dashmap::DashMap;

use crate::storage::engine::DocumentEngine;
use crate::storage::record::StoredDocument;

/// In-memory document storage backed by [`DashMap`].
///
/// Readers never block each other; writers lock a single shard.
pub struct HashMapEngine {
    entries: DashMap<String, StoredDocument>,
}

impl HashMapEngine {
    /// Creates a new, empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for HashMapEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentEngine for HashMapEngine {
    fn put(&self, id: &str, doc: StoredDocument) -> Option<StoredDocument> {
        self.entries.insert(id.to_string(), doc)
    }

    fn get(&self, id: &str) -> Option<StoredDocument> {
        self.entries.get(id).map(|r| r.clone())
    }

    fn remove(&self, id: &str) -> Option<StoredDocument> {
        self.entries.remove(id).map(|(_, d)| d)
    }

    fn contains_key(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn snapshot(&self) -> Vec<(String, StoredDocument)> {
        let mut entries: Vec<(String, StoredDocument)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use bulkdoc_core::Document;
    use serde_json::json;

    use super::*;
    use crate::storage::record::DocumentMetadata;

    fn make_doc(title: &str) -> StoredDocument {
        let mut document = Document::new();
        document.insert("title".to_string(), json!(title));
        StoredDocument {
            document,
            metadata: DocumentMetadata::new(0, 1),
        }
    }

    #[test]
    fn put_get_remove_round_trip() {
        let engine = HashMapEngine::new();

        assert!(engine.put("a1", make_doc("first")).is_none());
        assert_eq!(engine.get("a1").unwrap().document["title"], json!("first"));

        let previous = engine.put("a1", make_doc("second")).unwrap();
        assert_eq!(previous.document["title"], json!("first"));

        let removed = engine.remove("a1").unwrap();
        assert_eq!(removed.document["title"], json!("second"));
        assert!(engine.get("a1").is_none());
        assert!(engine.remove("a1").is_none());
    }

    #[test]
    fn len_and_contains() {
        let engine = HashMapEngine::new();
        assert!(engine.is_empty());

        engine.put("a", make_doc("a"));
        engine.put("b", make_doc("b"));
        assert_eq!(engine.len(), 2);
        assert!(engine.contains_key("a"));
        assert!(!engine.contains_key("z"));
        assert!(!engine.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let engine = HashMapEngine::new();
        for id in ["c", "a", "b"] {
            engine.put(id, make_doc(id));
        }
        let ids: Vec<String> = engine.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
