//! Low-level document engine trait.
//!
//! Defines [`DocumentEngine`], the innermost layer of the in-memory record
//! collections: a synchronous key-value map from document id to
//! [`StoredDocument`]. Schema enforcement, id assignment, and merge semantics
//! live one layer up in [`MemoryCollections`](super::MemoryCollections).

use super::record::StoredDocument;

/// Typed id → document storage.
///
/// All operations are synchronous. Wrapped in `Arc<dyn DocumentEngine>` for
/// sharing across async boundaries.
pub trait DocumentEngine: Send + Sync + 'static {
    /// Insert or replace a document by id. Returns the previous document if any.
    fn put(&self, id: &str, doc: StoredDocument) -> Option<StoredDocument>;

    /// Retrieve a document by id, or `None` if not present.
    fn get(&self, id: &str) -> Option<StoredDocument>;

    /// Remove a document by id, returning the removed document.
    fn remove(&self, id: &str) -> Option<StoredDocument>;

    /// Check if an id exists without returning the document.
    fn contains_key(&self, id: &str) -> bool;

    /// Return the number of documents.
    fn len(&self) -> usize;

    /// Check if the engine is empty.
    fn is_empty(&self) -> bool;

    /// Point-in-time copy of all entries, sorted by id.
    fn snapshot(&self) -> Vec<(String, StoredDocument)>;
}
