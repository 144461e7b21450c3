//! Seam between the bulk engine and the document store.

use async_trait::async_trait;
use bulkdoc_core::{compile, validate, Document, SchemaSnapshot, ValidationResult};

/// Outcome of a single-document mutation: the stored document, or why it was
/// not stored.
pub type MutationOutcome = Result<Document, MutationFailure>;

/// Per-document rejection reported by the store.
///
/// Never fatal to a batch; the orchestrator records it against the document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationFailure {
    #[error("a document with id '{0}' already exists")]
    AlreadyExists(String),
    #[error("document '{0}' not found")]
    NotFound(String),
    /// The store's live schema rejected the document.
    #[error("rejected by the live schema: {0}")]
    SchemaMismatch(String),
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),
    #[error("{0}")]
    Rejected(String),
}

/// Errors from store calls that are not about one document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),
    #[error("collection '{0}' already exists")]
    CollectionExists(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// Record-collection API of the document store.
///
/// The bulk engine only needs schema reads and single-document writes. Each
/// call is assumed atomic for its one document; nothing spans documents.
/// Implementations: [`MemoryCollections`](crate::storage::MemoryCollections)
/// (in-process), remote stores (future).
#[async_trait]
pub trait RecordCollection: Send + Sync {
    /// Fetch the current schema of a collection with its version.
    async fn get_schema(&self, collection: &str) -> Result<SchemaSnapshot, StoreError>;

    /// Insert a new document. Fails on identifier collision.
    async fn create_one(&self, collection: &str, document: Document) -> MutationOutcome;

    /// Merge `document` into the existing document `id`. Fails if `id` is unknown.
    async fn update_one(&self, collection: &str, id: &str, document: Document)
        -> MutationOutcome;

    /// Create or replace a document by its identifier.
    async fn upsert_one(&self, collection: &str, document: Document) -> MutationOutcome;

    /// Remove document `id`, returning the removed document.
    async fn delete_one(&self, collection: &str, id: &str) -> MutationOutcome;

    /// Validate a document against the collection's current schema.
    ///
    /// The default compiles the fetched schema and runs the local validator, so
    /// the semantics are the same whether a store overrides it or not.
    async fn validate_against_schema(
        &self,
        collection: &str,
        document: &Document,
    ) -> Result<ValidationResult, StoreError> {
        let snapshot = self.get_schema(collection).await?;
        Ok(validate(&compile(&snapshot.schema), document))
    }
}
