//! In-process [`RecordCollection`] implementation.
//!
//! [`MemoryCollections`] keeps one [`DocumentEngine`] per collection plus the
//! collection's live schema. Every write is checked against that live schema,
//! which is what lets a stale client-side snapshot surface as
//! [`MutationFailure::SchemaMismatch`] instead of silently storing a document
//! the current schema would reject.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bulkdoc_core::{
    compile, document_id, validate, ClockSource, CollectionSchema, Document, RuleSet,
    SchemaSnapshot, SystemClock, ID_FIELD,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::storage::engine::DocumentEngine;
use crate::storage::engines::HashMapEngine;
use crate::storage::record::{DocumentMetadata, StoredDocument};
use crate::traits::{MutationFailure, MutationOutcome, RecordCollection, StoreError};

/// Live state of one collection.
///
/// Replaced wholesale when the schema changes; the engine and write lock are
/// carried over so stored documents survive a schema change.
struct CollectionState {
    snapshot: SchemaSnapshot,
    rules: RuleSet,
    engine: Arc<dyn DocumentEngine>,
    /// Serializes check-then-write sequences (create collision, update merge).
    write_lock: Arc<Mutex<()>>,
}

impl CollectionState {
    fn check_live_schema(&self, document: &Document) -> Result<(), MutationFailure> {
        let result = validate(&self.rules, document);
        if result.is_valid {
            Ok(())
        } else {
            Err(MutationFailure::SchemaMismatch(result.errors.join("; ")))
        }
    }
}

/// In-memory document store with per-collection live schemas.
pub struct MemoryCollections {
    collections: DashMap<String, Arc<CollectionState>>,
    clock: Arc<dyn ClockSource>,
}

impl MemoryCollections {
    /// Creates an empty store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            collections: DashMap::new(),
            clock,
        }
    }

    /// Registers a new collection. Its schema starts at version 1.
    ///
    /// # Errors
    ///
    /// Fails if the schema violates its invariants or the name is taken.
    pub fn create_collection(&self, schema: CollectionSchema) -> Result<SchemaSnapshot, StoreError> {
        schema
            .check()
            .map_err(|e| StoreError::InvalidSchema(e.to_string()))?;

        let name = schema.name.clone();
        let snapshot = SchemaSnapshot { version: 1, schema };
        match self.collections.entry(name.clone()) {
            Entry::Occupied(_) => return Err(StoreError::CollectionExists(name)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(CollectionState {
                    rules: compile(&snapshot.schema),
                    snapshot: snapshot.clone(),
                    engine: Arc::new(HashMapEngine::new()),
                    write_lock: Arc::new(Mutex::new(())),
                }));
            }
        }

        info!(collection = %name, fields = snapshot.schema.fields.len(), "collection created");
        Ok(snapshot)
    }

    /// Replaces the schema of an existing collection and bumps its version.
    ///
    /// Stored documents are kept as they are; only later writes see the new schema.
    ///
    /// # Errors
    ///
    /// Fails if the schema violates its invariants or the collection is unknown.
    pub fn replace_schema(&self, schema: CollectionSchema) -> Result<SchemaSnapshot, StoreError> {
        schema
            .check()
            .map_err(|e| StoreError::InvalidSchema(e.to_string()))?;

        let mut entry = self
            .collections
            .get_mut(&schema.name)
            .ok_or_else(|| StoreError::CollectionNotFound(schema.name.clone()))?;

        let current = Arc::clone(entry.value());
        let snapshot = SchemaSnapshot {
            version: current.snapshot.version + 1,
            schema,
        };
        *entry.value_mut() = Arc::new(CollectionState {
            rules: compile(&snapshot.schema),
            snapshot: snapshot.clone(),
            engine: Arc::clone(&current.engine),
            write_lock: Arc::clone(&current.write_lock),
        });

        info!(
            collection = %snapshot.schema.name,
            version = snapshot.version,
            "collection schema replaced"
        );
        Ok(snapshot)
    }

    /// Removes a collection and all of its documents.
    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections.remove(name).is_some()
    }

    /// Names of all registered collections, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Reads a stored document.
    #[must_use]
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.state(collection)
            .ok()
            .and_then(|state| state.engine.get(id))
            .map(|stored| stored.document)
    }

    /// Reads a stored document's store-internal metadata.
    #[must_use]
    pub fn metadata(&self, collection: &str, id: &str) -> Option<DocumentMetadata> {
        self.state(collection)
            .ok()
            .and_then(|state| state.engine.get(id))
            .map(|stored| stored.metadata)
    }

    /// All documents of a collection, sorted by id.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.state(collection)
            .map(|state| {
                state
                    .engine
                    .snapshot()
                    .into_iter()
                    .map(|(_, stored)| stored.document)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of documents in a collection (0 if unknown).
    #[must_use]
    pub fn document_count(&self, collection: &str) -> usize {
        self.state(collection).map_or(0, |state| state.engine.len())
    }

    fn state(&self, collection: &str) -> Result<Arc<CollectionState>, MutationFailure> {
        self.collections
            .get(collection)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| MutationFailure::CollectionNotFound(collection.to_string()))
    }

    /// Writes `document` under `id`, creating or replacing. Caller holds the lock.
    fn write(&self, state: &CollectionState, id: &str, document: Document) -> Document {
        let now = self.clock.now();
        let version = state.snapshot.version;
        let metadata = match state.engine.get(id) {
            Some(existing) => {
                let mut metadata = existing.metadata;
                metadata.on_update(now, version);
                metadata
            }
            None => DocumentMetadata::new(now, version),
        };
        state.engine.put(
            id,
            StoredDocument {
                document: document.clone(),
                metadata,
            },
        );
        document
    }
}

impl Default for MemoryCollections {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a collection schema from a JSON file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a schema.
pub fn read_schema_file(path: impl AsRef<Path>) -> anyhow::Result<CollectionSchema> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid schema in {}", path.display()))
}

/// Returns the document's id, assigning a UUID v4 when it has none.
fn ensure_id(document: &mut Document) -> Result<String, MutationFailure> {
    let existing = match document.get(ID_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
        Some(_) => {
            return Err(MutationFailure::Rejected(
                "field 'id' must be a non-empty string".to_string(),
            ))
        }
    };
    if let Some(id) = existing {
        return Ok(id);
    }
    let id = uuid::Uuid::new_v4().to_string();
    document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    Ok(id)
}

#[async_trait]
impl RecordCollection for MemoryCollections {
    async fn get_schema(&self, collection: &str) -> Result<SchemaSnapshot, StoreError> {
        self.collections
            .get(collection)
            .map(|entry| entry.snapshot.clone())
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    async fn create_one(&self, collection: &str, mut document: Document) -> MutationOutcome {
        let state = self.state(collection)?;
        let id = ensure_id(&mut document)?;
        state.check_live_schema(&document)?;

        let _guard = state.write_lock.lock();
        if state.engine.contains_key(&id) {
            return Err(MutationFailure::AlreadyExists(id));
        }
        debug!(collection, id = %id, "document created");
        Ok(self.write(&state, &id, document))
    }

    async fn update_one(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> MutationOutcome {
        let state = self.state(collection)?;
        if let Some(other) = document_id(&document) {
            if other != id {
                return Err(MutationFailure::Rejected(format!(
                    "document id cannot change from '{id}' to '{other}'"
                )));
            }
        }

        let _guard = state.write_lock.lock();
        let existing = state
            .engine
            .get(id)
            .ok_or_else(|| MutationFailure::NotFound(id.to_string()))?;

        let mut merged = existing.document;
        for (key, value) in document {
            merged.insert(key, value);
        }
        state.check_live_schema(&merged)?;
        debug!(collection, id, "document updated");
        Ok(self.write(&state, id, merged))
    }

    async fn upsert_one(&self, collection: &str, mut document: Document) -> MutationOutcome {
        let state = self.state(collection)?;
        let id = ensure_id(&mut document)?;
        state.check_live_schema(&document)?;

        let _guard = state.write_lock.lock();
        debug!(collection, id = %id, "document upserted");
        Ok(self.write(&state, &id, document))
    }

    async fn delete_one(&self, collection: &str, id: &str) -> MutationOutcome {
        let state = self.state(collection)?;
        let _guard = state.write_lock.lock();
        let removed = state
            .engine
            .remove(id)
            .ok_or_else(|| MutationFailure::NotFound(id.to_string()))?;
        debug!(collection, id, "document deleted");
        Ok(removed.document)
    }
}
