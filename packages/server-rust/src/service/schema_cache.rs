//! Per-collection cache of compiled schemas.
//!
//! A cached entry is the [`SchemaSnapshot`] as fetched plus its compiled
//! [`RuleSet`]. Entries are shared as `Arc`s, so a batch that took an entry
//! keeps validating against it even if the entry is invalidated mid-run.

use std::sync::Arc;

use bulkdoc_core::{compile, RuleSet, SchemaSnapshot};
use dashmap::DashMap;
use tracing::debug;

use crate::traits::{RecordCollection, StoreError};

/// A schema snapshot with its compiled rules.
#[derive(Debug)]
pub struct CompiledSchema {
    pub snapshot: SchemaSnapshot,
    pub rules: RuleSet,
}

impl CompiledSchema {
    #[must_use]
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        let rules = compile(&snapshot.schema);
        Self { snapshot, rules }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }
}

/// Lazily-filled cache in front of [`RecordCollection::get_schema`].
pub struct SchemaCache {
    store: Arc<dyn RecordCollection>,
    entries: DashMap<String, Arc<CompiledSchema>>,
}

impl SchemaCache {
    #[must_use]
    pub fn new(store: Arc<dyn RecordCollection>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    /// Returns the cached entry, fetching and compiling it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the store's error when the schema cannot be fetched.
    pub async fn get(&self, collection: &str) -> Result<Arc<CompiledSchema>, StoreError> {
        if let Some(entry) = self.entries.get(collection) {
            return Ok(Arc::clone(entry.value()));
        }
        self.refresh(collection).await
    }

    /// Fetches the schema from the store and replaces the cached entry.
    ///
    /// # Errors
    ///
    /// Propagates the store's error; the previous entry is dropped in that case.
    pub async fn refresh(&self, collection: &str) -> Result<Arc<CompiledSchema>, StoreError> {
        match self.store.get_schema(collection).await {
            Ok(snapshot) => {
                let compiled = Arc::new(CompiledSchema::new(snapshot));
                debug!(collection, version = compiled.version(), "schema cached");
                self.entries
                    .insert(collection.to_string(), Arc::clone(&compiled));
                Ok(compiled)
            }
            Err(e) => {
                self.entries.remove(collection);
                Err(e)
            }
        }
    }

    /// Drops the cached entry so the next [`get`](Self::get) re-fetches.
    pub fn invalidate(&self, collection: &str) {
        if self.entries.remove(collection).is_some() {
            debug!(collection, "schema cache invalidated");
        }
    }

    /// Version of the cached entry, if any.
    #[must_use]
    pub fn cached_version(&self, collection: &str) -> Option<u64> {
        self.entries.get(collection).map(|entry| entry.version())
    }
}
