//! Stored document types for the in-memory record collections.

use bulkdoc_core::Document;

/// Metadata tracked for every stored document.
///
/// Store-internal: never returned through the
/// [`RecordCollection`](crate::traits::RecordCollection) API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Document version, incremented on every write.
    pub version: u32,
    /// Wall-clock time (millis since epoch) when this document was created.
    pub creation_time: u64,
    /// Wall-clock time of the last write.
    pub last_update_time: u64,
    /// Version of the collection schema the last write was checked against.
    pub schema_version: u64,
}

impl DocumentMetadata {
    /// Creates metadata for a freshly inserted document. Version starts at 1.
    #[must_use]
    pub fn new(now: u64, schema_version: u64) -> Self {
        Self {
            version: 1,
            creation_time: now,
            last_update_time: now,
            schema_version,
        }
    }

    /// Records a write: increments `version` and updates `last_update_time`.
    pub fn on_update(&mut self, now: u64, schema_version: u64) {
        self.version = self.version.saturating_add(1);
        self.last_update_time = now;
        self.schema_version = schema_version;
    }
}

/// A document plus store-internal metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub document: Document,
    pub metadata: DocumentMetadata,
}
