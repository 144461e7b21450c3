//! Entry points used by the HTTP layer.

use std::sync::Arc;

use bulkdoc_core::{
    blank_document, validate, BulkOperation, BulkOperationResult, CollectionSchema, Document,
    RawBatchInput, ValidationResult,
};
use serde::Serialize;

use crate::service::bulk::BulkOrchestrator;
use crate::service::config::ServerConfig;
use crate::service::operation::BulkError;
use crate::service::report::{summary_for_error, to_summary, BulkSummary};
use crate::service::schema_cache::SchemaCache;
use crate::traits::{RecordCollection, StoreError};

/// Schema of a collection plus the blank document a create form starts from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaForm {
    pub version: u64,
    pub schema: CollectionSchema,
    pub blank_document: Document,
}

/// Document operations over one [`RecordCollection`].
pub struct DocumentService {
    schemas: Arc<SchemaCache>,
    bulk: BulkOrchestrator,
    config: ServerConfig,
}

impl DocumentService {
    #[must_use]
    pub fn new(store: Arc<dyn RecordCollection>, config: ServerConfig) -> Self {
        let schemas = Arc::new(SchemaCache::new(Arc::clone(&store)));
        let bulk = BulkOrchestrator::new(store, Arc::clone(&schemas), config.bulk.clone());
        Self {
            schemas,
            bulk,
            config,
        }
    }

    /// Runs a bulk operation over a raw upload or pasted batch.
    ///
    /// # Errors
    ///
    /// See [`BulkOrchestrator::run`].
    pub async fn run_bulk_operation(
        &self,
        operation: BulkOperation,
        collection: &str,
        input: &RawBatchInput,
    ) -> Result<BulkOperationResult, BulkError> {
        self.bulk.run(operation, collection, input).await
    }

    /// Validates one document against the collection's cached schema.
    ///
    /// # Errors
    ///
    /// Fails when the schema cannot be fetched.
    pub async fn validate_single_document(
        &self,
        collection: &str,
        document: &Document,
    ) -> Result<ValidationResult, StoreError> {
        let compiled = self.schemas.get(collection).await?;
        Ok(validate(&compiled.rules, document))
    }

    /// Fetches a fresh schema and the blank document derived from it.
    ///
    /// # Errors
    ///
    /// Fails when the schema cannot be fetched.
    pub async fn schema_form(&self, collection: &str) -> Result<SchemaForm, StoreError> {
        let compiled = self.schemas.refresh(collection).await?;
        Ok(SchemaForm {
            version: compiled.version(),
            blank_document: blank_document(&compiled.snapshot.schema),
            schema: compiled.snapshot.schema.clone(),
        })
    }

    #[must_use]
    pub fn summarize(&self, result: &BulkOperationResult) -> BulkSummary {
        to_summary(result, self.config.bulk.error_preview_limit)
    }

    #[must_use]
    pub fn summarize_error(
        &self,
        operation: BulkOperation,
        collection: &str,
        error: &BulkError,
    ) -> BulkSummary {
        summary_for_error(
            operation,
            collection,
            error,
            self.config.bulk.error_preview_limit,
        )
    }
}
