//! Bulk mutation orchestrator.
//!
//! A run goes through four stages, each finishing before the next starts:
//!
//! 1. **Parse** the raw input into documents (or identifiers for delete).
//! 2. **Validate** every document against one schema snapshot. Any failure
//!    aborts the batch before the store is touched.
//! 3. **Dispatch** one store call per document with bounded concurrency.
//!    Failures are recorded per document; nothing is retried or rolled back.
//! 4. **Aggregate** the outcomes, in input order, into a
//!    [`BulkOperationResult`].

use std::sync::Arc;
use std::time::Instant;

use bulkdoc_core::{
    document_id, parse, parse_id_batch, validate, BulkOperation, BulkOperationResult,
    ClockSource, Document, DocumentId, DocumentOutcome, FailureKind, RawBatchInput, RuleSet,
    SystemClock,
};
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::service::config::BulkConfig;
use crate::service::operation::{BulkError, NO_DOCUMENTS, NO_IDS};
use crate::service::schema_cache::SchemaCache;
use crate::traits::{MutationFailure, MutationOutcome, RecordCollection};

/// Reason recorded for an update whose document carries no string `"id"`.
pub const MISSING_ID_REASON: &str = "update requires a string 'id' field";
/// Reason recorded for a delete entry that has no identifier.
pub const MISSING_DELETE_ID_REASON: &str = "document has no string 'id' field to delete";

/// Operations that carry whole documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentWrite {
    Create,
    Update,
    Upsert,
}

impl From<DocumentWrite> for BulkOperation {
    fn from(write: DocumentWrite) -> Self {
        match write {
            DocumentWrite::Create => Self::Create,
            DocumentWrite::Update => Self::Update,
            DocumentWrite::Upsert => Self::Upsert,
        }
    }
}

/// Parsed batch, before validation.
enum Batch {
    Documents(DocumentWrite, Vec<Document>),
    Ids(Vec<Option<DocumentId>>),
}

impl Batch {
    fn parse(operation: BulkOperation, input: &RawBatchInput) -> Result<Self, BulkError> {
        let write = match operation {
            BulkOperation::Create => DocumentWrite::Create,
            BulkOperation::Update => DocumentWrite::Update,
            BulkOperation::Upsert => DocumentWrite::Upsert,
            BulkOperation::Delete => return Ok(Self::Ids(parse_id_batch(input)?)),
        };
        Ok(Self::Documents(write, parse(input)?))
    }

    fn len(&self) -> usize {
        match self {
            Self::Documents(_, docs) => docs.len(),
            Self::Ids(ids) => ids.len(),
        }
    }
}

/// Runs bulk operations against a [`RecordCollection`].
pub struct BulkOrchestrator {
    store: Arc<dyn RecordCollection>,
    schemas: Arc<SchemaCache>,
    config: BulkConfig,
    clock: Arc<dyn ClockSource>,
}

impl BulkOrchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordCollection>,
        schemas: Arc<SchemaCache>,
        config: BulkConfig,
    ) -> Self {
        Self::with_clock(store, schemas, config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        store: Arc<dyn RecordCollection>,
        schemas: Arc<SchemaCache>,
        config: BulkConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            store,
            schemas,
            config,
            clock,
        }
    }

    /// Runs `operation` over the batch in `input` against `collection`.
    ///
    /// # Errors
    ///
    /// Returns a [`BulkError`] when the batch is aborted before dispatch:
    /// undecodable, empty, or oversize input, an unavailable schema, or any
    /// document failing validation. Once dispatch starts the run always
    /// returns `Ok`, with per-document failures inside the result.
    pub async fn run(
        &self,
        operation: BulkOperation,
        collection: &str,
        input: &RawBatchInput,
    ) -> Result<BulkOperationResult, BulkError> {
        let started = Instant::now();
        let started_at = self.clock.now();

        let batch = Batch::parse(operation, input)?;
        self.check_size(operation, &batch)?;

        // One snapshot for the whole batch, even if the cache moves on.
        let compiled = self.schemas.get(collection).await?;

        info!(
            collection,
            operation = %operation,
            documents = batch.len(),
            schema_version = compiled.version(),
            "bulk run started"
        );

        let outcomes = match batch {
            Batch::Documents(write, docs) => {
                preflight(&compiled.rules, &docs)?;
                self.dispatch_documents(write, collection, docs).await
            }
            Batch::Ids(ids) => self.dispatch_ids(collection, ids).await,
        };

        let result = BulkOperationResult::from_outcomes(
            operation,
            collection,
            Some(compiled.version()),
            outcomes,
            started_at,
            self.clock.now(),
        );

        if result.has_schema_drift() {
            warn!(collection, "store rejected documents the cached schema accepted");
            self.schemas.invalidate(collection);
        }

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            collection,
            operation = %operation,
            success = result.success_count,
            failed = result.failure_count,
            duration_ms,
            "bulk run finished"
        );
        metrics::counter!("bulkdoc_bulk_runs_total", "operation" => operation.as_str())
            .increment(1);

        Ok(result)
    }

    fn check_size(&self, operation: BulkOperation, batch: &Batch) -> Result<(), BulkError> {
        let count = batch.len();
        if count == 0 {
            return Err(BulkError::EmptyBatch(match operation {
                BulkOperation::Delete => NO_IDS,
                _ => NO_DOCUMENTS,
            }));
        }
        let limit = self.config.max_batch_documents;
        if count > limit {
            return Err(BulkError::TooManyDocuments { count, limit });
        }
        Ok(())
    }

    fn concurrency(&self) -> usize {
        self.config.dispatch_concurrency.max(1)
    }

    async fn dispatch_documents(
        &self,
        write: DocumentWrite,
        collection: &str,
        docs: Vec<Document>,
    ) -> Vec<DocumentOutcome> {
        stream::iter(docs.into_iter().enumerate())
            .map(|(index, doc)| self.dispatch_document(write, collection, index, doc))
            .buffered(self.concurrency())
            .collect()
            .await
    }

    async fn dispatch_ids(
        &self,
        collection: &str,
        ids: Vec<Option<DocumentId>>,
    ) -> Vec<DocumentOutcome> {
        stream::iter(ids.into_iter().enumerate())
            .map(|(index, id)| async move {
                let Some(id) = id else {
                    return missing_id(BulkOperation::Delete, collection, index);
                };
                let result = self.store.delete_one(collection, &id).await;
                settle(BulkOperation::Delete, collection, index, Some(id), result)
            })
            .buffered(self.concurrency())
            .collect()
            .await
    }

    async fn dispatch_document(
        &self,
        write: DocumentWrite,
        collection: &str,
        index: usize,
        doc: Document,
    ) -> DocumentOutcome {
        let operation = BulkOperation::from(write);
        let id = document_id(&doc).map(ToString::to_string);
        let result = match (write, id.as_deref()) {
            (DocumentWrite::Create, _) => self.store.create_one(collection, doc).await,
            (DocumentWrite::Upsert, _) => self.store.upsert_one(collection, doc).await,
            (DocumentWrite::Update, Some(key)) => self.store.update_one(collection, key, doc).await,
            (DocumentWrite::Update, None) => return missing_id(operation, collection, index),
        };
        settle(operation, collection, index, id, result)
    }
}

fn missing_id(operation: BulkOperation, collection: &str, index: usize) -> DocumentOutcome {
    let reason = match operation {
        BulkOperation::Delete => MISSING_DELETE_ID_REASON,
        _ => MISSING_ID_REASON,
    };
    record(
        operation,
        collection,
        DocumentOutcome::failed(index, None, FailureKind::MissingId, reason),
    )
}

/// Validates every document, collecting all errors before deciding.
fn preflight(rules: &RuleSet, docs: &[Document]) -> Result<(), BulkError> {
    let errors: Vec<String> = docs
        .iter()
        .enumerate()
        .flat_map(|(i, doc)| {
            validate(rules, doc)
                .errors
                .into_iter()
                .map(move |e| format!("document {}: {e}", i + 1))
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BulkError::Validation { errors })
    }
}

/// Turns a store result into an outcome. The stored document's id wins over
/// the submitted one so generated ids are reported.
fn settle(
    operation: BulkOperation,
    collection: &str,
    index: usize,
    id: Option<DocumentId>,
    result: MutationOutcome,
) -> DocumentOutcome {
    let outcome = match result {
        Ok(stored) => {
            DocumentOutcome::success(index, document_id(&stored).map(ToString::to_string).or(id))
        }
        Err(failure) => {
            let kind = match failure {
                MutationFailure::SchemaMismatch(_) => FailureKind::SchemaDrift,
                _ => FailureKind::Mutation,
            };
            DocumentOutcome::failed(index, id, kind, failure.to_string())
        }
    };
    record(operation, collection, outcome)
}

fn record(operation: BulkOperation, collection: &str, outcome: DocumentOutcome) -> DocumentOutcome {
    let label = match outcome.failure_kind() {
        None => "success",
        Some(FailureKind::Mutation) => "mutation",
        Some(FailureKind::SchemaDrift) => "schema_drift",
        Some(FailureKind::MissingId) => "missing_id",
    };
    if let Some(message) = outcome.error_message() {
        warn!(collection, operation = %operation, kind = label, "{message}");
    }
    metrics::counter!(
        "bulkdoc_documents_total",
        "operation" => operation.as_str(),
        "outcome" => label
    )
    .increment(1);
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bulkdoc_core::{
        CollectionSchema, FieldDefinition, FieldType, ManualClock, SchemaSnapshot,
    };
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use super::*;
    use crate::storage::MemoryCollections;
    use crate::traits::StoreError;

    fn products() -> CollectionSchema {
        CollectionSchema::new(
            "products",
            vec![
                FieldDefinition::new("id", FieldType::String).optional(),
                FieldDefinition::new("title", FieldType::String),
                FieldDefinition::new("price", FieldType::Float),
                FieldDefinition::new("tags", FieldType::StringArray).optional(),
            ],
        )
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn jsonl(values: &[Value]) -> RawBatchInput {
        let content: String = values.iter().map(|v| format!("{v}\n")).collect();
        RawBatchInput::file("batch.jsonl", content)
    }

    /// Wraps a [`MemoryCollections`] and counts every store call.
    struct CountingStore {
        inner: MemoryCollections,
        writes: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl CountingStore {
        fn new() -> Arc<Self> {
            let inner = MemoryCollections::with_clock(Arc::new(ManualClock::new(10)));
            inner.create_collection(products()).unwrap();
            Arc::new(Self {
                inner,
                writes: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn note(&self, call: String) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().push(call);
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordCollection for CountingStore {
        async fn get_schema(&self, collection: &str) -> Result<SchemaSnapshot, StoreError> {
            self.inner.get_schema(collection).await
        }

        async fn create_one(&self, collection: &str, document: Document) -> MutationOutcome {
            self.note(format!("create {:?}", document_id(&document)));
            self.inner.create_one(collection, document).await
        }

        async fn update_one(
            &self,
            collection: &str,
            id: &str,
            document: Document,
        ) -> MutationOutcome {
            self.note(format!("update {id}"));
            self.inner.update_one(collection, id, document).await
        }

        async fn upsert_one(&self, collection: &str, document: Document) -> MutationOutcome {
            self.note(format!("upsert {:?}", document_id(&document)));
            self.inner.upsert_one(collection, document).await
        }

        async fn delete_one(&self, collection: &str, id: &str) -> MutationOutcome {
            self.note(format!("delete {id}"));
            self.inner.delete_one(collection, id).await
        }
    }

    fn orchestrator(store: &Arc<CountingStore>, config: BulkConfig) -> BulkOrchestrator {
        let store: Arc<dyn RecordCollection> = store.clone();
        let schemas = Arc::new(SchemaCache::new(Arc::clone(&store)));
        BulkOrchestrator::with_clock(store, schemas, config, Arc::new(ManualClock::new(10)))
    }

    async fn seed(store: &CountingStore, ids: &[&str]) {
        for id in ids {
            store
                .inner
                .create_one(
                    "products",
                    doc(json!({"id": id, "title": "seed", "price": 1.0})),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn delete_reports_missing_ids_per_document() {
        let store = CountingStore::new();
        seed(&store, &["a1", "a2"]).await;
        let bulk = orchestrator(&store, BulkConfig::default());

        let result = bulk
            .run(
                BulkOperation::Delete,
                "products",
                &RawBatchInput::text("a1\na2\nmissing1\n"),
            )
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("missing1"));
        assert_eq!(result.outcomes[2].failure_kind(), Some(FailureKind::Mutation));
        assert_eq!(store.inner.document_count("products"), 0);
    }

    #[tokio::test]
    async fn validation_failure_makes_no_store_calls() {
        let store = CountingStore::new();
        let bulk = orchestrator(&store, BulkConfig::default());
        let mut batch: Vec<Value> = (1..=10)
            .map(|i| json!({"id": format!("p{i}"), "title": "ok", "price": 1.5}))
            .collect();
        batch[6] = json!({"id": "p7", "title": "bad", "price": "12.5"});

        let err = bulk
            .run(BulkOperation::Create, "products", &jsonl(&batch))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Validation errors: document 7: field 'price' must be a number"
        );
        assert_eq!(store.writes(), 0);
        assert_eq!(store.inner.document_count("products"), 0);
    }

    #[tokio::test]
    async fn validation_collects_every_document_error() {
        let store = CountingStore::new();
        let bulk = orchestrator(&store, BulkConfig::default());
        let batch = [
            json!({"id": "p1", "price": 1.0}),
            json!({"id": "p2", "title": "ok", "price": 2.0}),
            json!({"id": "p3", "title": 3, "price": null}),
        ];

        let Err(BulkError::Validation { errors }) =
            bulk.run(BulkOperation::Upsert, "products", &jsonl(&batch)).await
        else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors,
            vec![
                "document 1: field 'title' is required",
                "document 3: field 'title' must be a string",
                "document 3: field 'price' is required",
            ]
        );
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn upload_with_unsupported_extension_is_a_parse_error() {
        let store = CountingStore::new();
        let bulk = orchestrator(&store, BulkConfig::default());

        let err = bulk
            .run(
                BulkOperation::Create,
                "products",
                &RawBatchInput::file("data.csv", "id,title\n1,x\n"),
            )
            .await
            .unwrap_err();

        assert!(err.is_parse_error());
        assert!(err.to_string().starts_with("unsupported file format"));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn empty_batches_are_rejected() {
        let store = CountingStore::new();
        let bulk = orchestrator(&store, BulkConfig::default());

        let err = bulk
            .run(BulkOperation::Create, "products", &RawBatchInput::text("  \n"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no documents provided");

        let err = bulk
            .run(BulkOperation::Delete, "products", &RawBatchInput::text("\n\n"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "please provide document IDs to delete");
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn oversize_batches_are_rejected() {
        let store = CountingStore::new();
        let config = BulkConfig {
            max_batch_documents: 2,
            ..BulkConfig::default()
        };
        let bulk = orchestrator(&store, config);

        let err = bulk
            .run(BulkOperation::Delete, "products", &RawBatchInput::text("a\nb\nc"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BulkError::TooManyDocuments { count: 3, limit: 2 }
        ));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn unknown_collection_is_fatal() {
        let store = CountingStore::new();
        let bulk = orchestrator(&store, BulkConfig::default());

        let err = bulk
            .run(BulkOperation::Delete, "orders", &RawBatchInput::text("a1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BulkError::SchemaUnavailable(StoreError::CollectionNotFound(_))
        ));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn create_reports_duplicates_and_generated_ids() {
        let store = CountingStore::new();
        seed(&store, &["p1"]).await;
        let bulk = orchestrator(&store, BulkConfig::default());
        let batch = [
            json!({"id": "p1", "title": "dup", "price": 1.0}),
            json!({"title": "fresh", "price": 2.0}),
        ];

        let result = bulk
            .run(BulkOperation::Create, "products", &jsonl(&batch))
            .await
            .unwrap();

        assert_eq!(result.total(), 2);
        assert_eq!(result.success_count, 1);
        assert_eq!(
            result.errors,
            vec!["document 1 (id 'p1'): a document with id 'p1' already exists"]
        );
        let generated = result.outcomes[1].id.clone().unwrap();
        assert_eq!(generated.len(), 36);
        assert!(store.inner.document("products", &generated).is_some());
    }

    #[tokio::test]
    async fn update_without_id_is_not_sent_to_the_store() {
        let store = CountingStore::new();
        seed(&store, &["p1"]).await;
        let bulk = orchestrator(&store, BulkConfig::default());

        let outcomes = bulk
            .dispatch_documents(
                DocumentWrite::Update,
                "products",
                vec![
                    doc(json!({"title": "no id", "price": 1.0})),
                    doc(json!({"id": "p1", "title": "renamed", "price": 9.0})),
                    doc(json!({"id": "ghost", "title": "x", "price": 1.0})),
                ],
            )
            .await;

        assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::MissingId));
        assert!(outcomes[1].is_success());
        assert_eq!(outcomes[2].failure_kind(), Some(FailureKind::Mutation));
        assert_eq!(*store.calls.lock(), vec!["update p1", "update ghost"]);
        assert_eq!(
            store.inner.document("products", "p1").unwrap()["title"],
            json!("renamed")
        );
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = CountingStore::new();
        let bulk = orchestrator(&store, BulkConfig::default());
        let batch = [
            json!({"id": "p1", "title": "one", "price": 1.0}),
            json!({"id": "p2", "title": "two", "price": 2.0, "tags": ["a"]}),
        ];

        let first = bulk
            .run(BulkOperation::Upsert, "products", &jsonl(&batch))
            .await
            .unwrap();
        let after_first = store.inner.documents("products");
        let second = bulk
            .run(BulkOperation::Upsert, "products", &jsonl(&batch))
            .await
            .unwrap();

        assert_eq!(first.success_count, 2);
        assert_eq!(second.success_count, 2);
        assert_eq!(store.inner.documents("products"), after_first);
    }

    #[tokio::test]
    async fn schema_drift_is_distinct_and_invalidates_cache() {
        let store = CountingStore::new();
        let store_dyn: Arc<dyn RecordCollection> = store.clone();
        let schemas = Arc::new(SchemaCache::new(Arc::clone(&store_dyn)));
        let bulk = BulkOrchestrator::new(store_dyn, Arc::clone(&schemas), BulkConfig::default());

        // Warm the cache, then tighten the live schema behind its back.
        schemas.get("products").await.unwrap();
        let mut live = products();
        live.fields.push(FieldDefinition::new("brand", FieldType::String));
        store.inner.replace_schema(live).unwrap();

        let batch = [json!({"id": "p1", "title": "one", "price": 1.0})];
        let result = bulk
            .run(BulkOperation::Create, "products", &jsonl(&batch))
            .await
            .unwrap();

        assert_eq!(result.schema_version, Some(1));
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.outcomes[0].failure_kind(), Some(FailureKind::SchemaDrift));
        assert!(result.has_schema_drift());
        assert_eq!(schemas.cached_version("products"), None);

        // Next run picks up the new schema and fails pre-flight instead.
        let err = bulk
            .run(BulkOperation::Create, "products", &jsonl(&batch))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation errors: document 1: field 'brand' is required"
        );
    }

    #[tokio::test]
    async fn delete_from_document_file_uses_ids() {
        let store = CountingStore::new();
        seed(&store, &["a1"]).await;
        let bulk = orchestrator(&store, BulkConfig::default());

        let result = bulk
            .run(
                BulkOperation::Delete,
                "products",
                &jsonl(&[json!({"id": "a1"}), json!({"title": "no id"})]),
            )
            .await
            .unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.outcomes[1].failure_kind(), Some(FailureKind::MissingId));
        assert_eq!(*store.calls.lock(), vec!["delete a1"]);
    }

    #[tokio::test]
    async fn delete_from_json_array_of_ids() {
        let store = CountingStore::new();
        seed(&store, &["a1", "a2", "a3"]).await;
        let bulk = orchestrator(&store, BulkConfig::default());

        let pasted = bulk
            .run(
                BulkOperation::Delete,
                "products",
                &RawBatchInput::text(r#"["a1", "a2"]"#),
            )
            .await
            .unwrap();
        assert_eq!(pasted.success_count, 2);
        assert_eq!(pasted.failure_count, 0);

        let uploaded = bulk
            .run(
                BulkOperation::Delete,
                "products",
                &RawBatchInput::file("ids.json", r#"["a3", {"id": "gone"}]"#),
            )
            .await
            .unwrap();
        assert_eq!(uploaded.success_count, 1);
        assert_eq!(
            uploaded.errors,
            vec!["document 2 (id 'gone'): document 'gone' not found"]
        );
        assert_eq!(
            *store.calls.lock(),
            vec!["delete a1", "delete a2", "delete a3", "delete gone"]
        );
        assert_eq!(store.inner.document_count("products"), 0);
    }

    #[tokio::test]
    async fn outcomes_keep_input_order_under_concurrency() {
        let store = CountingStore::new();
        let config = BulkConfig {
            dispatch_concurrency: 8,
            ..BulkConfig::default()
        };
        let bulk = orchestrator(&store, config);
        let batch: Vec<Value> = (0..40)
            .map(|i| json!({"id": format!("p{i}"), "title": "t", "price": 1.0}))
            .collect();

        let result = bulk
            .run(BulkOperation::Upsert, "products", &jsonl(&batch))
            .await
            .unwrap();

        let indexes: Vec<usize> = result.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indexes, (0..40).collect::<Vec<_>>());
        let ids: Vec<String> = result.outcomes.iter().filter_map(|o| o.id.clone()).collect();
        assert_eq!(ids[17], "p17");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn counts_sum_to_batch_size(
            present in proptest::collection::vec(any::<bool>(), 1..20),
            concurrency in 1usize..6,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let store = CountingStore::new();
                let seeded: Vec<String> = present
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| **p)
                    .map(|(i, _)| format!("d{i}"))
                    .collect();
                let refs: Vec<&str> = seeded.iter().map(String::as_str).collect();
                seed(&store, &refs).await;

                let config = BulkConfig { dispatch_concurrency: concurrency, ..BulkConfig::default() };
                let bulk = orchestrator(&store, config);
                let ids: String = (0..present.len()).map(|i| format!("d{i}\n")).collect();
                let result = bulk
                    .run(BulkOperation::Delete, "products", &RawBatchInput::text(ids))
                    .await
                    .unwrap();

                prop_assert_eq!(result.success_count + result.failure_count, present.len());
                prop_assert_eq!(result.success_count, seeded.len());
                prop_assert_eq!(store.writes(), present.len());
                Ok(())
            })?;
        }
    }
}
