//! Bulk operation types shared between the orchestrator and its callers.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so the JSON handed to the
//! dashboard (and written into downloadable reports) reads `successCount`,
//! `failureCount`, and so on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DocumentId;

/// Default number of errors shown in a summary before collapsing the rest.
pub const DEFAULT_ERROR_PREVIEW: usize = 5;

/// A bulk mutation requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperation {
    /// Insert new documents; duplicates are rejected by the store.
    Create,
    /// Merge fields into existing documents, addressed by `"id"`.
    Update,
    /// Create or replace documents by `"id"`.
    Upsert,
    /// Remove documents by identifier.
    Delete,
}

impl BulkOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        }
    }

    /// Whether the batch is validated against the schema before dispatch.
    /// `delete` takes identifiers, not documents, so it is never validated.
    #[must_use]
    pub fn validates_documents(self) -> bool {
        !matches!(self, Self::Delete)
    }

    /// Past-tense verb used in summaries ("3 documents created").
    #[must_use]
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Upsert => "upserted",
            Self::Delete => "deleted",
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single document was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The store rejected the document (duplicate id, unknown id, ...).
    Mutation,
    /// The store's live schema rejected a document the cached snapshot accepted.
    SchemaDrift,
    /// An update was requested for a document without a string `"id"`.
    MissingId,
}

/// Result of dispatching one document or identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed { kind: FailureKind, reason: String },
}

/// Per-document entry of a bulk result, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutcome {
    /// Zero-based position in the parsed batch.
    pub index: usize,
    /// Identifier of the document, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl DocumentOutcome {
    #[must_use]
    pub fn success(index: usize, id: Option<DocumentId>) -> Self {
        Self {
            index,
            id,
            status: OutcomeStatus::Success,
        }
    }

    pub fn failed(
        index: usize,
        id: Option<DocumentId>,
        kind: FailureKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id,
            status: OutcomeStatus::Failed {
                kind,
                reason: reason.into(),
            },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success)
    }

    /// Failure kind, if this outcome failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            OutcomeStatus::Success => None,
            OutcomeStatus::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Human-readable error line for a failed outcome, e.g.
    /// `document 3 (id 'missing1'): document not found`.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let OutcomeStatus::Failed { reason, .. } = &self.status else {
            return None;
        };
        let number = self.index + 1;
        Some(match &self.id {
            Some(id) => format!("document {number} (id '{id}'): {reason}"),
            None => format!("document {number}: {reason}"),
        })
    }
}

/// Aggregated result of one bulk run.
///
/// Built once by the orchestrator from the per-document outcomes and never
/// mutated afterwards. `errors` is the full list; [`error_preview`](Self::error_preview)
/// gives the bounded version for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResult {
    pub operation: BulkOperation,
    pub collection: String,
    /// Version of the schema snapshot the batch was validated against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u64>,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
    pub outcomes: Vec<DocumentOutcome>,
    /// Milliseconds since Unix epoch when the run started.
    pub started_at: u64,
    /// Milliseconds since Unix epoch when the last outcome was recorded.
    pub finished_at: u64,
}

impl BulkOperationResult {
    /// Aggregates outcomes (already in input order) into counts and errors.
    #[must_use]
    pub fn from_outcomes(
        operation: BulkOperation,
        collection: impl Into<String>,
        schema_version: Option<u64>,
        outcomes: Vec<DocumentOutcome>,
        started_at: u64,
        finished_at: u64,
    ) -> Self {
        let success_count = outcomes.iter().filter(|o| o.is_success()).count();
        let errors: Vec<String> = outcomes
            .iter()
            .filter_map(DocumentOutcome::error_message)
            .collect();
        Self {
            operation,
            collection: collection.into(),
            schema_version,
            success_count,
            failure_count: outcomes.len() - success_count,
            errors,
            outcomes,
            started_at,
            finished_at,
        }
    }

    /// Number of documents dispatched.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether any document failed because of schema drift.
    #[must_use]
    pub fn has_schema_drift(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.failure_kind() == Some(FailureKind::SchemaDrift))
    }

    /// First `limit` errors, followed by an `…and N more` marker when truncated.
    #[must_use]
    pub fn error_preview(&self, limit: usize) -> Vec<String> {
        bounded_preview(&self.errors, limit)
    }
}

/// Truncates `errors` to `limit` entries plus an `…and N more` marker.
#[must_use]
pub fn bounded_preview(errors: &[String], limit: usize) -> Vec<String> {
    if errors.len() <= limit {
        return errors.to_vec();
    }
    let mut preview: Vec<String> = errors[..limit].to_vec();
    preview.push(format!("…and {} more", errors.len() - limit));
    preview
}
