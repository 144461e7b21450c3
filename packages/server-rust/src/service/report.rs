//! Result aggregator and reporter.
//!
//! Renders a [`BulkOperationResult`] either as a compact [`BulkSummary`] for
//! display or as a downloadable JSON artifact for audit. Both are pure.

use anyhow::Context;
use bulkdoc_core::{bounded_preview, BulkOperation, BulkOperationResult, DocumentOutcome};
use serde::{Deserialize, Serialize};

use crate::service::operation::BulkError;

/// Display form of a bulk run, also used for batch-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    pub operation: BulkOperation,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u64>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total: usize,
    /// Bounded preview of the error list.
    pub errors: Vec<String>,
    /// One-line description of the run.
    pub message: String,
}

/// Summarizes a finished run, keeping at most `preview_limit` errors.
#[must_use]
pub fn to_summary(result: &BulkOperationResult, preview_limit: usize) -> BulkSummary {
    let noun = if result.total() == 1 { "document" } else { "documents" };
    let message = if result.failure_count == 0 {
        format!(
            "{} {noun} {}",
            result.success_count,
            result.operation.past_tense()
        )
    } else {
        format!(
            "{} of {} {noun} {}, {} failed",
            result.success_count,
            result.total(),
            result.operation.past_tense(),
            result.failure_count
        )
    };
    BulkSummary {
        operation: result.operation,
        collection: result.collection.clone(),
        schema_version: result.schema_version,
        success_count: result.success_count,
        failure_count: result.failure_count,
        total: result.total(),
        errors: result.error_preview(preview_limit),
        message,
    }
}

/// Renders a batch-level failure in the same shape as a finished run.
#[must_use]
pub fn summary_for_error(
    operation: BulkOperation,
    collection: &str,
    error: &BulkError,
    preview_limit: usize,
) -> BulkSummary {
    BulkSummary {
        operation,
        collection: collection.to_string(),
        schema_version: None,
        success_count: 0,
        failure_count: 0,
        total: 0,
        errors: bounded_preview(&error.errors(), preview_limit),
        message: error.to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    collection: &'a str,
    operation: BulkOperation,
    /// Milliseconds since Unix epoch when the run finished.
    timestamp: u64,
    started_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<u64>,
    success_count: usize,
    failure_count: usize,
    errors: &'a [String],
    outcomes: &'a [DocumentOutcome],
}

/// Serializes the full result as a pretty-printed JSON artifact.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn to_downloadable(result: &BulkOperationResult) -> anyhow::Result<Vec<u8>> {
    let report = Report {
        collection: &result.collection,
        operation: result.operation,
        timestamp: result.finished_at,
        started_at: result.started_at,
        schema_version: result.schema_version,
        success_count: result.success_count,
        failure_count: result.failure_count,
        errors: &result.errors,
        outcomes: &result.outcomes,
    };
    serde_json::to_vec_pretty(&report).context("failed to serialize bulk report")
}

/// Suggested file name for a downloadable report.
#[must_use]
pub fn report_file_name(result: &BulkOperationResult) -> String {
    format!(
        "{}-{}-{}.json",
        result.collection, result.operation, result.finished_at
    )
}
