//! Batch-level errors of a bulk run.
//!
//! Every variant aborts the whole batch before any store write. Per-document
//! failures never surface here; they are recorded as
//! [`DocumentOutcome`](bulkdoc_core::DocumentOutcome)s instead.

use bulkdoc_core::BatchError;

use crate::traits::StoreError;

/// Message for an empty create/update/upsert batch.
pub const NO_DOCUMENTS: &str = "no documents provided";
/// Message for an empty delete batch.
pub const NO_IDS: &str = "please provide document IDs to delete";

/// Fatal errors of a bulk run.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error(transparent)]
    Parse(#[from] BatchError),
    #[error("{0}")]
    EmptyBatch(&'static str),
    #[error("batch has {count} documents, the limit is {limit}")]
    TooManyDocuments { count: usize, limit: usize },
    /// At least one document failed pre-flight validation.
    #[error("Validation errors: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },
    #[error("schema unavailable: {0}")]
    SchemaUnavailable(#[from] StoreError),
}

impl BulkError {
    /// Whether the caller's input was unusable (parse, empty, or oversize).
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::EmptyBatch(_) | Self::TooManyDocuments { .. }
        )
    }

    /// The full list of error lines carried by this error.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::Validation { errors } => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_errors() {
        let err = BulkError::Validation {
            errors: vec![
                "document 1: field 'price' must be a number".to_string(),
                "document 3: field 'id' is required".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Validation errors: document 1: field 'price' must be a number; \
             document 3: field 'id' is required"
        );
        assert_eq!(err.errors().len(), 2);
        assert!(!err.is_parse_error());
    }

    #[test]
    fn empty_batch_messages() {
        assert_eq!(BulkError::EmptyBatch(NO_DOCUMENTS).to_string(), "no documents provided");
        assert_eq!(
            BulkError::EmptyBatch(NO_IDS).to_string(),
            "please provide document IDs to delete"
        );
        assert!(BulkError::EmptyBatch(NO_IDS).is_parse_error());
    }

    #[test]
    fn parse_errors_are_transparent() {
        let err = BulkError::from(BatchError::UnsupportedFormat {
            file_name: "data.csv".to_string(),
        });
        assert!(err.to_string().starts_with("unsupported file format"));
        assert_eq!(err.errors(), vec![err.to_string()]);
    }
}
