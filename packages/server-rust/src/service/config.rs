use bulkdoc_core::DEFAULT_ERROR_PREVIEW;

/// Tuning for bulk mutation runs.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Maximum number of single-document store calls in flight per batch.
    /// Values below 1 are treated as 1.
    pub dispatch_concurrency: usize,
    /// Number of errors shown in a summary before collapsing the rest.
    pub error_preview_limit: usize,
    /// Largest batch accepted, in documents or identifiers.
    pub max_batch_documents: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            dispatch_concurrency: 4,
            error_preview_limit: DEFAULT_ERROR_PREVIEW,
            max_batch_documents: 10_000,
        }
    }
}

/// Server-level configuration for the document service.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Bulk run tuning.
    pub bulk: BulkConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bulk.dispatch_concurrency, 4);
        assert_eq!(config.bulk.error_preview_limit, 5);
        assert_eq!(config.bulk.max_batch_documents, 10_000);
    }
}
