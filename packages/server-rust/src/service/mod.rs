//! Document validation and bulk mutation services.
//!
//! 1. **Schema cache** (`schema_cache`): versioned snapshots with compiled rules
//! 2. **Orchestrator** (`bulk`): parse, validate, dispatch, aggregate
//! 3. **Reporter** (`report`): summaries and downloadable artifacts
//! 4. **Entry points** (`document`): what the HTTP handlers call

pub mod bulk;
pub mod config;
pub mod document;
pub mod operation;
pub mod report;
pub mod schema_cache;

pub use bulk::BulkOrchestrator;
pub use config::{BulkConfig, ServerConfig};
pub use document::{DocumentService, SchemaForm};
pub use operation::BulkError;
pub use report::{report_file_name, summary_for_error, to_downloadable, to_summary, BulkSummary};
pub use schema_cache::{CompiledSchema, SchemaCache};
