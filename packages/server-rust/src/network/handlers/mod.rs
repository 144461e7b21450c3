//! HTTP handler definitions.
//!
//! Defines `AppState` (the shared state carried through axum extractors) and
//! re-exports the handler functions used by the router.

pub mod documents;
pub mod health;

pub use documents::{
    bulk_handler, bulk_report_handler, schema_handler, validate_handler, BulkRequest,
};
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::service::DocumentService;

/// Shared application state passed to all handlers via `State` extraction.
///
/// Holds `Arc`s so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Document validation and bulk mutation entry points.
    pub service: Arc<DocumentService>,
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime.
    pub start_time: Instant,
}
