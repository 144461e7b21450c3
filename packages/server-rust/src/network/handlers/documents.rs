//! Collection schema, single-document validation, and bulk endpoints.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bulkdoc_core::{BulkOperation, Document, RawBatchInput, ValidationResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::AppState;
use crate::service::{report_file_name, to_downloadable, BulkError, SchemaForm};
use crate::traits::StoreError;

/// Body of the bulk endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub operation: BulkOperation,
    pub input: RawBatchInput,
}

/// Store error rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (store_error_status(&self.0), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn store_error_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::CollectionExists(_) => StatusCode::CONFLICT,
        StoreError::InvalidSchema(_) => StatusCode::BAD_REQUEST,
    }
}

fn bulk_error_status(e: &BulkError) -> StatusCode {
    match e {
        BulkError::Parse(_) | BulkError::EmptyBatch(_) | BulkError::TooManyDocuments { .. } => {
            StatusCode::BAD_REQUEST
        }
        BulkError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BulkError::SchemaUnavailable(store) => store_error_status(store),
    }
}

fn shutting_down() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "server is shutting down" })),
    )
        .into_response()
}

/// `GET /collections/{name}/schema`
///
/// Always re-fetches, so opening a form refreshes the cached schema.
pub async fn schema_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SchemaForm>, ApiError> {
    Ok(Json(state.service.schema_form(&name).await?))
}

/// `POST /collections/{name}/documents/validate`
pub async fn validate_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(document): Json<Document>,
) -> Result<Json<ValidationResult>, ApiError> {
    Ok(Json(
        state
            .service
            .validate_single_document(&name, &document)
            .await?,
    ))
}

/// `POST /collections/{name}/documents/bulk`
///
/// 200 with a summary once dispatch ran, even if every document failed.
/// Batch-level failures return a zero-count summary with a 4xx status.
pub async fn bulk_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<BulkRequest>,
) -> Response {
    let Some(_guard) = state.shutdown.begin_request() else {
        return shutting_down();
    };

    match state
        .service
        .run_bulk_operation(request.operation, &name, &request.input)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(state.service.summarize(&result))).into_response(),
        Err(e) => bulk_error_response(&state, request.operation, &name, &e),
    }
}

/// `POST /collections/{name}/documents/bulk/report`
///
/// Same run as [`bulk_handler`], answered with the full JSON report as an
/// attachment.
pub async fn bulk_report_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<BulkRequest>,
) -> Response {
    let Some(_guard) = state.shutdown.begin_request() else {
        return shutting_down();
    };

    let result = match state
        .service
        .run_bulk_operation(request.operation, &name, &request.input)
        .await
    {
        Ok(result) => result,
        Err(e) => return bulk_error_response(&state, request.operation, &name, &e),
    };

    match to_downloadable(&result) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", report_file_name(&result)),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!(collection = %name, error = %e, "failed to render bulk report");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn bulk_error_response(
    state: &AppState,
    operation: BulkOperation,
    collection: &str,
    e: &BulkError,
) -> Response {
    warn!(collection, operation = %operation, error = %e, "bulk run aborted");
    let summary = state.service.summarize_error(operation, collection, e);
    (bulk_error_status(e), Json(summary)).into_response()
}
