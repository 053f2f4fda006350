use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::success_response,
    AppState,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

const FILE_FIELD: &str = "file";

/// Result of a processed upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "Excel file uploaded and processed successfully")]
    pub message: String,
    /// Products created by this upload
    #[schema(example = 2)]
    pub products_count: usize,
    /// Daily rows written for new and updated products
    #[schema(example = 6)]
    pub days_count: usize,
}

/// Multipart form accepted by the upload endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Spreadsheet file (.xlsx, .xls or .csv)
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Creates the router for spreadsheet uploads
pub fn uploads_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(upload_spreadsheet))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Upload a spreadsheet of products and daily movements
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Spreadsheet imported", body = UploadResponse),
        (status = 400, description = "Not a spreadsheet, missing column or unparsable cell", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "Upload exceeds the configured size limit", body = crate::errors::ErrorResponse),
        (status = 500, description = "Import rolled back", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "uploads"
)]
pub async fn upload_spreadsheet(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, status = %e.status(), "Malformed multipart body");
        ApiError::from(e)
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let contents = field.bytes().await.map_err(|e| {
            warn!(error = %e, status = %e.status(), "Failed to read uploaded file");
            ApiError::from(e)
        })?;

        info!(
            username = %user.username,
            filename = %filename,
            size = contents.len(),
            "Spreadsheet upload received"
        );

        let summary = state
            .services
            .ingestion
            .import_upload(&filename, contents.to_vec())
            .await?;

        return Ok(success_response(UploadResponse {
            message: "Excel file uploaded and processed successfully".to_string(),
            products_count: summary.products_count,
            days_count: summary.days_count,
        }));
    }

    Err(ApiError::bad_request("No file uploaded"))
}
