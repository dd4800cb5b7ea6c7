//! File batch endpoints
//!
//! POST /files, GET /files, DELETE /files/:index, DELETE /files?confirm=true

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::FileSummary,
    services::RawEntry,
    AppState,
};

/// Upper bound on one multipart drop
const MAX_DROP_BYTES: usize = 512 * 1024 * 1024;

/// An entry that was not added, with the reason shown to the user
#[derive(Debug, Serialize)]
pub struct RejectedEntry {
    pub name: String,
    pub reason: String,
    /// The whole container failed to read
    pub container: bool,
}

/// POST /files response
#[derive(Debug, Serialize)]
pub struct AddFilesResponse {
    pub added: Vec<FileSummary>,
    pub rejected: Vec<RejectedEntry>,
}

/// GET /files response
#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileSummary>,
}

/// DELETE /files/:index response
#[derive(Debug, Serialize)]
pub struct RemoveFileResponse {
    pub removed: FileSummary,
}

/// DELETE /files response
#[derive(Debug, Serialize)]
pub struct ClearFilesResponse {
    pub removed: usize,
}

#[derive(Debug, Deserialize)]
pub struct ClearFilesQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// POST /files
///
/// Each multipart part is one dropped item. Containers are expanded;
/// non-image items are rejected individually.
pub async fn add_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AddFilesResponse>> {
    let mut raw_entries = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field
            .file_name()
            .or_else(|| field.name())
            .unwrap_or("unnamed")
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read part {}: {}", name, e)))?;

        let mut entry = RawEntry::new(name, bytes);
        if let Some(content_type) = content_type {
            entry = entry.with_content_type(content_type);
        }
        raw_entries.push(entry);
    }

    let report = state.session.add_files(raw_entries);

    Ok(Json(AddFilesResponse {
        added: report.added,
        rejected: report
            .rejected
            .into_iter()
            .map(|rejection| RejectedEntry {
                container: rejection.is_container_failure(),
                reason: rejection.error.to_string(),
                name: rejection.name,
            })
            .collect(),
    }))
}

/// GET /files
pub async fn list_files(State(state): State<AppState>) -> Json<ListFilesResponse> {
    Json(ListFilesResponse {
        files: state.session.files(),
    })
}

/// DELETE /files/:index
pub async fn remove_file(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<RemoveFileResponse>> {
    let removed = state.session.remove_file(index)?;
    Ok(Json(RemoveFileResponse { removed }))
}

/// DELETE /files?confirm=true
pub async fn clear_files(
    State(state): State<AppState>,
    Query(query): Query<ClearFilesQuery>,
) -> ApiResult<Json<ClearFilesResponse>> {
    if !query.confirm {
        return Err(ApiError::BadRequest(
            "Clearing all files requires confirm=true".to_string(),
        ));
    }

    let removed = state.session.clear_all_files();
    Ok(Json(ClearFilesResponse { removed }))
}

pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/files",
            get(list_files)
                .post(add_files)
                .delete(clear_files)
                .layer(DefaultBodyLimit::max(MAX_DROP_BYTES)),
        )
        .route("/files/:index", delete(remove_file))
}
