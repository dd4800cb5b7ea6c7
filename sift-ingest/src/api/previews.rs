//! Preview content for file entries and outcomes

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::{error::ApiError, error::ApiResult, AppState};

/// GET /previews/:id
///
/// 404 once the owning entry or outcome has released the handle.
pub async fn get_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let preview = state
        .session
        .preview(id)
        .ok_or_else(|| ApiError::NotFound(format!("Preview {}", id)))?;

    Ok(([(header::CONTENT_TYPE, preview.content_type)], preview.bytes).into_response())
}

pub fn preview_routes() -> Router<AppState> {
    Router::new().route("/previews/:id", get(get_preview))
}
