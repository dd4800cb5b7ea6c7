//! Submission, state and outcome endpoints

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::ApiResult,
    models::{OutcomeSummary, SubmissionState, SubmissionSummary},
    AppState,
};

/// GET /state response
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub state: SubmissionState,
    pub files: usize,
    pub criteria: usize,
    pub outcomes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_summary: Option<SubmissionSummary>,
}

#[derive(Debug, Serialize)]
pub struct OutcomesResponse {
    pub outcomes: Vec<OutcomeSummary>,
}

/// POST /submit
///
/// Resolves when every submitted file has settled. 409 while another
/// submission is running.
pub async fn submit(State(state): State<AppState>) -> ApiResult<Json<SubmissionSummary>> {
    let summary = state.session.submit().await?;
    Ok(Json(summary))
}

/// GET /state
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let session = &state.session;
    Json(StateResponse {
        state: session.state(),
        files: session.files().len(),
        criteria: session.criteria().len(),
        outcomes: session.outcomes().len(),
        last_summary: session.last_summary(),
    })
}

/// GET /outcomes
pub async fn list_outcomes(State(state): State<AppState>) -> Json<OutcomesResponse> {
    Json(OutcomesResponse {
        outcomes: state.session.outcomes(),
    })
}

/// DELETE /outcomes/:index
pub async fn discard_outcome(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<OutcomeSummary>> {
    Ok(Json(state.session.discard_outcome(index)?))
}

pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/state", get(get_state))
        .route("/outcomes", get(list_outcomes))
        .route("/outcomes/:index", delete(discard_outcome))
}
