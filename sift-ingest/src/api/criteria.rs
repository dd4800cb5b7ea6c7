//! Criteria set endpoints

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::ApiResult, models::Criterion, AppState};

/// POST /criteria request
///
/// `count` may arrive as a JSON number or as form text; anything else is
/// passed on as text so it fails count validation.
#[derive(Debug, Deserialize)]
pub struct AddCriterionRequest {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub count: Option<Value>,
}

fn count_text(count: Option<&Value>) -> String {
    match count {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct CriteriaResponse {
    pub criteria: Vec<Criterion>,
}

/// POST /criteria
pub async fn add_criterion(
    State(state): State<AppState>,
    Json(request): Json<AddCriterionRequest>,
) -> ApiResult<Json<Criterion>> {
    let count = count_text(request.count.as_ref());
    let criterion = state
        .session
        .add_criterion_text(&request.label, &count)?;
    Ok(Json(criterion))
}

/// GET /criteria
pub async fn list_criteria(State(state): State<AppState>) -> Json<CriteriaResponse> {
    Json(CriteriaResponse {
        criteria: state.session.criteria(),
    })
}

/// DELETE /criteria/:index
pub async fn remove_criterion(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<Criterion>> {
    Ok(Json(state.session.remove_criterion(index)?))
}

pub fn criteria_routes() -> Router<AppState> {
    Router::new()
        .route("/criteria", get(list_criteria).post(add_criterion))
        .route("/criteria/:index", delete(remove_criterion))
}
