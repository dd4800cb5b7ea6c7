//! sift-ingest library interface
//!
//! Image ingestion, remote analysis, multi-criteria matching and result
//! aggregation behind an HTTP + SSE surface. Exposed as a library for
//! integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

pub use crate::error::{ApiError, ApiResult};
pub use crate::session::SearchSession;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use sift_common::events::EventBus;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The single search session this service drives
    pub session: Arc<SearchSession>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(session: Arc<SearchSession>, event_bus: EventBus) -> Self {
        Self {
            session,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::file_routes())
        .merge(api::criteria_routes())
        .merge(api::submission_routes())
        .merge(api::preview_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
