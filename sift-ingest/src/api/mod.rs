//! HTTP API handlers for sift-ingest
//!
//! REST endpoints drive the search session; progress and notifications stream
//! over SSE.

pub mod criteria;
pub mod files;
pub mod health;
pub mod previews;
pub mod sse;
pub mod submission;

pub use criteria::criteria_routes;
pub use files::file_routes;
pub use health::health_routes;
pub use previews::preview_routes;
pub use sse::event_stream;
pub use submission::submission_routes;
