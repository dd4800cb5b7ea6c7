//! Pipeline services
//!
//! Leaf-first: archive expansion and preview handles feed the batch; the
//! upload coordinator fans out per file, the criterion matcher fans out per
//! criterion, and the result aggregator collects what settles.

pub mod analysis_client;
pub mod archive_expander;
pub mod batch;
pub mod criteria_set;
pub mod criterion_matcher;
pub mod preview_registry;
pub mod result_aggregator;
pub mod upload_coordinator;

pub use analysis_client::{
    AnalysisPayload, AnalysisService, HttpAnalysisClient, StaticTokenProvider, TokenProvider,
    TransportError,
};
pub use archive_expander::{ArchiveExpander, ExpandedEntry, ExpansionError, RawEntry, Rejection};
pub use batch::FileBatch;
pub use criteria_set::{parse_count, CriteriaSet};
pub use criterion_matcher::{evaluate, CriterionMatcher, MatchDecision, MatchError};
pub use preview_registry::{Preview, PreviewHandle, PreviewRegistry};
pub use result_aggregator::{ResultAggregator, StateTransition};
pub use upload_coordinator::{NoopObserver, SubmissionObserver, UploadCoordinator};
