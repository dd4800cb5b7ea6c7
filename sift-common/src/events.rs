//! Notification events for the Sift event system
//!
//! The pipeline never displays anything itself. Every user-facing notification
//! is emitted as a [`SiftEvent`] on the [`EventBus`]; the presentation layer
//! decides how (and whether) to show it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Submission lifecycle state
///
/// `Idle → Ingesting → Matching → Complete → Idle`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// No submission running; batch and criteria are editable
    #[default]
    Idle,
    /// Validation passed, per-file tasks are being dispatched
    Ingesting,
    /// All tasks dispatched, some may still be pending
    Matching,
    /// Every dispatched task has settled
    Complete,
}

/// How a notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Sift event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SiftEvent {
    /// Entries were accepted into the batch
    FilesAdded {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A dropped entry (or an entry inside a container) has a rejected type
    FileRejected {
        display_name: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A container could not be opened or enumerated
    ContainerExpansionFailed {
        container_name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A user action was rejected before any work started
    ValidationFailed {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Upload-and-analyze failed for one file
    UploadFailed {
        display_name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// At least one criterion query failed for one file
    MatchFailed {
        display_name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A file satisfied every active criterion
    MatchFound {
        file_id: Uuid,
        display_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Submission lifecycle transition
    SubmissionStateChanged {
        old_state: SubmissionState,
        new_state: SubmissionState,
        timestamp: DateTime<Utc>,
    },

    /// Every file of a submission has settled
    SubmissionCompleted {
        submitted: usize,
        matched: usize,
        unmatched: usize,
        failed: usize,
        discarded: usize,
        timestamp: DateTime<Utc>,
    },
}

impl SiftEvent {
    /// Get the event type name, used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            SiftEvent::FilesAdded { .. } => "FilesAdded",
            SiftEvent::FileRejected { .. } => "FileRejected",
            SiftEvent::ContainerExpansionFailed { .. } => "ContainerExpansionFailed",
            SiftEvent::ValidationFailed { .. } => "ValidationFailed",
            SiftEvent::UploadFailed { .. } => "UploadFailed",
            SiftEvent::MatchFailed { .. } => "MatchFailed",
            SiftEvent::MatchFound { .. } => "MatchFound",
            SiftEvent::SubmissionStateChanged { .. } => "SubmissionStateChanged",
            SiftEvent::SubmissionCompleted { .. } => "SubmissionCompleted",
        }
    }

    /// Presentation hint for notification display
    pub fn severity(&self) -> Severity {
        match self {
            SiftEvent::FileRejected { .. }
            | SiftEvent::ContainerExpansionFailed { .. }
            | SiftEvent::ValidationFailed { .. }
            | SiftEvent::UploadFailed { .. }
            | SiftEvent::MatchFailed { .. } => Severity::Error,
            SiftEvent::SubmissionCompleted { .. } => Severity::Success,
            _ => Severity::Info,
        }
    }

    /// Human-readable notification text
    pub fn message(&self) -> String {
        match self {
            SiftEvent::FilesAdded { count, .. } => format!("{} file(s) added", count),
            SiftEvent::FileRejected {
                display_name,
                reason,
                ..
            } => format!("Rejected {}: {}", display_name, reason),
            SiftEvent::ContainerExpansionFailed {
                container_name,
                message,
                ..
            } => format!("Could not expand {}: {}", container_name, message),
            SiftEvent::ValidationFailed { message, .. } => message.clone(),
            SiftEvent::UploadFailed {
                display_name,
                message,
                ..
            } => format!("Error uploading file {}: {}", display_name, message),
            SiftEvent::MatchFailed {
                display_name,
                message,
                ..
            } => format!("Error finding target object in {}: {}", display_name, message),
            SiftEvent::MatchFound { display_name, .. } => format!("{} matched", display_name),
            SiftEvent::SubmissionStateChanged { new_state, .. } => {
                format!("Submission state: {:?}", new_state)
            }
            SiftEvent::SubmissionCompleted {
                submitted, matched, ..
            } => format!(
                "All files processed: {} of {} matched",
                matched, submitted
            ),
        }
    }
}

/// Broadcast channel for notification events
///
/// Cloning an `EventBus` yields another sender onto the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SiftEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SiftEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SiftEvent,
    ) -> Result<usize, broadcast::error::SendError<SiftEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SiftEvent) {
        tracing::debug!(event = event.event_type(), "{}", event.message());
        if self.emit(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SiftEvent::UploadFailed {
            display_name: "cat.png".to_string(),
            message: "connection refused".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "UploadFailed");
        assert_eq!(json["display_name"], "cat.png");
    }

    #[test]
    fn test_submission_state_serializes_snake_case() {
        let json = serde_json::to_string(&SubmissionState::Matching).unwrap();
        assert_eq!(json, "\"matching\"");
        assert_eq!(SubmissionState::default(), SubmissionState::Idle);
    }

    #[test]
    fn test_severity() {
        let failed = SiftEvent::ValidationFailed {
            message: "Please select files first.".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(failed.severity(), Severity::Error);
        assert_eq!(failed.message(), "Please select files first.");

        let done = SiftEvent::SubmissionCompleted {
            submitted: 2,
            matched: 1,
            unmatched: 1,
            failed: 0,
            discarded: 0,
            timestamp: Utc::now(),
        };
        assert_eq!(done.severity(), Severity::Success);
        assert_eq!(done.event_type(), "SubmissionCompleted");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let event = SiftEvent::FilesAdded {
            count: 1,
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        // Lossy emit never fails
        bus.emit_lossy(event);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(SiftEvent::FilesAdded {
            count: 3,
            timestamp: Utc::now(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "FilesAdded");
    }
}
