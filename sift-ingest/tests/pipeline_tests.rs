//! End-to-end pipeline tests against a scripted analysis service

mod helpers;

use helpers::*;
use std::sync::Arc;
use tokio::sync::Semaphore;

use sift_common::events::SiftEvent;
use sift_ingest::error::{SessionError, ValidationError};
use sift_ingest::models::{SubmissionState, SubmissionSummary};

#[tokio::test]
async fn test_at_least_criterion_keeps_only_matching_files() {
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 2)])
            .with_counts("b.png", &[("cat", 0)]),
    );
    let (session, _bus) = session_with(service);

    session.add_files(vec![png("a.png"), png("b.png")]);
    session.add_criterion("cat", 1).unwrap();

    let summary = session.submit().await.unwrap();

    assert_eq!(names(&session.outcomes()), vec!["a.png"]);
    assert_eq!(
        summary,
        SubmissionSummary {
            submitted: 2,
            matched: 1,
            unmatched: 1,
            failed: 0,
            discarded: 0,
        }
    );
    assert_eq!(session.outcomes()[0].criterion_results[0].found_count, 2);
}

#[tokio::test]
async fn test_zero_count_means_absent() {
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("c.png", &[("dog", 0)])
            .with_counts("d.png", &[("dog", 1)]),
    );
    let (session, _bus) = session_with(service);

    session.add_files(vec![png("c.png"), png("d.png")]);
    session.add_criterion_text("dog", "0").unwrap();
    session.submit().await.unwrap();

    assert_eq!(names(&session.outcomes()), vec!["c.png"]);
}

#[tokio::test]
async fn test_every_criterion_must_hold() {
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("both.png", &[("cat", 1), ("dog", 0)])
            .with_counts("catdog.png", &[("cat", 1), ("dog", 3)]),
    );
    let (session, _bus) = session_with(service);

    session.add_files(vec![png("both.png"), png("catdog.png")]);
    session.add_criterion("cat", 1).unwrap();
    session.add_criterion("dog", 0).unwrap();
    session.submit().await.unwrap();

    assert_eq!(names(&session.outcomes()), vec!["both.png"]);
}

#[tokio::test]
async fn test_upload_failure_is_isolated() {
    let service = Arc::new(
        ScriptedService::new()
            .failing_upload("e.png")
            .with_counts("f.png", &[("cat", 1)]),
    );
    let (session, bus) = session_with(service);
    let mut rx = bus.subscribe();

    session.add_files(vec![png("e.png"), png("f.png")]);
    session.add_criterion("cat", 1).unwrap();
    let summary = session.submit().await.unwrap();

    assert_eq!(names(&session.outcomes()), vec!["f.png"]);
    assert_eq!(summary.failed, 1);
    assert_eq!(session.state(), SubmissionState::Complete);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SiftEvent::UploadFailed { display_name, .. } if display_name == "e.png"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, SiftEvent::SubmissionCompleted { failed: 1, .. })));
}

#[tokio::test]
async fn test_query_failure_fails_the_file() {
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("flaky.png", &[("cat", 5)])
            .failing_query("flaky.png")
            .with_counts("ok.png", &[("cat", 5)]),
    );
    let (session, bus) = session_with(service);
    let mut rx = bus.subscribe();

    session.add_files(vec![png("flaky.png"), png("ok.png")]);
    session.add_criterion("cat", 1).unwrap();
    let summary = session.submit().await.unwrap();

    assert_eq!(names(&session.outcomes()), vec!["ok.png"]);
    assert_eq!(summary.failed, 1);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, SiftEvent::MatchFailed { .. })));
}

#[tokio::test]
async fn test_state_sequence_is_reported() {
    let service = Arc::new(ScriptedService::new().with_counts("a.png", &[("cat", 1)]));
    let (session, bus) = session_with(service);

    session.add_files(vec![png("a.png")]);
    session.add_criterion("cat", 1).unwrap();

    let mut rx = bus.subscribe();
    session.submit().await.unwrap();

    let states: Vec<SubmissionState> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            SiftEvent::SubmissionStateChanged { new_state, .. } => Some(new_state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            SubmissionState::Ingesting,
            SubmissionState::Matching,
            SubmissionState::Complete
        ]
    );
}

#[tokio::test]
async fn test_validation_rejects_before_any_upload() {
    let service = Arc::new(ScriptedService::new());
    let (session, bus) = session_with(service.clone());
    let mut rx = bus.subscribe();

    let err = session.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::EmptyBatch)
    ));

    session.add_files(vec![png("a.png")]);
    let err = session.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::EmptyCriteria)
    ));

    assert_eq!(service.upload_count(), 0);
    assert_eq!(session.state(), SubmissionState::Idle);
    let failures = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, SiftEvent::ValidationFailed { .. }))
        .count();
    assert_eq!(failures, 2);
}

#[tokio::test]
async fn test_resubmitting_same_batch_is_deterministic() {
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 3)])
            .with_counts("b.png", &[("cat", 1)])
            .with_counts("c.png", &[("cat", 0)]),
    );
    let (session, _bus) = session_with(service);
    session.add_criterion("cat", 1).unwrap();

    session.add_files(vec![png("a.png"), png("b.png"), png("c.png")]);
    session.submit().await.unwrap();
    let first = names(&session.outcomes());
    assert!(session.files().is_empty(), "submitted entries are consumed");

    session.add_files(vec![png("a.png"), png("b.png"), png("c.png")]);
    assert_eq!(session.state(), SubmissionState::Idle);
    assert!(session.outcomes().is_empty(), "a new drop clears prior outcomes");
    session.submit().await.unwrap();

    assert_eq!(names(&session.outcomes()), first);
    assert_eq!(first, vec!["a.png", "b.png"]);
}

#[tokio::test]
async fn test_resources_stay_balanced() {
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 1)])
            .with_counts("b.png", &[("cat", 1)]),
    );
    let (session, _bus) = session_with(service);
    session.add_criterion("cat", 1).unwrap();

    session.add_files(vec![png("a.png"), png("b.png"), png("c.png")]);
    assert_resources_balanced(&session);

    session.remove_file(2).unwrap();
    assert_resources_balanced(&session);

    session.submit().await.unwrap();
    assert_resources_balanced(&session);
    assert_eq!(session.live_previews(), 2);

    session.discard_outcome(0).unwrap();
    assert_resources_balanced(&session);

    session.add_files(vec![png("d.png")]);
    assert_resources_balanced(&session);

    session.clear_all_files();
    assert_resources_balanced(&session);
    assert_eq!(session.live_previews(), 0);
}

#[tokio::test]
async fn test_clearing_mid_flight_discards_results() {
    let gate = Arc::new(Semaphore::new(0));
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 1)])
            .with_counts("b.png", &[("cat", 1)])
            .gated(gate.clone()),
    );
    let (session, _bus) = session_with(service);
    session.add_files(vec![png("a.png"), png("b.png")]);
    session.add_criterion("cat", 1).unwrap();

    let submitting = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_state(&session, SubmissionState::Matching).await;

    assert_eq!(session.clear_all_files(), 2);
    gate.add_permits(2);

    let summary = submitting.await.unwrap().unwrap();
    assert_eq!(summary.discarded, 2);
    assert_eq!(summary.matched, 0);
    assert!(session.outcomes().is_empty());
    assert_eq!(session.state(), SubmissionState::Complete);
    assert_eq!(session.live_previews(), 0);
}

#[tokio::test]
async fn test_removing_one_file_mid_flight_keeps_the_other() {
    let gate = Arc::new(Semaphore::new(0));
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 1)])
            .with_counts("b.png", &[("cat", 1)])
            .gated(gate.clone()),
    );
    let (session, _bus) = session_with(service);
    session.add_files(vec![png("a.png"), png("b.png")]);
    session.add_criterion("cat", 1).unwrap();

    let submitting = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_state(&session, SubmissionState::Matching).await;

    session.remove_file(0).unwrap();
    gate.add_permits(2);

    let summary = submitting.await.unwrap().unwrap();
    assert_eq!(summary.discarded, 1);
    assert_eq!(names(&session.outcomes()), vec!["b.png"]);
    assert_resources_balanced(&session);
}

#[tokio::test]
async fn test_criteria_edits_do_not_reach_in_flight_matches() {
    let gate = Arc::new(Semaphore::new(0));
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 1), ("dog", 4)])
            .gated(gate.clone()),
    );
    let (session, _bus) = session_with(service.clone());
    session.add_files(vec![png("a.png")]);
    session.add_criterion("cat", 1).unwrap();

    let submitting = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_state(&session, SubmissionState::Matching).await;

    session.add_criterion("dog", 0).unwrap();
    session.remove_criterion(0).unwrap();
    gate.add_permits(1);

    submitting.await.unwrap().unwrap();
    assert_eq!(names(&session.outcomes()), vec!["a.png"]);
    assert_eq!(*service.queried_labels.lock().unwrap(), vec!["cat".to_string()]);
}

#[tokio::test]
async fn test_second_submit_while_running_conflicts() {
    let gate = Arc::new(Semaphore::new(0));
    let service = Arc::new(ScriptedService::new().gated(gate.clone()));
    let (session, _bus) = session_with(service);
    session.add_files(vec![png("a.png")]);
    session.add_criterion("cat", 1).unwrap();

    let submitting = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_state(&session, SubmissionState::Matching).await;

    assert!(matches!(
        session.submit().await,
        Err(SessionError::Conflict(_))
    ));

    gate.add_permits(1);
    submitting.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_drop_during_submission_survives_completion() {
    let gate = Arc::new(Semaphore::new(0));
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 1)])
            .gated(gate.clone()),
    );
    let (session, _bus) = session_with(service);
    session.add_files(vec![png("a.png")]);
    session.add_criterion("cat", 1).unwrap();

    let submitting = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_state(&session, SubmissionState::Matching).await;

    session.add_files(vec![png("late.png")]);
    gate.add_permits(1);
    submitting.await.unwrap().unwrap();

    let files: Vec<String> = session.files().into_iter().map(|f| f.display_name).collect();
    assert_eq!(files, vec!["late.png"]);
    assert_eq!(names(&session.outcomes()), vec!["a.png"]);
    assert_resources_balanced(&session);
}

#[tokio::test]
async fn test_archive_drop_expands_images_only() {
    let (session, bus) = session_with(Arc::new(ScriptedService::new()));
    let mut rx = bus.subscribe();

    let archive = zip_of(&[
        ("photos/", None),
        ("photos/one.png", Some(PNG)),
        ("photos/two.jpg", Some(JPEG)),
        ("three.png", Some(PNG)),
    ]);
    let report = session.add_files(vec![sift_ingest::services::RawEntry::new(
        "holiday.zip",
        archive,
    )
    .with_content_type("application/zip")]);

    assert_eq!(report.added.len(), 3);
    assert!(report.rejected.is_empty());
    assert_eq!(session.files().len(), 3);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, SiftEvent::FilesAdded { count: 3, .. })));
}

#[tokio::test]
async fn test_corrupt_archive_is_reported_and_siblings_kept() {
    let (session, bus) = session_with(Arc::new(ScriptedService::new()));
    let mut rx = bus.subscribe();

    let report = session.add_files(vec![
        sift_ingest::services::RawEntry::new("broken.zip", b"PK\x03\x04garbage".to_vec())
            .with_content_type("application/zip"),
        png("fine.png"),
    ]);

    assert_eq!(report.added.len(), 1);
    assert_eq!(report.rejected.len(), 1);
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SiftEvent::ContainerExpansionFailed { container_name, .. } if container_name == "broken.zip"
    )));
}

#[tokio::test]
async fn test_duplicate_labels_rejected() {
    let (session, _bus) = session_with(Arc::new(ScriptedService::new()));
    session.add_criterion("Cat", 1).unwrap();

    let err = session.add_criterion(" cat ", 3).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::DuplicateLabel(_))
    ));
    assert_eq!(session.criteria().len(), 1);
}

#[tokio::test]
async fn test_abandoned_submit_still_completes() {
    let gate = Arc::new(Semaphore::new(0));
    let service = Arc::new(
        ScriptedService::new()
            .with_counts("a.png", &[("cat", 1)])
            .gated(gate.clone()),
    );
    let (session, _bus) = session_with(service);
    session.add_files(vec![png("a.png")]);
    session.add_criterion("cat", 1).unwrap();

    let submitting = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_state(&session, SubmissionState::Matching).await;

    // The waiting caller goes away, as when an HTTP client disconnects
    submitting.abort();
    assert!(submitting.await.unwrap_err().is_cancelled());
    gate.add_permits(1);

    wait_for_state(&session, SubmissionState::Complete).await;
    assert_eq!(names(&session.outcomes()), vec!["a.png"]);
    assert_eq!(session.last_summary().unwrap().matched, 1);
    assert_resources_balanced(&session);

    session.add_files(vec![png("a.png")]);
    gate.add_permits(1);
    assert_eq!(session.submit().await.unwrap().matched, 1);
}
