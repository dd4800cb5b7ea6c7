//! Shared fixtures for sift-ingest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use sift_common::events::{EventBus, SiftEvent};
use sift_ingest::models::{FileSnapshot, SubmissionState};
use sift_ingest::services::{AnalysisPayload, AnalysisService, RawEntry, TransportError};
use sift_ingest::SearchSession;

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

/// Deterministic analysis service keyed by file name
///
/// The payload it returns is `{"file": <display name>}`; object counts come
/// from the table given at construction.
#[derive(Default)]
pub struct ScriptedService {
    counts: HashMap<String, HashMap<String, u32>>,
    failing_uploads: HashSet<String>,
    failing_queries: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    pub uploads: AtomicUsize,
    pub queried_labels: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts(mut self, file: &str, counts: &[(&str, u32)]) -> Self {
        self.counts.insert(
            file.to_string(),
            counts.iter().map(|(l, c)| (l.to_string(), *c)).collect(),
        );
        self
    }

    pub fn failing_upload(mut self, file: &str) -> Self {
        self.failing_uploads.insert(file.to_string());
        self
    }

    pub fn failing_query(mut self, file: &str) -> Self {
        self.failing_queries.insert(file.to_string());
        self
    }

    /// Each upload waits for one permit from `gate`
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn upload_and_analyze(
        &self,
        file: &FileSnapshot,
    ) -> Result<AnalysisPayload, TransportError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.failing_uploads.contains(&file.display_name) {
            return Err(TransportError::Api(500, "analysis failed".to_string()));
        }
        Ok(AnalysisPayload::new(
            serde_json::json!({ "file": file.display_name }),
        ))
    }

    async fn find_object(
        &self,
        payload: &AnalysisPayload,
        object_label: &str,
        _required_count: u32,
    ) -> Result<u32, TransportError> {
        self.queried_labels
            .lock()
            .unwrap()
            .push(object_label.to_string());

        let file = payload.as_json()["file"].as_str().unwrap_or_default();
        if self.failing_queries.contains(file) {
            return Err(TransportError::Network("connection reset".to_string()));
        }
        Ok(self
            .counts
            .get(file)
            .and_then(|counts| counts.get(object_label))
            .copied()
            .unwrap_or(0))
    }
}

pub fn png(name: &str) -> RawEntry {
    RawEntry::new(name, PNG.to_vec()).with_content_type("image/png")
}

/// Zip archive; `None` content adds a directory entry
pub fn zip_of(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        match content {
            Some(bytes) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(bytes).unwrap();
            }
            None => writer.add_directory(*name, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}

pub fn session_with(service: Arc<ScriptedService>) -> (Arc<SearchSession>, EventBus) {
    let event_bus = EventBus::new(256);
    let session = Arc::new(SearchSession::new(
        service,
        event_bus.clone(),
        10 * 1024 * 1024,
    ));
    (session, event_bus)
}

/// Poll until the session reaches `state` (5 s limit)
pub async fn wait_for_state(session: &SearchSession, state: SubmissionState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.state() != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {:?}", state));
}

/// Every event currently buffered on `rx`
pub fn drain(rx: &mut broadcast::Receiver<SiftEvent>) -> Vec<SiftEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn names(outcomes: &[sift_ingest::models::OutcomeSummary]) -> Vec<String> {
    let mut names: Vec<String> = outcomes.iter().map(|o| o.display_name.clone()).collect();
    names.sort();
    names
}

/// Previews held by the batch and the result view account for every live one
pub fn assert_resources_balanced(session: &SearchSession) {
    assert_eq!(
        session.live_previews(),
        session.files().len() + session.outcomes().len(),
        "live previews must equal entries plus displayed outcomes"
    );
}
