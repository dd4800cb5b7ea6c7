//! Remote analysis service client
//!
//! Two capabilities are consumed, both authenticated with a bearer token:
//! - `POST /images/upload-and-analyze`: multipart upload of one file, returns
//!   an opaque analysis payload
//! - `POST /images/find-object`: counts instances of one object label in an
//!   already-analyzed payload
//!
//! The service's own `found` verdict is never trusted; callers re-derive the
//! match decision from `number_of_objects_found`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::FileSnapshot;

const UPLOAD_PATH: &str = "/images/upload-and-analyze";
const FIND_OBJECT_PATH: &str = "/images/find-object";
const USER_AGENT: &str = concat!("sift-ingest/", env!("CARGO_PKG_VERSION"));

/// Transport-level failures, scoped to one request
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: bearer token rejected")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Opaque result of upload-and-analyze
///
/// Only ever passed back to `find_object`; never inspected or mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisPayload(serde_json::Value);

impl AnalysisPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Supplies the bearer token attached to outgoing requests
///
/// Credential storage lives outside this crate.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, typically resolved from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Remote analysis capabilities
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload one file and return its analysis payload
    async fn upload_and_analyze(&self, file: &FileSnapshot)
        -> Result<AnalysisPayload, TransportError>;

    /// Count instances of `object_label` in an analyzed payload
    ///
    /// `required_count` is forwarded for the service's information only.
    async fn find_object(
        &self,
        payload: &AnalysisPayload,
        object_label: &str,
        required_count: u32,
    ) -> Result<u32, TransportError>;
}

#[derive(Debug, Serialize)]
struct FindObjectRequest<'a> {
    data: &'a AnalysisPayload,
    object: &'a str,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct FindObjectResponse {
    #[serde(default)]
    #[allow(dead_code)]
    found: Option<bool>,
    number_of_objects_found: Option<i64>,
}

/// HTTP implementation of [`AnalysisService`]
pub struct HttpAnalysisClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpAnalysisClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::Api(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

fn file_part(file: &FileSnapshot) -> Part {
    let part = Part::bytes(file.bytes.to_vec()).file_name(file.display_name.clone());
    match part.mime_str(&file.content_type) {
        Ok(part) => part,
        Err(_) => {
            tracing::debug!(file = %file.display_name, content_type = %file.content_type, "Unusable content type, sending without one");
            Part::bytes(file.bytes.to_vec()).file_name(file.display_name.clone())
        }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn upload_and_analyze(
        &self,
        file: &FileSnapshot,
    ) -> Result<AnalysisPayload, TransportError> {
        let url = format!("{}{}", self.base_url, UPLOAD_PATH);
        let form = Form::new().part("files", file_part(file));

        tracing::debug!(file = %file.display_name, bytes = file.bytes.len(), "Uploading for analysis");

        let response = self
            .authorized(self.http_client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        tracing::debug!(file = %file.display_name, "Analysis payload received");
        Ok(AnalysisPayload::new(payload))
    }

    async fn find_object(
        &self,
        payload: &AnalysisPayload,
        object_label: &str,
        required_count: u32,
    ) -> Result<u32, TransportError> {
        let url = format!("{}{}", self.base_url, FIND_OBJECT_PATH);
        let body = FindObjectRequest {
            data: payload,
            object: object_label,
            count: required_count,
        };

        let response = self
            .authorized(self.http_client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;

        let parsed: FindObjectResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        let found = parsed.number_of_objects_found.ok_or_else(|| {
            TransportError::Parse("response missing number_of_objects_found".to_string())
        })?;

        let found = u32::try_from(found)
            .map_err(|_| TransportError::Parse(format!("invalid object count {}", found)))?;

        tracing::debug!(label = %object_label, found, "Object count received");
        Ok(found)
    }
}
