//! Default HTTP implementation of the bookmark service interfaces.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use marksync_core::Bookmark;

use crate::service::{
    BookmarkWriter, CreateError, DeleteError, SnapshotError, SnapshotLoader,
};

pub const DEFAULT_TIMEOUT_MS: u64 = 2_500;
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 2;
pub const ENV_SERVICE_BASE_URL: &str = "MARKSYNC_SERVICE_BASE_URL";

/// Configuration for [`HttpBookmarkService`].
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl HttpServiceConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

/// Service base-url misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceConfigError {
    #[error("service base url must not be empty")]
    EmptyBaseUrl,
    #[error("service base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

/// Resolves the service base URL: environment override first, then a stored
/// value, trailing slashes trimmed. Returns the value plus its source.
pub fn resolve_service_base_url(
    stored: Option<&str>,
) -> Result<(String, &'static str), ServiceConfigError> {
    if let Some(base_url) = env_non_empty(ENV_SERVICE_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_SERVICE_BASE_URL));
    }
    if let Some(base_url) = stored.map(str::trim).filter(|value| !value.is_empty()) {
        return normalize_base_url(base_url).map(|normalized| (normalized, "stored"));
    }
    Err(ServiceConfigError::EmptyBaseUrl)
}

fn normalize_base_url(raw: &str) -> Result<String, ServiceConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ServiceConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ServiceConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ServiceConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ServiceConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Serialize)]
struct CreateBookmarkRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP-backed bookmark service.
///
/// The owner is implicit in the bearer token; the `owner_id` trait
/// parameters are not sent on the wire. Snapshot reads retry on transport
/// errors; mutations are sent exactly once so a flaky network cannot turn
/// one create into two.
#[derive(Debug, Clone)]
pub struct HttpBookmarkService {
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

impl HttpBookmarkService {
    pub fn new(config: HttpServiceConfig) -> Result<Self, ServiceConfigError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            access_token: config.access_token,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            request_attempts: config.request_attempts.max(1),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn bookmarks_path() -> &'static str {
        "/v1/bookmarks"
    }

    #[must_use]
    pub fn bookmark_path(id: &str) -> String {
        format!("/v1/bookmarks/{}", id.trim())
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method, self.endpoint(path))
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait]
impl BookmarkWriter for HttpBookmarkService {
    async fn create(&self, _owner_id: &str, url: &str) -> Result<Bookmark, CreateError> {
        let response = self
            .request(reqwest::Method::POST, Self::bookmarks_path())
            .json(&CreateBookmarkRequest { url })
            .send()
            .await
            .map_err(|error| CreateError::Unknown(error.to_string()))?;

        let status = response.status();
        let bytes = read_body(response)
            .await
            .map_err(CreateError::Unknown)?;
        if !status.is_success() {
            return Err(map_create_error(status, &bytes));
        }
        serde_json::from_slice(&bytes).map_err(|error| CreateError::Unknown(error.to_string()))
    }

    async fn delete(&self, _owner_id: &str, id: &str) -> Result<(), DeleteError> {
        let response = self
            .request(reqwest::Method::DELETE, &Self::bookmark_path(id))
            .send()
            .await
            .map_err(|error| DeleteError::Unknown(error.to_string()))?;

        let status = response.status();
        // Deleting an id the service no longer knows is a no-op success.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let bytes = read_body(response)
            .await
            .map_err(DeleteError::Unknown)?;
        Err(map_delete_error(status, &bytes))
    }
}

#[async_trait]
impl SnapshotLoader for HttpBookmarkService {
    async fn fetch_snapshot(&self, _owner_id: &str) -> Result<Vec<Bookmark>, SnapshotError> {
        let mut last_error: Option<String> = None;

        for attempt in 0..self.request_attempts {
            let sent = self
                .request(reqwest::Method::GET, Self::bookmarks_path())
                .send()
                .await;
            match sent {
                Ok(response) => {
                    let status = response.status();
                    let bytes = read_body(response)
                        .await
                        .map_err(SnapshotError::Unknown)?;
                    if !status.is_success() {
                        return Err(map_snapshot_error(status, &bytes));
                    }
                    let snapshot: SnapshotResponse = serde_json::from_slice(&bytes)
                        .map_err(|error| SnapshotError::Unknown(error.to_string()))?;
                    return Ok(snapshot.bookmarks);
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt + 1 >= self.request_attempts {
                        break;
                    }
                }
            }
        }

        Err(SnapshotError::Unknown(
            last_error.unwrap_or_else(|| "unknown".to_string()),
        ))
    }
}

async fn read_body(response: Response) -> Result<Vec<u8>, String> {
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|error| error.to_string())
}

fn map_create_error(status: StatusCode, body: &[u8]) -> CreateError {
    match status {
        StatusCode::BAD_REQUEST => CreateError::Validation(error_message(status, body)),
        StatusCode::UNAUTHORIZED => CreateError::Unauthenticated,
        StatusCode::CONFLICT => CreateError::Duplicate,
        _ => CreateError::Unknown(error_message(status, body)),
    }
}

fn map_delete_error(status: StatusCode, body: &[u8]) -> DeleteError {
    match status {
        StatusCode::UNAUTHORIZED => DeleteError::Unauthenticated,
        _ => DeleteError::Unknown(error_message(status, body)),
    }
}

fn map_snapshot_error(status: StatusCode, body: &[u8]) -> SnapshotError {
    match status {
        StatusCode::UNAUTHORIZED => SnapshotError::Unauthenticated,
        _ => SnapshotError::Unknown(error_message(status, body)),
    }
}

/// Pulls the service's error message out of a `{"error": ...}` body, falling
/// back to the raw text or the status line.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        let trimmed = parsed.error.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.to_string()
    }
}
