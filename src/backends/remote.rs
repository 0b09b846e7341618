//! Remote inference backend
//!
//! Speaks the plain binary inference contract used by hosted segmentation
//! models: `POST <endpoint>` with the image as body and an optional bearer
//! token, answered by `200 OK` with the processed image as body.

use super::{BackendKind, RemovalBackend};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Default hosted model endpoint
pub const DEFAULT_REMOTE_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/briaai/RMBG-1.4";

/// Maximum number of bytes of an error body kept in failure reasons
const ERROR_BODY_LIMIT: usize = 200;

/// Backend forwarding images to a remote inference API
pub struct RemoteBackend {
    name: String,
    endpoint: String,
    token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl RemoteBackend {
    /// Create a remote backend using a shared HTTP client
    ///
    /// Blank tokens are treated as absent.
    #[must_use]
    pub fn new<N, E>(name: N, endpoint: E, token: Option<String>, client: Client) -> Self
    where
        N: Into<String>,
        E: Into<String>,
    {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            token: token.filter(|t| !t.trim().is_empty()),
            client,
        }
    }

    /// Endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a credential is configured
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl RemovalBackend for RemoteBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, BackendError> {
        debug!(backend = %self.name, endpoint = %self.endpoint, bytes = image.len(), "Calling remote backend");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(ACCEPT, "image/png")
            .body(image.to_vec());
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::transport("request timed out")
            } else {
                BackendError::transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::transport(format!("Failed to read response body: {e}")))?;
        if bytes.is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        Ok(bytes.to_vec())
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", trimmed.get(..end).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_ignored() {
        let backend = RemoteBackend::new("hf", DEFAULT_REMOTE_ENDPOINT, Some("  ".into()), Client::new());
        assert!(!backend.has_token());

        let backend = RemoteBackend::new("hf", DEFAULT_REMOTE_ENDPOINT, Some("hf_x".into()), Client::new());
        assert!(backend.has_token());
    }

    #[test]
    fn test_debug_redacts_token() {
        let backend = RemoteBackend::new("hf", DEFAULT_REMOTE_ENDPOINT, Some("secret".into()), Client::new());
        let debug = format!("{backend:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_error_body_truncation() {
        let long = "é".repeat(300);
        let out = truncate(&long);
        assert!(out.ends_with("..."));
        assert!(out.len() <= ERROR_BODY_LIMIT + 3);
        assert_eq!(truncate("  short  "), "short");
    }
}
