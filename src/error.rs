//! Error types for image intake, backend invocation and dispatch

use std::time::Duration;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Failures while turning request input into a canonical byte buffer
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Data URL without the comma separating header and payload
    #[error("Malformed data URL: missing ',' between header and payload")]
    MalformedDataUrl,

    /// Data URL payload is not valid base64
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Remote image could not be fetched
    #[error("{}", fetch_failed_message(*.status, .reason))]
    FetchFailed {
        /// HTTP status when the server answered, `None` on transport errors
        status: Option<u16>,
        reason: String,
    },

    /// `image_data` is neither a data URL nor an http(s) URL
    #[error("Unsupported image reference: {0}")]
    UnsupportedUrl(String),

    /// Multipart body contained no file part with an `image/*` content type
    #[error("No image file found in multipart data")]
    NoImagePart,

    /// Body claims to be multipart but cannot be parsed as such
    #[error("Failed to parse multipart data: {0}")]
    MalformedMultipart(String),

    /// Nothing to process
    #[error("No data provided")]
    EmptyInput,
}

fn fetch_failed_message(status: Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("Failed to fetch image (HTTP {code}): {reason}"),
        None => format!("Failed to fetch image: {reason}"),
    }
}

impl DecodeError {
    /// Create a fetch failure for a response with a non-success status
    pub fn fetch_status<S: Into<String>>(status: u16, reason: S) -> Self {
        Self::FetchFailed {
            status: Some(status),
            reason: reason.into(),
        }
    }

    /// Create a fetch failure for a transport error or timeout
    pub fn fetch_transport<S: Into<String>>(reason: S) -> Self {
        Self::FetchFailed {
            status: None,
            reason: reason.into(),
        }
    }

    /// Create a malformed multipart error
    pub fn malformed_multipart<S: Into<String>>(msg: S) -> Self {
        Self::MalformedMultipart(msg.into())
    }
}

/// A single backend invocation failure
///
/// These are recovered inside the dispatch loop and only ever reach callers
/// as entries of [`ServiceError::AllBackendsFailed`].
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// Local engine failure (undecodable image, inference error, ...)
    #[error("engine error: {0}")]
    Engine(String),

    #[error("backend returned an empty response")]
    EmptyResponse,
}

impl BackendError {
    /// Create a new engine error
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Self::Engine(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }
}

/// Recorded failure of one backend during a dispatch pass
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BackendFailure {
    /// Backend name as configured
    pub backend: String,
    /// Human readable failure reason
    pub reason: String,
}

impl BackendFailure {
    pub fn new<N: Into<String>>(backend: N, error: &BackendError) -> Self {
        Self {
            backend: backend.into(),
            reason: error.to_string(),
        }
    }
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.backend, self.reason)
    }
}

/// Top level error type surfaced to callers of the gateway
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Request input could not be normalized
    #[error("Failed to process image data: {0}")]
    Decode(#[from] DecodeError),

    /// Missing or invalid backend configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every configured backend failed for this request
    #[error("All backends failed: {}", format_attempts(.attempts))]
    AllBackendsFailed { attempts: Vec<BackendFailure> },

    /// Model loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request shape is wrong (missing fields, bad JSON)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_attempts(attempts: &[BackendFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create model error with troubleshooting context
    pub fn model_error_with_context<P: AsRef<std::path::Path>>(
        operation: &str,
        model_path: P,
        error: &str,
        suggestions: &[&str],
    ) -> Self {
        let path_display = model_path.as_ref().display();
        let suggestion_text = if suggestions.is_empty() {
            String::new()
        } else {
            format!(" Suggestions: {}", suggestions.join(", "))
        };

        Self::Model(format!(
            "Failed to {operation} model '{path_display}': {error}.{suggestion_text}"
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::Configuration(format!(
            "Invalid {parameter}: {value} (valid range: {valid_range})"
        ))
    }
}
