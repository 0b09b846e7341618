//! Mock backend for testing and dry runs

use super::{BackendKind, RemovalBackend};
use crate::error::BackendError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted behavior of a [`MockBackend`]
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return these bytes
    Succeed(Vec<u8>),
    /// Return the input unchanged
    Echo,
    /// Fail with an upstream status
    FailStatus(u16),
    /// Fail with an engine error message
    FailEngine(String),
    /// Sleep before returning the bytes (for timeout tests)
    Delay(Duration, Vec<u8>),
}

/// Backend returning scripted results and counting invocations
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Create a new mock backend
    #[must_use]
    pub fn new<S: Into<String>>(name: S, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Backend that always succeeds with `output`
    #[must_use]
    pub fn succeeding<S: Into<String>>(name: S, output: Vec<u8>) -> Self {
        Self::new(name, MockBehavior::Succeed(output))
    }

    /// Backend that always fails with HTTP `status`
    #[must_use]
    pub fn failing<S: Into<String>>(name: S, status: u16) -> Self {
        Self::new(name, MockBehavior::FailStatus(status))
    }

    /// Number of times the backend was invoked
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemovalBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Succeed(output) => Ok(output.clone()),
            MockBehavior::Echo => Ok(image.to_vec()),
            MockBehavior::FailStatus(status) => Err(BackendError::Status {
                status: *status,
                body: "mock failure".to_string(),
            }),
            MockBehavior::FailEngine(message) => Err(BackendError::engine(message.clone())),
            MockBehavior::Delay(delay, output) => {
                tokio::time::sleep(*delay).await;
                Ok(output.clone())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let backend = MockBackend::new("echo", MockBehavior::Echo);
        assert_eq!(backend.calls(), 0);

        let out = backend.remove_background(b"abc").await.unwrap();
        assert_eq!(out, b"abc".to_vec());
        backend.remove_background(b"abc").await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let backend = MockBackend::failing("down", 503);
        let err = backend.remove_background(b"abc").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
        assert_eq!(backend.kind(), BackendKind::Mock);
    }
}
