//! Ordered fallback across background removal backends
//!
//! The dispatcher tries each configured backend in priority order, one at a
//! time, each call bounded by a timeout. The first success wins; failures are
//! recorded and the loop moves on. Only when every backend has failed does
//! the caller see an error, and that error lists every attempt.

use crate::backends::RemovalBackend;
use crate::error::{BackendError, BackendFailure, Result, ServiceError};
use instant::Instant;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default per-backend call timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of one dispatch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalResult {
    /// A backend produced an image
    Success {
        /// Processed image bytes (PNG)
        image: Vec<u8>,
        /// Name of the backend that produced the image
        backend: String,
        /// Backends that failed before the successful one, in order
        failures: Vec<BackendFailure>,
    },
    /// Every backend failed
    Failure {
        /// Summary of the failed pass
        reason: String,
        /// One entry per configured backend, in configured order
        attempts: Vec<BackendFailure>,
    },
}

/// Successful dispatch, unwrapped from [`RemovalResult`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalSuccess {
    pub image: Vec<u8>,
    pub backend: String,
    pub failures: Vec<BackendFailure>,
}

impl RemovalResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failures recorded during the pass
    #[must_use]
    pub fn failures(&self) -> &[BackendFailure] {
        match self {
            Self::Success { failures, .. } => failures,
            Self::Failure { attempts, .. } => attempts,
        }
    }

    /// Convert into a `Result`, mapping a failed pass to `ServiceError::AllBackendsFailed`
    ///
    /// # Errors
    /// - `ServiceError::AllBackendsFailed` when no backend succeeded
    pub fn into_result(self) -> Result<RemovalSuccess> {
        match self {
            Self::Success {
                image,
                backend,
                failures,
            } => Ok(RemovalSuccess {
                image,
                backend,
                failures,
            }),
            Self::Failure { attempts, .. } => Err(ServiceError::AllBackendsFailed { attempts }),
        }
    }
}

/// Dispatches images across an ordered, immutable list of backends
#[derive(Clone)]
pub struct Dispatcher {
    backends: Vec<Arc<dyn RemovalBackend>>,
    call_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backends", &self.backend_names())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn RemovalBackend>>, call_timeout: Duration) -> Self {
        Self {
            backends,
            call_timeout,
        }
    }

    /// Backend names in priority order
    #[must_use]
    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Configured backends in priority order
    #[must_use]
    pub fn backends(&self) -> &[Arc<dyn RemovalBackend>] {
        &self.backends
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Run one dispatch pass over the configured backends
    ///
    /// # Errors
    /// - `ServiceError::Configuration` when no backends are configured
    pub async fn dispatch(&self, image: &[u8]) -> Result<RemovalResult> {
        dispatch(image, &self.backends, self.call_timeout).await
    }
}

/// Try `backends` in order until one succeeds
///
/// Each call is bounded by `call_timeout`. Backend failures are recorded,
/// never returned individually.
///
/// # Errors
/// - `ServiceError::Configuration` when `backends` is empty; no call is made
#[instrument(skip_all, fields(bytes = image.len(), backends = backends.len()))]
pub async fn dispatch(
    image: &[u8],
    backends: &[Arc<dyn RemovalBackend>],
    call_timeout: Duration,
) -> Result<RemovalResult> {
    if backends.is_empty() {
        return Err(ServiceError::configuration(
            "no background removal backends configured",
        ));
    }

    let mut failures = Vec::new();

    for backend in backends {
        let start = Instant::now();
        let outcome = match tokio::time::timeout(call_timeout, backend.remove_background(image)).await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(call_timeout)),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                info!(
                    backend = backend.name(),
                    kind = %backend.kind(),
                    elapsed_ms,
                    output_bytes = output.len(),
                    skipped = failures.len(),
                    "Background removed"
                );
                return Ok(RemovalResult::Success {
                    image: output,
                    backend: backend.name().to_string(),
                    failures,
                });
            },
            Err(error) => {
                warn!(
                    backend = backend.name(),
                    kind = %backend.kind(),
                    elapsed_ms,
                    error = %error,
                    "Backend failed, trying next"
                );
                failures.push(BackendFailure::new(backend.name(), &error));
            },
        }
    }

    warn!(attempts = failures.len(), "All backends failed");
    Ok(RemovalResult::Failure {
        reason: format!("all {} backends failed", failures.len()),
        attempts: failures,
    })
}
