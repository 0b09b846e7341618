//! Background removal backends
//!
//! Every provider the dispatcher can fall back across implements
//! [`RemovalBackend`]:
//! - Local backend (Tract segmentation session, pure Rust)
//! - Remote backend (third-party inference API over HTTP)
//! - Mock backend (scripted responses for tests and dry runs)

#[cfg(feature = "tract")]
pub mod local;
pub mod mock;
pub mod remote;

#[cfg(feature = "tract")]
pub use self::local::LocalBackend;
pub use self::mock::{MockBackend, MockBehavior};
pub use self::remote::RemoteBackend;

use crate::error::BackendError;
use async_trait::async_trait;

/// Kind of provider behind a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process segmentation model
    Local,
    /// HTTP inference endpoint
    Remote,
    /// Scripted test double
    Mock,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// A provider capable of removing the background from encoded image bytes
///
/// Implementations are immutable once constructed and shared between
/// concurrent requests.
#[async_trait]
pub trait RemovalBackend: Send + Sync {
    /// Configured name, used in logs and failure reports
    fn name(&self) -> &str;

    /// Kind of provider
    fn kind(&self) -> BackendKind;

    /// Remove the background and return the processed image (PNG)
    ///
    /// # Errors
    /// - `BackendError` describing why this provider could not produce a result
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, BackendError>;
}
