//! Local backend running the in-process segmentation session

use super::{BackendKind, RemovalBackend};
use crate::engine::SegmentationSession;
use crate::error::BackendError;
use async_trait::async_trait;
use std::sync::Arc;

/// Backend delegating to a process-wide [`SegmentationSession`]
///
/// The session is loaded once at startup and handed in here; this backend
/// never loads or reloads a model on its own.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    session: Arc<SegmentationSession>,
}

impl LocalBackend {
    #[must_use]
    pub fn new<S: Into<String>>(name: S, session: Arc<SegmentationSession>) -> Self {
        Self {
            name: name.into(),
            session,
        }
    }

    /// Shared session handle
    #[must_use]
    pub fn session(&self) -> &Arc<SegmentationSession> {
        &self.session
    }
}

#[async_trait]
impl RemovalBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, BackendError> {
        let session = Arc::clone(&self.session);
        let image = image.to_vec();

        // Inference is CPU bound; keep it off the async workers
        tokio::task::spawn_blocking(move || session.remove_background(&image))
            .await
            .map_err(|e| BackendError::engine(format!("Inference task failed: {e}")))?
    }
}
