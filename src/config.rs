//! Gateway configuration and backend construction

use crate::backends::{RemoteBackend, RemovalBackend};
use crate::dispatch::{Dispatcher, DEFAULT_CALL_TIMEOUT};
use crate::error::{Result, ServiceError};
use crate::input::DEFAULT_FETCH_TIMEOUT;
use crate::models::{ModelCatalog, DEFAULT_MODEL};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port
pub const DEFAULT_PORT: u16 = 5000;

/// Default request body cap (20 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Name given to the local backend when none is configured
pub const DEFAULT_LOCAL_NAME: &str = "local";

/// One entry of the ordered backend list
#[derive(Clone, PartialEq, Eq)]
pub enum BackendSpec {
    /// In-process segmentation model
    Local {
        name: String,
        /// Catalog model name
        model: String,
        /// Explicit model file; defaults to `~/.u2net/<model>.onnx`
        model_path: Option<PathBuf>,
    },
    /// HTTP inference endpoint
    Remote {
        name: String,
        endpoint: String,
        token: Option<String>,
    },
}

impl std::fmt::Debug for BackendSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local {
                name,
                model,
                model_path,
            } => f
                .debug_struct("Local")
                .field("name", name)
                .field("model", model)
                .field("model_path", model_path)
                .finish(),
            Self::Remote {
                name,
                endpoint,
                token,
            } => f
                .debug_struct("Remote")
                .field("name", name)
                .field("endpoint", endpoint)
                .field("token", &token.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

impl BackendSpec {
    /// Local backend for the default model at its default path
    #[must_use]
    pub fn local_default() -> Self {
        Self::Local {
            name: DEFAULT_LOCAL_NAME.to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_path: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Local { name, .. } | Self::Remote { name, .. } => name,
        }
    }
}

/// Runtime configuration of the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,

    /// CORS origins; empty means any origin
    pub allowed_origins: Vec<String>,

    /// Timeout for fetching `http(s)` image URLs
    pub fetch_timeout: Duration,

    /// Timeout applied to each backend call
    pub backend_timeout: Duration,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Backends in priority order
    pub backends: Vec<BackendSpec>,

    /// Refuse to start when the local model cannot be loaded (default: true)
    ///
    /// When false, a failing local backend is dropped from the list and the
    /// health endpoint reports the model as unavailable.
    pub require_local_model: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            backend_timeout: DEFAULT_CALL_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            backends: vec![BackendSpec::local_default()],
            require_local_model: true,
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// `host:port` string for binding the listener
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate all configuration parameters
    ///
    /// An empty backend list is accepted here; requests then fail with a
    /// configuration error.
    ///
    /// # Errors
    /// - Port 0, zero timeouts or a zero body limit
    /// - Empty or duplicate backend names
    /// - Unknown local model, or a remote endpoint that is not `http(s)`
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ServiceError::config_value_error("port", self.port, "1-65535"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ServiceError::config_value_error(
                "fetch timeout",
                "0s",
                "greater than zero",
            ));
        }
        if self.backend_timeout.is_zero() {
            return Err(ServiceError::config_value_error(
                "backend timeout",
                "0s",
                "greater than zero",
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ServiceError::config_value_error(
                "max body size",
                self.max_body_bytes,
                "greater than zero",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &self.backends {
            let name = spec.name();
            if name.trim().is_empty() {
                return Err(ServiceError::configuration("backend name must not be empty"));
            }
            if !seen.insert(name) {
                return Err(ServiceError::configuration(format!(
                    "duplicate backend name '{name}'"
                )));
            }
            match spec {
                BackendSpec::Local { model, .. } => {
                    ModelCatalog::get(model)?;
                },
                BackendSpec::Remote { endpoint, .. } => {
                    let lower = endpoint.to_ascii_lowercase();
                    if !lower.starts_with("http://") && !lower.starts_with("https://") {
                        return Err(ServiceError::configuration(format!(
                            "backend '{name}' endpoint must be an http(s) URL, got '{endpoint}'"
                        )));
                    }
                },
            }
        }

        Ok(())
    }

    /// Instantiate the configured backends and wrap them in a [`Dispatcher`]
    ///
    /// Local models are loaded here, once, and shared by reference for the
    /// lifetime of the process.
    ///
    /// # Errors
    /// - Local model missing or unloadable while `require_local_model` is set
    /// - Local backend requested without the `tract` feature
    pub fn build_dispatcher(&self, client: &reqwest::Client) -> Result<BackendSet> {
        let mut backends: Vec<Arc<dyn RemovalBackend>> = Vec::with_capacity(self.backends.len());
        let mut local_model_ready = false;

        for spec in &self.backends {
            match spec {
                BackendSpec::Local {
                    name,
                    model,
                    model_path,
                } => match build_local(name, model, model_path.as_ref()) {
                    Ok(backend) => {
                        local_model_ready = true;
                        backends.push(backend);
                    },
                    Err(e) if !self.require_local_model => {
                        warn!(backend = %name, error = %e, "Local backend unavailable, skipping");
                    },
                    Err(e) => return Err(e),
                },
                BackendSpec::Remote {
                    name,
                    endpoint,
                    token,
                } => {
                    let backend =
                        RemoteBackend::new(name.clone(), endpoint.clone(), token.clone(), client.clone());
                    if !backend.has_token() {
                        warn!(backend = %name, "Remote backend has no API token configured");
                    }
                    backends.push(Arc::new(backend));
                },
            }
        }

        let dispatcher = Dispatcher::new(backends, self.backend_timeout);
        info!(
            backends = ?dispatcher.backend_names(),
            local_model_ready,
            "Backends initialized"
        );
        Ok(BackendSet {
            dispatcher,
            local_model_ready,
        })
    }
}

/// Initialized backends ready for serving
#[derive(Debug, Clone)]
pub struct BackendSet {
    pub dispatcher: Dispatcher,
    /// True when a local model session was loaded
    pub local_model_ready: bool,
}

#[cfg(feature = "tract")]
fn build_local(
    name: &str,
    model: &str,
    model_path: Option<&PathBuf>,
) -> Result<Arc<dyn RemovalBackend>> {
    use crate::backends::LocalBackend;
    use crate::engine::SegmentationSession;

    let info = ModelCatalog::get(model)?;
    let path = model_path
        .cloned()
        .unwrap_or_else(|| ModelCatalog::default_model_path(info.name));
    let session = SegmentationSession::load(info, path)?;
    Ok(Arc::new(LocalBackend::new(name, Arc::new(session))))
}

#[cfg(not(feature = "tract"))]
fn build_local(
    name: &str,
    _model: &str,
    _model_path: Option<&PathBuf>,
) -> Result<Arc<dyn RemovalBackend>> {
    Err(ServiceError::configuration(format!(
        "backend '{name}' needs the local engine, which requires the `tract` feature"
    )))
}

/// Builder for [`ServiceConfig`]
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Add an allowed CORS origin; `*` clears the list (any origin)
    #[must_use]
    pub fn allowed_origin<S: Into<String>>(mut self, origin: S) -> Self {
        let origin = origin.into();
        if origin.trim() == "*" {
            self.config.allowed_origins.clear();
        } else {
            self.config.allowed_origins.push(origin);
        }
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.config.backend_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    /// Replace the backend list
    #[must_use]
    pub fn backends(mut self, backends: Vec<BackendSpec>) -> Self {
        self.config.backends = backends;
        self
    }

    /// Append a backend at the lowest priority
    #[must_use]
    pub fn backend(mut self, backend: BackendSpec) -> Self {
        self.config.backends.push(backend);
        self
    }

    #[must_use]
    pub fn require_local_model(mut self, required: bool) -> Self {
        self.config.require_local_model = required;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`ServiceConfig::validate`]
    pub fn build(self) -> Result<ServiceConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
