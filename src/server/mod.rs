//! HTTP boundary of the gateway
//!
//! Routes:
//! - `GET /health` service status, configured backends, local model readiness
//! - `GET /models` built-in model catalog
//! - `POST /remove-background` multipart upload, JSON `{image_data}` or raw body
//! - `POST /remove-background-url` JSON `{image_data}`
//!
//! The removal routes also answer `GET` with a usage message.

mod error;
mod handlers;

pub use self::error::{ApiError, ErrorBody};
pub use self::handlers::{HealthResponse, ModelsResponse, RemovalResponse};

use crate::config::ServiceConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::input::ImageIntake;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared, read-only state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub intake: Arc<ImageIntake>,
    pub local_model_ready: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, intake: ImageIntake, local_model_ready: bool) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            intake: Arc::new(intake),
            local_model_ready,
            started_at: chrono::Utc::now(),
        }
    }
}

/// Build the application router
pub fn router(state: AppState, config: &ServiceConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/models", get(handlers::models))
        .route(
            "/remove-background",
            get(handlers::remove_background_usage).post(handlers::remove_background),
        )
        .route(
            "/remove-background-url",
            get(handlers::remove_background_url_usage).post(handlers::remove_background_url),
        )
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %uuid::Uuid::new_v4(),
                )
            }),
        )
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                },
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Bind the configured address and serve until `shutdown` resolves
///
/// # Errors
/// - Address cannot be bound
/// - Server I/O failure
pub async fn serve<F>(config: &ServiceConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        backends = ?state.dispatcher.backend_names(),
        "Background removal gateway listening"
    );

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
