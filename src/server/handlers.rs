//! Route handlers

use super::error::ApiError;
use super::AppState;
use crate::error::{DecodeError, ServiceError};
use crate::input::{encode_data_url, ImageInput};
use crate::models::{ModelCatalog, ModelSummary};
use crate::multipart;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

const PNG_MIME: &str = "image/png";
const PNG_DISPOSITION: &str = "attachment; filename=removed_bg.png";
const SUCCESS_MESSAGE: &str = "Background removed successfully";

#[derive(Debug, Deserialize)]
struct ImageDataRequest {
    image_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemovalResponse {
    pub success: bool,
    /// `data:image/png;base64,...`
    pub image: String,
    pub message: String,
    /// Backend that produced the image
    pub backend: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub platform: String,
    pub version: &'static str,
    pub backends: Vec<String>,
    pub local_model_ready: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelSummary>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "background-removal",
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        version: env!("CARGO_PKG_VERSION"),
        backends: state.dispatcher.backend_names(),
        local_model_ready: state.local_model_ready,
        started_at: state.started_at,
    })
}

pub async fn models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: ModelCatalog::summaries(),
    })
}

pub async fn remove_background_usage() -> Json<Value> {
    Json(json!({
        "message": "POST an image to this endpoint to remove its background",
        "accepts": [
            "multipart/form-data with an image file part",
            "application/json with {\"image_data\": \"data:image/...;base64,...\"} or an http(s) URL",
            "raw image bytes"
        ],
        "returns": "JSON with a PNG data URL, or raw PNG when Accept prefers image/png"
    }))
}

pub async fn remove_background_url_usage() -> Json<Value> {
    Json(json!({
        "message": "POST JSON to this endpoint to remove an image's background",
        "accepts": [
            "{\"image_data\": \"data:image/...;base64,...\"}",
            "{\"image_data\": \"https://...\"}"
        ],
        "returns": "JSON with a PNG data URL, or raw PNG when Accept prefers image/png"
    }))
}

/// `POST /remove-background`: multipart, JSON or raw body
#[instrument(skip_all, fields(content_type = tracing::field::Empty, bytes = body.len()))]
pub async fn remove_background(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    tracing::Span::current().record("content_type", content_type);

    let input = if let Some(boundary) = multipart::boundary_from_content_type(content_type) {
        ImageInput::Multipart {
            boundary,
            body: body.to_vec(),
        }
    } else if mime_is(content_type, "multipart/form-data") {
        return Err(DecodeError::malformed_multipart("missing boundary parameter").into());
    } else if mime_is(content_type, "application/json") {
        json_input(&body)?
    } else {
        ImageInput::RawBytes(body.to_vec())
    };

    process(&state, input, &headers).await
}

/// `POST /remove-background-url`: JSON `{image_data}` only
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn remove_background_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let input = json_input(&body)?;
    process(&state, input, &headers).await
}

async fn process(
    state: &AppState,
    input: ImageInput,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let kind = input.kind();
    let bytes = state.intake.normalize(input).await?;
    let success = state.dispatcher.dispatch(&bytes).await?.into_result()?;

    info!(
        input = kind,
        backend = %success.backend,
        failed_before = success.failures.len(),
        output_bytes = success.image.len(),
        "Background removal completed"
    );

    if prefers_png(headers) {
        return Ok((
            [(CONTENT_TYPE, PNG_MIME), (CONTENT_DISPOSITION, PNG_DISPOSITION)],
            success.image,
        )
            .into_response());
    }

    Ok(Json(RemovalResponse {
        success: true,
        image: encode_data_url(PNG_MIME, &success.image),
        message: SUCCESS_MESSAGE.to_string(),
        backend: success.backend,
    })
    .into_response())
}

fn json_input(body: &[u8]) -> Result<ImageInput, ApiError> {
    let request: ImageDataRequest = serde_json::from_slice(body)
        .map_err(|e| ServiceError::invalid_request(format!("Invalid JSON body: {e}")))?;
    let image_data = request
        .image_data
        .ok_or_else(|| ServiceError::invalid_request("No image_data provided"))?;
    Ok(ImageInput::from_image_data(&image_data)?)
}

fn mime_is(content_type: &str, expected: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(expected))
}

/// True when `Accept` ranks `image/png` above `application/json`
pub(crate) fn prefers_png(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mut png = None;
    let mut json = None;
    for range in accept.split(',') {
        let mut params = range.split(';');
        let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        let quality = params
            .find_map(|p| p.trim().strip_prefix("q=").and_then(|q| q.parse::<f32>().ok()))
            .unwrap_or(1.0);
        match mime.as_str() {
            PNG_MIME => png = Some(quality),
            "application/json" => json = Some(quality),
            _ => {},
        }
    }

    match (png, json) {
        (Some(png), Some(json)) => png > json,
        (Some(png), None) => png > 0.0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_accept_negotiation() {
        assert!(!prefers_png(&HeaderMap::new()));
        assert!(prefers_png(&accept("image/png")));
        assert!(!prefers_png(&accept("application/json")));
        assert!(!prefers_png(&accept("*/*")));
        assert!(prefers_png(&accept("application/json;q=0.5, image/png")));
        assert!(!prefers_png(&accept("image/png;q=0.2, application/json")));
        assert!(!prefers_png(&accept("image/png;q=0")));
    }

    #[test]
    fn test_mime_is_ignores_parameters_and_case() {
        assert!(mime_is("Application/JSON; charset=utf-8", "application/json"));
        assert!(!mime_is("text/plain", "application/json"));
        assert!(!mime_is("", "application/json"));
    }

    #[test]
    fn test_json_input_requires_image_data() {
        let err = json_input(br#"{"other": 1}"#).unwrap_err();
        assert!(matches!(err.0, ServiceError::InvalidRequest(_)));

        let err = json_input(b"not json").unwrap_err();
        assert!(matches!(err.0, ServiceError::InvalidRequest(_)));

        let input = json_input(br#"{"image_data": "https://example.com/a.png"}"#).unwrap();
        assert!(matches!(input, ImageInput::RemoteUrl(_)));
    }
}
