//! Image intake: turning heterogeneous request encodings into raw bytes
//!
//! Requests arrive as raw bodies, base64 data URLs, remote URLs or
//! multipart uploads. [`ImageIntake::normalize`] resolves each of them to the
//! canonical byte buffer handed to the dispatcher. Decoding is all-or-nothing:
//! a partially decoded payload is never returned.

use crate::error::DecodeError;
use crate::multipart;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use instant::Instant;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for fetching remote images
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A request image in one of the accepted encodings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Body bytes used as-is
    RawBytes(Vec<u8>),
    /// `data:<mime>;base64,<payload>` string
    Base64DataUrl(String),
    /// `http(s)://` URL to fetch
    RemoteUrl(String),
    /// `multipart/form-data` body and its boundary
    Multipart { boundary: String, body: Vec<u8> },
}

impl ImageInput {
    /// Classify an `image_data` string from a JSON request body
    ///
    /// Strings starting with `data:` are data URLs, `http://` or `https://`
    /// are remote URLs; everything else is rejected.
    ///
    /// # Errors
    /// - `DecodeError::EmptyInput` for an empty string
    /// - `DecodeError::UnsupportedUrl` for any other scheme
    pub fn from_image_data(image_data: &str) -> Result<Self, DecodeError> {
        let trimmed = image_data.trim();
        if trimmed.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        let lower = trimmed
            .get(..8)
            .unwrap_or(trimmed)
            .to_ascii_lowercase();
        if lower.starts_with("data:") {
            Ok(Self::Base64DataUrl(trimmed.to_string()))
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::RemoteUrl(trimmed.to_string()))
        } else {
            Err(DecodeError::UnsupportedUrl(truncate_for_display(trimmed)))
        }
    }

    /// Short label of the variant, for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RawBytes(_) => "raw",
            Self::Base64DataUrl(_) => "data_url",
            Self::RemoteUrl(_) => "url",
            Self::Multipart { .. } => "multipart",
        }
    }
}

/// Parsed data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    /// MIME header between `data:` and the comma (e.g. `image/png;base64`)
    pub mime: &'a str,
    /// Encoded payload after the first comma
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Split a data URL on its first comma
    ///
    /// # Errors
    /// - `DecodeError::MalformedDataUrl` when there is no comma
    pub fn parse(data_url: &'a str) -> Result<Self, DecodeError> {
        let (header, payload) = data_url
            .split_once(',')
            .ok_or(DecodeError::MalformedDataUrl)?;
        let mime = header.strip_prefix("data:").unwrap_or(header);
        Ok(Self { mime, payload })
    }

    /// Decode the base64 payload
    ///
    /// # Errors
    /// - `DecodeError::InvalidBase64` on bad encoding
    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        let payload: String = self
            .payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        Ok(STANDARD.decode(payload)?)
    }
}

/// Build a `data:<mime>;base64,<payload>` URL from raw bytes
#[must_use]
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Resolves [`ImageInput`] values to raw bytes
#[derive(Debug, Clone)]
pub struct ImageIntake {
    client: reqwest::Client,
    fetch_timeout: Duration,
}

impl ImageIntake {
    /// Create an intake with its own HTTP client
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(fetch_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, fetch_timeout))
    }

    /// Create an intake sharing an existing HTTP client
    #[must_use]
    pub fn with_client(client: reqwest::Client, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
        }
    }

    /// Configured timeout for remote fetches
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Resolve an input to its canonical byte buffer
    ///
    /// # Errors
    /// - `DecodeError` variants describing why the input could not be decoded
    #[instrument(skip_all, fields(kind = input.kind()))]
    pub async fn normalize(&self, input: ImageInput) -> Result<Vec<u8>, DecodeError> {
        let start = Instant::now();
        let bytes = match input {
            ImageInput::RawBytes(bytes) => bytes,
            ImageInput::Base64DataUrl(data_url) => DataUrl::parse(&data_url)?.decode()?,
            ImageInput::RemoteUrl(url) => self.fetch(&url).await?,
            ImageInput::Multipart { boundary, body } => {
                let part = multipart::first_image_part(body, &boundary).await?;
                debug!(
                    filename = %part.filename,
                    content_type = %part.content_type,
                    "Selected image part from multipart upload"
                );
                part.data
            },
        };

        if bytes.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        debug!(
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Input normalized"
        );
        Ok(bytes)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DecodeError> {
        debug!(url = %url, "Fetching remote image");

        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| DecodeError::fetch_transport(describe_reqwest_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DecodeError::fetch_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DecodeError::fetch_transport(describe_reqwest_error(&e)))?;
        Ok(body.to_vec())
    }
}

fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}

fn truncate_for_display(value: &str) -> String {
    const MAX: usize = 64;
    if value.chars().count() <= MAX {
        value.to_string()
    } else {
        let head: String = value.chars().take(MAX).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake() -> ImageIntake {
        ImageIntake::new(DEFAULT_FETCH_TIMEOUT).unwrap()
    }

    #[test]
    fn test_data_url_parse_splits_on_first_comma() {
        let parsed = DataUrl::parse("data:image/png;base64,QUJD,extra").unwrap();
        assert_eq!(parsed.mime, "image/png;base64");
        assert_eq!(parsed.payload, "QUJD,extra");
    }

    #[test]
    fn test_data_url_without_comma_is_malformed() {
        let result = DataUrl::parse("data:image/png;base64");
        assert!(matches!(result, Err(DecodeError::MalformedDataUrl)));
    }

    #[test]
    fn test_invalid_base64_payload() {
        let parsed = DataUrl::parse("data:image/png;base64,@@not-base64@@").unwrap();
        assert!(matches!(parsed.decode(), Err(DecodeError::InvalidBase64(_))));
    }

    #[test]
    fn test_payload_whitespace_is_ignored() {
        let parsed = DataUrl::parse("data:image/png;base64,QUJD\nREVG\n").unwrap();
        assert_eq!(parsed.decode().unwrap(), b"ABCDEF".to_vec());
    }

    #[test]
    fn test_image_data_classification() {
        assert!(matches!(
            ImageInput::from_image_data("data:image/png;base64,AAAA"),
            Ok(ImageInput::Base64DataUrl(_))
        ));
        assert!(matches!(
            ImageInput::from_image_data("https://example.com/cat.png"),
            Ok(ImageInput::RemoteUrl(_))
        ));
        assert!(matches!(
            ImageInput::from_image_data("HTTP://EXAMPLE.COM/cat.png"),
            Ok(ImageInput::RemoteUrl(_))
        ));
        assert!(matches!(
            ImageInput::from_image_data("ftp://example.com/cat.png"),
            Err(DecodeError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            ImageInput::from_image_data("   "),
            Err(DecodeError::EmptyInput)
        ));
    }

    #[test]
    fn test_unsupported_reference_is_truncated() {
        let long = "x".repeat(500);
        let Err(DecodeError::UnsupportedUrl(shown)) = ImageInput::from_image_data(&long) else {
            panic!("expected UnsupportedUrl");
        };
        assert!(shown.len() < 100);
        assert!(shown.ends_with("..."));
    }

    #[tokio::test]
    async fn test_raw_bytes_pass_through() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3];
        let out = intake()
            .normalize(ImageInput::RawBytes(bytes.clone()))
            .await
            .unwrap();
        assert_eq!(out, bytes);
    }

    #[tokio::test]
    async fn test_empty_raw_body_is_rejected() {
        let result = intake().normalize(ImageInput::RawBytes(Vec::new())).await;
        assert!(matches!(result, Err(DecodeError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_data_url_round_trip() {
        let samples: [&[u8]; 4] = [b"a", b"ab", b"abc", &[0, 255, 128, 7, 9, 200, 13, 10]];
        for sample in samples {
            let url = encode_data_url("image/png", sample);
            let out = intake()
                .normalize(ImageInput::Base64DataUrl(url))
                .await
                .unwrap();
            assert_eq!(out, sample.to_vec());
        }
    }

    #[tokio::test]
    async fn test_unreachable_url_is_transport_failure() {
        let intake = ImageIntake::new(Duration::from_secs(2)).unwrap();
        let result = intake
            .normalize(ImageInput::RemoteUrl("http://127.0.0.1:9/cat.png".to_string()))
            .await;
        assert!(matches!(
            result,
            Err(DecodeError::FetchFailed { status: None, .. })
        ));
    }
}
