//! `multipart/form-data` uploads
//!
//! The upload route takes a plain byte body so it can also accept JSON or raw
//! image bytes. Multipart bodies are handed to `multer` here instead of going
//! through an extractor.

use crate::error::DecodeError;
use axum::body::Bytes;
use std::convert::Infallible;

/// Uploaded file selected from a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    /// Field name from `Content-Disposition`
    pub name: Option<String>,
    pub filename: String,
    /// Declared `Content-Type`, e.g. `image/png`
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Extract the boundary parameter from a `multipart/form-data` content type
///
/// Returns `None` when the content type is not multipart or has no boundary.
#[must_use]
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    multer::parse_boundary(content_type).ok()
}

/// Return the first uploaded file whose content type is `image/*`
///
/// Fields are read in order; parts without a file name or with a non-image
/// type are skipped.
///
/// # Errors
/// - `DecodeError::NoImagePart` when no part qualifies
/// - `DecodeError::MalformedMultipart` when the body is not a valid form
pub async fn first_image_part(
    body: impl Into<Bytes>,
    boundary: &str,
) -> Result<ImagePart, DecodeError> {
    let body = body.into();
    let stream = futures_util::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut form = multer::Multipart::new(stream, boundary);

    while let Some(field) = form.next_field().await.map_err(malformed)? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let Some(content_type) = field
            .content_type()
            .filter(|mime| mime.type_().as_str().eq_ignore_ascii_case("image"))
            .map(ToString::to_string)
        else {
            continue;
        };
        let name = field.name().map(str::to_string);
        let data = field.bytes().await.map_err(malformed)?;

        return Ok(ImagePart {
            name,
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(DecodeError::NoImagePart)
}

fn malformed(err: multer::Error) -> DecodeError {
    DecodeError::malformed_multipart(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(boundary: &str, parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content_type, data) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{name}\"");
            if let Some(filename) = filename {
                disposition.push_str(&format!("; filename=\"{filename}\""));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = content_type {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=\"quoted-b\"").as_deref(),
            Some("quoted-b")
        );
        assert_eq!(boundary_from_content_type("application/json"), None);
        assert_eq!(boundary_from_content_type("multipart/form-data"), None);
    }

    #[tokio::test]
    async fn test_second_part_is_selected_when_first_is_not_an_image() {
        let body = form(
            "XyZ",
            &[
                ("note", Some("notes.txt"), Some("text/plain"), &b"hello"[..]),
                ("image", Some("cat.png"), Some("image/png"), &b"\x89PNG\r\n\x1a\nDATA"[..]),
            ],
        );

        let image = first_image_part(body, "XyZ").await.unwrap();
        assert_eq!(image.data, b"\x89PNG\r\n\x1a\nDATA".to_vec());
        assert_eq!(image.filename, "cat.png");
        assert_eq!(image.name.as_deref(), Some("image"));
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_field_without_filename_is_not_a_file() {
        let body = form("b", &[("image", None, Some("image/png"), &b"abc"[..])]);
        assert!(matches!(
            first_image_part(body, "b").await,
            Err(DecodeError::NoImagePart)
        ));
    }

    #[tokio::test]
    async fn test_filename_with_semicolon_is_kept_whole() {
        let body = form(
            "b",
            &[("image", Some("a;b.png"), Some("image/png"), &b"png"[..])],
        );
        let image = first_image_part(body, "b").await.unwrap();
        assert_eq!(image.filename, "a;b.png");
        assert_eq!(image.data, b"png".to_vec());
    }

    #[tokio::test]
    async fn test_unterminated_part_is_malformed() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"f\"; filename=\"f.png\"\r\nContent-Type: image/png\r\n\r\nno end".to_vec();
        let result = first_image_part(body, "b").await;
        assert!(matches!(result, Err(DecodeError::MalformedMultipart(_))));
    }

    #[tokio::test]
    async fn test_content_type_match_is_case_insensitive() {
        let body = form("b", &[("file", Some("a.JPG"), Some("IMAGE/JPEG"), &b"jpg"[..])]);
        let image = first_image_part(body, "b").await.unwrap();
        assert_eq!(image.data, b"jpg".to_vec());
    }
}
