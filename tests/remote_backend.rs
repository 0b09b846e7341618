//! Remote inference backend against a fake HTTP endpoint

use imgly_bgremove_gateway::{backends::RemoteBackend, BackendError, BackendKind, RemovalBackend};
use wiremock::matchers::{body_bytes, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn backend(server: &MockServer, token: Option<&str>) -> RemoteBackend {
    RemoteBackend::new(
        "huggingface",
        format!("{}/models/briaai/RMBG-1.4", server.uri()),
        token.map(str::to_string),
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn test_sends_bearer_token_and_image_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/briaai/RMBG-1.4"))
        .and(header("authorization", "Bearer hf_secret"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(b"image-bytes".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"processed".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let remote = backend(&server, Some("hf_secret"));
    assert_eq!(remote.kind(), BackendKind::Remote);

    let out = remote.remove_background(b"image-bytes").await.unwrap();
    assert_eq!(out, b"processed".to_vec());
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let out = backend(&server, None).remove_background(b"img").await.unwrap();
    assert_eq!(out, b"ok".to_vec());

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_non_200_is_a_status_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let err = backend(&server, Some("bad"))
        .remove_background(b"img")
        .await
        .unwrap_err();

    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_other_2xx_is_not_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
        .mount(&server)
        .await;

    let err = backend(&server, None).remove_background(b"img").await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 202, .. }));
}

#[tokio::test]
async fn test_empty_body_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = backend(&server, None).remove_background(b"img").await.unwrap_err();
    assert!(matches!(err, BackendError::EmptyResponse));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_failure() {
    let remote = RemoteBackend::new(
        "offline",
        "http://127.0.0.1:9/rmbg",
        None,
        reqwest::Client::new(),
    );
    let err = remote.remove_background(b"img").await.unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}
