//! Ordered fallback behavior across mixed backends

use imgly_bgremove_gateway::{
    backends::{MockBackend, MockBehavior, RemoteBackend},
    Dispatcher, RemovalBackend, RemovalResult, ServiceError,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_failing_primary_falls_back_to_secondary() {
    let primary = Arc::new(MockBackend::failing("local", 500));
    let secondary = Arc::new(MockBackend::succeeding("remote", b"png".to_vec()));
    let dispatcher = Dispatcher::new(vec![primary.clone(), secondary.clone()], TIMEOUT);

    let result = dispatcher.dispatch(b"input").await.unwrap();

    match result {
        RemovalResult::Success {
            image,
            backend,
            failures,
        } => {
            assert_eq!(image, b"png".to_vec());
            assert_eq!(backend, "remote");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].backend, "local");
            assert!(failures[0].reason.contains("500"));
        },
        RemovalResult::Failure { .. } => panic!("expected success"),
    }
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);
}

#[tokio::test]
async fn test_all_backends_failing_reports_every_attempt() {
    let backends: Vec<Arc<dyn RemovalBackend>> = vec![
        Arc::new(MockBackend::failing("a", 500)),
        Arc::new(MockBackend::new("b", MockBehavior::FailEngine("cannot decode".into()))),
        Arc::new(MockBackend::failing("c", 429)),
    ];
    let dispatcher = Dispatcher::new(backends, TIMEOUT);

    let result = dispatcher.dispatch(b"input").await.unwrap();
    assert!(!result.is_success());

    let Err(ServiceError::AllBackendsFailed { attempts }) = result.into_result() else {
        panic!("expected AllBackendsFailed");
    };
    let names: Vec<&str> = attempts.iter().map(|a| a.backend.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(attempts[1].reason.contains("cannot decode"));
}

#[tokio::test]
async fn test_empty_backend_list_invokes_nothing() {
    let dispatcher = Dispatcher::new(Vec::new(), TIMEOUT);
    let result = dispatcher.dispatch(b"input").await;
    assert!(matches!(result, Err(ServiceError::Configuration(_))));
}

#[tokio::test]
async fn test_remote_non_200_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/rmbg"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
        .expect(1)
        .mount(&server)
        .await;

    let remote = Arc::new(RemoteBackend::new(
        "huggingface",
        format!("{}/models/rmbg", server.uri()),
        Some("hf_test".to_string()),
        reqwest::Client::new(),
    ));
    let fallback = Arc::new(MockBackend::new("echo", MockBehavior::Echo));
    let dispatcher = Dispatcher::new(vec![remote, fallback], TIMEOUT);

    let success = dispatcher
        .dispatch(b"raw image")
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(success.backend, "echo");
    assert_eq!(success.image, b"raw image".to_vec());
    assert_eq!(success.failures.len(), 1);
    assert_eq!(
        success.failures[0].reason,
        "HTTP 503: model is loading"
    );
}

#[tokio::test]
async fn test_slow_remote_is_cut_off_by_call_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let remote = Arc::new(RemoteBackend::new(
        "slow",
        server.uri(),
        None,
        reqwest::Client::new(),
    ));
    let fallback = Arc::new(MockBackend::succeeding("fast", b"ok".to_vec()));
    let dispatcher = Dispatcher::new(vec![remote, fallback], Duration::from_millis(200));

    let success = dispatcher
        .dispatch(b"img")
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(success.backend, "fast");
    assert_eq!(success.failures.len(), 1);
    assert_eq!(success.failures[0].reason, "timed out after 200ms");
}
