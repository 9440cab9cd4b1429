//! Failure injection tests against a real socket.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use resilient_fetch::error::TimeoutScope;
use resilient_fetch::resilience::BreakerState;
use resilient_fetch::{ErrorCategory, FailureCause};

mod common;

#[tokio::test]
async fn test_retry_on_failure() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let backend = common::start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            let count = cc.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                (503, r#"{"message":"busy"}"#.into())
            } else {
                (200, r#"{"login":"octocat"}"#.into())
            }
        }
    })
    .await;

    let service = common::service_for(vec![common::fast_endpoint(
        "ExternalApi",
        backend.base_address(),
    )]);
    let body: Option<Value> = service
        .fetch("ExternalApi", "/users/octocat")
        .await
        .expect("should eventually succeed after retries");

    assert_eq!(body.unwrap()["login"], "octocat");
    assert_eq!(backend.hits(), 3);

    let first = &backend.requests()[0];
    assert_eq!(first.method, "GET");
    assert_eq!(first.path, "/api/users/octocat");
    assert_eq!(first.accept.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let backend = common::start_mock_backend(404, r#"{"message":"Not Found"}"#).await;
    let service = common::service_for(vec![common::fast_endpoint(
        "ExternalApi",
        backend.base_address(),
    )]);

    let err = service
        .fetch::<Value>("ExternalApi", "/users/nobody")
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::RemoteRejected);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.attempts, 1);
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_breaker_opens_and_recovers() {
    let healthy = Arc::new(AtomicBool::new(false));
    let h = healthy.clone();
    let backend = common::start_programmable_backend(move |_| {
        let h = h.clone();
        async move {
            if h.load(Ordering::SeqCst) {
                (200, "{}".into())
            } else {
                (500, "dead".into())
            }
        }
    })
    .await;

    let mut endpoint = common::fast_endpoint("ExternalApi", backend.base_address());
    endpoint.retry.max_retries = 0;
    endpoint.circuit_breaker.failure_threshold = 2;
    let service = common::service_for(vec![endpoint]);

    for _ in 0..2 {
        let err = service.fetch::<Value>("ExternalApi", "/").await.unwrap_err();
        assert!(matches!(err.cause, FailureCause::ServerFault { status: 500 }));
    }

    let err = service.fetch::<Value>("ExternalApi", "/").await.unwrap_err();
    assert!(matches!(err.cause, FailureCause::BreakerOpen { .. }));
    assert_eq!(err.category, ErrorCategory::Unavailable);
    assert_eq!(err.attempts, 0);
    assert_eq!(backend.hits(), 2, "open breaker must not reach the backend");

    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(350)).await;

    let body: Option<Value> = service.fetch("ExternalApi", "/").await.unwrap();
    assert!(body.is_some());

    let snapshots = service.registry().breaker_snapshots();
    assert_eq!(snapshots[0].1.state, BreakerState::Closed);
    assert_eq!(snapshots[0].1.consecutive_failures, 0);
}

#[tokio::test]
async fn test_slow_attempt_is_retried() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let backend = common::start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(800)).await;
            }
            (200, r#"{"ok":true}"#.into())
        }
    })
    .await;

    let mut endpoint = common::fast_endpoint("ExternalApi", backend.base_address());
    endpoint.timeouts.attempt_ms = 200;
    let service = common::service_for(vec![endpoint]);

    let body: Option<Value> = service.fetch("ExternalApi", "/slow").await.unwrap();
    assert_eq!(body.unwrap()["ok"], true);
    assert_eq!(backend.hits(), 2);
}

#[tokio::test]
async fn test_whole_call_timeout() {
    let backend = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "{}".into())
    })
    .await;

    let mut endpoint = common::fast_endpoint("ExternalApi", backend.base_address());
    endpoint.timeouts.attempt_ms = 300;
    endpoint.timeouts.call_ms = 500;
    let service = common::service_for(vec![endpoint]);

    let start = Instant::now();
    let err = service.fetch::<Value>("ExternalApi", "/").await.unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(err.category, ErrorCategory::Unavailable);
    assert!(matches!(
        err.cause,
        FailureCause::TimedOut { scope: TimeoutScope::Call, .. }
    ));
}

#[tokio::test]
async fn test_connection_refused_is_unavailable() {
    let addr = common::closed_address().await;
    let mut endpoint = common::fast_endpoint("ExternalApi", format!("http://{addr}/"));
    endpoint.retry.max_retries = 1;
    let service = common::service_for(vec![endpoint]);

    let err = service.fetch::<Value>("ExternalApi", "/").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Unavailable);
    assert!(matches!(err.cause, FailureCause::Transport(_)));
    assert_eq!(err.attempts, 2);
    assert_eq!(err.to_json()["status"], Value::Null);
}

#[tokio::test]
async fn test_no_content_and_malformed_bodies() {
    let empty = common::start_mock_backend(204, "").await;
    let broken = common::start_mock_backend(200, "{\"login\": ").await;
    let service = common::service_for(vec![
        common::fast_endpoint("Quiet", empty.base_address()),
        common::fast_endpoint("Broken", broken.base_address()),
    ]);

    let body: Option<Value> = service.fetch("Quiet", "/ping").await.unwrap();
    assert!(body.is_none());

    let err = service.fetch::<Value>("Broken", "/users").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::DeserializationFailed);
    assert_eq!(broken.hits(), 1);
}

#[tokio::test]
async fn test_invalid_utf8_body_fails_to_deserialize() {
    let backend = common::start_raw_backend(200, b"{\"login\":\"oct\xffcat\"}").await;
    let service = common::service_for(vec![common::fast_endpoint(
        "ExternalApi",
        backend.base_address(),
    )]);

    let err = service
        .fetch::<Value>("ExternalApi", "/users/octocat")
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::DeserializationFailed);
    assert_eq!(err.attempts, 1);
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_rate_limited_then_ok() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let backend = common::start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            match cc.fetch_add(1, Ordering::SeqCst) {
                0 => (429, "slow down".into()),
                1 => (408, "".into()),
                _ => (200, "[1,2,3]".into()),
            }
        }
    })
    .await;

    let service = common::service_for(vec![common::fast_endpoint(
        "ExternalApi",
        backend.base_address(),
    )]);
    let body: Option<Vec<u32>> = service.fetch("ExternalApi", "/numbers").await.unwrap();
    assert_eq!(body, Some(vec![1, 2, 3]));
    assert_eq!(backend.hits(), 3);
}
