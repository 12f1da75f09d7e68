// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cp_core::test_support::{site, standard_job};
use cp_core::CheckKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ── Failure classification ──────────────────────────────────────────────

#[yare::parameterized(
    internal    = { 500, true },
    unavailable = { 503, true },
    throttled   = { 429, true },
    req_timeout = { 408, true },
    bad_request = { 400, false },
    forbidden   = { 403, false },
    not_found   = { 404, false },
    conflict    = { 409, false },
    locked      = { 422, false },
    too_large   = { 413, false },
)]
fn status_classification(status: u16, retryable: bool) {
    assert_eq!(ApiError::from_status(status, "body").is_retryable(), retryable);
}

#[test]
fn transport_failures_are_retryable_and_local_ones_are_not() {
    assert!(ApiError::Network("reset".into()).is_retryable());
    assert!(ApiError::Timeout.is_retryable());
    assert!(!ApiError::Decode("bad json".into()).is_retryable());
    assert!(!ApiError::LocalFile("gone.jpg".into()).is_retryable());
}

// ── HTTP client against a one-shot local server ─────────────────────────

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve a single response; the handle yields the raw request, lowercased.
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    serve_raw(format!(
        "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ))
    .await
}

/// Write `response` verbatim, then close the connection.
async fn serve_raw(response: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        request.to_lowercase()
    });
    (format!("http://{addr}"), handle)
}

fn client(base_url: &str) -> HttpProofApi {
    HttpProofApi::new(base_url, Some("secret".to_string()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetch_job_gets_job_with_bearer_token() {
    let (url, server) = serve_once(200, r#"{"id": "j1", "status": "in_progress"}"#).await;

    let job = client(&url).fetch_job(&JobId::new("j1")).await.unwrap();

    assert_eq!(job.id, "j1");
    assert_eq!(job.status, cp_core::JobStatus::InProgress);
    let request = server.await.unwrap();
    assert!(request.starts_with("get /jobs/j1 http/1.1"));
    assert!(request.contains("authorization: bearer secret"));
}

#[tokio::test]
async fn record_check_posts_event_with_idempotency_key() {
    let (url, server) = serve_once(200, r#"{"id": "j1"}"#).await;
    let event = CheckEvent::new(CheckKind::CheckIn, 1_700_000_000_000, site(), true);

    client(&url).record_check(&JobId::new("j1"), &event, "key-1").await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("post /jobs/j1/check-in http/1.1"));
    assert!(request.contains("idempotency-key: key-1"));
    assert!(request.contains(r#""timestamp":1700000000000"#));
    assert!(request.contains(r#""approximate":true"#));
}

#[tokio::test]
async fn update_checklist_patches_items() {
    let (url, server) = serve_once(204, "").await;
    let items = vec![ChecklistUpdate::new("mop", true)];

    client(&url).update_checklist(&JobId::new("j1"), &items, "key-2").await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("patch /jobs/j1/checklist http/1.1"));
    assert!(request.contains(r#"{"items":[{"id":"mop","is_completed":true}]}"#));
}

#[tokio::test]
async fn client_error_maps_to_validation_with_body() {
    let (url, _server) = serve_once(422, "item locked").await;
    let items = vec![ChecklistUpdate::new("mop", true)];

    let err = client(&url).update_checklist(&JobId::new("j1"), &items, "k").await.unwrap_err();

    assert_eq!(err, ApiError::Validation { status: 422, body: "item locked".to_string() });
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_is_retryable() {
    let (url, _server) = serve_once(503, "maintenance").await;
    let err = client(&url).fetch_job(&JobId::new("j1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let (url, _server) = serve_once(200, "not json").await;
    let err = client(&url).fetch_job(&JobId::new("j1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn cut_off_upload_reply_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("before.jpg");
    std::fs::write(&file, b"\xff\xd8jpeg").unwrap();
    let reply = concat!(
        "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\n",
        "Content-Length: 100\r\n\r\n{\"id\":\"ph",
    );
    let (url, _server) = serve_raw(reply.to_string()).await;

    let err = client(&url)
        .upload_photo(&JobId::new("j1"), PhotoKind::Before, &file, None, "k")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(_)), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn garbled_check_reply_is_retryable() {
    let (url, _server) = serve_once(200, "{\"id\": ").await;
    let event = CheckEvent::new(CheckKind::CheckIn, 1_700_000_000_000, site(), false);

    let err = client(&url).record_check(&JobId::new("j1"), &event, "k").await.unwrap_err();

    assert!(err.is_retryable(), "{err:?}");
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}")).fetch_job(&JobId::new("j1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });
    let api = HttpProofApi::new(format!("http://{addr}"), None, Duration::from_millis(200)).unwrap();

    let err = api.fetch_job(&JobId::new("j1")).await.unwrap_err();
    assert_eq!(err, ApiError::Timeout);
}

#[tokio::test]
async fn missing_photo_file_fails_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    let api = client("http://127.0.0.1:9");

    let err = api
        .upload_photo(&JobId::new("j1"), PhotoKind::Before, &dir.path().join("gone.jpg"), None, "k")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::LocalFile(_)));
}

// ── Fake backend ────────────────────────────────────────────────────────

fn fake_with_job() -> FakeProofApi {
    let api = FakeProofApi::new();
    api.insert_job(standard_job("j1"));
    api
}

#[tokio::test]
async fn fake_dedupes_by_idempotency_key() {
    let api = fake_with_job();
    let items = vec![ChecklistUpdate::new("mop", true)];
    let job = JobId::new("j1");

    api.update_checklist(&job, &items, "k1").await.unwrap();
    api.update_checklist(&job, &items, "k1").await.unwrap();

    assert_eq!(api.calls_to(ApiOp::UpdateChecklist).len(), 2);
    assert_eq!(api.records().len(), 1);
}

#[tokio::test]
async fn lost_response_applies_once_and_retry_returns_same_photo_id() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.jpg");
    std::fs::write(&file, b"x").unwrap();
    let api = fake_with_job();
    let job = JobId::new("j1");
    api.script([Outcome::LoseResponse]);

    let first = api.upload_photo(&job, PhotoKind::Before, &file, None, "k").await;
    assert!(matches!(first, Err(ApiError::Network(_))));
    let photo_id = api.upload_photo(&job, PhotoKind::Before, &file, None, "k").await.unwrap();

    assert_eq!(api.records().len(), 1);
    assert_eq!(api.job(&job).unwrap().photos[0].id, Some(photo_id));
    assert_eq!(api.uploads(), vec![file]);
}

#[tokio::test]
async fn scripted_failure_leaves_server_untouched() {
    let api = fake_with_job();
    api.script([Outcome::Fail(ApiError::Timeout)]);
    let items = vec![ChecklistUpdate::new("mop", true)];

    let result = api.update_checklist(&JobId::new("j1"), &items, "k").await;

    assert_eq!(result, Err(ApiError::Timeout));
    assert!(api.records().is_empty());
}

#[tokio::test]
async fn unknown_checklist_item_is_refused() {
    let api = fake_with_job();
    let items = vec![ChecklistUpdate::new("windows", true)];

    let err = api.update_checklist(&JobId::new("j1"), &items, "k").await.unwrap_err();

    assert!(matches!(err, ApiError::Validation { status: 422, .. }));
}

#[tokio::test]
async fn check_in_is_recorded_once_per_job_whatever_the_key() {
    let api = fake_with_job();
    let job = JobId::new("j1");
    let event = CheckEvent::new(CheckKind::CheckIn, 5, site(), false);

    let updated = api.record_check(&job, &event, "a").await.unwrap();
    api.record_check(&job, &event, "b").await.unwrap();

    assert_eq!(updated.check_in, Some(event));
    assert_eq!(updated.status, cp_core::JobStatus::InProgress);
    assert_eq!(api.records().len(), 1);
}

#[tokio::test]
async fn offline_fake_fails_every_call() {
    let api = fake_with_job();
    api.set_offline(true);
    assert!(matches!(api.fetch_job(&JobId::new("j1")).await, Err(ApiError::Network(_))));

    api.set_offline(false);
    assert!(api.fetch_job(&JobId::new("j1")).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn stalled_call_never_completes() {
    let api = fake_with_job();
    api.script([Outcome::Stall]);
    let result =
        tokio::time::timeout(Duration::from_secs(60), api.fetch_job(&JobId::new("j1"))).await;
    assert!(result.is_err());
}
