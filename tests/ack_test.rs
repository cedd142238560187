//! 已读回执 HTTP 测试

use httpmock::Method::POST;
use httpmock::MockServer;
use notify_center::notification::ack::{AckConfig, HttpReadAck, StaticTokenProvider};
use notify_center::{EngineConfig, NotificationEngine, NotificationKind, ReadAck};
use std::sync::Arc;
use std::time::Duration;

fn ack_for(server: &MockServer, token: Option<&str>) -> HttpReadAck {
    HttpReadAck::new(AckConfig {
        base_url: server.url("/api/notifications"),
        timeout_secs: 5,
    })
    .unwrap()
    .with_token_provider(Arc::new(StaticTokenProvider::new(token.map(String::from))))
}

#[tokio::test]
async fn test_post_read_sends_bearer_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/notifications/abc/read")
                .header("authorization", "Bearer secret-token")
                .header("content-type", "application/json");
            then.status(204);
        })
        .await;

    let ack = ack_for(&server, Some("secret-token"));
    ack.post_read("abc").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_read_without_token_omits_header() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/notifications/xyz/read")
                .header_missing("authorization");
            then.status(200);
        })
        .await;

    let ack = ack_for(&server, None);
    ack.post_read("xyz").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_read_surfaces_server_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/notifications/abc/read");
            then.status(500);
        })
        .await;

    let ack = ack_for(&server, None);
    let err = ack.post_read("abc").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_send_read_ack_is_fire_and_forget_on_failure() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/notifications/abc/read");
            then.status(503);
        })
        .await;

    let ack = ack_for(&server, None);
    ack.send_read_ack("abc");

    for _ in 0..100 {
        if mock.hits_async().await >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(mock.hits_async().await, 1);
}

#[tokio::test]
async fn test_engine_mark_all_read_posts_each_remote_id() {
    let server = MockServer::start_async().await;
    let shared = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/notifications/shared/read")
                .header("authorization", "Bearer t0k");
            then.status(204);
        })
        .await;

    let config = EngineConfig {
        ack_base_url: server.url("/api/notifications"),
        ack_timeout_secs: 5,
        auth_token: Some("t0k".to_string()),
        ..EngineConfig::default()
    };
    let engine = NotificationEngine::builder().config(config).build().unwrap();
    for _ in 0..2 {
        engine.enqueue(
            NotificationKind::Info,
            "import done",
            None,
            None,
            Some("shared".to_string()),
        );
    }
    engine.info("local only", None);

    engine.mark_all_read();
    assert!(engine.snapshot().is_empty());

    for _ in 0..100 {
        if shared.hits_async().await >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(shared.hits_async().await, 1);

    engine.shutdown();
}
