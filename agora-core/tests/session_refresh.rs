//! Integration tests for credential injection and session refresh.
//!
//! These tests drive ApiClient against a mock server and verify that:
//! - Concurrent 401s share a single refresh call
//! - Every rejected request is replayed with the refreshed token
//! - A replayed request is never refreshed twice
//! - A failed refresh rejects every waiter, clears the session, and is
//!   announced exactly once
//! - A cancelled refresh releases its waiters without signing out

use std::sync::Arc;
use std::time::Duration;

use agora_core::{
    ApiClient, ApiError, ApiRequest, ClientConfig, CredentialStore, MemoryStore, Navigation,
    RefreshError, Secret, SessionEvent, StorageBackend,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::StatusCode;
use tokio::sync::broadcast::error::TryRecvError;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

/// Helper to create a client with an established session holding `token`.
async fn setup_client(server: &MockServer, token: Option<&str>) -> ApiClient {
    let config = ClientConfig::with_base_url(&server.uri())
        .unwrap()
        .with_storage(StorageBackend::Memory);
    let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new())));

    if let Some(token) = token {
        credentials
            .set_session(Secret::new(token), "me@example.com", "Me")
            .await;
    }

    ApiClient::new(config, credentials).unwrap()
}

fn jwt(username: &str, name: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = serde_json::json!({ "username": username, "name": name });
    format!("{}.{}.signature", header, URL_SAFE_NO_PAD.encode(payload.to_string()))
}

fn empty_page() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "content": [],
        "totalElements": 0
    }))
}

fn token_body(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "accessToken": token }))
}

async fn mount_boards_rejecting(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/boards"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
}

async fn mount_boards_accepting(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/boards"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(empty_page())
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_refresh() {
    let server = MockServer::start().await;
    mount_boards_rejecting(&server, "T1").await;
    mount_boards_accepting(&server, "T2").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    let mut events = client.subscribe();

    let (first, second) = tokio::join!(
        client.execute(ApiRequest::get("/boards")),
        client.execute(ApiRequest::get("/boards")),
    );

    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
    assert_eq!(
        client.credentials().access_token().unwrap().expose(),
        "T2"
    );
    assert!(!client.is_refreshing());

    assert_eq!(events.try_recv().unwrap(), SessionEvent::TokenRefreshed);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_refresh_keeps_identity() {
    let server = MockServer::start().await;
    mount_boards_rejecting(&server, "T1").await;
    mount_boards_accepting(&server, "T2").await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2"))
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    client.execute(ApiRequest::get("/boards")).await.unwrap();

    let credential = client.credentials().get();
    assert_eq!(credential.subject_id(), Some("me@example.com"));
    assert_eq!(credential.display_name(), Some("Me"));
}

#[tokio::test]
async fn test_refresh_call_carries_no_bearer() {
    let server = MockServer::start().await;
    mount_boards_rejecting(&server, "T1").await;
    mount_boards_accepting(&server, "T2").await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2"))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    client.execute(ApiRequest::get("/boards")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == "/api/auth/refresh")
        .unwrap();
    assert!(!refresh.headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_replayed_request_is_not_refreshed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/boards"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2"))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    let result = client.execute(ApiRequest::get("/boards")).await;

    match result {
        Err(ApiError::Unauthorized { method, path }) => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/boards");
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_failed_refresh_signs_out_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/boards/42"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500).set_body_string("refresh token expired"))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    let mut events = client.subscribe();

    let err = client
        .execute(ApiRequest::get("/boards/42"))
        .await
        .unwrap_err();

    match &err {
        ApiError::RefreshFailed(RefreshError::Rejected { status, message }) => {
            assert_eq!(*status, 500);
            assert_eq!(message, "refresh token expired");
        }
        other => panic!("expected RefreshFailed, got {:?}", other),
    }
    assert!(err.is_session_expired());
    assert!(client.credentials().get().is_empty());
    assert!(!client.is_refreshing());

    match events.try_recv().unwrap() {
        SessionEvent::AuthenticationLost { navigation, .. } => {
            assert_eq!(navigation, Navigation::Hard("/login".to_string()));
        }
        other => panic!("expected AuthenticationLost, got {:?}", other),
    }
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_failed_refresh_rejects_every_waiter() {
    let server = MockServer::start().await;
    mount_boards_rejecting(&server, "T1").await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    let mut events = client.subscribe();

    let (a, b, c) = tokio::join!(
        client.execute(ApiRequest::get("/boards")),
        client.execute(ApiRequest::get("/boards")),
        client.execute(ApiRequest::get("/boards")),
    );

    for result in [a, b, c] {
        assert!(matches!(
            result,
            Err(ApiError::RefreshFailed(RefreshError::Rejected { status: 401, .. }))
        ));
    }
    assert!(client.credentials().get().is_empty());

    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::AuthenticationLost { .. })
    ));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    // Only the three first attempts reached the board endpoint.
    let replays = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/boards")
        .count();
    assert_eq!(replays, 3);
}

#[tokio::test]
async fn test_second_cycle_after_settle() {
    let server = MockServer::start().await;
    mount_boards_rejecting(&server, "T1").await;
    mount_boards_accepting(&server, "T2").await;
    mount_boards_accepting(&server, "T3").await;

    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T3"))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;

    client.execute(ApiRequest::get("/boards")).await.unwrap();
    assert!(!client.is_refreshing());
    assert_eq!(client.credentials().access_token().unwrap().expose(), "T2");

    // The server expired the session again.
    client.credentials().set_token(Secret::new("T1")).await;

    client.execute(ApiRequest::get("/boards")).await.unwrap();
    assert!(!client.is_refreshing());
    assert_eq!(client.credentials().access_token().unwrap().expose(), "T3");
}

#[tokio::test]
async fn test_other_errors_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/boards/7"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "no such post"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2"))
        .expect(0)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    let err = client
        .execute(ApiRequest::get("/boards/7"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.server_message().as_deref(), Some("no such post"));
    assert!(!err.is_session_expired());
    assert_eq!(client.credentials().access_token().unwrap().expose(), "T1");
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/boards/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, None).await;
    client
        .execute(ApiRequest::get("/boards/categories"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_follower_rejected_after_replay_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/boards"))
        .respond_with(ResponseTemplate::new(401))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    let (leader, follower) = tokio::join!(
        client.execute(ApiRequest::get("/boards")),
        client.execute(ApiRequest::get("/boards")),
    );

    assert!(matches!(leader, Err(ApiError::Unauthorized { .. })));
    assert!(matches!(follower, Err(ApiError::Unauthorized { .. })));
    assert!(!client.is_refreshing());

    let replayed_with_t2 = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/boards")
        .filter(|r| r.headers.get("authorization").is_some_and(|v| v == "Bearer T2"))
        .count();
    assert_eq!(replayed_with_t2, 2);
}

#[tokio::test]
async fn test_cancelled_leader_abandons_followers() {
    let server = MockServer::start().await;
    mount_boards_rejecting(&server, "T1").await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("T2").set_delay(Duration::from_secs(1)))
        .mount(&server)
        .await;

    let client = setup_client(&server, Some("T1")).await;
    let mut events = client.subscribe();

    let leader = tokio::spawn({
        let client = client.clone();
        async move { client.execute(ApiRequest::get("/boards")).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.is_refreshing());

    let follower = tokio::spawn({
        let client = client.clone();
        async move { client.execute(ApiRequest::get("/boards")).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    leader.abort();
    let result = follower.await.unwrap();

    assert!(matches!(
        result,
        Err(ApiError::RefreshFailed(RefreshError::Abandoned))
    ));
    assert!(!client.is_refreshing());
    assert_eq!(client.credentials().access_token().unwrap().expose(), "T1");
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_refresh_without_identity_takes_it_from_token() {
    let server = MockServer::start().await;
    let token = jwt("me@example.com", "Me");
    mount_boards_accepting(&server, &token).await;
    Mock::given(method("GET"))
        .and(path("/api/boards"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body(&token))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, None).await;
    client.execute(ApiRequest::get("/boards")).await.unwrap();

    let credential = client.credentials().get();
    assert_eq!(credential.access_token().unwrap().expose(), token);
    assert_eq!(credential.subject_id(), Some("me@example.com"));
    assert_eq!(credential.display_name(), Some("Me"));
}

#[tokio::test]
async fn test_refresh_without_identity_rejects_opaque_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/boards"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_body("opaque"))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup_client(&server, None).await;
    let mut events = client.subscribe();

    let result = client.execute(ApiRequest::get("/boards")).await;

    assert!(matches!(
        result,
        Err(ApiError::RefreshFailed(RefreshError::InvalidResponse { .. }))
    ));
    assert!(client.credentials().get().is_empty());
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::AuthenticationLost { .. })
    ));
}
