//! HTTP-level tests over an in-memory store
//!
//! Accounts are registered through the directory with a fixed hash so that
//! only the register/login test pays for argon2.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use idshare_api::{build_router, AppState};
use idshare_core::config::AuthConfig;
use idshare_core::core_disclosure::{AccountDirectory, DisclosureManager, DisclosureSqlStore};
use idshare_core::test_utils::TEST_PASSWORD_HASH;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestServer {
    state: AppState,
    router: Router,
}

impl TestServer {
    fn new() -> Self {
        let store = DisclosureSqlStore::memory().expect("in-memory store");
        let state = AppState::new(DisclosureManager::new(store), &AuthConfig::default());
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Register `username` and return a bearer token for them
    async fn login_as(&self, username: &str) -> String {
        let account = self
            .state
            .manager
            .register_account(username, TEST_PASSWORD_HASH)
            .expect("register account");
        self.state.sessions.create_session(&account).await
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.router.clone().oneshot(request).await.expect("router call");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    /// John asks Mary for a first name; returns (request id, request variant id)
    async fn john_asks_mary(&self, john: &str) -> (i64, i64) {
        let (status, request) = self
            .post("/requests/sent", john, json!({"receiver_username": "mary", "reasoning": "need info"}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{request}");
        let request_id = request["id"].as_i64().expect("request id");

        let (status, variant) = self
            .post(
                &format!("/requests/sent/{request_id}/variants"),
                john,
                json!({"label": "first name", "context": "for the form"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{variant}");
        (request_id, variant["id"].as_i64().expect("variant id"))
    }
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::new();
    let (status, body) = server.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_login_logout() {
    let server = TestServer::new();

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"username": "john", "password": "correct horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["username"], "john");

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "john", "password": "wrong password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "john", "password": "correct horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["token"].as_str().expect("token").to_string();

    let (status, _) = server.get("/requests/sent", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.call(Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server.get("/requests/sent", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    println!("✅ Token rejected after logout");
}

#[tokio::test]
async fn test_register_validation() {
    let server = TestServer::new();

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"username": "john", "password": "short"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["password"].is_array(), "{body}");
}

#[tokio::test]
async fn test_anonymous_is_unauthorized() {
    let server = TestServer::new();

    for uri in ["/profile/identity-variants", "/requests/sent", "/requests/received", "/disclosures/1"] {
        let (status, _) = server.call(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    // Bad token, bad body: authentication still decides first
    let (status, _) = server
        .call(Method::POST, "/requests/sent", Some("not-a-token"), Some(json!([1, 2])))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_john_mary_walkthrough() {
    let server = TestServer::new();
    let john = server.login_as("john").await;
    let mary = server.login_as("mary").await;

    let (request_id, slot) = server.john_asks_mary(&john).await;

    // Mary sees it with John as counterparty
    let (status, received) = server.get("/requests/received", &mary).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(received[0]["id"], request_id);
    assert_eq!(received[0]["counterparty_username"], "john");
    assert_eq!(received[0]["status"], "pending");

    let (status, detail) = server.get(&format!("/requests/received/{request_id}"), &mary).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["variants"][0]["label"], "first name");

    // Pending: list ok, detail forbidden
    let (status, _) = server
        .get(&format!("/requests/received/{request_id}/variants/{slot}"), &mary)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, variant) = server
        .post("/profile/identity-variants", &mary, json!({"label": "first name", "variant_value": "Michal"}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{variant}");
    let michal = variant["id"].as_i64().expect("profile variant id");

    // Linking before accepting is refused
    let (status, _) = server
        .patch(
            &format!("/requests/received/{request_id}/variants/{slot}"),
            &mary,
            json!({"linked_profile_variant_id": michal}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .call(Method::POST, &format!("/requests/received/{request_id}/accept"), Some(&mary), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, body) = server
        .patch(
            &format!("/requests/received/{request_id}/variants/{slot}"),
            &mary,
            json!({"linked_profile_variant_id": michal, "label": "ignored"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["label"], "first name");
    assert_eq!(body["linked_profile_variant_id"], michal);

    let (status, body) = server
        .get(&format!("/requests/sent/{request_id}/variants/{slot}"), &john)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disclosed_value"], "Michal");
    assert!(body.get("linked_profile_variant_id").is_none());
    println!("✅ John sees the disclosed value");

    // Deny revokes
    let (status, _) = server
        .call(Method::POST, &format!("/requests/received/{request_id}/deny"), Some(&mary), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.get(&format!("/disclosures/{slot}"), &john).await;
    assert_eq!(body["disclosed_value"], Value::Null);

    let (_, body) = server.get(&format!("/requests/sent/{request_id}"), &john).await;
    assert_eq!(body["status"], "denied");
    assert_eq!(body["reasoning"], "need info");
    println!("✅ Deny cleared the disclosure");
}

#[tokio::test]
async fn test_stranger_gets_not_found() {
    let server = TestServer::new();
    let john = server.login_as("john").await;
    let _mary = server.login_as("mary").await;
    let eve = server.login_as("eve").await;

    let (request_id, slot) = server.john_asks_mary(&john).await;

    let (status, body) = server.get("/requests/received", &eve).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    for uri in [
        format!("/requests/sent/{request_id}"),
        format!("/requests/received/{request_id}"),
        format!("/requests/sent/{request_id}/variants/{slot}"),
        format!("/disclosures/{slot}"),
    ] {
        let (status, _) = server.get(&uri, &eve).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }

    let (status, _) = server
        .call(Method::POST, &format!("/requests/received/{request_id}/deny"), Some(&eve), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.get(&format!("/requests/sent/{request_id}/variants"), &eve).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_stranger_with_mistyped_body_gets_not_found() {
    let server = TestServer::new();
    let john = server.login_as("john").await;
    let mary = server.login_as("mary").await;
    let eve = server.login_as("eve").await;

    let (request_id, slot) = server.john_asks_mary(&john).await;
    let (status, variant) = server
        .post("/profile/identity-variants", &mary, json!({"label": "first name", "variant_value": "Michal"}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{variant}");
    let profile_id = variant["id"].as_i64().expect("profile variant id");

    for (uri, body) in [
        (format!("/requests/sent/{request_id}"), json!({"reasoning": 12})),
        (format!("/requests/sent/{request_id}/variants/{slot}"), json!({"label": ["x"]})),
        (format!("/requests/received/{request_id}/variants/{slot}"), json!({"linked_profile_variant_id": "x"})),
        (format!("/profile/identity-variants/{profile_id}"), json!({"variant_value": false})),
    ] {
        let (status, _) = server.patch(&uri, &eve, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }

    let (status, _) = server
        .post(&format!("/requests/sent/{request_id}/variants"), &eve, json!({"label": 7}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still sees the validation error
    let (status, _) = server
        .patch(&format!("/requests/sent/{request_id}"), &john, json!({"reasoning": 12}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sender_payload_cannot_rewrite_parties_or_links() {
    let server = TestServer::new();
    let john = server.login_as("john").await;
    let mary = server.login_as("mary").await;
    let (request_id, slot) = server.john_asks_mary(&john).await;

    let (status, body) = server
        .patch(
            &format!("/requests/sent/{request_id}"),
            &john,
            json!({"reasoning": "updated", "receiver_id": 1, "status": "accepted"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reasoning"], "updated");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["counterparty_username"], "mary");

    let (status, body) = server
        .patch(
            &format!("/requests/sent/{request_id}/variants/{slot}"),
            &john,
            json!({"label": "given name", "linked_profile_variant_id": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["label"], "given name");
    assert_eq!(body["disclosed_value"], Value::Null);

    // Mary cannot reach the sender-side write path
    let (status, _) = server
        .patch(
            &format!("/requests/sent/{request_id}/variants/{slot}"),
            &mary,
            json!({"label": "hijacked"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors() {
    let server = TestServer::new();
    let john = server.login_as("john").await;

    let (status, body) = server
        .post("/requests/sent", &john, json!({"receiver_username": "nobody", "reasoning": "x"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["receiver_username"].is_array(), "{body}");

    let (status, body) = server
        .post("/profile/identity-variants", &john, json!({"label": "", "variant_value": "x"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["label"].is_array(), "{body}");
}

#[tokio::test]
async fn test_delete_returns_no_content() {
    let server = TestServer::new();
    let john = server.login_as("john").await;
    let _mary = server.login_as("mary").await;
    let (request_id, slot) = server.john_asks_mary(&john).await;

    let (status, _) = server
        .call(
            Method::DELETE,
            &format!("/requests/sent/{request_id}/variants/{slot}"),
            Some(&john),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server
        .call(Method::DELETE, &format!("/requests/sent/{request_id}"), Some(&john), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server.get(&format!("/requests/sent/{request_id}"), &john).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
