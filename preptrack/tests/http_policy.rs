mod support;

use std::time::Duration;

use preptrack::mock::MockAuthenticator;
use preptrack::{ClientError, EntryService, KeyValueStore, PersistencePolicy};
use support::{day_json, login_body, Harness, API_KEY};

#[tokio::test]
async fn protected_401_clears_session_and_redirects_once() {
    let h = Harness::start().await;
    h.server.respond("POST", "/auth/login", 200, &login_body("tok-1"));
    h.server.respond(
        "GET",
        "/api/entries/today",
        401,
        r#"{"message":"Token expired"}"#,
    );

    h.client
        .session()
        .login("ada@example.com", "pw", PersistencePolicy::Durable)
        .await
        .unwrap();
    assert_eq!(h.persisted_token().as_deref(), Some("tok-1"));

    let err = h.client.entries().fetch_today().await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(err.to_string(), "Session expired");

    assert!(!h.client.session_handle().is_authenticated());
    assert_eq!(h.redirect.count(), 1);
    assert_eq!(h.persisted_token(), None);
    assert!(h.durable.is_empty());
}

#[tokio::test]
async fn login_401_is_a_credential_error_and_keeps_session() {
    let h = Harness::start().await;
    h.server.respond_once("POST", "/auth/login", 200, &login_body("tok-1"));
    h.server.respond(
        "POST",
        "/auth/login",
        401,
        r#"{"message":"Invalid credentials"}"#,
    );

    h.client
        .session()
        .login("ada@example.com", "pw", PersistencePolicy::Durable)
        .await
        .unwrap();
    let err = h
        .client
        .session()
        .login("ada@example.com", "wrong", PersistencePolicy::Durable)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 401, .. }));
    let session = h.client.session().session();
    assert!(session.is_authenticated());
    assert_eq!(session.token.as_deref(), Some("tok-1"));
    assert_eq!(session.error.as_deref(), Some("Invalid credentials"));
    assert_eq!(h.redirect.count(), 0);
}

#[tokio::test]
async fn stale_401_does_not_end_a_newer_session() {
    let h = Harness::start().await;
    h.server.respond_once("POST", "/auth/login", 200, &login_body("tok-old"));
    h.server.respond("POST", "/auth/login", 200, &login_body("tok-new"));
    h.server.respond_after(
        Duration::from_millis(300),
        "GET",
        "/api/entries/today",
        401,
        "{}",
    );

    let session = h.client.session();
    session
        .login("ada@example.com", "pw", PersistencePolicy::Durable)
        .await
        .unwrap();

    let (today, relogin) = tokio::join!(h.client.entries().fetch_today(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session
            .login("ada@example.com", "pw", PersistencePolicy::Durable)
            .await
    });

    assert!(today.unwrap_err().is_session_expired());
    relogin.unwrap();
    assert_eq!(session.session().token.as_deref(), Some("tok-new"));
    assert_eq!(h.redirect.count(), 0);
    assert_eq!(
        h.server.last_request("GET", "/api/entries/today").header("authorization"),
        Some("Bearer tok-old")
    );
}

#[tokio::test]
async fn requests_carry_the_right_headers() {
    let h = Harness::start().await;
    h.server.respond("POST", "/auth/login", 200, &login_body("tok-1"));
    h.server.respond("GET", "/api/entries/today", 200, &day_json("2024-01-01", vec![]));
    h.server.respond(
        "GET",
        "/users/profile",
        200,
        r#"{"_id":"user-1","email":"ada@example.com","isActive":true}"#,
    );

    h.client
        .session()
        .login("ada@example.com", "pw", PersistencePolicy::Durable)
        .await
        .unwrap();
    h.client.entries().fetch_today().await.unwrap();
    h.client.account().profile().await.unwrap();

    let login = h.server.last_request("POST", "/auth/login");
    assert_eq!(login.header("x-api-key"), Some(API_KEY));
    assert_eq!(login.header("content-type"), Some("application/json"));
    assert_eq!(login.header("authorization"), None);
    assert_eq!(login.json()["email"], "ada@example.com");

    let today = h.server.last_request("GET", "/api/entries/today");
    assert_eq!(today.header("authorization"), Some("Bearer tok-1"));
    assert_eq!(today.header("x-api-key"), None);

    let profile = h.server.last_request("GET", "/users/profile");
    assert_eq!(profile.header("authorization"), Some("Bearer tok-1"));
    assert_eq!(profile.header("x-api-key"), Some(API_KEY));
}

#[tokio::test]
async fn unsigned_requests_omit_bearer() {
    let h = Harness::start().await;
    h.server.respond("GET", "/api/entries/tags", 200, "[]");

    h.client.entries().service().tags().await.unwrap();
    let tags = h.server.last_request("GET", "/api/entries/tags");
    assert_eq!(tags.header("authorization"), None);
}

#[tokio::test]
async fn server_message_is_surfaced_with_generic_fallback() {
    let h = Harness::start().await;
    h.server.respond(
        "POST",
        "/auth/register",
        409,
        r#"{"message":"User already exists"}"#,
    );
    h.server.respond("GET", "/api/entries/today", 500, "<html>oops</html>");

    let err = h
        .client
        .session()
        .signup("ada@example.com", "pw", PersistencePolicy::Durable)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User already exists");
    assert_eq!(err.status(), Some(409));

    let err = h.client.entries().fetch_today().await.unwrap_err();
    assert_eq!(err.to_string(), "Something went wrong");
    assert_eq!(err.status(), Some(500));
    assert_eq!(
        h.client.entries().state().last_error(),
        Some("Something went wrong")
    );
}

#[tokio::test]
async fn schema_mismatch_is_an_invalid_response() {
    let h = Harness::start().await;
    h.server.respond("GET", "/api/entries/today", 200, r#"{"unexpected":true}"#);
    h.server.respond(
        "POST",
        "/auth/login",
        200,
        r#"{"accessToken":"","user":{"id":"user-1","role":"user"}}"#,
    );

    let err = h.client.entries().fetch_today().await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse { ref call, .. } if call == "GET /entries/today"));

    let err = h
        .client
        .session()
        .login("ada@example.com", "pw", PersistencePolicy::Durable)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse { .. }));
    assert!(!h.client.session_handle().is_authenticated());
    assert_eq!(h.persisted_token(), None);
}

#[tokio::test]
async fn passkey_login_round_trip() {
    let h = Harness::start().await;
    h.server.respond(
        "POST",
        "/auth/passkey/login/options",
        200,
        r#"{"options":{"challenge":"abc"},"challengeId":"ch-1"}"#,
    );
    h.server.respond(
        "POST",
        "/auth/passkey/login/verify",
        200,
        r#"{"accessToken":"tok-pk","user":{"id":"user-1","username":"ada@example.com","role":"user"}}"#,
    );

    let user = h
        .client
        .session()
        .passkey_login(None, PersistencePolicy::Ephemeral, &MockAuthenticator::new("cred-1"))
        .await
        .unwrap();
    assert_eq!(user.email, "ada@example.com");

    let verify = h.server.last_request("POST", "/auth/passkey/login/verify");
    let body = verify.json();
    assert_eq!(body["challengeId"], "ch-1");
    assert_eq!(body["credential"]["id"], "cred-1");
    assert_eq!(h.ephemeral.get("token").unwrap().as_deref(), Some("tok-pk"));
    assert_eq!(h.durable.get("remember").unwrap().as_deref(), Some("false"));
}
