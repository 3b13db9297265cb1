use axum::http::StatusCode;
use serde_json::json;
use sessiongate_backend::{
    services::{SessionAuthorityTrait, SessionStoreTrait},
    types::{SessionId, UserId},
};
use std::time::Duration;
use tower::ServiceExt;

mod support;

use support::{login_request, request, response_json, session_cookie, Harness};

fn alice() -> UserId {
    UserId::new("alice").expect("user id")
}

fn sid(value: &str) -> SessionId {
    SessionId::new(value).expect("session id")
}

/// Logs `identifier` in and returns the issued session identifier.
async fn login_ok(
    harness: &Harness,
    identifier: &str,
    secret: &str,
    cookie: Option<&str>,
) -> String {
    let response = harness
        .app()
        .oneshot(login_request(identifier, secret, cookie))
        .await
        .expect("call login");
    assert_eq!(response.status(), StatusCode::OK);
    let issued = session_cookie(response.headers()).expect("session cookie");
    assert!(!issued.is_empty());
    issued
}

async fn wait_until_destroyed(harness: &Harness, session: &SessionId) {
    for _ in 0..100 {
        if harness.store.get(session).await.expect("store get").is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("superseded session {} was never destroyed", session.short());
}

#[tokio::test]
async fn second_login_supersedes_the_first_session() {
    let harness = Harness::new();

    let response = harness
        .app()
        .oneshot(login_request("alice", "wonderland", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = session_cookie(response.headers()).expect("first cookie");
    let body = response_json(response).await;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["user"]["id"], json!("alice"));

    let me = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(first.as_str())))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);

    let second = login_ok(&harness, "alice", "wonderland", None).await;
    assert_ne!(first, second);
    assert!(harness
        .authority
        .is_active(&alice(), &sid(&second))
        .await
        .unwrap());
    assert!(!harness
        .authority
        .is_active(&alice(), &sid(&first))
        .await
        .unwrap());

    wait_until_destroyed(&harness, &sid(&first)).await;

    let stale = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(first.as_str())))
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);

    let current = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(second.as_str())))
        .await
        .unwrap();
    assert_eq!(current.status(), StatusCode::OK);
}

#[tokio::test]
async fn superseded_session_is_rejected_then_treated_as_anonymous() {
    let harness = Harness::new();
    let first = login_ok(&harness, "alice", "wonderland", None).await;

    // Another device takes over without triggering background cleanup.
    harness
        .authority
        .activate(&alice(), &SessionId::generate())
        .await
        .unwrap();

    let rejected = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(first.as_str())))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
    assert_eq!(session_cookie(rejected.headers()).as_deref(), Some(""));
    let body = response_json(rejected).await;
    assert_eq!(body["code"], json!("SESSION_SUPERSEDED"));
    assert!(harness.store.get(&sid(&first)).await.unwrap().is_none());

    let retried = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(first.as_str())))
        .await
        .unwrap();
    assert_eq!(retried.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_from_a_superseded_session_is_rejected_first() {
    let harness = Harness::new();
    let first = login_ok(&harness, "alice", "wonderland", None).await;
    harness
        .authority
        .activate(&alice(), &SessionId::generate())
        .await
        .unwrap();

    let rejected = harness
        .app()
        .oneshot(login_request("alice", "wonderland", Some(first.as_str())))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::FORBIDDEN);

    let again = login_ok(&harness, "alice", "wonderland", Some(first.as_str())).await;
    assert_ne!(again, first);
    assert!(harness
        .authority
        .is_active(&alice(), &sid(&again))
        .await
        .unwrap());
}

#[tokio::test]
async fn relogin_on_the_same_session_keeps_it_active() {
    let harness = Harness::new();
    let first = login_ok(&harness, "alice", "wonderland", None).await;
    let again = login_ok(&harness, "alice", "wonderland", Some(first.as_str())).await;

    assert_eq!(first, again);
    assert!(harness
        .authority
        .is_active(&alice(), &sid(&first))
        .await
        .unwrap());
    assert!(harness.store.get(&sid(&first)).await.unwrap().is_some());
}

#[tokio::test]
async fn invalid_credentials_change_nothing() {
    let harness = Harness::new();

    let response = harness
        .app()
        .oneshot(login_request("alice", "looking-glass", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(response.headers()).is_none());
    let body = response_json(response).await;
    assert_eq!(body["code"], json!("INVALID_CREDENTIALS"));

    assert!(harness.store.is_empty().await);
    assert!(harness.authority.find(&alice()).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_credentials_leave_the_existing_session_active() {
    let harness = Harness::new();
    let first = login_ok(&harness, "alice", "wonderland", None).await;

    let response = harness
        .app()
        .oneshot(login_request("alice", "nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(harness
        .authority
        .is_active(&alice(), &sid(&first))
        .await
        .unwrap());
}

#[tokio::test]
async fn empty_identifier_fails_validation() {
    let harness = Harness::new();
    let response = harness
        .app()
        .oneshot(login_request("", "wonderland", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn logout_releases_the_active_session() {
    let harness = Harness::new();
    let first = login_ok(&harness, "alice", "wonderland", None).await;

    let response = harness
        .app()
        .oneshot(request("POST", "/api/auth/logout", Some(first.as_str())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(session_cookie(response.headers()).as_deref(), Some(""));
    assert_eq!(response_json(response).await, json!({ "ok": true }));

    assert!(harness.authority.find(&alice()).await.unwrap().is_none());
    assert!(harness.store.get(&sid(&first)).await.unwrap().is_none());

    let me = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(first.as_str())))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_logout_succeeds() {
    let harness = Harness::new();
    let response = harness
        .app()
        .oneshot(request("POST", "/api/auth/logout", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn logout_from_a_stale_session_leaves_the_newer_one_active() {
    let harness = Harness::new();
    let first = login_ok(&harness, "alice", "wonderland", None).await;
    let second = login_ok(&harness, "alice", "wonderland", None).await;

    // Rejected by the gate, or anonymous once cleanup has run; either way harmless.
    let response = harness
        .app()
        .oneshot(request("POST", "/api/auth/logout", Some(first.as_str())))
        .await
        .unwrap();
    assert!(matches!(
        response.status(),
        StatusCode::OK | StatusCode::FORBIDDEN
    ));

    assert!(harness
        .authority
        .is_active(&alice(), &sid(&second))
        .await
        .unwrap());
}

#[tokio::test]
async fn other_user_on_a_live_session_gets_a_new_identifier() {
    let harness = Harness::new();
    let shared = login_ok(&harness, "alice", "wonderland", None).await;
    let issued = login_ok(&harness, "bob", "builder", Some(shared.as_str())).await;
    assert_ne!(shared, issued);

    let bob = UserId::new("bob").unwrap();
    assert!(harness.authority.find(&alice()).await.unwrap().is_none());
    assert!(harness.authority.is_active(&bob, &sid(&issued)).await.unwrap());
    assert!(harness.store.get(&sid(&shared)).await.unwrap().is_none());

    let me = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(issued.as_str())))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(response_json(me).await["user"]["id"], json!("bob"));

    // A straggler on the old identifier is anonymous and cannot disturb bob.
    let straggler = harness
        .app()
        .oneshot(request("GET", "/api/auth/me", Some(shared.as_str())))
        .await
        .unwrap();
    assert_eq!(straggler.status(), StatusCode::UNAUTHORIZED);
    assert!(harness.authority.is_active(&bob, &sid(&issued)).await.unwrap());
    assert!(harness.store.get(&sid(&issued)).await.unwrap().is_some());
}

#[tokio::test]
async fn health_is_not_gated() {
    let harness = Harness::new();
    let first = login_ok(&harness, "alice", "wonderland", None).await;
    harness
        .authority
        .activate(&alice(), &SessionId::generate())
        .await
        .unwrap();

    for cookie in [Some(first.as_str()), Some("bogus"), None] {
        let response = harness
            .app()
            .oneshot(request("GET", "/health", cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["ok"], json!(true));
    }
    assert!(harness.store.get(&sid(&first)).await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_logins_leave_exactly_one_active_session() {
    let harness = Harness::new();
    let app = harness.app();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let response = app
                    .oneshot(login_request("alice", "wonderland", None))
                    .await
                    .expect("call login");
                assert_eq!(response.status(), StatusCode::OK);
                session_cookie(response.headers()).expect("cookie")
            })
        })
        .collect();

    let mut issued = Vec::new();
    for handle in handles {
        issued.push(handle.await.expect("join login"));
    }

    let mut active = Vec::new();
    for session in &issued {
        if harness
            .authority
            .is_active(&alice(), &sid(session))
            .await
            .unwrap()
        {
            active.push(session.clone());
        }
    }
    assert_eq!(active.len(), 1);

    let record = harness.authority.find(&alice()).await.unwrap().expect("record");
    assert_eq!(record.session_id.as_str(), active[0]);
}
