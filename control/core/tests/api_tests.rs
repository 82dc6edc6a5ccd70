// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP surface tests: the auth endpoints and the internal trust-boundary
//! verify endpoint, exercised through the router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use warden_control_core::application::session::SessionService;
use warden_control_core::application::verifier::{ServiceGate, TokenVerifier, VerifierService};
use warden_control_core::domain::control_config::Environment;
use warden_control_core::domain::credential::{ApiKey, KeyScope};
use warden_control_core::domain::policy::{
    PermissionGrant, PermissionLevel, PermissionMatrix, PolicyCategory, PolicySeverity, ResourceType,
    SafetyPolicy,
};
use warden_control_core::domain::repository::{
    CredentialRepository, PolicyBindingRepository, PolicyRepository,
};
use warden_control_core::infrastructure::repositories::memory::{
    InMemoryAuditRepository, InMemoryCredentialRepository, InMemoryPolicyBindingRepository,
    InMemoryPolicyRepository,
};
use warden_control_core::infrastructure::side_effects::SideEffectQueue;
use warden_control_core::presentation::api::{app, AppState};

struct Fixture {
    router: axum::Router,
    credentials: Arc<InMemoryCredentialRepository>,
}

async fn fixture(environment: Environment) -> Fixture {
    let credentials = Arc::new(InMemoryCredentialRepository::new());
    let policies = Arc::new(InMemoryPolicyRepository::new());
    let bindings = Arc::new(InMemoryPolicyBindingRepository::new());
    let audits = Arc::new(InMemoryAuditRepository::new());
    let (side_effects, _worker) = SideEffectQueue::spawn(credentials.clone(), audits, 64);

    let policy = SafetyPolicy::new("network-read", PolicyCategory::Safety, PolicySeverity::Medium)
        .with_permissions(
            PermissionMatrix::new()
                .with_grant(ResourceType::Network, PermissionGrant::wildcard(PermissionLevel::Read)),
        );
    let policy_id = policy.id;
    policies.save(policy).await.unwrap();
    bindings
        .bind(KeyScope::User, policy_id)
        .await
        .unwrap();

    let verifier: Arc<dyn TokenVerifier> = Arc::new(VerifierService::new(
        credentials.clone(),
        side_effects.clone(),
        Some("root-xyz".to_string()),
    ));
    let sessions = Arc::new(SessionService::new(
        verifier.clone(),
        policies,
        bindings,
        side_effects.clone(),
    ));
    let gate = Arc::new(ServiceGate::new(Some("svc-secret".to_string()), verifier));

    let state = Arc::new(AppState {
        sessions,
        gate,
        environment,
        side_effects,
    });
    Fixture {
        router: app(state),
        credentials,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_login_returns_session_summary() {
    let f = fixture(Environment::Local).await;
    let key = ApiKey::provision(KeyScope::User, "alice", None);
    let token = key.token.clone();
    f.credentials.save(key).await.unwrap();

    let response = f
        .router
        .oneshot(post_json("/auth/login", json!({ "apiKey": token })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"], "alice");
    assert_eq!(body["scope"], "user");
    assert_eq!(body["clearance"], 3);
    assert_eq!(body["permissions"], json!(["NETWORK:read:*"]));
}

#[tokio::test]
async fn test_login_failure_is_generic() {
    let f = fixture(Environment::Local).await;

    // Malformed and absent keys produce the identical response
    for api_key in ["not-a-key", "wdn_live_absent"] {
        let response = f
            .router
            .clone()
            .oneshot(post_json("/auth/login", json!({ "apiKey": api_key })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body, json!({"error": "invalid credentials"}));
    }
}

#[tokio::test]
async fn test_internal_verify_requires_service_secret() {
    let f = fixture(Environment::Local).await;

    // No bearer at all
    let response = f
        .router
        .clone()
        .oneshot(post_json("/verify", json!({ "key": "root-xyz" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong secret
    let mut request = post_json("/verify", json!({ "key": "root-xyz" }));
    request
        .headers_mut()
        .insert("authorization", "Bearer wrong".parse().unwrap());
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Correct secret resolves the token
    let mut request = post_json("/verify", json!({ "key": "root-xyz" }));
    request
        .headers_mut()
        .insert("authorization", "Bearer svc-secret".parse().unwrap());
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["scope"], "master");
    assert_eq!(body["data"]["owner"], "root");
}

#[tokio::test]
async fn test_internal_verify_conflates_unusable_keys() {
    let f = fixture(Environment::Local).await;
    let mut request = post_json("/verify", json!({ "key": "wdn_live_absent" }));
    request
        .headers_mut()
        .insert("authorization", "Bearer svc-secret".parse().unwrap());
    let response = f.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "KEY_NOT_FOUND");
}

#[tokio::test]
async fn test_auth_verify_round_trip() {
    let f = fixture(Environment::Local).await;
    let key = ApiKey::provision(KeyScope::User, "alice", None);
    let token = key.token.clone();
    f.credentials.save(key).await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/auth/verify")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("GET")
        .uri("/auth/verify")
        .body(Body::empty())
        .unwrap();
    let response = f.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_always_succeeds() {
    let f = fixture(Environment::Local).await;

    // Unauthenticated logout is still a success (idempotent)
    let request = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": true}));

    let request = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header("authorization", "Bearer wdn_live_gone")
        .body(Body::empty())
        .unwrap();
    let response = f.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_plaintext_rejected_outside_local() {
    let f = fixture(Environment::Production).await;

    let response = f
        .router
        .clone()
        .oneshot(post_json("/auth/login", json!({ "apiKey": "root-xyz" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "PLAINTEXT_REJECTED");

    // Same request behind TLS termination passes the transport gate
    let mut request = post_json("/auth/login", json!({ "apiKey": "root-xyz" }));
    request
        .headers_mut()
        .insert("x-forwarded-proto", "https".parse().unwrap());
    let response = f.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
