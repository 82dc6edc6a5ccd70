// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Control Plane HTTP Surface
//!
//! The privileged domain's inbound endpoints:
//!
//! - `POST /verify` — internal trust-boundary call, gated by the service
//!   secret. The only way the unprivileged tier resolves tokens.
//! - `POST /auth/login` — dashboard login; failures never say which check
//!   failed.
//! - `GET /auth/verify` — does the current token still resolve.
//! - `POST /auth/logout` — best-effort, idempotent, audited.
//!
//! Plaintext HTTP is rejected before any auth logic runs outside the
//! `Local` environment.

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::application::session::SessionService;
use crate::application::verifier::ServiceGate;
use crate::domain::audit::{AuditLog, AuditOutcome, AuditSeverity};
use crate::domain::control_config::Environment;
use crate::domain::error::AccessError;
use crate::domain::identity::AuthenticatedIdentity;
use crate::domain::policy::ResourceType;
use crate::infrastructure::side_effects::SideEffects;

pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub gate: Arc<ServiceGate>,
    pub environment: Environment,
    pub side_effects: SideEffects,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/verify", post(verify_internal))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(auth_verify))
        .route("/auth/logout", post(logout))
        .layer(middleware::from_fn_with_state(state.clone(), require_secure_transport))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reject plaintext HTTP outside the local environment, before any auth
/// logic. TLS terminates at the edge proxy, which stamps
/// `x-forwarded-proto`.
async fn require_secure_transport(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.environment != Environment::Local {
        let proto = request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok());
        if proto != Some("https") {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "PLAINTEXT_REJECTED", "message": "HTTPS is required"})),
            )
                .into_response();
        }
    }
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

fn status_for(err: &AccessError) -> StatusCode {
    match err {
        AccessError::AuthMissing | AccessError::KeyInvalidFormat | AccessError::KeyNotFound => {
            StatusCode::UNAUTHORIZED
        }
        AccessError::SecurityServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AccessError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
        AccessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Internal errors are audited at severity critical before they surface as
/// 5xx.
async fn audit_internal_error(state: &AppState, action: &str, detail: String, origin: Option<IpAddr>) {
    error!(action, detail = %detail, "internal error on auth surface");
    state
        .side_effects
        .record_audit(
            AuditLog::new("system", action, ResourceType::System, AuditOutcome::Failure, detail)
                .with_severity(AuditSeverity::Critical)
                .with_origin(origin),
        )
        .await;
}

#[derive(Deserialize)]
struct VerifyRequest {
    key: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<AuthenticatedIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn verify_internal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<VerifyRequest>,
) -> Response {
    let Some(secret) = bearer_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                success: false,
                data: None,
                error: Some(AccessError::AuthMissing.code().to_string()),
            }),
        )
            .into_response();
    };

    match state.gate.verify_for_service(secret, &payload.key).await {
        Ok(identity) => Json(VerifyResponse {
            success: true,
            data: Some(identity),
            error: None,
        })
        .into_response(),
        Err(e) => {
            if matches!(e, AccessError::Internal(_)) {
                audit_internal_error(&state, "verify.internal", e.to_string(), client_ip(&headers)).await;
            }
            (
                status_for(&e),
                Json(VerifyResponse {
                    success: false,
                    data: None,
                    error: Some(e.code().to_string()),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    api_key: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let origin = client_ip(&headers);
    match state.sessions.login(&payload.api_key, origin).await {
        Ok(summary) => Json(summary).into_response(),
        Err(AccessError::SecurityServiceUnavailable(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "service unavailable"})),
        )
            .into_response(),
        Err(AccessError::Internal(e)) => {
            audit_internal_error(&state, "auth.login", e.to_string(), origin).await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            )
                .into_response()
        }
        // One generic failure for every credential problem: nothing leaks
        // which check failed.
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid credentials"})),
        )
            .into_response(),
    }
}

async fn auth_verify(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": AccessError::AuthMissing.code()})),
        )
            .into_response();
    };
    match state.sessions.verify(token).await {
        Ok(_) => Json(json!({"success": true})).into_response(),
        Err(e) => (
            status_for(&e),
            Json(json!({"success": false, "error": e.code()})),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let origin = client_ip(&headers);
    state.sessions.logout(bearer_token(&headers), origin).await;
    Json(json!({"success": true})).into_response()
}
