// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Trust-Boundary Transports
//!
//! Both transports terminate at the privileged domain's `ServiceGate` and
//! present the same service secret as the bearer credential of the internal
//! call. The HTTP fallback is bounded by a timeout that maps to
//! `SECURITY_SERVICE_UNAVAILABLE` rather than hanging the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use warden_control_core::application::verifier::ServiceGate;
use warden_control_core::domain::error::AccessError;
use warden_control_core::domain::identity::AuthenticatedIdentity;

pub enum VerifyTransport {
    /// In-process call into the privileged domain. Preferred: no network
    /// hop.
    Direct {
        gate: Arc<ServiceGate>,
        service_secret: String,
    },
    /// Network fallback to a configured verifier URL.
    Http(HttpVerifier),
}

impl VerifyTransport {
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AccessError> {
        match self {
            Self::Direct { gate, service_secret } => gate.verify_for_service(service_secret, token).await,
            Self::Http(http) => http.verify(token).await,
        }
    }
}

/// Wire shape of the internal `POST /verify` response.
#[derive(Debug, Deserialize)]
struct VerifyResponseWire {
    success: bool,
    data: Option<AuthenticatedIdentity>,
    error: Option<String>,
}

pub struct HttpVerifier {
    base_url: String,
    service_secret: String,
    client: reqwest::Client,
}

impl HttpVerifier {
    pub fn new(
        base_url: impl Into<String>,
        service_secret: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            service_secret: service_secret.into(),
            client,
        })
    }

    pub async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AccessError> {
        let url = format!("{}/verify", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.service_secret))
            .json(&serde_json::json!({ "key": token }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "trust-boundary call failed");
                let detail = if e.is_timeout() {
                    "verify call timed out".to_string()
                } else {
                    e.to_string()
                };
                AccessError::SecurityServiceUnavailable(detail)
            })?;

        let body: VerifyResponseWire = response
            .json()
            .await
            .map_err(|e| AccessError::SecurityServiceUnavailable(format!("malformed verify response: {e}")))?;

        if body.success {
            body.data.ok_or_else(|| {
                AccessError::SecurityServiceUnavailable("verify response missing identity".to_string())
            })
        } else {
            let code = body.error.unwrap_or_default();
            Err(AccessError::from_code(&code, "reported by verifier"))
        }
    }
}
