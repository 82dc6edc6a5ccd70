// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Gateway
//!
//! Transport selection and per-request authentication for the unprivileged
//! tier. Selection order: direct in-process channel when available, the
//! configured verifier URL otherwise. Neither configured means fail closed:
//! every authentication attempt returns `SECURITY_SERVICE_UNAVAILABLE`
//! instead of verification being silently skipped.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use warden_control_core::application::verifier::ServiceGate;
use warden_control_core::domain::control_config::ControlConfig;
use warden_control_core::domain::error::AccessError;
use warden_control_core::domain::identity::AuthenticatedIdentity;

use crate::context::RequestContext;
use crate::transport::{HttpVerifier, VerifyTransport};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Long-lived secret identifying this calling service on internal
    /// verify calls.
    pub service_secret: Option<String>,

    /// Network fallback when no direct channel is available.
    pub verifier_url: Option<String>,

    pub verify_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_secret: None,
            verifier_url: None,
            verify_timeout: Duration::from_secs(3),
        }
    }
}

impl From<&ControlConfig> for GatewayConfig {
    fn from(config: &ControlConfig) -> Self {
        Self {
            service_secret: config.service_secret.clone(),
            verifier_url: config.verifier_url.clone(),
            verify_timeout: config.verify_timeout(),
        }
    }
}

pub struct Gateway {
    transport: Option<VerifyTransport>,
}

impl Gateway {
    /// Build a gateway, preferring the direct in-process channel when one
    /// is supplied.
    pub fn new(config: GatewayConfig, direct: Option<Arc<ServiceGate>>) -> Self {
        let transport = match (config.service_secret, direct) {
            (Some(service_secret), Some(gate)) => Some(VerifyTransport::Direct { gate, service_secret }),
            (Some(service_secret), None) => match config.verifier_url {
                Some(url) => match HttpVerifier::new(url, service_secret, config.verify_timeout) {
                    Ok(http) => Some(VerifyTransport::Http(http)),
                    Err(e) => {
                        warn!(error = %e, "failed to build HTTP verify transport");
                        None
                    }
                },
                None => None,
            },
            (None, _) => None,
        };
        if transport.is_none() {
            warn!("no trust-boundary transport configured; gateway will fail closed");
        }
        Self { transport }
    }

    /// Resolve the caller's bearer token to an identity, memoized in `ctx`
    /// for the rest of this request.
    pub async fn authenticate<'c>(
        &self,
        ctx: &'c RequestContext,
        bearer: Option<&str>,
    ) -> Result<&'c AuthenticatedIdentity, AccessError> {
        let token = bearer.ok_or(AccessError::AuthMissing)?;
        ctx.identity_cell()
            .get_or_try_init(|| async {
                match &self.transport {
                    Some(transport) => transport.verify(token).await,
                    None => Err(AccessError::SecurityServiceUnavailable(
                        "no trust-boundary transport configured".to_string(),
                    )),
                }
            })
            .await
    }
}
