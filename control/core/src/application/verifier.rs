// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Credential Verifier
//!
//! Resolves a bearer token to an [`AuthenticatedIdentity`]. The only
//! component allowed to read the credential store directly.
//!
//! ## Verification Pipeline
//!
//! ```text
//! incoming token
//!   └─ root token?            ← constant-time compare, no store lookup
//!   └─ recognized prefix?     ← cheap rejection, zero store access
//!   └─ token index lookup     ← token → credential
//!   └─ usable at `now`?       ← stored Active AND not expired (derived)
//!   └─ usage touch enqueued   ← fire-and-forget, never blocks the response
//! ```
//!
//! Absent, revoked, suspended, and expired credentials all surface as
//! `KEY_NOT_FOUND`; nothing on this path reveals which check failed.
//!
//! ## Security
//!
//! Root-token and service-secret comparison must be constant-time. Timing
//! side-channels on bearer comparison leak secret prefixes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::domain::credential::has_recognized_prefix;
use crate::domain::error::AccessError;
use crate::domain::identity::AuthenticatedIdentity;
use crate::domain::repository::CredentialRepository;
use crate::infrastructure::side_effects::SideEffects;

/// Constant-time equality over two secrets. Handles unequal lengths without
/// an early return on content.
pub fn secret_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Domain seam for token verification. The gateway's direct transport and
/// the internal HTTP endpoint both terminate here.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AccessError>;
}

pub struct VerifierService {
    credentials: Arc<dyn CredentialRepository>,
    side_effects: SideEffects,
    root_token: Option<String>,
}

impl VerifierService {
    pub fn new(
        credentials: Arc<dyn CredentialRepository>,
        side_effects: SideEffects,
        root_token: Option<String>,
    ) -> Self {
        Self {
            credentials,
            side_effects,
            root_token,
        }
    }

    fn is_root(&self, token: &str) -> bool {
        match &self.root_token {
            Some(root) => secret_eq(root, token),
            None => false,
        }
    }
}

#[async_trait]
impl TokenVerifier for VerifierService {
    async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AccessError> {
        if token.is_empty() {
            return Err(AccessError::AuthMissing);
        }

        // Bootstrap path: the configured root token resolves to a synthetic
        // Master identity with no store lookup.
        if self.is_root(token) {
            debug!("root token verified");
            return Ok(AuthenticatedIdentity::master_root());
        }

        if !has_recognized_prefix(token) {
            return Err(AccessError::KeyInvalidFormat);
        }

        let key = self
            .credentials
            .find_by_token(token)
            .await
            .map_err(|e| AccessError::SecurityServiceUnavailable(e.to_string()))?
            .ok_or(AccessError::KeyNotFound)?;

        let now = Utc::now();
        if !key.is_usable(now) {
            debug!(key_id = %key.id, status = ?key.effective_status(now), "unusable credential presented");
            return Err(AccessError::KeyNotFound);
        }

        // Usage counters and last_used_at ride the side-effect queue; a full
        // queue drops the touch rather than delaying the response.
        if !self.side_effects.try_touch_usage(key.id, now) {
            warn!(key_id = %key.id, "usage touch dropped: side-effect queue full");
        }

        Ok(AuthenticatedIdentity::from_key(&key))
    }
}

/// Trust-boundary gate in front of a [`TokenVerifier`]. Both transports
/// (direct in-process and internal HTTP) present the calling service's
/// long-lived secret here before any token is looked at. Unconfigured means
/// closed: every call is rejected rather than verification being skipped.
pub struct ServiceGate {
    service_secret: Option<String>,
    inner: Arc<dyn TokenVerifier>,
}

impl ServiceGate {
    pub fn new(service_secret: Option<String>, inner: Arc<dyn TokenVerifier>) -> Self {
        Self { service_secret, inner }
    }

    /// Verify `token` on behalf of a calling service that presented
    /// `service_secret`.
    pub async fn verify_for_service(
        &self,
        presented_secret: &str,
        token: &str,
    ) -> Result<AuthenticatedIdentity, AccessError> {
        let Some(expected) = &self.service_secret else {
            warn!("trust-boundary call rejected: no service secret configured");
            return Err(AccessError::SecurityServiceUnavailable(
                "service secret not configured".to_string(),
            ));
        };
        if !secret_eq(expected, presented_secret) {
            warn!("trust-boundary call rejected: bad service secret");
            return Err(AccessError::Forbidden("invalid service credential".to_string()));
        }
        self.inner.verify(token).await
    }
}
