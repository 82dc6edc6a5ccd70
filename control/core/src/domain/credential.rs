// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # API Key Aggregate
//!
//! Domain model for programmatic credentials. An [`ApiKey`] is a bearer
//! secret with a coarse scope, a lifecycle status, an optional absolute
//! expiry, and per-key rate-limit declarations.
//!
//! ## Invariants
//!
//! - Secret token values are unique across all credentials; a token string
//!   is never reused after revocation. Enforced by the credential store's
//!   token index on insert.
//! - `Expired` is a **derived** status: it is never persisted as a
//!   transition. [`ApiKey::effective_status`] computes it from `expires_at`
//!   at verification time, so a credential stored as `Active` whose expiry
//!   has elapsed is unusable without requiring a write.
//! - Only the privileged security domain reads this aggregate. The
//!   unprivileged tier sees verification results, never raw secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recognized credential prefixes (case-sensitive). A presented token that
/// starts with none of these is rejected before any store access.
pub const RECOGNIZED_PREFIXES: &[&str] = &["wdn_live_", "wdn_svc_", "wdn_test_"];

/// Whether `token` carries one of the recognized credential prefixes.
pub fn has_recognized_prefix(token: &str) -> bool {
    RECOGNIZED_PREFIXES.iter().any(|p| token.starts_with(p))
}

/// Opaque identifier for a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub Uuid);

impl KeyId {
    /// Generate a new random key ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil ID used by synthetic identities (root bootstrap).
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for KeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse credential tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScope {
    Master,
    Admin,
    User,
    Service,
    Readonly,
}

impl KeyScope {
    /// Numeric clearance tier reported to dashboard clients on login.
    pub fn clearance(&self) -> u8 {
        match self {
            Self::Master => 5,
            Self::Admin => 4,
            Self::User => 3,
            Self::Service => 2,
            Self::Readonly => 1,
        }
    }

    /// The token prefix newly provisioned keys of this scope carry.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Self::Service => "wdn_svc_",
            Self::Readonly => "wdn_test_",
            _ => "wdn_live_",
        }
    }
}

impl std::fmt::Display for KeyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Master => "master",
            Self::Admin => "admin",
            Self::User => "user",
            Self::Service => "service",
            Self::Readonly => "readonly",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of an [`ApiKey`].
///
/// `Expired` never appears in the store; it is computed by
/// [`ApiKey::effective_status`] when `expires_at` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Suspended,
    Revoked,
    Expired,
}

/// Per-key rate-limit declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRateLimit {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

impl Default for KeyRateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 1_000,
        }
    }
}

/// Usage counters updated best-effort after each successful verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub total_requests: u64,
}

/// A bearer credential granting programmatic access to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: KeyId,

    /// The secret token value. Never leaves the privileged domain.
    pub token: String,

    pub scope: KeyScope,

    /// Owner identity (operator or service account name).
    pub owner: String,

    /// Stored lifecycle status. See [`KeyStatus`] for the derived `Expired`.
    pub status: KeyStatus,

    pub created_at: DateTime<Utc>,

    /// Optional absolute expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,

    pub rate_limit: KeyRateLimit,

    pub usage: UsageCounters,
}

impl ApiKey {
    /// Provision a fresh credential with a scope-appropriate token prefix.
    pub fn provision(scope: KeyScope, owner: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        let id = KeyId::new();
        let token = format!("{}{}", scope.token_prefix(), Uuid::new_v4().simple());
        Self {
            id,
            token,
            scope,
            owner: owner.into(),
            status: KeyStatus::Active,
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
            rate_limit: KeyRateLimit::default(),
            usage: UsageCounters::default(),
        }
    }

    /// Whether `expires_at` has elapsed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// The status as seen by verification: stored status, with `Expired`
    /// derived from `expires_at` without a write.
    pub fn effective_status(&self, now: DateTime<Utc>) -> KeyStatus {
        if self.status == KeyStatus::Active && self.is_expired(now) {
            KeyStatus::Expired
        } else {
            self.status
        }
    }

    /// Whether the credential can authenticate a request at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == KeyStatus::Active
    }

    /// Record one successful use. Applied by the side-effect worker, never
    /// on the verification path itself.
    pub fn touch_usage(&mut self, at: DateTime<Utc>) {
        self.last_used_at = Some(at);
        self.usage.total_requests = self.usage.total_requests.saturating_add(1);
    }

    /// Revoke the credential. The token value stays occupied in the store so
    /// it can never be reissued.
    pub fn revoke(&mut self) {
        self.status = KeyStatus::Revoked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_recognized_prefixes_are_case_sensitive() {
        assert!(has_recognized_prefix("wdn_live_abc123"));
        assert!(has_recognized_prefix("wdn_svc_abc123"));
        assert!(!has_recognized_prefix("WDN_LIVE_abc123"));
        assert!(!has_recognized_prefix("sk_live_abc123"));
        assert!(!has_recognized_prefix(""));
    }

    #[test]
    fn test_provisioned_token_carries_scope_prefix() {
        let svc = ApiKey::provision(KeyScope::Service, "ci-bot", None);
        assert!(svc.token.starts_with("wdn_svc_"));

        let user = ApiKey::provision(KeyScope::User, "alice", None);
        assert!(user.token.starts_with("wdn_live_"));
        assert!(has_recognized_prefix(&user.token));
    }

    #[test]
    fn test_expired_status_is_derived_not_stored() {
        let now = Utc::now();
        let mut key = ApiKey::provision(KeyScope::User, "alice", Some(now - Duration::days(1)));

        // Stored status still reads Active
        assert_eq!(key.status, KeyStatus::Active);
        assert_eq!(key.effective_status(now), KeyStatus::Expired);
        assert!(!key.is_usable(now));

        // Removing the expiry restores usability without a status write
        key.expires_at = None;
        assert!(key.is_usable(now));
    }

    #[test]
    fn test_suspended_key_is_not_usable() {
        let mut key = ApiKey::provision(KeyScope::User, "alice", None);
        key.status = KeyStatus::Suspended;
        assert!(!key.is_usable(Utc::now()));
        assert_eq!(key.effective_status(Utc::now()), KeyStatus::Suspended);
    }

    #[test]
    fn test_touch_usage_updates_counters() {
        let mut key = ApiKey::provision(KeyScope::User, "alice", None);
        let at = Utc::now();
        key.touch_usage(at);
        assert_eq!(key.usage.total_requests, 1);
        assert_eq!(key.last_used_at, Some(at));
    }
}
