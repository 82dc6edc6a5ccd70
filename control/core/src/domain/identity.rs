// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Authenticated Identity
//!
//! The result of verification: the resolved credential's id, scope, and
//! owner, plus whether the session completed a second factor. Never
//! persisted; lives for exactly one request (the gateway memoizes it
//! request-locally and nowhere else).

use serde::{Deserialize, Serialize};

use super::credential::{ApiKey, KeyId, KeyScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub key_id: KeyId,
    pub scope: KeyScope,
    pub owner: String,

    /// Whether the session completed a second factor. Set by the session
    /// layer after MFA; verification itself never asserts it.
    #[serde(default)]
    pub mfa_verified: bool,
}

impl AuthenticatedIdentity {
    pub fn from_key(key: &ApiKey) -> Self {
        Self {
            key_id: key.id,
            scope: key.scope,
            owner: key.owner.clone(),
            mfa_verified: false,
        }
    }

    /// Synthetic Master identity for the out-of-band root token. Exists so
    /// the system is bootstrappable before any credential is stored.
    pub fn master_root() -> Self {
        Self {
            key_id: KeyId::nil(),
            scope: KeyScope::Master,
            owner: "root".to_string(),
            mfa_verified: false,
        }
    }

    pub fn clearance(&self) -> u8 {
        self.scope.clearance()
    }
}
