// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Store Repository Traits
//!
//! Seams over the external ordered key-value store. The credential and
//! policy stores are owned exclusively by the privileged security domain;
//! nothing outside this crate writes to them.
//!
//! Policy-to-credential binding is an explicit many-to-many association
//! (`KeyScope` → policy ids) behind [`PolicyBindingRepository`]. `Master`
//! scope bypasses policy evaluation entirely and needs no bindings; every
//! other scope grants nothing until bound.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
use super::audit::AuditLog;
use super::credential::{ApiKey, KeyId, KeyScope};
use super::policy::{PolicyId, SafetyPolicy};

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn find_by_id(&self, id: &KeyId) -> Result<Option<ApiKey>>;

    /// Locate a credential by exact token equality via the store's
    /// token → id index. Status filtering is the verifier's job.
    async fn find_by_token(&self, token: &str) -> Result<Option<ApiKey>>;

    /// Insert or update. Fails if the token value is already held by a
    /// different credential (token uniqueness, no reuse after revocation).
    async fn save(&self, key: ApiKey) -> Result<()>;

    async fn list_all(&self) -> Result<Vec<ApiKey>>;

    /// Update `last_used_at` and usage counters. Invoked by the side-effect
    /// worker, never on the verification path.
    async fn touch_usage(&self, id: &KeyId, at: DateTime<Utc>) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<SafetyPolicy>>;
    async fn save(&self, policy: SafetyPolicy) -> Result<()>;
    async fn list_all(&self) -> Result<Vec<SafetyPolicy>>;
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait PolicyBindingRepository: Send + Sync {
    /// Policy ids bound to a scope. Empty for unbound scopes.
    async fn bound_policy_ids(&self, scope: KeyScope) -> Result<Vec<PolicyId>>;

    async fn bind(&self, scope: KeyScope, policy_id: PolicyId) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append-only. Records are immutable once written.
    async fn append(&self, entry: AuditLog) -> Result<()>;

    /// Most recent entries, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditLog>>;
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRequest>>;
    async fn save(&self, request: ApprovalRequest) -> Result<()>;
    async fn list_by_status(&self, status: ApprovalStatus) -> Result<Vec<ApprovalRequest>>;
}
