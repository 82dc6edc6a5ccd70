// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # In-Memory Store Implementations
//!
//! Phase-1 repositories backed by `RwLock<HashMap>`. The external ordered
//! key-value store is consumed, not designed, here; these implementations
//! model its list/create/patch semantics for development and tests.
//!
//! The credential store maintains a token → id index so verification never
//! scans. The linear scan over all credentials is kept (test-only) as the
//! correctness baseline the index is asserted against.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
use crate::domain::audit::AuditLog;
use crate::domain::credential::{ApiKey, KeyId, KeyScope};
use crate::domain::policy::{PolicyId, SafetyPolicy};
use crate::domain::repository::{
    ApprovalRepository, AuditRepository, CredentialRepository, PolicyBindingRepository, PolicyRepository,
};

pub struct InMemoryCredentialRepository {
    keys: Arc<RwLock<HashMap<KeyId, ApiKey>>>,
    // Token -> id index; revoked credentials stay in `keys`, keeping their
    // token values occupied forever (no reuse after revocation).
    token_index: Arc<RwLock<HashMap<String, KeyId>>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
            token_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Correctness baseline for the token index: the linear scan the index
    /// replaces.
    #[cfg(test)]
    pub async fn scan_by_token(&self, token: &str) -> Option<ApiKey> {
        let guard = self.keys.read().await;
        guard.values().find(|k| k.token == token).cloned()
    }
}

impl Default for InMemoryCredentialRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn find_by_id(&self, id: &KeyId) -> Result<Option<ApiKey>> {
        let guard = self.keys.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ApiKey>> {
        let id = {
            let index = self.token_index.read().await;
            index.get(token).copied()
        };
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn save(&self, key: ApiKey) -> Result<()> {
        let mut index = self.token_index.write().await;
        if let Some(existing) = index.get(&key.token) {
            if *existing != key.id {
                bail!("token value already in use by credential {}", existing);
            }
        }
        let mut guard = self.keys.write().await;
        index.insert(key.token.clone(), key.id);
        guard.insert(key.id, key);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ApiKey>> {
        let guard = self.keys.read().await;
        Ok(guard.values().cloned().collect())
    }

    async fn touch_usage(&self, id: &KeyId, at: DateTime<Utc>) -> Result<()> {
        let mut guard = self.keys.write().await;
        match guard.get_mut(id) {
            Some(key) => {
                key.touch_usage(at);
                Ok(())
            }
            None => bail!("credential {} not found", id),
        }
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.keys.read().await;
        Ok(guard.len())
    }
}

pub struct InMemoryPolicyRepository {
    policies: Arc<RwLock<HashMap<PolicyId, SafetyPolicy>>>,
}

impl InMemoryPolicyRepository {
    pub fn new() -> Self {
        Self {
            policies: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryPolicyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyRepository for InMemoryPolicyRepository {
    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<SafetyPolicy>> {
        let guard = self.policies.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn save(&self, policy: SafetyPolicy) -> Result<()> {
        let mut guard = self.policies.write().await;
        guard.insert(policy.id, policy);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<SafetyPolicy>> {
        let guard = self.policies.read().await;
        Ok(guard.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.policies.read().await;
        Ok(guard.len())
    }
}

pub struct InMemoryPolicyBindingRepository {
    bindings: Arc<RwLock<HashMap<KeyScope, Vec<PolicyId>>>>,
}

impl InMemoryPolicyBindingRepository {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryPolicyBindingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyBindingRepository for InMemoryPolicyBindingRepository {
    async fn bound_policy_ids(&self, scope: KeyScope) -> Result<Vec<PolicyId>> {
        let guard = self.bindings.read().await;
        Ok(guard.get(&scope).cloned().unwrap_or_default())
    }

    async fn bind(&self, scope: KeyScope, policy_id: PolicyId) -> Result<()> {
        let mut guard = self.bindings.write().await;
        let bound = guard.entry(scope).or_default();
        if !bound.contains(&policy_id) {
            bound.push(policy_id);
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.bindings.read().await;
        Ok(guard.values().map(|v| v.len()).sum())
    }
}

pub struct InMemoryAuditRepository {
    entries: Arc<RwLock<Vec<AuditLog>>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryAuditRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, entry: AuditLog) -> Result<()> {
        let mut guard = self.entries.write().await;
        guard.push(entry);
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditLog>> {
        let guard = self.entries.read().await;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

pub struct InMemoryApprovalRepository {
    requests: Arc<RwLock<HashMap<ApprovalId, ApprovalRequest>>>,
}

impl InMemoryApprovalRepository {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryApprovalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRequest>> {
        let guard = self.requests.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn save(&self, request: ApprovalRequest) -> Result<()> {
        let mut guard = self.requests.write().await;
        guard.insert(request.id, request);
        Ok(())
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> Result<Vec<ApprovalRequest>> {
        let guard = self.requests.read().await;
        let mut matching: Vec<_> = guard.values().filter(|r| r.status == status).cloned().collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }
}
