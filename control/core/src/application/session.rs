// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Session Flows
//!
//! Login, re-verification, and logout as the dashboard consumes them. Login
//! resolves the presented key and summarizes the permissions its scope is
//! bound to; callers receive a generic failure without learning which check
//! failed. Logout is best-effort and idempotent: it always succeeds from
//! the caller's point of view and leaves an audit record either way.

use std::net::IpAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::audit::{AuditLog, AuditOutcome, AuditSeverity};
use crate::domain::credential::KeyScope;
use crate::domain::error::AccessError;
use crate::domain::identity::AuthenticatedIdentity;
use crate::domain::policy::{PermissionGrant, PermissionMatrix, ResourceType, SafetyPolicy};
use crate::domain::repository::{PolicyBindingRepository, PolicyRepository};
use crate::infrastructure::side_effects::SideEffects;

use super::verifier::TokenVerifier;

/// Login response body: the session summary the dashboard renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSummary {
    pub user: String,
    pub scope: KeyScope,
    pub clearance: u8,
    pub permissions: Vec<String>,
}

pub struct SessionService {
    verifier: Arc<dyn TokenVerifier>,
    policies: Arc<dyn PolicyRepository>,
    bindings: Arc<dyn PolicyBindingRepository>,
    side_effects: SideEffects,
}

impl SessionService {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        policies: Arc<dyn PolicyRepository>,
        bindings: Arc<dyn PolicyBindingRepository>,
        side_effects: SideEffects,
    ) -> Self {
        Self {
            verifier,
            policies,
            bindings,
            side_effects,
        }
    }

    pub async fn login(&self, api_key: &str, origin_ip: Option<IpAddr>) -> Result<LoginSummary, AccessError> {
        let identity = match self.verifier.verify(api_key).await {
            Ok(identity) => identity,
            Err(e) => {
                self.side_effects
                    .record_audit(
                        AuditLog::new(
                            "unknown",
                            "auth.login",
                            ResourceType::User,
                            AuditOutcome::Failure,
                            format!("login rejected: {}", e.code()),
                        )
                        .with_severity(AuditSeverity::Warning)
                        .with_origin(origin_ip),
                    )
                    .await;
                return Err(e);
            }
        };

        let permissions = self.permission_summary(&identity).await?;
        info!(owner = %identity.owner, scope = %identity.scope, "login succeeded");

        self.side_effects
            .record_audit(
                AuditLog::new(
                    identity.owner.clone(),
                    "auth.login",
                    ResourceType::User,
                    AuditOutcome::Success,
                    format!("{} session opened", identity.scope),
                )
                .with_origin(origin_ip),
            )
            .await;

        Ok(LoginSummary {
            user: identity.owner.clone(),
            clearance: identity.clearance(),
            scope: identity.scope,
            permissions,
        })
    }

    /// Whether the presented token still resolves.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AccessError> {
        self.verifier.verify(token).await
    }

    /// Best-effort logout. Succeeds whether or not the request was
    /// authenticated, and audits either way.
    pub async fn logout(&self, token: Option<&str>, origin_ip: Option<IpAddr>) {
        let actor = match token {
            Some(token) => match self.verifier.verify(token).await {
                Ok(identity) => identity.owner,
                Err(_) => "anonymous".to_string(),
            },
            None => "anonymous".to_string(),
        };

        self.side_effects
            .record_audit(
                AuditLog::new(
                    actor,
                    "auth.logout",
                    ResourceType::User,
                    AuditOutcome::Success,
                    "session closed",
                )
                .with_origin(origin_ip),
            )
            .await;
    }

    /// The merged matrix across every enabled policy bound to the scope.
    /// Master reports the coarse full-access matrix.
    async fn permission_summary(&self, identity: &AuthenticatedIdentity) -> Result<Vec<String>, AccessError> {
        if identity.scope == KeyScope::Master {
            return Ok(PermissionMatrix::admin_wildcard().describe());
        }

        let bound = self
            .bindings
            .bound_policy_ids(identity.scope)
            .await
            .map_err(AccessError::Internal)?;
        let mut policies = Vec::new();
        for id in &bound {
            if let Some(policy) = self.policies.find_by_id(id).await.map_err(AccessError::Internal)? {
                if policy.enabled {
                    policies.push(policy);
                }
            }
        }
        Ok(merged_permissions(&policies).describe())
    }
}

/// Fold policies into one matrix keeping the strongest grant per resource:
/// higher level wins; at equal level a wildcard beats an instance filter.
fn merged_permissions(policies: &[SafetyPolicy]) -> PermissionMatrix {
    let mut merged = PermissionMatrix::new();
    for resource in ResourceType::ALL {
        let mut strongest: Option<PermissionGrant> = None;
        for policy in policies {
            let grant = policy.permissions.grant_for(resource);
            let stronger = match &strongest {
                None => true,
                Some(current) => {
                    grant.level > current.level || (grant.level == current.level && grant.wildcard && !current.wildcard)
                }
            };
            if stronger {
                strongest = Some(grant);
            }
        }
        if let Some(grant) = strongest {
            merged = merged.with_grant(resource, grant);
        }
    }
    merged
}
