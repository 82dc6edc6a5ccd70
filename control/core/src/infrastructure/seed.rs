// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Default Policy Seeding
//!
//! Idempotent "seed if empty": installs the default safety policies and
//! scope bindings on first boot. A non-empty policy store makes this a
//! no-op, so repeated boots never duplicate or overwrite operator edits.
//!
//! `Master` receives no binding — it bypasses policy evaluation entirely.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::domain::credential::KeyScope;
use crate::domain::policy::{
    PermissionGrant, PermissionLevel, PermissionMatrix, PolicyCategory, PolicyRateLimits,
    PolicySeverity, ResourceType, SafetyPolicy,
};
use crate::domain::repository::{PolicyBindingRepository, PolicyRepository};

/// Seed default policies and bindings when the policy store is empty.
/// Returns whether seeding ran.
pub async fn seed_if_empty(
    policies: &Arc<dyn PolicyRepository>,
    bindings: &Arc<dyn PolicyBindingRepository>,
) -> Result<bool> {
    if policies.count().await? > 0 {
        return Ok(false);
    }

    let defaults = [
        (KeyScope::Admin, admin_elevated()),
        (KeyScope::User, operator_baseline()),
        (KeyScope::Service, service_automation()),
        (KeyScope::Readonly, readonly_observer()),
    ];
    for (scope, policy) in defaults {
        let id = policy.id;
        let name = policy.name.clone();
        policies.save(policy).await?;
        bindings.bind(scope, id).await?;
        info!(policy = %name, scope = %scope, "seeded default policy");
    }
    Ok(true)
}

fn admin_elevated() -> SafetyPolicy {
    let mut matrix = PermissionMatrix::new();
    for resource in ResourceType::ALL {
        matrix = matrix.with_grant(resource, PermissionGrant::wildcard(PermissionLevel::Admin));
    }
    // Admin administers everything except the system surface itself
    matrix = matrix.with_grant(ResourceType::System, PermissionGrant::wildcard(PermissionLevel::Write));
    SafetyPolicy::new("admin-elevated", PolicyCategory::Safety, PolicySeverity::High).with_permissions(matrix)
}

fn operator_baseline() -> SafetyPolicy {
    SafetyPolicy::new("operator-baseline", PolicyCategory::Safety, PolicySeverity::Medium).with_permissions(
        PermissionMatrix::new()
            .with_grant(ResourceType::Operator, PermissionGrant::wildcard(PermissionLevel::Read))
            .with_grant(ResourceType::Slot, PermissionGrant::wildcard(PermissionLevel::Execute))
            .with_grant(ResourceType::Network, PermissionGrant::wildcard(PermissionLevel::Read)),
    )
}

fn service_automation() -> SafetyPolicy {
    SafetyPolicy::new("service-automation", PolicyCategory::Performance, PolicySeverity::Medium)
        .with_permissions(
            PermissionMatrix::new()
                .with_grant(ResourceType::Operator, PermissionGrant::wildcard(PermissionLevel::Read))
                .with_grant(ResourceType::Slot, PermissionGrant::wildcard(PermissionLevel::Execute))
                .with_grant(ResourceType::Network, PermissionGrant::wildcard(PermissionLevel::Read)),
        )
        .with_rate_limits(PolicyRateLimits {
            requests_per_minute: Some(120),
            requests_per_hour: Some(5_000),
            requests_per_day: Some(50_000),
            max_concurrent: Some(8),
        })
}

fn readonly_observer() -> SafetyPolicy {
    SafetyPolicy::new("readonly-observer", PolicyCategory::Safety, PolicySeverity::Low).with_permissions(
        PermissionMatrix::new()
            .with_grant(ResourceType::Operator, PermissionGrant::wildcard(PermissionLevel::Read))
            .with_grant(ResourceType::Slot, PermissionGrant::wildcard(PermissionLevel::Read))
            .with_grant(ResourceType::Network, PermissionGrant::wildcard(PermissionLevel::Read))
            .with_grant(ResourceType::Audit, PermissionGrant::wildcard(PermissionLevel::Read)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{PolicyBindingRepository, PolicyRepository};
    use crate::infrastructure::repositories::memory::{
        InMemoryPolicyBindingRepository, InMemoryPolicyRepository,
    };

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let policies: Arc<dyn PolicyRepository> = Arc::new(InMemoryPolicyRepository::new());
        let bindings: Arc<dyn PolicyBindingRepository> = Arc::new(InMemoryPolicyBindingRepository::new());

        assert!(seed_if_empty(&policies, &bindings).await.unwrap());
        let seeded_policies = policies.count().await.unwrap();
        let seeded_bindings = bindings.count().await.unwrap();
        assert_eq!(seeded_policies, 4);
        assert_eq!(seeded_bindings, 4);

        // Second boot: no-op
        assert!(!seed_if_empty(&policies, &bindings).await.unwrap());
        assert_eq!(policies.count().await.unwrap(), seeded_policies);
        assert_eq!(bindings.count().await.unwrap(), seeded_bindings);
    }

    #[tokio::test]
    async fn test_master_scope_receives_no_binding() {
        let policies: Arc<dyn PolicyRepository> = Arc::new(InMemoryPolicyRepository::new());
        let bindings: Arc<dyn PolicyBindingRepository> = Arc::new(InMemoryPolicyBindingRepository::new());
        seed_if_empty(&policies, &bindings).await.unwrap();

        assert!(bindings
            .bound_policy_ids(crate::domain::credential::KeyScope::Master)
            .await
            .unwrap()
            .is_empty());
        assert!(!bindings
            .bound_policy_ids(crate::domain::credential::KeyScope::User)
            .await
            .unwrap()
            .is_empty());
    }
}
