// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Authorization Evaluator
//!
//! Decides allow/deny for a requested (resource, level, instance) against
//! the policies bound to an identity's scope.
//!
//! ## Algorithm
//!
//! 1. `Master` scope short-circuits to Allow (implicitly satisfies
//!    everything; it carries no bindings).
//! 2. Gather every **enabled** policy bound to the scope.
//! 3. A policy grants when its matrix level ≥ the required level AND the
//!    grant covers the requested instance (wildcard dominates).
//! 4. Time- and network-based restrictions narrow an otherwise-granting
//!    policy: outside its restriction set the policy is non-granting for
//!    this request, but other policies may still grant.
//! 5. An MFA-required restriction on any otherwise-granting policy denies
//!    the whole request unless the session completed a second factor —
//!    order-independent, stricter than narrowing.
//! 6. Logical OR across bound policies; nothing granted means Deny.
//!
//! Denial is a normal outcome. `Err` is reserved for evaluation failure
//! (policy store unreachable), which callers surface as a server error.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::credential::KeyScope;
use crate::domain::error::AccessError;
use crate::domain::identity::AuthenticatedIdentity;
use crate::domain::policy::{PermissionLevel, ResourceType};
use crate::domain::repository::{PolicyBindingRepository, PolicyRepository};

/// One authorization question.
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    pub resource: ResourceType,
    pub required: PermissionLevel,
    pub resource_id: Option<&'a str>,
    pub origin_ip: Option<IpAddr>,
    pub at: DateTime<Utc>,
}

impl<'a> AccessRequest<'a> {
    pub fn new(resource: ResourceType, required: PermissionLevel) -> Self {
        Self {
            resource,
            required,
            resource_id: None,
            origin_ip: None,
            at: Utc::now(),
        }
    }

    pub fn on_instance(mut self, resource_id: &'a str) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn from_ip(mut self, ip: IpAddr) -> Self {
        self.origin_ip = Some(ip);
        self
    }
}

/// Evaluation outcome. Deny carries the dominant reason for audit detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No bound, enabled policy grants the requested level.
    NoGrantingPolicy,
    /// A granting policy requires a second factor the session lacks.
    MfaRequired,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoGrantingPolicy => write!(f, "no bound policy grants the requested access"),
            Self::MfaRequired => write!(f, "second factor required"),
        }
    }
}

pub struct AuthorizationService {
    policies: Arc<dyn PolicyRepository>,
    bindings: Arc<dyn PolicyBindingRepository>,
}

impl AuthorizationService {
    pub fn new(policies: Arc<dyn PolicyRepository>, bindings: Arc<dyn PolicyBindingRepository>) -> Self {
        Self { policies, bindings }
    }

    pub async fn authorize(
        &self,
        identity: &AuthenticatedIdentity,
        request: &AccessRequest<'_>,
    ) -> Result<Decision, AccessError> {
        if identity.scope == KeyScope::Master {
            return Ok(Decision::Allow);
        }

        let bound = self
            .bindings
            .bound_policy_ids(identity.scope)
            .await
            .map_err(AccessError::Internal)?;

        let mut granted = false;
        let mut mfa_blocked = false;

        for policy_id in &bound {
            let Some(policy) = self.policies.find_by_id(policy_id).await.map_err(AccessError::Internal)? else {
                continue;
            };
            if !policy.enabled {
                continue;
            }

            let grant = policy.permissions.grant_for(request.resource);
            if !grant.permits(request.required, request.resource_id) {
                continue;
            }

            // Restrictions narrow an otherwise-granting policy.
            if !policy.restrictions.permits(request.at, request.origin_ip) {
                debug!(policy = %policy.name, "granting policy narrowed by restrictions");
                continue;
            }

            if policy.restrictions.require_mfa && !identity.mfa_verified {
                mfa_blocked = true;
                continue;
            }

            granted = true;
        }

        if mfa_blocked {
            return Ok(Decision::Deny(DenyReason::MfaRequired));
        }
        if granted {
            return Ok(Decision::Allow);
        }
        Ok(Decision::Deny(DenyReason::NoGrantingPolicy))
    }
}
