// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod approval;
pub mod audit;
pub mod control_config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod policy;
pub mod repository;

pub use approval::{ApprovalDecision, ApprovalError, ApprovalId, ApprovalKind, ApprovalRequest, ApprovalStatus};
pub use audit::{AuditId, AuditLog, AuditOutcome, AuditSeverity};
pub use control_config::{ControlConfig, Environment};
pub use credential::{ApiKey, KeyId, KeyRateLimit, KeyScope, KeyStatus, UsageCounters};
pub use error::{AccessError, RateWindow};
pub use identity::AuthenticatedIdentity;
pub use policy::{
    PermissionGrant, PermissionLevel, PermissionMatrix, PolicyCategory, PolicyId,
    PolicyRateLimits, PolicyRestrictions, PolicySeverity, ResourceType, SafetyPolicy, TimeWindow,
};
