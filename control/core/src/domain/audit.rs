// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Log Record
//!
//! Immutable audit trail entry. Every state-changing operation on the
//! credential, policy, or approval stores produces at least one record in
//! the same logical unit of work — at-least-once is acceptable for
//! telemetry value, zero never is.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::policy::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(pub Uuid);

impl AuditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Warning,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

/// One audit trail entry. Immutable once created; the audit store only
/// appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditId,
    pub timestamp: DateTime<Utc>,

    /// Acting operator or service account.
    pub actor: String,

    /// Action code, e.g. `auth.login`, `approval.resolve`.
    pub action: String,

    pub resource_type: ResourceType,
    pub outcome: AuditOutcome,
    pub severity: AuditSeverity,

    /// Human-readable detail.
    pub detail: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_ip: Option<IpAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl AuditLog {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        resource_type: ResourceType,
        outcome: AuditOutcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: AuditId::new(),
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            resource_type,
            outcome,
            severity: AuditSeverity::Info,
            detail: detail.into(),
            origin_ip: None,
            duration_ms: None,
        }
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_origin(mut self, ip: Option<IpAddr>) -> Self {
        self.origin_ip = ip;
        self
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }
}
