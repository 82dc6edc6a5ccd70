// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Approval Workflow Service
//!
//! Mediates irreversible actions behind human review. Submitting and
//! resolving both emit audit records; a resolution attempt on an already
//! terminal request is rejected **and** audited, so the trail shows the
//! retransition attempt itself.
//!
//! Approving a request never executes its payload — the unprivileged tier
//! executes, using the approval as an authorization precondition.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::domain::approval::{
    ApprovalDecision, ApprovalError, ApprovalId, ApprovalKind, ApprovalRequest,
};
use crate::domain::audit::{AuditLog, AuditOutcome, AuditSeverity};
use crate::domain::policy::ResourceType;
use crate::domain::repository::ApprovalRepository;
use crate::infrastructure::side_effects::SideEffects;

#[derive(Debug, Error)]
pub enum ApprovalServiceError {
    #[error("approval request {0} not found")]
    NotFound(ApprovalId),

    #[error(transparent)]
    Terminal(#[from] ApprovalError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// The resource an approval kind gates, for audit records.
fn audited_resource(kind: ApprovalKind) -> ResourceType {
    match kind {
        ApprovalKind::OperatorRegistration => ResourceType::Operator,
        ApprovalKind::PolicyChange => ResourceType::Policy,
        ApprovalKind::KeyProvision => ResourceType::Key,
    }
}

pub struct ApprovalService {
    approvals: Arc<dyn ApprovalRepository>,
    side_effects: SideEffects,
}

impl ApprovalService {
    pub fn new(approvals: Arc<dyn ApprovalRepository>, side_effects: SideEffects) -> Self {
        Self { approvals, side_effects }
    }

    /// Create a pending request for a deferred, human-reviewed action.
    pub async fn submit(
        &self,
        kind: ApprovalKind,
        payload: serde_json::Value,
        requested_by: impl Into<String>,
        origin_ip: Option<IpAddr>,
    ) -> Result<ApprovalRequest, ApprovalServiceError> {
        let request = ApprovalRequest::new(kind, payload, requested_by);
        self.approvals.save(request.clone()).await?;
        info!(approval_id = %request.id, kind = ?kind, "approval request submitted");

        self.side_effects
            .record_audit(
                AuditLog::new(
                    request.requested_by.clone(),
                    "approval.submit",
                    audited_resource(kind),
                    AuditOutcome::Success,
                    format!("approval {} submitted", request.id),
                )
                .with_origin(origin_ip),
            )
            .await;
        Ok(request)
    }

    /// Apply a reviewer verdict to a pending request.
    ///
    /// Terminal states are preserved: a second transition attempt returns
    /// [`ApprovalServiceError::Terminal`] and leaves an audit record of the
    /// rejected retransition.
    pub async fn resolve(
        &self,
        id: ApprovalId,
        decision: ApprovalDecision,
        reviewer: impl Into<String>,
        origin_ip: Option<IpAddr>,
    ) -> Result<ApprovalRequest, ApprovalServiceError> {
        let reviewer = reviewer.into();
        let mut request = self
            .approvals
            .find_by_id(&id)
            .await?
            .ok_or(ApprovalServiceError::NotFound(id))?;

        if let Err(e) = request.resolve(decision, reviewer.clone(), Utc::now()) {
            self.side_effects
                .record_audit(
                    AuditLog::new(
                        reviewer,
                        "approval.resolve",
                        audited_resource(request.kind),
                        AuditOutcome::Failure,
                        format!("retransition of {} rejected: {}", id, e),
                    )
                    .with_severity(AuditSeverity::Warning)
                    .with_origin(origin_ip),
                )
                .await;
            return Err(e.into());
        }

        self.approvals.save(request.clone()).await?;
        info!(approval_id = %id, decision = ?decision, reviewer = %reviewer, "approval resolved");

        self.side_effects
            .record_audit(
                AuditLog::new(
                    reviewer,
                    "approval.resolve",
                    audited_resource(request.kind),
                    AuditOutcome::Success,
                    format!("approval {} resolved as {:?}", id, request.status),
                )
                .with_origin(origin_ip),
            )
            .await;
        Ok(request)
    }
}
