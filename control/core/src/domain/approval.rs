// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Approval Request Aggregate
//!
//! Deferred human authorization for irreversible actions. A request is
//! created `Pending` and transitions exactly once to `Approved` or
//! `Rejected`; both are terminal.
//!
//! ## Invariants
//!
//! - `Pending` is the only non-terminal state. [`ApprovalRequest::resolve`]
//!   rejects any transition out of a terminal state and preserves the
//!   original resolution.
//! - Resolution stamps reviewer identity and timestamp.
//! - Approving never executes the payload — execution remains the
//!   unprivileged tier's responsibility, with the approval serving as an
//!   authorization precondition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub Uuid);

impl ApprovalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApprovalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    OperatorRegistration,
    PolicyChange,
    KeyProvision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Reviewer verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// The request already left `Pending`; the original terminal state is
    /// preserved.
    #[error("approval {id} already resolved as {status:?}")]
    AlreadyResolved { id: ApprovalId, status: ApprovalStatus },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    pub kind: ApprovalKind,
    pub status: ApprovalStatus,

    /// Opaque action parameters, carried but never executed here.
    pub payload: serde_json::Value,

    pub requested_by: String,
    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    pub fn new(kind: ApprovalKind, payload: serde_json::Value, requested_by: impl Into<String>) -> Self {
        Self {
            id: ApprovalId::new(),
            kind,
            status: ApprovalStatus::Pending,
            payload,
            requested_by: requested_by.into(),
            created_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ApprovalStatus::Pending
    }

    /// Apply a reviewer verdict. Stamps reviewer and timestamp; errors if
    /// the request already reached a terminal state.
    pub fn resolve(
        &mut self,
        decision: ApprovalDecision,
        reviewer: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), ApprovalError> {
        if self.is_terminal() {
            return Err(ApprovalError::AlreadyResolved {
                id: self.id,
                status: self.status,
            });
        }
        self.status = match decision {
            ApprovalDecision::Approve => ApprovalStatus::Approved,
            ApprovalDecision::Reject => ApprovalStatus::Rejected,
        };
        self.reviewed_by = Some(reviewer.into());
        self.reviewed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolution_stamps_reviewer() {
        let mut request = ApprovalRequest::new(ApprovalKind::KeyProvision, json!({"scope": "user"}), "alice");
        assert_eq!(request.status, ApprovalStatus::Pending);

        let at = Utc::now();
        request.resolve(ApprovalDecision::Approve, "bob", at).unwrap();
        assert_eq!(request.status, ApprovalStatus::Approved);
        assert_eq!(request.reviewed_by.as_deref(), Some("bob"));
        assert_eq!(request.reviewed_at, Some(at));
    }

    #[test]
    fn test_terminal_state_is_monotonic() {
        let mut request = ApprovalRequest::new(ApprovalKind::PolicyChange, json!({}), "alice");
        request.resolve(ApprovalDecision::Approve, "bob", Utc::now()).unwrap();

        // Second transition attempt is rejected, original state preserved
        let err = request.resolve(ApprovalDecision::Reject, "mallory", Utc::now()).unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyResolved { status: ApprovalStatus::Approved, .. }));
        assert_eq!(request.status, ApprovalStatus::Approved);
        assert_eq!(request.reviewed_by.as_deref(), Some("bob"));
    }

    #[test]
    fn test_reject_is_also_terminal() {
        let mut request = ApprovalRequest::new(ApprovalKind::OperatorRegistration, json!({}), "alice");
        request.resolve(ApprovalDecision::Reject, "bob", Utc::now()).unwrap();
        assert!(request.resolve(ApprovalDecision::Approve, "bob", Utc::now()).is_err());
        assert_eq!(request.status, ApprovalStatus::Rejected);
    }
}
