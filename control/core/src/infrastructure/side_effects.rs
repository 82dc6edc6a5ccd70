// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Side-Effect Queue - bounded background work off the request path
//
// Usage-counter touches and audit writes must not block or fail an
// otherwise-successful request. Both ride a bounded mpsc channel drained by
// a single worker task with at-least-once semantics: one retry, then the
// loss is logged.
//
// Audit enqueues are awaited (backpressure) because an action is not
// complete until its audit record is durably queued. Usage touches use
// try_send and may be dropped under load.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::audit::AuditLog;
use crate::domain::credential::KeyId;
use crate::domain::repository::{AuditRepository, CredentialRepository};

#[derive(Debug, Clone)]
pub enum SideEffect {
    TouchKeyUsage { key_id: KeyId, at: DateTime<Utc> },
    RecordAudit(AuditLog),
}

/// Cheap cloneable handle for enqueueing side effects.
#[derive(Clone)]
pub struct SideEffects {
    tx: mpsc::Sender<SideEffect>,
}

impl SideEffects {
    /// Enqueue a usage touch without waiting. Returns false when the queue
    /// is full and the touch was dropped.
    pub fn try_touch_usage(&self, key_id: KeyId, at: DateTime<Utc>) -> bool {
        self.tx
            .try_send(SideEffect::TouchKeyUsage { key_id, at })
            .is_ok()
    }

    /// Enqueue an audit record, waiting for queue capacity. The triggering
    /// action is not complete until this returns.
    pub async fn record_audit(&self, entry: AuditLog) {
        if let Err(e) = self.tx.send(SideEffect::RecordAudit(entry)).await {
            // Worker gone; the record is lost. Log the full payload so the
            // trail survives in the structured log.
            error!(effect = ?e.0, "audit record lost: side-effect worker unavailable");
        }
    }
}

pub struct SideEffectQueue;

impl SideEffectQueue {
    /// Spawn the worker task draining side effects into the stores.
    pub fn spawn(
        credentials: Arc<dyn CredentialRepository>,
        audits: Arc<dyn AuditRepository>,
        capacity: usize,
    ) -> (SideEffects, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<SideEffect>(capacity);
        let handle = tokio::spawn(async move {
            while let Some(effect) = rx.recv().await {
                Self::apply(&credentials, &audits, effect).await;
            }
            debug!("side-effect queue closed, worker exiting");
        });
        (SideEffects { tx }, handle)
    }

    async fn apply(
        credentials: &Arc<dyn CredentialRepository>,
        audits: &Arc<dyn AuditRepository>,
        effect: SideEffect,
    ) {
        // At-least-once: one retry, then the failure is logged for
        // operational visibility but never propagated to a request.
        match effect {
            SideEffect::TouchKeyUsage { key_id, at } => {
                for attempt in 0..2 {
                    match credentials.touch_usage(&key_id, at).await {
                        Ok(()) => return,
                        Err(e) if attempt == 0 => {
                            warn!(key_id = %key_id, error = %e, "usage touch failed, retrying");
                        }
                        Err(e) => {
                            error!(key_id = %key_id, error = %e, "usage touch failed after retry");
                        }
                    }
                }
            }
            SideEffect::RecordAudit(entry) => {
                for attempt in 0..2 {
                    match audits.append(entry.clone()).await {
                        Ok(()) => return,
                        Err(e) if attempt == 0 => {
                            warn!(audit_id = ?entry.id, error = %e, "audit append failed, retrying");
                        }
                        Err(e) => {
                            error!(entry = ?entry, error = %e, "audit record lost after retry");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::{AuditOutcome, AuditSeverity};
    use crate::domain::credential::{ApiKey, KeyScope};
    use crate::domain::policy::ResourceType;
    use crate::infrastructure::repositories::memory::{InMemoryAuditRepository, InMemoryCredentialRepository};
    use std::time::Duration;

    #[tokio::test]
    async fn test_audit_record_reaches_store() {
        let credentials = Arc::new(InMemoryCredentialRepository::new());
        let audits = Arc::new(InMemoryAuditRepository::new());
        let (effects, _worker) = SideEffectQueue::spawn(credentials, audits.clone(), 16);

        let entry = AuditLog::new("alice", "auth.login", ResourceType::User, AuditOutcome::Success, "login")
            .with_severity(AuditSeverity::Info);
        effects.record_audit(entry.clone()).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let recent = audits.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action, "auth.login");
    }

    #[tokio::test]
    async fn test_usage_touch_applied_asynchronously() {
        let credentials = Arc::new(InMemoryCredentialRepository::new());
        let audits = Arc::new(InMemoryAuditRepository::new());
        let key = ApiKey::provision(KeyScope::User, "alice", None);
        let id = key.id;
        credentials.save(key).await.unwrap();

        let (effects, _worker) = SideEffectQueue::spawn(credentials.clone(), audits, 16);
        assert!(effects.try_touch_usage(id, Utc::now()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stored = credentials.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.usage.total_requests, 1);
    }

    #[tokio::test]
    async fn test_touch_for_unknown_key_is_logged_not_fatal() {
        let credentials = Arc::new(InMemoryCredentialRepository::new());
        let audits = Arc::new(InMemoryAuditRepository::new());
        let (effects, _worker) = SideEffectQueue::spawn(credentials, audits.clone(), 16);

        // Unknown key: the worker logs and keeps draining
        assert!(effects.try_touch_usage(KeyId::new(), Utc::now()));
        let entry = AuditLog::new("alice", "auth.logout", ResourceType::User, AuditOutcome::Success, "bye");
        effects.record_audit(entry).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(audits.list_recent(10).await.unwrap().len(), 1);
    }
}
