// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Request Context
//!
//! Explicit per-request state threaded through the call chain — never
//! ambient or global. Memoizes the resolved identity so multiple
//! authorization checks within one inbound request invoke the verifier at
//! most once; the context is dropped with the request, so the identity
//! never outlives it or leaks to another caller.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use warden_control_core::domain::identity::AuthenticatedIdentity;

pub struct RequestContext {
    identity: OnceCell<AuthenticatedIdentity>,
    pub origin_ip: Option<IpAddr>,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            identity: OnceCell::new(),
            origin_ip: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_origin(ip: IpAddr) -> Self {
        Self {
            origin_ip: Some(ip),
            ..Self::new()
        }
    }

    /// The memoized identity, if this request already authenticated.
    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.identity.get()
    }

    pub(crate) fn identity_cell(&self) -> &OnceCell<AuthenticatedIdentity> {
        &self.identity
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
