// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # WARDEN Control Core
//!
//! Access control and policy enforcement for the WARDEN control plane:
//! credential verification, scoped authorization, rate limiting, the audit
//! trail, and the human approval workflow.
//!
//! # Architecture
//!
//! - **Layer:** Core System (privileged security domain)
//! - **Purpose:** The only tier allowed to read raw credentials and policies.
//!   The unprivileged application tier reaches this crate exclusively through
//!   the `warden-gateway` trust-boundary client.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
