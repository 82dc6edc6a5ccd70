// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # WARDEN Gateway
//!
//! The unprivileged application tier's proxy to the credential verifier.
//! This crate never holds raw credential records: it forwards the caller's
//! bearer token across the trust boundary, authenticated with a long-lived
//! service secret that identifies the calling service, not the end user.
//!
//! Two transports are supported: a direct in-process service call
//! (preferred) and a network call to a configured URL (fallback). With
//! neither configured the gateway fails closed — every request is rejected
//! rather than verification being skipped.

pub mod context;
pub mod gateway;
pub mod transport;

pub use context::RequestContext;
pub use gateway::{Gateway, GatewayConfig};
pub use transport::{HttpVerifier, VerifyTransport};
