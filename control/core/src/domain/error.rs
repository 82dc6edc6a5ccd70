// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Access Error Taxonomy
//!
//! Request-path failures of the access-control core. Each variant carries a
//! stable wire code so the gateway can round-trip errors across the trust
//! boundary. Absent, revoked, suspended, and expired credentials are
//! intentionally conflated into `KeyNotFound` to avoid leaking which check
//! failed. Denial by the authorization evaluator (`Forbidden`) is distinct
//! from authentication failure and does not invalidate the session.

use thiserror::Error;

/// The rate-limit window that rejected an admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateWindow {
    Minute,
    Hour,
    Day,
    Concurrent,
}

impl std::fmt::Display for RateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Concurrent => "concurrent",
        };
        write!(f, "{}", s)
    }
}

/// Errors surfaced by verification, authorization, and admission.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No bearer token was presented.
    #[error("no bearer token presented")]
    AuthMissing,

    /// The token matches no recognized credential prefix. Rejected before
    /// any store access.
    #[error("malformed API key")]
    KeyInvalidFormat,

    /// Absent, revoked, suspended, or expired — never distinguished.
    #[error("API key not found")]
    KeyNotFound,

    /// The privileged security domain cannot be reached.
    #[error("security service unavailable: {0}")]
    SecurityServiceUnavailable(String),

    /// Admission denied by rate limiting. Distinct from a permission denial
    /// so clients can tell "not allowed" from "allowed but throttled".
    #[error("rate limited: {window} window exhausted")]
    RateLimited { window: RateWindow },

    /// Authorization denied. Terminal for the action, not for the session.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unexpected internal failure. Surfaced as 5xx and audited at severity
    /// critical by the presentation layer.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AccessError {
    /// Stable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthMissing => "AUTH_MISSING",
            Self::KeyInvalidFormat => "KEY_INVALID_FORMAT",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::SecurityServiceUnavailable(_) => "SECURITY_SERVICE_UNAVAILABLE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Rebuild an error from a wire code received across the trust boundary.
    pub fn from_code(code: &str, detail: &str) -> Self {
        match code {
            "AUTH_MISSING" => Self::AuthMissing,
            "KEY_INVALID_FORMAT" => Self::KeyInvalidFormat,
            "KEY_NOT_FOUND" => Self::KeyNotFound,
            "SECURITY_SERVICE_UNAVAILABLE" => Self::SecurityServiceUnavailable(detail.to_string()),
            "RATE_LIMITED" => Self::RateLimited { window: RateWindow::Minute },
            "FORBIDDEN" => Self::Forbidden(detail.to_string()),
            other => Self::Internal(anyhow::anyhow!("{}: {}", other, detail)),
        }
    }

    /// Authentication failures are terminal for the request.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthMissing | Self::KeyInvalidFormat | Self::KeyNotFound | Self::SecurityServiceUnavailable(_)
        )
    }
}
