// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Safety Policy Aggregate
//!
//! A [`SafetyPolicy`] bundles a resource permission matrix, rate-limit
//! declarations, and request restrictions. Policies are bound to credential
//! scopes; the authorization evaluator ORs the grants of every bound,
//! enabled policy (most-permissive-wins), with restrictions narrowing an
//! otherwise-granting policy.
//!
//! ## Permission Model
//!
//! There is exactly one permission representation: the resource matrix. A
//! coarse "allow everything" permission is expressed as
//! [`PermissionMatrix::admin_wildcard`] — `Admin` level with `wildcard` on
//! every resource — not a separate code path.
//!
//! ## Invariants
//!
//! - [`PermissionLevel`] forms a strict total order
//!   `None < Read < Execute < Write < Admin`; a higher level implies every
//!   capability of the lower ones for the same resource.
//! - When `wildcard` is true the `resource_id` filter is ignored entirely.
//! - A resource absent from the matrix is equivalent to level `None` for
//!   that resource — implicitly non-granting, never an error.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCategory {
    Safety,
    Performance,
    Ethics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySeverity {
    Low,
    Medium,
    High,
}

/// Category of protected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    Operator,
    Slot,
    Network,
    Key,
    Policy,
    User,
    Audit,
    System,
}

impl ResourceType {
    /// Every resource type, in matrix display order.
    pub const ALL: [ResourceType; 8] = [
        Self::Operator,
        Self::Slot,
        Self::Network,
        Self::Key,
        Self::Policy,
        Self::User,
        Self::Audit,
        Self::System,
    ];
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Operator => "OPERATOR",
            Self::Slot => "SLOT",
            Self::Network => "NETWORK",
            Self::Key => "KEY",
            Self::Policy => "POLICY",
            Self::User => "USER",
            Self::Audit => "AUDIT",
            Self::System => "SYSTEM",
        };
        write!(f, "{}", s)
    }
}

/// Graded capability on a resource type.
///
/// Derived `Ord` gives the strict total order
/// `None < Read < Execute < Write < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    None,
    Read,
    Execute,
    Write,
    Admin,
}

impl PermissionLevel {
    /// Whether this level implies `required` (higher implies lower).
    pub fn satisfies(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Execute => "execute",
            Self::Write => "write",
            Self::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

/// One matrix entry: the level granted on a resource type, either for every
/// instance (`wildcard`) or for a single `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub level: PermissionLevel,

    /// When true the `resource_id` filter is ignored entirely.
    pub wildcard: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl PermissionGrant {
    pub fn none() -> Self {
        Self {
            level: PermissionLevel::None,
            wildcard: false,
            resource_id: None,
        }
    }

    pub fn wildcard(level: PermissionLevel) -> Self {
        Self {
            level,
            wildcard: true,
            resource_id: None,
        }
    }

    pub fn instance(level: PermissionLevel, resource_id: impl Into<String>) -> Self {
        Self {
            level,
            wildcard: false,
            resource_id: Some(resource_id.into()),
        }
    }

    /// Whether this grant covers the requested instance. Wildcard dominates;
    /// a request without a specific instance is covered by any grant.
    pub fn covers_instance(&self, requested: Option<&str>) -> bool {
        if self.wildcard {
            return true;
        }
        match requested {
            None => true,
            Some(id) => self.resource_id.as_deref() == Some(id),
        }
    }

    /// Whether this grant satisfies `required` on the requested instance.
    pub fn permits(&self, required: PermissionLevel, requested: Option<&str>) -> bool {
        self.level.satisfies(required) && self.covers_instance(requested)
    }
}

/// Resource-type → grant matrix. The single permission representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionMatrix(HashMap<ResourceType, PermissionGrant>);

impl PermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coarse full-access permission: `Admin` + wildcard on every resource.
    pub fn admin_wildcard() -> Self {
        let mut matrix = HashMap::new();
        for resource in ResourceType::ALL {
            matrix.insert(resource, PermissionGrant::wildcard(PermissionLevel::Admin));
        }
        Self(matrix)
    }

    pub fn with_grant(mut self, resource: ResourceType, grant: PermissionGrant) -> Self {
        self.0.insert(resource, grant);
        self
    }

    /// The grant declared for `resource`, or the implicit `None`-level grant
    /// when the matrix declares nothing for it.
    pub fn grant_for(&self, resource: ResourceType) -> PermissionGrant {
        self.0.get(&resource).cloned().unwrap_or_else(PermissionGrant::none)
    }

    /// Human-readable `RESOURCE:level` entries, sorted, for login responses.
    pub fn describe(&self) -> Vec<String> {
        let mut entries: Vec<String> = self
            .0
            .iter()
            .filter(|(_, g)| g.level != PermissionLevel::None)
            .map(|(r, g)| {
                if g.wildcard {
                    format!("{}:{}:*", r, g.level)
                } else {
                    format!("{}:{}", r, g.level)
                }
            })
            .collect();
        entries.sort();
        entries
    }
}

/// Rate limits a policy declares on top of the per-key limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRateLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<u32>,
}

/// Daily time-of-day window in UTC hours. `start_hour == end_hour` means the
/// full day; a window may wrap midnight (e.g. 22 → 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl TimeWindow {
    pub fn contains(&self, hour: u8) -> bool {
        if self.start_hour == self.end_hour {
            return true;
        }
        if self.start_hour < self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Request restrictions that narrow an otherwise-granting policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRestrictions {
    /// When non-empty, the caller IP must appear here.
    #[serde(default)]
    pub ip_allowlist: Vec<IpAddr>,

    /// A caller IP appearing here is always blocked.
    #[serde(default)]
    pub ip_denylist: Vec<IpAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,

    /// When non-empty, requests are only permitted on these weekdays (UTC).
    #[serde(default)]
    pub allowed_weekdays: Vec<Weekday>,

    /// Denies the request unless the session completed a second factor.
    /// Evaluated against the identity by the authorization evaluator.
    #[serde(default)]
    pub require_mfa: bool,
}

impl PolicyRestrictions {
    /// Whether the time- and network-based restrictions permit a request at
    /// `now` from `ip`. An unknown caller IP fails a non-empty allowlist
    /// (deny on ambiguity) but cannot match the denylist.
    pub fn permits(&self, now: DateTime<Utc>, ip: Option<IpAddr>) -> bool {
        if !self.allowed_weekdays.is_empty() && !self.allowed_weekdays.contains(&now.weekday()) {
            return false;
        }
        if let Some(window) = &self.time_window {
            if !window.contains(now.hour() as u8) {
                return false;
            }
        }
        match ip {
            Some(ip) => {
                if self.ip_denylist.contains(&ip) {
                    return false;
                }
                if !self.ip_allowlist.is_empty() && !self.ip_allowlist.contains(&ip) {
                    return false;
                }
            }
            None => {
                if !self.ip_allowlist.is_empty() {
                    return false;
                }
            }
        }
        true
    }
}

/// A named bundle of resource permissions, rate limits, and restrictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    pub id: PolicyId,
    pub name: String,
    pub category: PolicyCategory,
    pub enabled: bool,
    pub severity: PolicySeverity,
    pub permissions: PermissionMatrix,
    pub rate_limits: PolicyRateLimits,
    pub restrictions: PolicyRestrictions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SafetyPolicy {
    pub fn new(name: impl Into<String>, category: PolicyCategory, severity: PolicySeverity) -> Self {
        let now = Utc::now();
        Self {
            id: PolicyId::new(),
            name: name.into(),
            category,
            enabled: true,
            severity,
            permissions: PermissionMatrix::new(),
            rate_limits: PolicyRateLimits::default(),
            restrictions: PolicyRestrictions::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionMatrix) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_restrictions(mut self, restrictions: PolicyRestrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn with_rate_limits(mut self, rate_limits: PolicyRateLimits) -> Self {
        self.rate_limits = rate_limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_total_order() {
        use PermissionLevel::*;
        assert!(None < Read);
        assert!(Read < Execute);
        assert!(Execute < Write);
        assert!(Write < Admin);
    }

    #[test]
    fn test_higher_level_satisfies_lower() {
        use PermissionLevel::*;
        for required in [Read, Execute, Write] {
            assert!(Admin.satisfies(required));
        }
        assert!(!Read.satisfies(Write));
        assert!(Read.satisfies(None));
    }

    #[test]
    fn test_wildcard_dominates_instance_filter() {
        // wildcard=true with an empty resource_id must still grant
        // regardless of the requested instance
        let grant = PermissionGrant {
            level: PermissionLevel::Read,
            wildcard: true,
            resource_id: Some(String::new()),
        };
        assert!(grant.permits(PermissionLevel::Read, Some("net-42")));
        assert!(grant.permits(PermissionLevel::Read, None));
    }

    #[test]
    fn test_instance_grant_matches_only_its_resource() {
        let grant = PermissionGrant::instance(PermissionLevel::Write, "slot-7");
        assert!(grant.permits(PermissionLevel::Write, Some("slot-7")));
        assert!(!grant.permits(PermissionLevel::Write, Some("slot-8")));
        // A request without a specific instance is covered
        assert!(grant.permits(PermissionLevel::Write, None));
    }

    #[test]
    fn test_empty_matrix_is_implicit_none() {
        let matrix = PermissionMatrix::new();
        let grant = matrix.grant_for(ResourceType::Network);
        assert_eq!(grant.level, PermissionLevel::None);
        assert!(!grant.permits(PermissionLevel::Read, None));
    }

    #[test]
    fn test_admin_wildcard_covers_every_resource() {
        let matrix = PermissionMatrix::admin_wildcard();
        for resource in ResourceType::ALL {
            assert!(matrix.grant_for(resource).permits(PermissionLevel::Admin, Some("anything")));
        }
    }

    #[test]
    fn test_time_window_wraps_midnight() {
        let night = TimeWindow { start_hour: 22, end_hour: 6 };
        assert!(night.contains(23));
        assert!(night.contains(2));
        assert!(!night.contains(12));

        let day = TimeWindow { start_hour: 9, end_hour: 17 };
        assert!(day.contains(9));
        assert!(!day.contains(17));
    }

    #[test]
    fn test_restrictions_weekday_and_ip() {
        use std::net::Ipv4Addr;
        let now = Utc::now();
        let here = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let elsewhere = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

        let restrictions = PolicyRestrictions {
            ip_allowlist: vec![here],
            ..Default::default()
        };
        assert!(restrictions.permits(now, Some(here)));
        assert!(!restrictions.permits(now, Some(elsewhere)));
        // unknown caller IP fails a non-empty allowlist
        assert!(!restrictions.permits(now, None));

        let denied = PolicyRestrictions {
            ip_denylist: vec![here],
            ..Default::default()
        };
        assert!(!denied.permits(now, Some(here)));
        assert!(denied.permits(now, None));

        let weekday_only = PolicyRestrictions {
            allowed_weekdays: vec![now.weekday()],
            ..Default::default()
        };
        assert!(weekday_only.permits(now, None));
        let other_day = PolicyRestrictions {
            allowed_weekdays: vec![now.weekday().succ()],
            ..Default::default()
        };
        assert!(!other_day.permits(now, None));
    }

    #[test]
    fn test_describe_sorts_and_marks_wildcards() {
        let matrix = PermissionMatrix::new()
            .with_grant(ResourceType::Network, PermissionGrant::wildcard(PermissionLevel::Read))
            .with_grant(ResourceType::Audit, PermissionGrant::instance(PermissionLevel::Read, "a-1"));
        assert_eq!(matrix.describe(), vec!["AUDIT:read", "NETWORK:read:*"]);
    }
}
