// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Control Plane Configuration
//!
//! YAML manifest for the access-control core, discovered via
//! `WARDEN_CONFIG_PATH` or `./warden-config.yaml` with env-var overrides for
//! the two secrets. Holds the out-of-band root token, the trust-boundary
//! service secret, the fallback verifier URL, and the runtime environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Runtime environment. Plaintext HTTP is rejected before any auth logic
/// runs outside `Local`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default)]
    pub environment: Environment,

    /// Distinguished root token, configured out-of-band. Resolves to a
    /// synthetic Master identity with no store lookup so the system is
    /// bootstrappable before any credential exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_token: Option<String>,

    /// Long-lived secret identifying the calling service on internal
    /// trust-boundary calls. Without it the internal verify endpoint is
    /// closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_secret: Option<String>,

    /// Network fallback for the trust-boundary call when the direct
    /// in-process channel is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_url: Option<String>,

    /// Bound on the internal trust-boundary call before it maps to
    /// `SECURITY_SERVICE_UNAVAILABLE`.
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,

    /// Capacity of the bounded side-effect queue (usage touches + audit
    /// writes).
    #[serde(default = "default_side_effect_capacity")]
    pub side_effect_queue_capacity: usize,
}

fn default_verify_timeout_ms() -> u64 {
    3_000
}

fn default_side_effect_capacity() -> usize {
    1_024
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            root_token: None,
            service_secret: None,
            verifier_url: None,
            verify_timeout_ms: default_verify_timeout_ms(),
            side_effect_queue_capacity: default_side_effect_capacity(),
        }
    }
}

impl ControlConfig {
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(yaml)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Configuration discovery: `WARDEN_CONFIG_PATH`, then
    /// `./warden-config.yaml`.
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("WARDEN_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from("./warden-config.yaml");
        if local.exists() {
            return Some(local);
        }
        None
    }

    /// Load with discovery, falling back to defaults, then apply env-var
    /// overrides for the secrets.
    pub async fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path.or_else(Self::discover_config) {
            tracing::info!(path = %path.display(), "loading control plane configuration");
            Self::load(&path).await?
        } else {
            Self::default()
        };
        if let Ok(token) = std::env::var("WARDEN_ROOT_TOKEN") {
            config.root_token = Some(token);
        }
        if let Ok(secret) = std::env::var("WARDEN_SERVICE_SECRET") {
            config.service_secret = Some(secret);
        }
        Ok(config)
    }

    pub fn verify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.verify_timeout_ms)
    }
}
