use std::fs;
use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pipguard_core::PackageName;

use crate::layout::GuardLayout;

/// Optional `config.toml` at the pipguard root. A missing file means
/// defaults; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub command_timeout_secs: u64,
    pub verify_timeout_secs: u64,
    pub python: Option<String>,
    pub extra_critical_packages: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 300,
            verify_timeout_secs: 60,
            python: None,
            extra_critical_packages: Vec::new(),
        }
    }
}

impl GuardConfig {
    pub fn load(layout: &GuardLayout) -> Result<Self> {
        let path = layout.config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config: {}", path.display()));
            }
        };
        toml::from_str(&raw).with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    /// Configured names that should classify as critical in addition to the
    /// built-in set. Invalid names are dropped rather than aborting the run.
    pub fn extra_critical(&self) -> Vec<PackageName> {
        self.extra_critical_packages
            .iter()
            .filter_map(|raw| PackageName::parse(raw).ok())
            .collect()
    }
}
