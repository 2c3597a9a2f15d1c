use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// On-disk layout for pipguard state: per-action log, snapshot and rollback
/// files under `logs/`, configuration at the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardLayout {
    root: PathBuf,
}

impl GuardLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn log_path(&self, stamp: &str) -> PathBuf {
        self.logs_dir().join(format!("upgrade_{stamp}.log"))
    }

    pub fn snapshot_path(&self, stamp: &str) -> PathBuf {
        self.logs_dir().join(format!("requirements_{stamp}.txt"))
    }

    pub fn rollback_path(&self, stamp: &str) -> PathBuf {
        self.logs_dir().join(format!("rollback_{stamp}.sh"))
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.logs_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_root() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user root")?;
        return Ok(PathBuf::from(app_data).join("Pipguard"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user root")?;
    Ok(PathBuf::from(home).join(".pipguard"))
}
