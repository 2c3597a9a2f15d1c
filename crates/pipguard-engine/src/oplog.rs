use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::Local;

/// Append-only audit trail, independent of terminal output. The writer is
/// serialized behind a mutex so concurrent verification tasks keep entry
/// ordering intact, and every record is flushed before the call returns.
#[derive(Debug)]
pub struct OperationLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl OperationLog {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open operation log: {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, message: &str) -> Result<()> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("operation log writer poisoned"))?;
        writeln!(file, "[{stamp}] {message}")
            .with_context(|| format!("failed to append operation log: {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush operation log: {}", self.path.display()))
    }
}
