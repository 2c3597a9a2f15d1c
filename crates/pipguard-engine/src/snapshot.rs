use std::fs;
use std::path::PathBuf;

use chrono::Local;

use pipguard_core::PackageName;
use pipguard_inventory::{is_safe_version_token, FrozenPackage};

use crate::error::EngineError;
use crate::layout::GuardLayout;

/// The entire installed set at capture time, in capture order. Immutable
/// once written; exactly one rollback procedure derives from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub stamp: String,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub name: PackageName,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackProcedure {
    pub snapshot_stamp: String,
    pub python: String,
    pub steps: Vec<ReinstallStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReinstallStep {
    pub name: PackageName,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSnapshot {
    pub snapshot_path: PathBuf,
    pub rollback_path: PathBuf,
}

pub fn current_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Records every installed package, not only the upgrade selection: a
/// rollback must restore the whole pre-upgrade state.
pub fn capture(frozen: &[FrozenPackage], stamp: impl Into<String>) -> Snapshot {
    Snapshot {
        stamp: stamp.into(),
        entries: frozen
            .iter()
            .map(|package| SnapshotEntry {
                name: package.name.clone(),
                version: package.version.clone(),
            })
            .collect(),
    }
}

/// Deterministic and order-preserving: deriving twice from the same
/// snapshot renders byte-identical procedures.
pub fn derive_rollback(snapshot: &Snapshot, python: &str) -> RollbackProcedure {
    RollbackProcedure {
        snapshot_stamp: snapshot.stamp.clone(),
        python: python.to_string(),
        steps: snapshot
            .entries
            .iter()
            .map(|entry| ReinstallStep {
                name: entry.name.clone(),
                version: entry.version.clone(),
            })
            .collect(),
    }
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for entry in &snapshot.entries {
        out.push_str(entry.name.as_str());
        out.push_str("==");
        out.push_str(&entry.version);
        out.push('\n');
    }
    out
}

pub fn render_rollback_script(procedure: &RollbackProcedure) -> String {
    let mut out = String::new();
    out.push_str("#!/bin/sh\n");
    out.push_str(&format!(
        "# pipguard rollback for snapshot {}\n",
        procedure.snapshot_stamp
    ));
    out.push_str("set -u\n");
    out.push_str(&format!(
        "echo 'Restoring snapshot {}'\n",
        procedure.snapshot_stamp
    ));
    let python = escape_single_quote_shell(&procedure.python);
    for step in &procedure.steps {
        out.push_str(&format!(
            "'{}' -m pip install '{}=={}'\n",
            python,
            step.name.as_str(),
            step.version
        ));
    }
    out.push_str("echo 'Rollback complete'\n");
    out
}

/// Durably writes the snapshot and its rollback script. The artifacts list
/// the full installed inventory, so both are restricted to the owner. Any
/// failure here is fatal for the session: without a persisted snapshot
/// there is no rollback, so no upgrade may proceed.
pub fn persist(
    layout: &GuardLayout,
    snapshot: &Snapshot,
    rollback: &RollbackProcedure,
) -> Result<PersistedSnapshot, EngineError> {
    // Every pin is embedded in a quoted shell line; nothing outside the
    // safe token alphabet may reach the rendered artifacts.
    for entry in &snapshot.entries {
        if !is_safe_version_token(&entry.version) {
            return Err(EngineError::SnapshotWriteFailed(format!(
                "unsafe version token for {}: {}",
                entry.name, entry.version
            )));
        }
    }
    for step in &rollback.steps {
        if !is_safe_version_token(&step.version) {
            return Err(EngineError::SnapshotWriteFailed(format!(
                "unsafe version token for {}: {}",
                step.name, step.version
            )));
        }
    }

    layout
        .ensure_base_dirs()
        .map_err(|err| EngineError::SnapshotWriteFailed(err.to_string()))?;

    let snapshot_path = layout.snapshot_path(&snapshot.stamp);
    write_owner_only(&snapshot_path, &render_snapshot(snapshot), 0o600)?;

    let rollback_path = layout.rollback_path(&rollback.snapshot_stamp);
    write_owner_only(&rollback_path, &render_rollback_script(rollback), 0o700)?;

    Ok(PersistedSnapshot {
        snapshot_path,
        rollback_path,
    })
}

fn escape_single_quote_shell(value: &str) -> String {
    value.replace('\'', "'\"'\"'")
}

fn write_owner_only(
    path: &std::path::Path,
    content: &str,
    mode: u32,
) -> Result<(), EngineError> {
    fs::write(path, content).map_err(|err| {
        EngineError::SnapshotWriteFailed(format!("{}: {err}", path.display()))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|err| {
            EngineError::SnapshotWriteFailed(format!("{}: {err}", path.display()))
        })?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
