use anyhow::{bail, Context, Result};
use serde::Deserialize;

use pipguard_core::{PackageName, PackageOrigin, PackageRecord, PROTECTED_PACKAGES};

use crate::pip::{is_safe_version_token, PipClient};
use crate::runner::CommandRunner;

#[derive(Debug, Deserialize)]
struct OutdatedEntry {
    name: String,
    version: String,
    latest_version: String,
    #[serde(default)]
    installer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPackage {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReport {
    pub records: Vec<PackageRecord>,
    pub skipped: Vec<SkippedPackage>,
}

/// Queries the outdated set. Read-only; entries that cannot be represented
/// safely are reported as skipped instead of silently dropped.
pub fn scan<R: CommandRunner>(pip: &PipClient<R>) -> Result<ScanReport> {
    let output = pip
        .list_outdated()
        .context("outdated package query failed")?;
    if !output.success() {
        bail!("pip list --outdated failed: {}", output.stderr);
    }
    parse_outdated_json(&output.stdout)
}

pub fn parse_outdated_json(raw: &str) -> Result<ScanReport> {
    let entries: Vec<OutdatedEntry> =
        serde_json::from_str(raw).context("failed to parse pip list --outdated output")?;

    let mut report = ScanReport::default();
    for entry in entries {
        let name = match PackageName::parse(&entry.name) {
            Ok(name) => name,
            Err(err) => {
                report.skipped.push(SkippedPackage {
                    name: entry.name,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        if PROTECTED_PACKAGES
            .iter()
            .any(|protected| name.canonical() == *protected)
        {
            report.skipped.push(SkippedPackage {
                name: entry.name,
                reason: "protected package, never upgraded".to_string(),
            });
            continue;
        }
        if entry.version.trim().is_empty() || entry.latest_version.trim().is_empty() {
            report.skipped.push(SkippedPackage {
                name: entry.name,
                reason: "missing version information".to_string(),
            });
            continue;
        }

        report.records.push(PackageRecord::new(
            name,
            entry.version.trim(),
            entry.latest_version.trim(),
            PackageOrigin::from_installer(entry.installer.as_deref()),
        ));
    }

    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenPackage {
    pub name: PackageName,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FreezeReport {
    pub packages: Vec<FrozenPackage>,
    pub skipped: Vec<SkippedPackage>,
}

/// Captures the entire installed set with exact versions, the raw material
/// for a snapshot. A rollback must be able to restore everything, not just
/// the packages selected for upgrade.
pub fn freeze<R: CommandRunner>(pip: &PipClient<R>) -> Result<FreezeReport> {
    let output = pip.freeze().context("installed package query failed")?;
    if !output.success() {
        bail!("pip freeze failed: {}", output.stderr);
    }
    Ok(parse_freeze_output(&output.stdout))
}

pub fn parse_freeze_output(raw: &str) -> FreezeReport {
    let mut report = FreezeReport::default();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name_part, version_part)) = line.split_once("==") else {
            // Editable installs and direct-URL requirements cannot be
            // restored from a version pin.
            report.skipped.push(SkippedPackage {
                name: line.to_string(),
                reason: "not an exact version pin".to_string(),
            });
            continue;
        };
        let name = match PackageName::parse(name_part.trim()) {
            Ok(name) => name,
            Err(err) => {
                report.skipped.push(SkippedPackage {
                    name: line.to_string(),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let version = version_part.trim();
        if version.is_empty() {
            report.skipped.push(SkippedPackage {
                name: line.to_string(),
                reason: "empty version pin".to_string(),
            });
            continue;
        }
        // A package controls its own Version metadata, and these pins end
        // up inside the quoted lines of the rollback shell script.
        if !is_safe_version_token(version) {
            report.skipped.push(SkippedPackage {
                name: line.to_string(),
                reason: "version contains unsafe characters".to_string(),
            });
            continue;
        }
        report.packages.push(FrozenPackage {
            name,
            version: version.to_string(),
        });
    }
    report
}
