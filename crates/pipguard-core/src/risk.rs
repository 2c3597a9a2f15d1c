use serde::Serialize;

use crate::name::PackageName;
use crate::record::PackageRecord;
use crate::version::PackageVersion;

/// Packages that package management itself depends on. Upgrading these
/// mid-batch can break the ability to install anything after them.
pub const CRITICAL_PACKAGES: &[&str] = &["pip", "setuptools", "wheel"];

/// Packages that must never be selected for upgrade at all.
pub const PROTECTED_PACKAGES: &[&str] = &["python", "distribute"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub name: PackageName,
    pub installed: String,
    pub candidate: String,
    pub tier: RiskTier,
    pub dependents_count: usize,
    pub rationale: String,
}

pub fn is_critical_package(name: &PackageName) -> bool {
    CRITICAL_PACKAGES
        .iter()
        .any(|critical| name.canonical() == *critical)
}

pub fn classify(record: &PackageRecord, dependents_count: usize) -> RiskAssessment {
    classify_with_critical(record, dependents_count, &[])
}

/// Pure tier assignment over already-scanned data. Precedence: critical
/// infrastructure, then unparseable versions, then major, minor, patch.
/// The rationale always names the rule that fired.
pub fn classify_with_critical(
    record: &PackageRecord,
    dependents_count: usize,
    extra_critical: &[PackageName],
) -> RiskAssessment {
    let (tier, rationale) = tier_for(record, dependents_count, extra_critical);
    RiskAssessment {
        name: record.name.clone(),
        installed: record.installed.clone(),
        candidate: record.latest.clone(),
        tier,
        dependents_count,
        rationale,
    }
}

fn tier_for(
    record: &PackageRecord,
    dependents_count: usize,
    extra_critical: &[PackageName],
) -> (RiskTier, String) {
    if is_critical_package(&record.name) || extra_critical.contains(&record.name) {
        return (
            RiskTier::Critical,
            format!("core packaging infrastructure: {}", record.name),
        );
    }

    let (installed, latest) = match (&record.installed_version, &record.latest_version) {
        (
            PackageVersion::Parsed {
                major: im,
                minor: ii,
                patch: ip,
            },
            PackageVersion::Parsed {
                major: lm,
                minor: li,
                patch: lp,
            },
        ) => ((*im, *ii, *ip), (*lm, *li, *lp)),
        _ => {
            return (
                RiskTier::High,
                format!(
                    "version not precisely parseable ({} -> {}); forced to high",
                    record.installed, record.latest
                ),
            );
        }
    };

    if latest.0 > installed.0 {
        return (
            RiskTier::High,
            format!(
                "major version change: {} -> {}",
                record.installed, record.latest
            ),
        );
    }
    if latest.0 < installed.0 {
        return (
            RiskTier::High,
            format!(
                "major version downgrade: {} -> {}",
                record.installed, record.latest
            ),
        );
    }
    if latest.1 != installed.1 {
        let direction = if latest.1 > installed.1 {
            "change"
        } else {
            "downgrade"
        };
        return (
            RiskTier::Medium,
            format!(
                "minor version {direction}: {} -> {} ({} dependent(s))",
                record.installed, record.latest, dependents_count
            ),
        );
    }
    if latest.2 != installed.2 {
        return (
            RiskTier::Low,
            format!(
                "patch-level change: {} -> {}",
                record.installed, record.latest
            ),
        );
    }

    // Same numeric version: typically a pre-release to release transition.
    (
        RiskTier::Low,
        format!(
            "no numeric version change: {} -> {}",
            record.installed, record.latest
        ),
    )
}
