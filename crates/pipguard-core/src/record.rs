use crate::name::PackageName;
use crate::version::PackageVersion;

/// Who put the package into the environment, as pip reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOrigin {
    Pip,
    Foreign,
}

impl PackageOrigin {
    pub fn from_installer(installer: Option<&str>) -> Self {
        match installer {
            None | Some("") | Some("pip") => Self::Pip,
            Some(_) => Self::Foreign,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pip => "pip",
            Self::Foreign => "foreign",
        }
    }
}

/// One outdated package as reported by a scan. The exact version strings are
/// kept untouched for snapshots and pin arguments; the parsed forms drive
/// classification only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: PackageName,
    pub installed: String,
    pub latest: String,
    pub installed_version: PackageVersion,
    pub latest_version: PackageVersion,
    pub origin: PackageOrigin,
}

impl PackageRecord {
    pub fn new(name: PackageName, installed: &str, latest: &str, origin: PackageOrigin) -> Self {
        Self {
            name,
            installed: installed.to_string(),
            latest: latest.to_string(),
            installed_version: PackageVersion::parse(installed),
            latest_version: PackageVersion::parse(latest),
            origin,
        }
    }

    /// True when either side of the upgrade failed precise parsing.
    pub fn degraded_comparison(&self) -> bool {
        !self.installed_version.is_parsed() || !self.latest_version.is_parsed()
    }
}
