mod name;
mod record;
mod risk;
mod version;

pub use name::PackageName;
pub use record::{PackageOrigin, PackageRecord};
pub use risk::{classify, classify_with_critical, is_critical_package, RiskAssessment, RiskTier};
pub use risk::{CRITICAL_PACKAGES, PROTECTED_PACKAGES};
pub use version::PackageVersion;
