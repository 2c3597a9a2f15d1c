use std::fmt;

/// A pip-reported version reduced to the three numeric components the risk
/// rules reason about. Anything that does not yield at least one leading
/// numeric component is kept verbatim as `Unparseable` so classification can
/// fail toward caution instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageVersion {
    Parsed { major: u64, minor: u64, patch: u64 },
    Unparseable(String),
}

impl PackageVersion {
    /// Accepts the PEP 440 shapes pip actually emits: an optional epoch
    /// prefix (`1:2.0.0` or `1!2.0.0`), a local-version suffix (`1.2.3+local`),
    /// pre/post/dev suffixes (`2.0.0a1`, `1.2.3.post1`) and short forms
    /// (`1.2` reads as 1.2.0).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Unparseable(raw.to_string());
        }

        let without_epoch = match trimmed.split_once([':', '!']) {
            Some((_, rest)) => rest,
            None => trimmed,
        };
        let without_local = match without_epoch.split_once('+') {
            Some((numeric, _)) => numeric,
            None => without_epoch,
        };
        // Pre-release and dev/post suffixes start at the first alphabetic
        // character: "2.0.0a1" -> "2.0.0", "1.2.3.post1" -> "1.2.3.".
        let numeric_end = without_local
            .find(|ch: char| ch.is_ascii_alphabetic())
            .unwrap_or(without_local.len());
        let numeric = without_local[..numeric_end].trim_end_matches('.');

        let mut components = [0u64; 3];
        let mut seen = 0usize;
        for part in numeric.split('.').take(3) {
            match part.parse::<u64>() {
                Ok(value) => {
                    components[seen] = value;
                    seen += 1;
                }
                Err(_) => return Self::Unparseable(raw.to_string()),
            }
        }
        if seen == 0 {
            return Self::Unparseable(raw.to_string());
        }

        Self::Parsed {
            major: components[0],
            minor: components[1],
            patch: components[2],
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }

    pub fn components(&self) -> Option<(u64, u64, u64)> {
        match self {
            Self::Parsed {
                major,
                minor,
                patch,
            } => Some((*major, *minor, *patch)),
            Self::Unparseable(_) => None,
        }
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
            Self::Unparseable(raw) => f.write_str(raw),
        }
    }
}
