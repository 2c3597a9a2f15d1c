use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use anyhow::{anyhow, Result};
use serde::{Serialize, Serializer};

/// Package identity as pip understands it: case-insensitive, with runs of
/// `-`, `_` and `.` treated as equivalent separators. The original spelling
/// is preserved for display and for pip invocations; equality, ordering and
/// hashing all use the canonical form.
#[derive(Debug, Clone)]
pub struct PackageName {
    raw: String,
    canonical: String,
}

impl PackageName {
    /// Validates against the strict allowed-character pattern before the
    /// name can ever reach an argument list. Rejects `..` and `__`
    /// sequences outright.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("package name must not be empty"));
        }
        if !trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || ch == '-')
        {
            return Err(anyhow!("package name contains invalid character(s): {raw}"));
        }
        if trimmed.contains("..") || trimmed.contains("__") {
            return Err(anyhow!("suspicious package name rejected: {raw}"));
        }

        Ok(Self {
            canonical: canonicalize(trimmed),
            raw: trimmed.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

fn canonicalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_was_separator = false;
    for ch in name.chars() {
        if ch == '-' || ch == '_' || ch == '.' {
            if !previous_was_separator {
                out.push('-');
            }
            previous_was_separator = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            previous_was_separator = false;
        }
    }
    out
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}
