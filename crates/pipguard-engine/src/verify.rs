use std::time::Duration;

use anyhow::Result;

use pipguard_core::PackageName;
use pipguard_inventory::{CommandRunner, PipClient, RunError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResult {
    Succeeded,
    Failed,
    Inconclusive,
}

impl VerifyResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "verification-failed",
            Self::Inconclusive => "inconclusive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub result: VerifyResult,
    pub detail: String,
}

/// Distribution names whose importable module is spelled differently.
/// Keys are canonical package names.
const KNOWN_IMPORT_NAMES: &[(&str, &str)] = &[
    ("attrs", "attr"),
    ("beautifulsoup4", "bs4"),
    ("msgpack", "msgpack"),
    ("pillow", "PIL"),
    ("protobuf", "google.protobuf"),
    ("python-dateutil", "dateutil"),
    ("pyyaml", "yaml"),
    ("scikit-image", "skimage"),
    ("scikit-learn", "sklearn"),
];

/// Module names to try for a distribution, best guess first: the known
/// mapping, then dash-to-underscore, then lowercase, then the raw name.
/// Anything that is not a valid module path is discarded.
pub fn import_candidates(name: &PackageName) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if is_valid_module_path(&candidate) && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    if let Some((_, module)) = KNOWN_IMPORT_NAMES
        .iter()
        .find(|(dist, _)| *dist == name.canonical())
    {
        push((*module).to_string());
    }
    let underscored = name.as_str().replace('-', "_");
    push(underscored.to_lowercase());
    push(underscored);
    push(name.as_str().to_string());

    candidates
}

fn is_valid_module_path(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        })
}

/// Imports the package in a fresh interpreter so a prior import's side
/// effects or partial state cannot mask a real regression. Any exception
/// during load, including module-level side effects, counts as failed.
pub fn verify_import<R: CommandRunner>(
    pip: &PipClient<R>,
    name: &PackageName,
    timeout: Duration,
) -> Result<VerifyOutcome> {
    let candidates = import_candidates(name);
    if candidates.is_empty() {
        return Ok(VerifyOutcome {
            result: VerifyResult::Inconclusive,
            detail: format!("no importable module name could be inferred for {name}"),
        });
    }

    let mut last_diagnostic = String::new();
    for candidate in &candidates {
        match pip.python_snippet(&format!("import {candidate}"), timeout) {
            Ok(output) if output.success() => {
                return Ok(VerifyOutcome {
                    result: VerifyResult::Succeeded,
                    detail: format!("imported {candidate}"),
                });
            }
            Ok(output) => {
                last_diagnostic = if output.stderr.is_empty() {
                    format!("import {candidate} exited with {}", output.exit_code)
                } else {
                    output.stderr
                };
            }
            Err(RunError::Timeout(timeout)) => {
                return Ok(VerifyOutcome {
                    result: VerifyResult::Inconclusive,
                    detail: format!("import check timed out after {timeout:?}"),
                });
            }
            Err(err) => {
                return Ok(VerifyOutcome {
                    result: VerifyResult::Inconclusive,
                    detail: format!("import check could not run: {err}"),
                });
            }
        }
    }

    Ok(VerifyOutcome {
        result: VerifyResult::Failed,
        detail: last_diagnostic,
    })
}
