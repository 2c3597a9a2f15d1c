use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use pipguard_core::{PackageName, PackageRecord};

use crate::pip::PipClient;
use crate::runner::{CommandRunner, RunError};

/// Direct dependents only. Classification needs "how many installed
/// packages would be immediately affected", not a transitive closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    dependents: BTreeMap<PackageName, BTreeSet<PackageName>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnscannablePackage {
    pub name: PackageName,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphReport {
    pub graph: DependencyGraph,
    pub unscannable: Vec<UnscannablePackage>,
}

impl DependencyGraph {
    /// Edges are (dependent, dependency) pairs. Self-edges are dropped.
    pub fn from_edges(edges: impl IntoIterator<Item = (PackageName, PackageName)>) -> Self {
        let mut dependents: BTreeMap<PackageName, BTreeSet<PackageName>> = BTreeMap::new();
        for (dependent, dependency) in edges {
            if dependent == dependency {
                continue;
            }
            dependents.entry(dependency).or_default().insert(dependent);
        }
        Self { dependents }
    }

    pub fn dependents_of(&self, name: &PackageName) -> BTreeSet<PackageName> {
        self.dependents.get(name).cloned().unwrap_or_default()
    }

    pub fn dependents_count(&self, name: &PackageName) -> usize {
        self.dependents.get(name).map_or(0, BTreeSet::len)
    }

    /// Builds the dependents map from one `pip show` query per record. A
    /// query that times out marks the package unscannable; it stays out of
    /// automatic classification instead of failing the whole scan.
    pub fn build<R: CommandRunner>(
        pip: &PipClient<R>,
        records: &[PackageRecord],
    ) -> Result<GraphReport> {
        let mut edges = Vec::new();
        let mut unscannable = Vec::new();

        for record in records {
            match pip.show(&record.name) {
                Ok(output) if output.success() => {
                    for raw in parse_required_by(&output.stdout) {
                        if let Ok(dependent) = PackageName::parse(&raw) {
                            edges.push((dependent, record.name.clone()));
                        }
                    }
                }
                Ok(output) => {
                    unscannable.push(UnscannablePackage {
                        name: record.name.clone(),
                        reason: format!(
                            "pip show exited with {}: {}",
                            output.exit_code, output.stderr
                        ),
                    });
                }
                Err(RunError::Timeout(timeout)) => {
                    unscannable.push(UnscannablePackage {
                        name: record.name.clone(),
                        reason: format!("dependency query timed out after {timeout:?}"),
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(GraphReport {
            graph: Self::from_edges(edges),
            unscannable,
        })
    }
}

/// Extracts the `Required-by:` list from `pip show` output. Empty fragments
/// after the comma split are filtered out.
pub(crate) fn parse_required_by(stdout: &str) -> Vec<String> {
    for line in stdout.lines() {
        let Some(rest) = line.strip_prefix("Required-by:") else {
            continue;
        };
        return rest
            .split(',')
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .map(str::to_string)
            .collect();
    }
    Vec::new()
}
