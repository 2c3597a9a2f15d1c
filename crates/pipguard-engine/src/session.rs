use std::collections::BTreeSet;

use anyhow::Result;

use pipguard_core::{classify_with_critical, PackageName, PackageRecord, RiskAssessment, RiskTier};
use pipguard_inventory::{
    freeze, scan, CommandRunner, DependencyGraph, PipClient, SkippedPackage, UnscannablePackage,
};

use crate::environment::{classify_environment, probe_interpreter, EnvironmentContext};
use crate::error::EngineError;
use crate::executor::{execute_batch, CancelFlag, UpgradeOutcome, UpgradeRequest};
use crate::layout::GuardLayout;
use crate::oplog::OperationLog;
use crate::snapshot::{capture, derive_rollback, persist, PersistedSnapshot, Snapshot};

/// Probe plus classification in one step; both failures are fatal.
pub fn resolve_environment<R: CommandRunner>(
    pip: &PipClient<R>,
    virtual_env: Option<String>,
    conda_env: Option<String>,
) -> Result<EnvironmentContext, EngineError> {
    let probe = probe_interpreter(pip, virtual_env, conda_env)?;
    classify_environment(&probe)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAssessment {
    pub records: Vec<PackageRecord>,
    pub assessments: Vec<RiskAssessment>,
    pub graph: DependencyGraph,
    pub skipped: Vec<SkippedPackage>,
    pub unscannable: Vec<UnscannablePackage>,
}

/// Scan, dependency analysis and classification. Read-only throughout.
/// Packages whose dependency query failed stay out of the assessments.
pub fn assess<R: CommandRunner>(
    pip: &PipClient<R>,
    extra_critical: &[PackageName],
) -> Result<SessionAssessment> {
    let scan_report = scan(pip)?;
    let graph_report = DependencyGraph::build(pip, &scan_report.records)?;

    let unscannable_names: BTreeSet<&PackageName> = graph_report
        .unscannable
        .iter()
        .map(|package| &package.name)
        .collect();
    let assessments = scan_report
        .records
        .iter()
        .filter(|record| !unscannable_names.contains(&record.name))
        .map(|record| {
            classify_with_critical(
                record,
                graph_report.graph.dependents_count(&record.name),
                extra_critical,
            )
        })
        .collect();

    Ok(SessionAssessment {
        records: scan_report.records,
        assessments,
        graph: graph_report.graph,
        skipped: scan_report.skipped,
        unscannable: graph_report.unscannable,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionFilter {
    /// Every assessment at or below the given tier. `Critical` includes
    /// everything; `High` and below never pick up critical packages.
    UpToTier(RiskTier),
    CriticalOnly,
    Named(Vec<PackageName>),
}

pub fn selection_from_assessments(
    assessments: &[RiskAssessment],
    filter: &SelectionFilter,
) -> Vec<UpgradeRequest> {
    assessments
        .iter()
        .filter(|assessment| match filter {
            SelectionFilter::UpToTier(max) => assessment.tier <= *max,
            SelectionFilter::CriticalOnly => assessment.tier == RiskTier::Critical,
            SelectionFilter::Named(names) => names.contains(&assessment.name),
        })
        .map(|assessment| UpgradeRequest {
            name: assessment.name.clone(),
            target: assessment.candidate.clone(),
            tier: assessment.tier,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMutation {
    pub snapshot: Snapshot,
    pub persisted: PersistedSnapshot,
    pub skipped: Vec<SkippedPackage>,
}

/// The pre-mutation gate. Refuses protected environments before a single
/// subprocess runs, then captures and durably persists the full-inventory
/// snapshot that makes the rest of the session reversible.
pub fn prepare_mutation<R: CommandRunner>(
    context: &EnvironmentContext,
    layout: &GuardLayout,
    pip: &PipClient<R>,
    stamp: &str,
) -> Result<PreparedMutation> {
    if !context.mutable {
        return Err(EngineError::MutationForbidden(context.kind.as_str().to_string()).into());
    }

    let freeze_report = freeze(pip)?;
    let snapshot = capture(&freeze_report.packages, stamp);
    let rollback = derive_rollback(&snapshot, pip.python());
    let persisted = persist(layout, &snapshot, &rollback)?;

    Ok(PreparedMutation {
        snapshot,
        persisted,
        skipped: freeze_report.skipped,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRun {
    pub persisted: PersistedSnapshot,
    pub outcomes: Vec<UpgradeOutcome>,
}

/// Full mutating half of a session: mutability gate, snapshot, then the
/// ordered batch. The snapshot is persisted before the first upgrade
/// subprocess starts, and the rollback script stays valid throughout.
#[allow(clippy::too_many_arguments)]
pub fn execute_selection<R: CommandRunner>(
    context: &EnvironmentContext,
    layout: &GuardLayout,
    pip: &PipClient<R>,
    log: &OperationLog,
    verify_timeout: std::time::Duration,
    stamp: &str,
    selection: Vec<UpgradeRequest>,
    cancel: &CancelFlag,
) -> Result<SessionRun> {
    let prepared = prepare_mutation(context, layout, pip, stamp)?;
    log.record(&format!(
        "snapshot persisted: {}",
        prepared.persisted.snapshot_path.display()
    ))?;
    log.record(&format!(
        "rollback script: {}",
        prepared.persisted.rollback_path.display()
    ))?;
    for skipped in &prepared.skipped {
        log.record(&format!(
            "not restorable from pin: {} ({})",
            skipped.name, skipped.reason
        ))?;
    }

    let outcomes = execute_batch(pip, log, verify_timeout, selection, cancel)?;
    Ok(SessionRun {
        persisted: prepared.persisted,
        outcomes,
    })
}
