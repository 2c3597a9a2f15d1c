use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use pipguard_core::{PackageName, RiskTier};
use pipguard_inventory::{is_safe_version_token, CommandRunner, PipClient, RunError};

use crate::oplog::OperationLog;
use crate::verify::{verify_import, VerifyResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub name: PackageName,
    pub target: String,
    pub tier: RiskTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeResult {
    Succeeded,
    Failed,
    TimedOut,
    VerificationFailed,
}

impl UpgradeResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
            Self::VerificationFailed => "verification-failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOutcome {
    pub name: PackageName,
    pub attempted: String,
    pub result: UpgradeResult,
    pub detail: String,
}

/// Raised to stop starting new batch operations. An upgrade already in
/// flight always runs to completion or timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Explicit ordering step: every non-critical request in input order, then
/// every critical one in input order. Upgrading packaging infrastructure
/// mid-batch can break the installs that come after it.
pub fn order_batch(selection: Vec<UpgradeRequest>) -> Vec<UpgradeRequest> {
    let (critical, regular): (Vec<_>, Vec<_>) = selection
        .into_iter()
        .partition(|request| request.tier == RiskTier::Critical);
    regular.into_iter().chain(critical).collect()
}

/// Runs the batch one pinned install at a time. A failed or timed-out
/// package never aborts the rest, and rollback is never triggered from
/// here: it stays an explicit, separate action on the persisted procedure.
pub fn execute_batch<R: CommandRunner>(
    pip: &PipClient<R>,
    log: &OperationLog,
    verify_timeout: Duration,
    selection: Vec<UpgradeRequest>,
    cancel: &CancelFlag,
) -> Result<Vec<UpgradeOutcome>> {
    let ordered = order_batch(selection);
    let mut outcomes = Vec::with_capacity(ordered.len());

    for request in ordered {
        if cancel.is_cancelled() {
            log.record("batch cancelled; not starting further upgrades")?;
            break;
        }

        let outcome = upgrade_one(pip, log, verify_timeout, &request)?;
        log.record(&format!(
            "{} -> {}: {}{}",
            outcome.name,
            outcome.attempted,
            outcome.result.as_str(),
            if outcome.detail.is_empty() {
                String::new()
            } else {
                format!(" ({})", outcome.detail)
            }
        ))?;
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn upgrade_one<R: CommandRunner>(
    pip: &PipClient<R>,
    log: &OperationLog,
    verify_timeout: Duration,
    request: &UpgradeRequest,
) -> Result<UpgradeOutcome> {
    if !is_safe_version_token(&request.target) {
        return Ok(UpgradeOutcome {
            name: request.name.clone(),
            attempted: request.target.clone(),
            result: UpgradeResult::Failed,
            detail: "target version contains unsafe characters".to_string(),
        });
    }

    log.record(&format!(
        "upgrading {} to {} (tier {})",
        request.name,
        request.target,
        request.tier.as_str()
    ))?;

    let (result, detail) = match pip.install_pinned(&request.name, &request.target) {
        Ok(output) if output.success() => {
            let verification = verify_import(pip, &request.name, verify_timeout)?;
            match verification.result {
                VerifyResult::Failed => (UpgradeResult::VerificationFailed, verification.detail),
                VerifyResult::Succeeded | VerifyResult::Inconclusive => {
                    (UpgradeResult::Succeeded, verification.detail)
                }
            }
        }
        Ok(output) => {
            let detail = if output.stderr.is_empty() {
                output.stdout
            } else {
                output.stderr
            };
            (UpgradeResult::Failed, detail)
        }
        Err(RunError::Timeout(timeout)) => (
            UpgradeResult::TimedOut,
            format!("upgrade timed out after {timeout:?}"),
        ),
        // A launch failure is recorded like any other failed outcome so the
        // caller still receives the full sequence for the batch.
        Err(err) => (UpgradeResult::Failed, err.to_string()),
    };

    Ok(UpgradeOutcome {
        name: request.name.clone(),
        attempted: request.target.clone(),
        result,
        detail,
    })
}
