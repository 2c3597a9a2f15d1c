mod config;
mod environment;
mod error;
mod executor;
mod layout;
mod oplog;
mod session;
mod snapshot;
mod verify;

pub use config::GuardConfig;
pub use environment::{
    classify_environment, probe_interpreter, EnvironmentContext, EnvironmentKind, EnvironmentProbe,
};
pub use error::EngineError;
pub use executor::{
    execute_batch, order_batch, CancelFlag, UpgradeOutcome, UpgradeRequest, UpgradeResult,
};
pub use layout::{default_user_root, GuardLayout};
pub use oplog::OperationLog;
pub use session::{
    assess, execute_selection, prepare_mutation, resolve_environment, selection_from_assessments,
    PreparedMutation, SelectionFilter, SessionAssessment, SessionRun,
};
pub use snapshot::{
    capture, current_stamp, derive_rollback, persist, render_rollback_script, render_snapshot,
    PersistedSnapshot, ReinstallStep, RollbackProcedure, Snapshot, SnapshotEntry,
};
pub use verify::{import_candidates, verify_import, VerifyOutcome, VerifyResult};
