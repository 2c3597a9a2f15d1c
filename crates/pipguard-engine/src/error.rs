use thiserror::Error;

/// Fatal conditions. Everything recoverable travels inside outcome records
/// instead of crossing component boundaries as an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("python environment could not be resolved: {0}")]
    EnvironmentUnresolvable(String),
    #[error("environment '{0}' is protected; package mutation is forbidden")]
    MutationForbidden(String),
    #[error("failed to persist snapshot: {0}")]
    SnapshotWriteFailed(String),
}
