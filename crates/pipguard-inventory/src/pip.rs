use std::time::Duration;

use pipguard_core::PackageName;

use crate::runner::{CommandOutput, CommandRunner, RunError};

/// Exact version strings get embedded in pin arguments and rollback
/// scripts; anything outside this token alphabet is refused rather than
/// passed through.
pub fn is_safe_version_token(raw: &str) -> bool {
    !raw.is_empty()
        && raw.chars().all(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, '.' | '_' | '-' | '+' | '!' | ':' | '*')
        })
}

/// The package query/execution surface, reachable only through argument
/// lists handed to a [`CommandRunner`].
#[derive(Debug)]
pub struct PipClient<'a, R: CommandRunner> {
    runner: &'a R,
    python: String,
    timeout: Duration,
}

impl<'a, R: CommandRunner> PipClient<'a, R> {
    pub fn new(runner: &'a R, python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            python: python.into(),
            timeout,
        }
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn pip_argv(&self, tail: &[&str]) -> Vec<String> {
        let mut argv = vec![self.python.clone(), "-m".to_string(), "pip".to_string()];
        argv.extend(tail.iter().map(|arg| arg.to_string()));
        argv
    }

    pub fn list_outdated(&self) -> Result<CommandOutput, RunError> {
        self.runner.run(
            &self.pip_argv(&["list", "--outdated", "--format=json", "--verbose"]),
            self.timeout,
        )
    }

    pub fn freeze(&self) -> Result<CommandOutput, RunError> {
        self.runner.run(&self.pip_argv(&["freeze"]), self.timeout)
    }

    pub fn show(&self, name: &PackageName) -> Result<CommandOutput, RunError> {
        self.runner
            .run(&self.pip_argv(&["show", name.as_str()]), self.timeout)
    }

    pub fn install_pinned(&self, name: &PackageName, version: &str) -> Result<CommandOutput, RunError> {
        self.runner.run(
            &self.pip_argv(&["install", &format!("{}=={version}", name.as_str())]),
            self.timeout,
        )
    }

    /// Runs a short python snippet in a fresh interpreter, e.g. for probing
    /// `sys.prefix` or attempting an isolated import.
    pub fn python_snippet(&self, code: &str, timeout: Duration) -> Result<CommandOutput, RunError> {
        self.runner.run(
            &[
                self.python.clone(),
                "-c".to_string(),
                code.to_string(),
            ],
            timeout,
        )
    }
}
