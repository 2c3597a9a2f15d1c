use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    #[error("empty argument list")]
    EmptyArgv,
    #[error("failed to run command: {0}")]
    Io(#[from] std::io::Error),
}

/// The seam between the engine and the external package-management command.
/// Every invocation is an argument list, never a shell string, and every
/// invocation is bounded by a wall-clock timeout.
pub trait CommandRunner {
    fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, RunError>;
}

/// Real subprocess execution. On timeout the child is killed and reaped,
/// never left orphaned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, RunError> {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyArgv)?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        match child.wait_timeout(timeout)? {
            Some(_) => {
                let output = child.wait_with_output()?;
                Ok(CommandOutput {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(RunError::Timeout(timeout))
            }
        }
    }
}
