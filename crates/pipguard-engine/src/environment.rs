use std::path::{Path, PathBuf};

use pipguard_inventory::{CommandRunner, PipClient};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    IsolatedVenv,
    IsolatedConda,
    GlobalManaged,
    ProtectedSystem,
}

impl EnvironmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IsolatedVenv => "venv",
            Self::IsolatedConda => "conda",
            Self::GlobalManaged => "homebrew",
            Self::ProtectedSystem => "system",
        }
    }
}

/// Classified once at session start, immutable afterward. `mutable` is the
/// single gate every mutating operation checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    pub kind: EnvironmentKind,
    pub root: PathBuf,
    pub interpreter: PathBuf,
    pub mutable: bool,
}

/// Raw facts about the interpreter. Environment variables are handed in by
/// the caller so classification never reads process globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentProbe {
    pub interpreter: PathBuf,
    pub prefix: PathBuf,
    pub base_prefix: PathBuf,
    pub virtual_env: Option<String>,
    pub conda_env: Option<String>,
}

const PROBE_SNIPPET: &str =
    "import sys\nprint(sys.executable)\nprint(sys.prefix)\nprint(sys.base_prefix)";

/// Asks the interpreter where it lives. Any failure here means the context
/// cannot be determined and the session must not proceed.
pub fn probe_interpreter<R: CommandRunner>(
    pip: &PipClient<R>,
    virtual_env: Option<String>,
    conda_env: Option<String>,
) -> Result<EnvironmentProbe, EngineError> {
    let output = pip
        .python_snippet(PROBE_SNIPPET, pip.timeout())
        .map_err(|err| EngineError::EnvironmentUnresolvable(err.to_string()))?;
    if !output.success() {
        return Err(EngineError::EnvironmentUnresolvable(format!(
            "interpreter probe exited with {}: {}",
            output.exit_code, output.stderr
        )));
    }

    let mut lines = output.stdout.lines().map(str::trim);
    let (Some(executable), Some(prefix), Some(base_prefix)) =
        (lines.next(), lines.next(), lines.next())
    else {
        return Err(EngineError::EnvironmentUnresolvable(
            "interpreter probe produced incomplete output".to_string(),
        ));
    };

    Ok(EnvironmentProbe {
        interpreter: PathBuf::from(executable),
        prefix: PathBuf::from(prefix),
        base_prefix: PathBuf::from(base_prefix),
        virtual_env,
        conda_env,
    })
}

/// Pure classification against the known environment markers. The
/// protected-system verdict is unconditional; there is no override path.
pub fn classify_environment(probe: &EnvironmentProbe) -> Result<EnvironmentContext, EngineError> {
    let in_venv = probe.base_prefix != probe.prefix
        || probe
            .virtual_env
            .as_deref()
            .is_some_and(|value| !value.is_empty());
    if in_venv {
        return Ok(EnvironmentContext {
            kind: EnvironmentKind::IsolatedVenv,
            root: probe.prefix.clone(),
            interpreter: probe.interpreter.clone(),
            mutable: true,
        });
    }

    if probe
        .conda_env
        .as_deref()
        .is_some_and(|value| !value.is_empty())
    {
        return Ok(EnvironmentContext {
            kind: EnvironmentKind::IsolatedConda,
            root: probe.prefix.clone(),
            interpreter: probe.interpreter.clone(),
            mutable: true,
        });
    }

    if is_brew_path(&probe.interpreter) {
        return Ok(EnvironmentContext {
            kind: EnvironmentKind::GlobalManaged,
            root: probe.prefix.clone(),
            interpreter: probe.interpreter.clone(),
            mutable: true,
        });
    }

    if is_protected_system_path(&probe.interpreter) {
        return Ok(EnvironmentContext {
            kind: EnvironmentKind::ProtectedSystem,
            root: probe.prefix.clone(),
            interpreter: probe.interpreter.clone(),
            mutable: false,
        });
    }

    Err(EngineError::EnvironmentUnresolvable(format!(
        "unrecognized interpreter location: {}",
        probe.interpreter.display()
    )))
}

fn is_brew_path(interpreter: &Path) -> bool {
    let raw = interpreter.to_string_lossy();
    raw.contains("/opt/homebrew")
        || raw.contains("/usr/local/Cellar")
        || raw.contains("/home/linuxbrew")
}

fn is_protected_system_path(interpreter: &Path) -> bool {
    ["/usr/bin", "/usr/lib", "/bin", "/sbin", "/System"]
        .iter()
        .any(|prefix| interpreter.starts_with(prefix))
}
