use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use pipguard_core::RiskTier;

mod dispatch;
mod render;
#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "pipguard")]
#[command(about = "Safe pip upgrade orchestration with snapshots and rollback", long_about = None)]
struct Cli {
    /// Python interpreter to operate on (defaults to the configured one, then python3)
    #[arg(long, global = true)]
    python: Option<String>,
    /// State directory root (defaults to ~/.pipguard)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Plain output without colors or progress indicators
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the environment and report outdated packages grouped by risk
    Scan {
        /// Emit the risk assessments as JSON
        #[arg(long)]
        json: bool,
    },
    /// Snapshot the environment, then upgrade a selection of outdated packages
    Upgrade {
        /// Upgrade everything at or below this risk tier (default: low)
        #[arg(long, value_enum)]
        risk: Option<RiskArg>,
        /// Upgrade only the named package; repeatable
        #[arg(long = "package", value_name = "NAME")]
        package: Vec<String>,
        /// Upgrade only the core packaging infrastructure
        #[arg(long)]
        critical_only: bool,
        /// Print the ordered plan without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Proceed without an explicit package list
        #[arg(long)]
        yes: bool,
    },
    /// Capture and persist a snapshot and rollback script without upgrading
    Snapshot,
    /// Diagnose the state directory, configuration and environment
    Doctor,
    /// Emit a completion script for the given shell
    Completions { shell: Shell },
    /// Print the pipguard version
    Version,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum RiskArg {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskArg {
    fn tier(self) -> RiskTier {
        match self {
            Self::Low => RiskTier::Low,
            Self::Medium => RiskTier::Medium,
            Self::High => RiskTier::High,
            Self::Critical => RiskTier::Critical,
        }
    }
}

fn main() -> Result<()> {
    dispatch::run_cli(Cli::parse())
}
