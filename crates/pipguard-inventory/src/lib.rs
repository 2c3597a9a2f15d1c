mod graph;
mod pip;
mod runner;
mod scan;

pub use graph::{DependencyGraph, GraphReport, UnscannablePackage};
pub use pip::{is_safe_version_token, PipClient};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, RunError};
pub use scan::{
    freeze, parse_freeze_output, parse_outdated_json, scan, FreezeReport, FrozenPackage,
    ScanReport, SkippedPackage,
};

#[cfg(test)]
mod tests;
