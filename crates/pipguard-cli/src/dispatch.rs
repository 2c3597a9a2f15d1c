use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::CommandFactory;

use pipguard_core::{PackageName, RiskTier};
use pipguard_engine::{
    assess, capture, current_stamp, derive_rollback, execute_selection, order_batch, persist,
    resolve_environment, selection_from_assessments, CancelFlag, EngineError, EnvironmentContext,
    GuardConfig, GuardLayout, OperationLog, SelectionFilter, SessionAssessment, UpgradeResult,
};
use pipguard_inventory::{freeze, CommandRunner, PipClient, ProcessRunner};

use crate::render::{
    finish_spinner, format_assessment_lines, format_environment_lines, format_outcome_lines,
    format_plan_lines, render_status_line, start_spinner, OutputStyle,
};
use crate::{Cli, Commands, RiskArg};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "pipguard", &mut io::stdout());
            return Ok(());
        }
        Commands::Version => {
            println!("pipguard {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let style = if cli.plain {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    };
    let layout = resolve_layout(cli.root.clone())?;
    let config = GuardConfig::load(&layout)?;
    let python = resolve_python(cli.python.clone(), &config);
    let runner = ProcessRunner;
    let pip = PipClient::new(&runner, python, config.command_timeout());

    match cli.command {
        Commands::Scan { json } => run_scan(&pip, &config, style, json),
        Commands::Upgrade {
            risk,
            package,
            critical_only,
            dry_run,
            yes,
        } => run_upgrade(
            &layout,
            &pip,
            &config,
            style,
            UpgradeOptions {
                risk,
                packages: package,
                critical_only,
                dry_run,
                yes,
            },
        ),
        Commands::Snapshot => run_snapshot(&layout, &pip, style),
        Commands::Doctor => run_doctor(&layout, &pip, &config),
        Commands::Completions { .. } | Commands::Version => Ok(()),
    }
}

pub(crate) struct UpgradeOptions {
    pub(crate) risk: Option<RiskArg>,
    pub(crate) packages: Vec<String>,
    pub(crate) critical_only: bool,
    pub(crate) dry_run: bool,
    pub(crate) yes: bool,
}

fn resolve_layout(root: Option<PathBuf>) -> Result<GuardLayout> {
    let root = match root {
        Some(root) => root,
        None => pipguard_engine::default_user_root()?,
    };
    Ok(GuardLayout::new(root))
}

/// Interpreter precedence: command line, then configuration, then python3.
pub(crate) fn resolve_python(flag: Option<String>, config: &GuardConfig) -> String {
    flag.or_else(|| config.python.clone())
        .unwrap_or_else(|| "python3".to_string())
}

/// An explicit package list wins, then --critical-only, then the tier cap.
/// Without any flag only low-risk upgrades are selected.
pub(crate) fn resolve_selection_filter(
    risk: Option<RiskArg>,
    packages: &[String],
    critical_only: bool,
) -> Result<SelectionFilter> {
    if !packages.is_empty() {
        let mut names = Vec::with_capacity(packages.len());
        for raw in packages {
            names.push(PackageName::parse(raw)?);
        }
        return Ok(SelectionFilter::Named(names));
    }
    if critical_only {
        return Ok(SelectionFilter::CriticalOnly);
    }
    Ok(SelectionFilter::UpToTier(
        risk.map(RiskArg::tier).unwrap_or(RiskTier::Low),
    ))
}

/// Mutation needs either an explicit package list or --yes.
pub(crate) fn upgrade_confirmed(yes: bool, packages: &[String]) -> bool {
    yes || !packages.is_empty()
}

/// Protected environments fail the upgrade command as soon as they are
/// classified; only a dry run may continue to the read-only plan.
pub(crate) fn ensure_mutable_for_upgrade(
    context: &EnvironmentContext,
    dry_run: bool,
) -> Result<()> {
    if !context.mutable && !dry_run {
        return Err(EngineError::MutationForbidden(context.kind.as_str().to_string()).into());
    }
    Ok(())
}

fn ambient_python_env() -> (Option<String>, Option<String>) {
    (
        std::env::var("VIRTUAL_ENV").ok(),
        std::env::var("CONDA_DEFAULT_ENV").ok(),
    )
}

fn run_scan<R: CommandRunner>(
    pip: &PipClient<R>,
    config: &GuardConfig,
    style: OutputStyle,
    json: bool,
) -> Result<()> {
    let (virtual_env, conda_env) = ambient_python_env();
    let context = resolve_environment(pip, virtual_env, conda_env)?;

    let spinner = start_spinner(style, "scanning installed packages");
    let assessment = assess(pip, &config.extra_critical());
    finish_spinner(spinner);
    let assessment = assessment?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment.assessments)?);
        return Ok(());
    }

    for line in format_environment_lines(&context) {
        println!("{line}");
    }
    for line in format_assessment_lines(&assessment.assessments, style) {
        println!("{line}");
    }
    print_scan_caveats(&assessment);
    Ok(())
}

fn print_scan_caveats(assessment: &SessionAssessment) {
    for skipped in &assessment.skipped {
        println!("skipped {}: {}", skipped.name, skipped.reason);
    }
    for unscannable in &assessment.unscannable {
        println!(
            "not assessed {}: {}",
            unscannable.name, unscannable.reason
        );
    }
}

fn run_upgrade<R: CommandRunner>(
    layout: &GuardLayout,
    pip: &PipClient<R>,
    config: &GuardConfig,
    style: OutputStyle,
    options: UpgradeOptions,
) -> Result<()> {
    let filter = resolve_selection_filter(options.risk, &options.packages, options.critical_only)?;

    let (virtual_env, conda_env) = ambient_python_env();
    let context = resolve_environment(pip, virtual_env, conda_env)?;
    for line in format_environment_lines(&context) {
        println!("{line}");
    }
    ensure_mutable_for_upgrade(&context, options.dry_run)?;

    let spinner = start_spinner(style, "scanning installed packages");
    let assessment = assess(pip, &config.extra_critical());
    finish_spinner(spinner);
    let assessment = assessment?;
    print_scan_caveats(&assessment);

    let selection = selection_from_assessments(&assessment.assessments, &filter);
    if selection.is_empty() {
        println!("{}", render_status_line(style, "upgrade", "nothing selected"));
        return Ok(());
    }

    let ordered = order_batch(selection);
    for line in format_plan_lines(&ordered, style) {
        println!("{line}");
    }
    if options.dry_run {
        return Ok(());
    }
    if !upgrade_confirmed(options.yes, &options.packages) {
        bail!("refusing to upgrade without --yes or an explicit --package list");
    }

    let stamp = current_stamp();
    let log = OperationLog::create(layout.log_path(&stamp))?;
    println!(
        "{}",
        render_status_line(style, "log", &log.path().display().to_string())
    );

    let spinner = start_spinner(style, "upgrading");
    let run = execute_selection(
        &context,
        layout,
        pip,
        &log,
        config.verify_timeout(),
        &stamp,
        ordered,
        &CancelFlag::new(),
    );
    finish_spinner(spinner);
    let run = run?;

    println!(
        "{}",
        render_status_line(
            style,
            "rollback",
            &run.persisted.rollback_path.display().to_string()
        )
    );
    for line in format_outcome_lines(&run.outcomes, style) {
        println!("{line}");
    }

    let incomplete = run
        .outcomes
        .iter()
        .filter(|outcome| outcome.result != UpgradeResult::Succeeded)
        .count();
    if incomplete > 0 {
        bail!(
            "{incomplete} upgrade(s) did not complete cleanly; rollback script: {}",
            run.persisted.rollback_path.display()
        );
    }
    Ok(())
}

fn run_snapshot<R: CommandRunner>(
    layout: &GuardLayout,
    pip: &PipClient<R>,
    style: OutputStyle,
) -> Result<()> {
    let stamp = current_stamp();
    let report = freeze(pip)?;
    let snapshot = capture(&report.packages, stamp);
    let rollback = derive_rollback(&snapshot, pip.python());
    let persisted = persist(layout, &snapshot, &rollback)?;

    println!(
        "{}",
        render_status_line(
            style,
            "snapshot",
            &format!(
                "{} packages pinned at {}",
                snapshot.entries.len(),
                persisted.snapshot_path.display()
            )
        )
    );
    println!(
        "{}",
        render_status_line(
            style,
            "rollback",
            &persisted.rollback_path.display().to_string()
        )
    );
    for skipped in &report.skipped {
        println!("not restorable from pin: {} ({})", skipped.name, skipped.reason);
    }
    Ok(())
}

fn run_doctor<R: CommandRunner>(
    layout: &GuardLayout,
    pip: &PipClient<R>,
    config: &GuardConfig,
) -> Result<()> {
    println!("root: {}", layout.root().display());
    println!("logs: {}", layout.logs_dir().display());
    println!(
        "config: {} ({})",
        layout.config_path().display(),
        if layout.config_path().exists() {
            "present"
        } else {
            "defaults"
        }
    );
    println!("python: {}", pip.python());
    println!("command timeout: {:?}", config.command_timeout());
    println!("verify timeout: {:?}", config.verify_timeout());

    let (virtual_env, conda_env) = ambient_python_env();
    match resolve_environment(pip, virtual_env, conda_env) {
        Ok(context) => {
            for line in format_environment_lines(&context) {
                println!("{line}");
            }
        }
        Err(err) => println!("environment: unresolvable ({err})"),
    }
    Ok(())
}
