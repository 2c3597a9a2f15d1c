use super::*;

use clap::error::ErrorKind;
use clap::Parser;

use pipguard_core::{PackageName, RiskAssessment};
use pipguard_engine::{
    EnvironmentContext, EnvironmentKind, GuardConfig, SelectionFilter, UpgradeOutcome,
    UpgradeRequest, UpgradeResult,
};

use crate::dispatch::{
    ensure_mutable_for_upgrade, resolve_python, resolve_selection_filter, upgrade_confirmed,
};
use crate::render::{
    format_assessment_lines, format_environment_lines, format_outcome_lines, format_plan_lines,
    render_status_line, OutputStyle,
};

fn name(raw: &str) -> PackageName {
    PackageName::parse(raw).expect("name must parse")
}

fn assessment(pkg: &str, installed: &str, candidate: &str, tier: RiskTier) -> RiskAssessment {
    RiskAssessment {
        name: name(pkg),
        installed: installed.to_string(),
        candidate: candidate.to_string(),
        tier,
        dependents_count: 0,
        rationale: format!("{tier:?} change").to_lowercase(),
    }
}

#[test]
fn cli_parses_upgrade_flags() {
    let cli = Cli::try_parse_from([
        "pipguard",
        "upgrade",
        "--risk",
        "high",
        "--package",
        "requests",
        "--package",
        "flask",
        "--dry-run",
    ])
    .expect("must parse");

    match cli.command {
        Commands::Upgrade {
            risk,
            package,
            critical_only,
            dry_run,
            yes,
        } => {
            assert_eq!(risk, Some(RiskArg::High));
            assert_eq!(package, vec!["requests".to_string(), "flask".to_string()]);
            assert!(!critical_only);
            assert!(dry_run);
            assert!(!yes);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_rejects_unknown_risk_value() {
    let err = Cli::try_parse_from(["pipguard", "upgrade", "--risk", "extreme"])
        .expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn global_flags_parse_after_the_subcommand() {
    let cli = Cli::try_parse_from(["pipguard", "scan", "--plain", "--python", "/env/bin/python"])
        .expect("must parse");
    assert!(cli.plain);
    assert_eq!(cli.python.as_deref(), Some("/env/bin/python"));
}

#[test]
fn python_precedence_is_flag_then_config_then_default() {
    let mut config = GuardConfig::default();
    assert_eq!(resolve_python(None, &config), "python3");

    config.python = Some("/opt/python3.12/bin/python".to_string());
    assert_eq!(resolve_python(None, &config), "/opt/python3.12/bin/python");
    assert_eq!(
        resolve_python(Some("/env/bin/python".to_string()), &config),
        "/env/bin/python"
    );
}

#[test]
fn package_list_wins_over_other_selection_flags() {
    let filter = resolve_selection_filter(
        Some(RiskArg::Critical),
        &["requests".to_string()],
        true,
    )
    .expect("must resolve");
    assert_eq!(filter, SelectionFilter::Named(vec![name("requests")]));
}

#[test]
fn selection_defaults_to_low_tier() {
    let filter = resolve_selection_filter(None, &[], false).expect("must resolve");
    assert_eq!(filter, SelectionFilter::UpToTier(RiskTier::Low));

    let filter = resolve_selection_filter(Some(RiskArg::High), &[], false).expect("must resolve");
    assert_eq!(filter, SelectionFilter::UpToTier(RiskTier::High));

    let filter = resolve_selection_filter(None, &[], true).expect("must resolve");
    assert_eq!(filter, SelectionFilter::CriticalOnly);
}

#[test]
fn invalid_package_name_fails_selection() {
    let err = resolve_selection_filter(None, &["bad name".to_string()], false)
        .expect_err("must reject");
    assert!(err.to_string().contains("bad name"));
}

#[test]
fn upgrade_needs_yes_or_an_explicit_list() {
    assert!(!upgrade_confirmed(false, &[]));
    assert!(upgrade_confirmed(true, &[]));
    assert!(upgrade_confirmed(false, &["requests".to_string()]));
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "snapshot", "42 packages pinned"),
        "snapshot: 42 packages pinned"
    );
}

#[test]
fn assessment_lines_group_highest_tier_first() {
    let assessments = vec![
        assessment("requests", "2.31.0", "2.31.1", RiskTier::Low),
        assessment("pip", "24.0.0", "24.1.0", RiskTier::Critical),
        assessment("django", "4.2.0", "5.0.0", RiskTier::High),
    ];
    let lines = format_assessment_lines(&assessments, OutputStyle::Plain);

    assert_eq!(lines[0], "critical (1)");
    assert!(lines[1].contains("pip 24.0.0 -> 24.1.0"));
    assert_eq!(lines[2], "high (1)");
    assert_eq!(lines[4], "low (1)");
}

#[test]
fn empty_assessment_report_says_up_to_date() {
    let lines = format_assessment_lines(&[], OutputStyle::Plain);
    assert_eq!(lines, vec!["everything is up to date".to_string()]);
}

#[test]
fn plan_lines_are_numbered_in_batch_order() {
    let ordered = vec![
        UpgradeRequest {
            name: name("requests"),
            target: "2.31.1".to_string(),
            tier: RiskTier::Low,
        },
        UpgradeRequest {
            name: name("pip"),
            target: "24.1.0".to_string(),
            tier: RiskTier::Critical,
        },
    ];
    let lines = format_plan_lines(&ordered, OutputStyle::Plain);
    assert_eq!(lines[0], "plan (2 upgrades):");
    assert_eq!(lines[1], "  1. requests -> 2.31.1 [low]");
    assert_eq!(lines[2], "  2. pip -> 24.1.0 [critical]");
}

#[test]
fn outcome_lines_end_with_a_summary() {
    let outcomes = vec![
        UpgradeOutcome {
            name: name("requests"),
            attempted: "2.31.1".to_string(),
            result: UpgradeResult::Succeeded,
            detail: "imported requests".to_string(),
        },
        UpgradeOutcome {
            name: name("slowpkg"),
            attempted: "2.0.0".to_string(),
            result: UpgradeResult::TimedOut,
            detail: "upgrade timed out after 300s".to_string(),
        },
    ];
    let lines = format_outcome_lines(&outcomes, OutputStyle::Plain);
    assert_eq!(
        lines[0],
        "requests -> 2.31.1: succeeded (imported requests)"
    );
    assert_eq!(
        lines[1],
        "slowpkg -> 2.0.0: timed-out (upgrade timed out after 300s)"
    );
    assert_eq!(lines[2], "1 of 2 upgrades succeeded");
}

#[test]
fn environment_lines_flag_protected_installs() {
    let context = EnvironmentContext {
        kind: EnvironmentKind::ProtectedSystem,
        root: "/usr".into(),
        interpreter: "/usr/bin/python3".into(),
        mutable: false,
    };
    let lines = format_environment_lines(&context);
    assert_eq!(lines[0], "environment: system (protected, upgrades refused)");
}

#[test]
fn upgrade_refuses_protected_environments_before_scanning() {
    let protected = EnvironmentContext {
        kind: EnvironmentKind::ProtectedSystem,
        root: "/usr".into(),
        interpreter: "/usr/bin/python3".into(),
        mutable: false,
    };
    let err = ensure_mutable_for_upgrade(&protected, false).expect_err("must refuse");
    assert!(matches!(
        err.downcast_ref::<pipguard_engine::EngineError>(),
        Some(pipguard_engine::EngineError::MutationForbidden(_))
    ));

    ensure_mutable_for_upgrade(&protected, true).expect("dry run stays read-only");

    let venv = EnvironmentContext {
        kind: EnvironmentKind::IsolatedVenv,
        root: "/env".into(),
        interpreter: "/env/bin/python".into(),
        mutable: true,
    };
    ensure_mutable_for_upgrade(&venv, false).expect("mutable environment proceeds");
}
