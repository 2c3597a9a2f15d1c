use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};

use pipguard_core::{RiskAssessment, RiskTier};
use pipguard_engine::{EnvironmentContext, UpgradeOutcome, UpgradeRequest, UpgradeResult};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{status}: {message}"),
        OutputStyle::Rich => format!("{}: {message}", colorize(status_style(), status)),
    }
}

/// Spinner shown while a long subprocess-heavy phase runs. Plain mode gets
/// nothing; any output there must stay line-oriented.
pub(crate) fn start_spinner(style: OutputStyle, label: &str) -> Option<ProgressBar> {
    if style == OutputStyle::Plain {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(label.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    Some(spinner)
}

pub(crate) fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
}

pub(crate) fn format_environment_lines(context: &EnvironmentContext) -> Vec<String> {
    vec![
        format!(
            "environment: {} ({})",
            context.kind.as_str(),
            if context.mutable {
                "upgrades allowed"
            } else {
                "protected, upgrades refused"
            }
        ),
        format!("interpreter: {}", context.interpreter.display()),
        format!("root: {}", context.root.display()),
    ]
}

/// Grouped risk report, highest tier first so the dangerous rows lead.
pub(crate) fn format_assessment_lines(
    assessments: &[RiskAssessment],
    style: OutputStyle,
) -> Vec<String> {
    let mut lines = Vec::new();
    for tier in [
        RiskTier::Critical,
        RiskTier::High,
        RiskTier::Medium,
        RiskTier::Low,
    ] {
        let group: Vec<&RiskAssessment> = assessments
            .iter()
            .filter(|assessment| assessment.tier == tier)
            .collect();
        if group.is_empty() {
            continue;
        }

        let header = format!("{} ({})", tier.as_str(), group.len());
        lines.push(match style {
            OutputStyle::Plain => header,
            OutputStyle::Rich => colorize(tier_style(tier), &header),
        });
        for assessment in group {
            lines.push(format!(
                "  {} {} -> {}  {}",
                assessment.name, assessment.installed, assessment.candidate, assessment.rationale
            ));
        }
    }
    if lines.is_empty() {
        lines.push("everything is up to date".to_string());
    }
    lines
}

pub(crate) fn format_plan_lines(ordered: &[UpgradeRequest], style: OutputStyle) -> Vec<String> {
    let mut lines = vec![format!("plan ({} upgrades):", ordered.len())];
    for (index, request) in ordered.iter().enumerate() {
        let row = format!(
            "  {}. {} -> {} [{}]",
            index + 1,
            request.name,
            request.target,
            request.tier.as_str()
        );
        lines.push(match style {
            OutputStyle::Plain => row,
            OutputStyle::Rich => {
                if request.tier >= RiskTier::High {
                    colorize(tier_style(request.tier), &row)
                } else {
                    row
                }
            }
        });
    }
    lines
}

pub(crate) fn format_outcome_lines(outcomes: &[UpgradeOutcome], style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::with_capacity(outcomes.len() + 1);
    for outcome in outcomes {
        let label = match style {
            OutputStyle::Plain => outcome.result.as_str().to_string(),
            OutputStyle::Rich => colorize(result_style(outcome.result), outcome.result.as_str()),
        };
        let detail = if outcome.detail.is_empty() {
            String::new()
        } else {
            format!(" ({})", outcome.detail)
        };
        lines.push(format!(
            "{} -> {}: {label}{detail}",
            outcome.name, outcome.attempted
        ));
    }

    let succeeded = outcomes
        .iter()
        .filter(|outcome| outcome.result == UpgradeResult::Succeeded)
        .count();
    lines.push(format!(
        "{succeeded} of {} upgrades succeeded",
        outcomes.len()
    ));
    lines
}

fn tier_style(tier: RiskTier) -> Style {
    let color = match tier {
        RiskTier::Low => AnsiColor::Green,
        RiskTier::Medium => AnsiColor::Yellow,
        RiskTier::High => AnsiColor::Red,
        RiskTier::Critical => AnsiColor::Magenta,
    };
    Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
}

fn result_style(result: UpgradeResult) -> Style {
    let color = match result {
        UpgradeResult::Succeeded => AnsiColor::Green,
        UpgradeResult::TimedOut => AnsiColor::Yellow,
        UpgradeResult::Failed | UpgradeResult::VerificationFailed => AnsiColor::Red,
    };
    Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
}

fn status_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
