use super::*;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use pipguard_core::PackageName;

use crate::graph::parse_required_by;

pub(crate) enum Scripted {
    Output(CommandOutput),
    Timeout,
}

/// Replays canned responses and records every argument list it was handed.
pub(crate) struct ScriptedRunner {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub(crate) fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, RunError> {
        self.calls.lock().expect("calls lock").push(argv.to_vec());
        match self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .expect("scripted runner exhausted")
        {
            Scripted::Output(output) => Ok(output),
            Scripted::Timeout => Err(RunError::Timeout(timeout)),
        }
    }
}

pub(crate) fn ok_output(stdout: &str) -> Scripted {
    Scripted::Output(CommandOutput {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub(crate) fn failed_output(stderr: &str) -> Scripted {
    Scripted::Output(CommandOutput {
        exit_code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

fn name(raw: &str) -> PackageName {
    PackageName::parse(raw).expect("name must parse")
}

#[test]
fn pip_invocations_are_argument_lists() {
    let runner = ScriptedRunner::new(vec![ok_output("[]")]);
    let pip = PipClient::new(&runner, "/env/bin/python", Duration::from_secs(300));
    scan(&pip).expect("scan must succeed");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![
            "/env/bin/python",
            "-m",
            "pip",
            "list",
            "--outdated",
            "--format=json",
            "--verbose"
        ]
    );
}

#[test]
fn scan_parses_outdated_entries() {
    let raw = r#"[
        {"name": "requests", "version": "2.31.0", "latest_version": "2.31.1", "installer": "pip"},
        {"name": "certifi", "version": "2023.5.7", "latest_version": "2023.7.22"}
    ]"#;
    let report = parse_outdated_json(raw).expect("must parse");
    assert_eq!(report.records.len(), 2);
    assert!(report.skipped.is_empty());
    assert_eq!(report.records[0].name.as_str(), "requests");
    assert_eq!(report.records[0].installed, "2.31.0");
    assert_eq!(report.records[0].latest, "2.31.1");
    assert_eq!(report.records[1].latest, "2023.7.22");
}

#[test]
fn scan_skips_protected_and_invalid_names() {
    let raw = r#"[
        {"name": "python", "version": "3.12.0", "latest_version": "3.12.1"},
        {"name": "bad;name", "version": "1.0.0", "latest_version": "1.0.1"},
        {"name": "requests", "version": "2.31.0", "latest_version": "2.31.1"}
    ]"#;
    let report = parse_outdated_json(raw).expect("must parse");
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped[0].reason.contains("protected"));
}

#[test]
fn scan_surfaces_pip_failure() {
    let runner = ScriptedRunner::new(vec![failed_output("no such option")]);
    let pip = PipClient::new(&runner, "python3", Duration::from_secs(300));
    let err = scan(&pip).expect_err("must fail");
    assert!(err.to_string().contains("pip list --outdated failed"));
}

#[test]
fn freeze_keeps_exact_pins_and_reports_the_rest() {
    let raw = "requests==2.31.0\ncertifi==2023.5.7\n-e git+https://example.test/app.git#egg=app\nlocalpkg @ file:///tmp/localpkg\n\n# comment\n";
    let report = parse_freeze_output(raw);
    assert_eq!(report.packages.len(), 2);
    assert_eq!(report.packages[0].name.as_str(), "requests");
    assert_eq!(report.packages[0].version, "2.31.0");
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped[0].reason.contains("not an exact version pin"));
}

#[test]
fn freeze_drops_pins_with_shell_metacharacters() {
    let raw = "evil==1.0'; rm -rf \"$HOME\"; echo '\nrequests==2.31.0\n";
    let report = parse_freeze_output(raw);
    assert_eq!(report.packages.len(), 1);
    assert_eq!(report.packages[0].name.as_str(), "requests");
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("unsafe characters"));
}

#[test]
fn required_by_parsing_filters_empty_fragments() {
    let stdout = "Name: urllib3\nVersion: 2.0.0\nRequired-by: requests, , botocore,\n";
    assert_eq!(parse_required_by(stdout), vec!["requests", "botocore"]);
}

#[test]
fn required_by_missing_line_means_no_dependents() {
    assert!(parse_required_by("Name: urllib3\nVersion: 2.0.0\n").is_empty());
}

#[test]
fn graph_excludes_self_edges_and_normalizes_names() {
    let graph = DependencyGraph::from_edges(vec![
        (name("requests"), name("urllib3")),
        (name("Requests"), name("urllib3")),
        (name("urllib3"), name("urllib3")),
        (name("botocore"), name("urllib3")),
    ]);
    let dependents = graph.dependents_of(&name("URLLIB3"));
    assert_eq!(dependents.len(), 2);
    assert_eq!(graph.dependents_count(&name("urllib3")), 2);
    assert_eq!(graph.dependents_count(&name("requests")), 0);
}

#[test]
fn graph_build_marks_timed_out_queries_unscannable() {
    let outdated = r#"[
        {"name": "urllib3", "version": "2.0.0", "latest_version": "2.0.1"},
        {"name": "requests", "version": "2.31.0", "latest_version": "2.31.1"}
    ]"#;
    let records = parse_outdated_json(outdated).expect("must parse").records;

    let runner = ScriptedRunner::new(vec![
        ok_output("Name: urllib3\nRequired-by: requests, botocore\n"),
        Scripted::Timeout,
    ]);
    let pip = PipClient::new(&runner, "python3", Duration::from_secs(5));
    let report = DependencyGraph::build(&pip, &records).expect("must build");

    assert_eq!(report.graph.dependents_count(&name("urllib3")), 2);
    assert_eq!(report.unscannable.len(), 1);
    assert_eq!(report.unscannable[0].name.as_str(), "requests");
    assert!(report.unscannable[0].reason.contains("timed out"));
}

#[test]
fn install_pinned_builds_a_single_pin_argument() {
    let runner = ScriptedRunner::new(vec![ok_output("")]);
    let pip = PipClient::new(&runner, "python3", Duration::from_secs(300));
    pip.install_pinned(&name("requests"), "2.31.1")
        .expect("must run");
    let calls = runner.calls();
    assert_eq!(
        calls[0],
        vec!["python3", "-m", "pip", "install", "requests==2.31.1"]
    );
}

#[test]
fn safe_version_tokens() {
    assert!(is_safe_version_token("2.31.0"));
    assert!(is_safe_version_token("1!2.0.0+local"));
    assert!(!is_safe_version_token(""));
    assert!(!is_safe_version_token("1.0; rm -rf /"));
    assert!(!is_safe_version_token("1.0 2.0"));
}
