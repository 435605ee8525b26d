use serde_json::Value;

use crate::common::{SYNTAX_LINE, TestProject};

fn full_spec() -> String {
    format!(
        "{SYNTAX_LINE}
name: demo
version: 1.0.0
args:
  VERSION: 1.2
  REVISION:
sources:
  src:
    context: {{}}
  extra:
    context:
      name: other
targets:
  jammy: {{}}
  azlinux3: {{}}
"
    )
}

/// Text output lists facts and the document actions
#[test]
fn test_inspect_text() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &full_spec()).unwrap();

    let output = project.run(&["inspect", "dalec.yml"]);
    output
        .assert_success()
        .assert_stdout_contains("is a Dalec spec")
        .assert_stdout_contains("ghcr.io/project-dalec/dalec/frontend:latest")
        .assert_stdout_contains("azlinux3")
        .assert_stdout_contains("jammy")
        .assert_stdout_contains("other")
        .assert_stdout_contains("VERSION = 1.2")
        .assert_stdout_contains("REVISION")
        .assert_stdout_contains("Dalec: Debug")
        .assert_stdout_contains("Dalec: Build");
}

/// JSON output carries the extracted facts
#[test]
fn test_inspect_json() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &full_spec()).unwrap();

    let output = project.run(&["inspect", "dalec.yml", "--format", "json"]);
    output.assert_success();
    let report: Value = serde_json::from_str(&output.stdout).unwrap();

    assert_eq!(report["recognized"], true);
    assert_eq!(report["facts"]["targets"], serde_json::json!(["azlinux3", "jammy"]));
    assert_eq!(report["facts"]["contexts"], serde_json::json!(["context", "other"]));
    assert_eq!(report["facts"]["args"]["VERSION"], "1.2");
    assert_eq!(report["facts"]["args"]["REVISION"], Value::Null);
    assert_eq!(report["actions"], serde_json::json!(["Dalec: Debug", "Dalec: Build"]));
    assert!(report["schema"].as_str().unwrap().starts_with("dalecspec://"));
    assert!(report["key"].as_str().unwrap().starts_with("file://"));
}

/// A YAML file without the syntax marker is rejected in text mode
#[test]
fn test_inspect_not_a_spec() {
    let project = TestProject::new().unwrap();
    project.write("plain.yml", "name: demo\ntargets:\n  jammy: {}\n").unwrap();

    let output = project.run(&["inspect", "plain.yml"]);
    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    output.assert_stderr_contains("not recognized as a Dalec spec");
}

/// JSON mode reports an unrecognized document without failing
#[test]
fn test_inspect_not_a_spec_json() {
    let project = TestProject::new().unwrap();
    project.write("plain.yml", "name: demo\n").unwrap();

    let output = project.run(&["inspect", "plain.yml", "--format", "json"]);
    output.assert_success();
    let report: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(report["recognized"], false);
    assert!(report.get("facts").is_none());
    assert_eq!(report["actions"], serde_json::json!([]));
}

/// Broken YAML still yields targets through the line scanner
#[test]
fn test_inspect_strategies_on_invalid_yaml() {
    let project = TestProject::new().unwrap();
    project
        .write("dalec.yml", &format!("{SYNTAX_LINE}\ntargets:\n  azlinux3:\n    image: [unclosed\n"))
        .unwrap();

    let structural = project.run(&["inspect", "dalec.yml", "--strategy", "structural", "--format", "json"]);
    structural.assert_success();
    let report: Value = serde_json::from_str(&structural.stdout).unwrap();
    assert_eq!(report["recognized"], true);
    assert_eq!(report["facts"]["targets"], serde_json::json!([]));

    for strategy in ["heuristic", "auto"] {
        let output = project.run(&["inspect", "dalec.yml", "--strategy", strategy, "--format", "json"]);
        output.assert_success();
        let report: Value = serde_json::from_str(&output.stdout).unwrap();
        assert_eq!(report["facts"]["targets"], serde_json::json!(["azlinux3"]), "strategy {strategy}");
    }
}

/// Missing files fail with a readable message
#[test]
fn test_inspect_missing_file() {
    let project = TestProject::new().unwrap();
    let output = project.run(&["inspect", "missing.yml"]);
    assert!(!output.success);
    output.assert_stderr_contains("missing.yml");
}
