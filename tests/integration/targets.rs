use serde_json::Value;

use crate::common::{SYNTAX_LINE, TestProject};

fn write_spec(project: &TestProject) {
    project
        .write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\ntargets:\n  jammy: {{}}\n  azlinux3: {{}}\n"))
        .unwrap();
}

/// Declared targets only, sorted
#[test]
fn test_targets_static_only() {
    let project = TestProject::new().unwrap();
    write_spec(&project);

    let output = project.run(&["targets", "dalec.yml", "--static-only", "--format", "json"]);
    output.assert_success();
    let targets: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(targets, serde_json::json!([{"name": "azlinux3"}, {"name": "jammy"}]));
}

/// Frontend targets are merged with the declared ones
#[cfg(unix)]
#[test]
fn test_targets_from_frontend() {
    let project = TestProject::new().unwrap();
    write_spec(&project);
    let script = project
        .write_script(
            "bin/fake-buildx",
            r#"echo '{"targets":[{"name":"azlinux3","description":"Azure Linux 3 package","default":true},{"name":"debug/gomods"}]}'"#,
        )
        .unwrap();
    project.write_config(&format!("[buildx]\ncommand = ['{}']\n", script.display())).unwrap();

    let output = project.run(&["targets", "dalec.yml", "--format", "json"]);
    output.assert_success();
    let targets: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(
        targets,
        serde_json::json!([
            {"name": "azlinux3", "description": "Azure Linux 3 package", "is_default": true},
            {"name": "debug/gomods"},
            {"name": "jammy"},
        ])
    );

    project
        .run(&["targets", "dalec.yml"])
        .assert_success()
        .assert_stdout_contains("Azure Linux 3 package")
        .assert_stdout_contains("(default)");
}

/// A failing frontend only warns
#[cfg(unix)]
#[test]
fn test_targets_frontend_failure_falls_back() {
    let project = TestProject::new().unwrap();
    write_spec(&project);
    let script = project.write_script("bin/fake-buildx", "echo 'frontend exploded' >&2\nexit 3").unwrap();
    project.write_config(&format!("[buildx]\ncommand = ['{}']\n", script.display())).unwrap();

    let output = project.run(&["targets", "dalec.yml"]);
    output
        .assert_success()
        .assert_stdout_contains("azlinux3")
        .assert_stdout_contains("jammy")
        .assert_stderr_contains("Failed to query Dalec targets")
        .assert_stderr_contains("frontend exploded");
}

/// A missing buildx binary only warns
#[test]
fn test_targets_missing_binary() {
    let project = TestProject::new().unwrap();
    write_spec(&project);
    project.write_config("[buildx]\ncommand = ['dalec-assist-no-such-binary']\n").unwrap();

    project
        .run(&["targets", "dalec.yml"])
        .assert_success()
        .assert_stdout_contains("jammy")
        .assert_stderr_contains("Failed to query Dalec targets");
}
