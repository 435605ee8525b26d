use predicates::prelude::*;

use crate::common::{SYNTAX_LINE, TestProject};

fn write_launch(project: &TestProject, json: &str) -> String {
    project.write("launch.json", json).unwrap().display().to_string()
}

/// A launch configuration without target is rejected
#[test]
fn test_dap_requires_target() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\n")).unwrap();
    let launch = write_launch(&project, r#"{"type":"dalec-buildx","request":"launch","specFile":"dalec.yml"}"#);

    project
        .command()
        .args(["dap", "--launch", &launch])
        .assert()
        .failure()
        .stderr(predicate::str::contains("A Dalec target name is required"));
}

/// Attach requests are not supported
#[test]
fn test_dap_rejects_attach() {
    let project = TestProject::new().unwrap();
    let launch = write_launch(&project, r#"{"request":"attach","target":"azlinux3"}"#);

    project
        .command()
        .args(["dap", "--launch", &launch])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only supports launch requests"));
}

/// The spec file must exist after variable substitution
#[test]
fn test_dap_missing_spec() {
    let project = TestProject::new().unwrap();
    let launch = write_launch(&project, r#"{"target":"azlinux3","specFile":"missing.yml"}"#);

    project
        .command()
        .args(["dap", "--launch", &launch])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dalec spec file not found"));
}

/// Malformed launch JSON and build args
#[test]
fn test_dap_invalid_json() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\n")).unwrap();

    let launch = write_launch(&project, "{not json");
    project
        .command()
        .args(["dap", "--launch", &launch])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid JSON in"));

    let launch = write_launch(&project, r#"{"target":"azlinux3","specFile":"dalec.yml","buildArgs":["A=1"]}"#);
    project
        .command()
        .args(["dap", "--launch", &launch])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid buildArgs"));
}

/// setBreakpoints requests reach the adapter with columns filled in
#[cfg(unix)]
#[test]
fn test_dap_proxy_fills_breakpoint_columns() {
    let project = TestProject::new().unwrap();
    let spec = project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\ntargets:\n  azlinux3: {{}}\n")).unwrap();
    let capture = project.path("captured.bin");
    let script = project.write_script("bin/fake-adapter", "cat > \"$DAP_CAPTURE\"").unwrap();
    project
        .write_config(&format!(
            "[buildx]\ncommand = ['{}']\n\n[buildx.env]\nDAP_CAPTURE = '{}'\n",
            script.display(),
            capture.display()
        ))
        .unwrap();

    let launch = write_launch(
        &project,
        &format!(
            r#"{{"type":"dalec-buildx","request":"launch","target":"azlinux3","specFile":"{}","context":"{}"}}"#,
            spec.display(),
            project.root().display()
        ),
    );

    let body = format!(
        r#"{{"seq":1,"type":"request","command":"setBreakpoints","arguments":{{"source":{{"path":"{}"}},"breakpoints":[{{"line":4}}]}}}}"#,
        spec.display()
    );
    let framed = format!("Content-Length: {}\r\n\r\n{body}", body.len());

    project.command().args(["dap", "--launch", &launch]).write_stdin(framed).assert().success();

    let captured = std::fs::read_to_string(&capture).unwrap();
    assert!(captured.starts_with("Content-Length: "), "{captured}");
    assert!(captured.contains(r#""column":11"#), "{captured}");
    assert!(captured.contains(r#""line":4"#), "{captured}");
}

/// A failing adapter makes the command fail
#[cfg(unix)]
#[test]
fn test_dap_adapter_failure() {
    let project = TestProject::new().unwrap();
    let spec = project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\n")).unwrap();
    let script = project.write_script("bin/fake-adapter", "exit 4").unwrap();
    project.write_config(&format!("[buildx]\ncommand = ['{}']\n", script.display())).unwrap();
    let launch = write_launch(
        &project,
        &format!(r#"{{"target":"azlinux3","specFile":"{}"}}"#, spec.display()),
    );

    project
        .command()
        .args(["dap", "--launch", &launch])
        .assert()
        .failure()
        .stderr(predicate::str::contains("docker buildx dap build failed"));
}

/// The command returns when the adapter exits, even while the client keeps stdin open
#[cfg(unix)]
#[test]
fn test_dap_exits_with_client_stdin_open() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let project = TestProject::new().unwrap();
    let spec = project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\n")).unwrap();
    let script = project.write_script("bin/fake-adapter", "exit 0").unwrap();
    project.write_config(&format!("[buildx]\ncommand = ['{}']\n", script.display())).unwrap();
    let launch = write_launch(
        &project,
        &format!(r#"{{"target":"azlinux3","specFile":"{}"}}"#, spec.display()),
    );

    let mut child = project
        .spawnable()
        .args(["dap", "--launch", &launch])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let _client_stdin = child.stdin.take();

    let deadline = Instant::now() + Duration::from_secs(30);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().ok();
            panic!("dap kept running after the adapter exited");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success());
}
