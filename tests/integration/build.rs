use predicates::prelude::*;

use crate::common::{SYNTAX_LINE, TestProject};

fn simple_spec() -> String {
    format!("{SYNTAX_LINE}\nname: demo\ntargets:\n  azlinux3: {{}}\n  jammy: {{}}\n")
}

/// Dry run prints the comment and the command without running anything
#[test]
fn test_build_dry_run() {
    let project = TestProject::new().unwrap();
    let spec = project.write("dalec.yml", &simple_spec()).unwrap();

    let output = project.run(&["build", "dalec.yml", "--target", "azlinux3", "--dry-run"]);
    output
        .assert_success()
        .assert_stdout_contains("Dalec build of target 'azlinux3' from dalec.yml")
        .assert_stdout_contains(&format!("docker buildx build --target azlinux3 -f {}", spec.display()));
    assert!(!output.stdout.contains("--no-cache"));
    output.assert_stderr_contains("Dalec Build (azlinux3)");
}

/// The configured command prefix and no-cache default are honoured
#[test]
fn test_build_dry_run_with_config() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &simple_spec()).unwrap();
    project.write_config("[buildx]\ncommand = [\"podman\", \"buildx\"]\nno_cache = true\n").unwrap();

    let output = project.run(&["build", "dalec.yml", "--target", "jammy", "--dry-run"]);
    output
        .assert_success()
        .assert_stdout_contains("podman buildx build --target jammy -f ")
        .assert_stdout_contains(" --no-cache ");
}

/// `--no-cache` on the command line
#[test]
fn test_build_no_cache_flag() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &simple_spec()).unwrap();

    project
        .command()
        .args(["build", "dalec.yml", "--target", "jammy", "--no-cache", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--target jammy").and(predicate::str::contains(" --no-cache ")));
}

/// Documents without the syntax marker are refused
#[test]
fn test_build_not_a_spec() {
    let project = TestProject::new().unwrap();
    project.write("plain.yml", "name: demo\n").unwrap();

    project
        .command()
        .args(["build", "plain.yml", "--target", "jammy", "--dry-run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not recognized as a Dalec spec"));
}

/// A broken config file is reported before anything else happens
#[test]
fn test_build_invalid_config() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &simple_spec()).unwrap();
    project.write_config("[buildx]\ncommand = []\n").unwrap();

    project
        .command()
        .args(["build", "dalec.yml", "--target", "jammy", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[buildx].command must name a program"));
}
