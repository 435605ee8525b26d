use crate::common::{SYNTAX_LINE, TestProject};

fn write_spec(project: &TestProject) {
    project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\n")).unwrap();
}

/// The URI encodes the workspace root found through `.git`
#[test]
fn test_schema_uri() {
    let project = TestProject::new().unwrap();
    write_spec(&project);

    let output = project.run(&["schema", "dalec.yml", "--uri"]);
    output.assert_success();
    let uri = output.stdout.trim();
    assert!(uri.starts_with("dalecspec://file%3A%2F%2F"), "{uri}");
    assert!(uri.ends_with("workspace/spec"), "{uri}");
}

/// The workspace copy of the schema wins over the bundled one
#[test]
fn test_schema_content_prefers_workspace() {
    let project = TestProject::new().unwrap();
    write_spec(&project);
    let bundled = project.write("bundled/spec.schema.json", r#"{"title":"bundled"}"#).unwrap();
    project.write_config(&format!("[schema]\nbundled = '{}'\n", bundled.display())).unwrap();

    project.run(&["schema", "dalec.yml"]).assert_success().assert_stdout_contains(r#"{"title":"bundled"}"#);

    project.write("docs/spec.schema.json", r#"{"title":"local"}"#).unwrap();
    project.run(&["schema", "dalec.yml"]).assert_success().assert_stdout_contains(r#"{"title":"local"}"#);
}

/// No schema anywhere is an error
#[test]
fn test_schema_unavailable() {
    let project = TestProject::new().unwrap();
    write_spec(&project);
    let missing = project.path("nowhere/spec.schema.json");
    project.write_config(&format!("[schema]\nbundled = '{}'\n", missing.display())).unwrap();

    let output = project.run(&["schema", "dalec.yml"]);
    assert!(!output.success);
    output.assert_stderr_contains("Unable to load Dalec spec schema");
}

/// Plain YAML gets no schema
#[test]
fn test_schema_not_a_spec() {
    let project = TestProject::new().unwrap();
    project.write("plain.yml", "name: demo\n").unwrap();

    let output = project.run(&["schema", "plain.yml", "--uri"]);
    assert!(!output.success);
    output.assert_stderr_contains("not recognized as a Dalec spec");
}
