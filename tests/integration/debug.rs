use serde_json::Value;

use crate::common::{SYNTAX_LINE, TestProject};

/// The launch configuration, resolved launch and adapter process are printed as JSON
#[test]
fn test_debug_prints_launch() {
    let project = TestProject::new().unwrap();
    let spec = project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\ntargets:\n  azlinux3: {{}}\n")).unwrap();

    let output = project.run(&["debug", "dalec.yml", "--target", "azlinux3"]);
    output.assert_success();
    let document: Value = serde_json::from_str(&output.stdout).unwrap();

    let configuration = &document["configuration"];
    assert_eq!(configuration["type"], "dalec-buildx");
    assert_eq!(configuration["request"], "launch");
    assert_eq!(configuration["name"], "Dalec: Debug azlinux3");
    assert_eq!(configuration["target"], "azlinux3");
    assert_eq!(configuration["specFile"], spec.display().to_string());

    assert_eq!(document["launch"]["specFile"], spec.display().to_string());
    assert_eq!(document["launch"]["buildArgs"], serde_json::json!({}));

    let adapter = &document["adapter"];
    assert_eq!(adapter["command"], "docker");
    assert_eq!(adapter["args"][0], "buildx");
    assert_eq!(adapter["args"][1], "dap");
    assert_eq!(adapter["args"][2], "build");
    assert_eq!(adapter["args"][3], "--target");
    assert_eq!(adapter["args"][4], "azlinux3");
    assert_eq!(adapter["env"]["BUILDX_EXPERIMENTAL"], "1");
}

/// `--no-cache` reaches the adapter arguments
#[test]
fn test_debug_no_cache() {
    let project = TestProject::new().unwrap();
    project.write("dalec.yml", &format!("{SYNTAX_LINE}\nname: demo\ntargets:\n  azlinux3: {{}}\n")).unwrap();

    let output = project.run(&["debug", "dalec.yml", "--target", "azlinux3", "--no-cache"]);
    output.assert_success();
    let document: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(document["configuration"]["noCache"], true);
    let args: Vec<&str> =
        document["adapter"]["args"].as_array().unwrap().iter().map(|arg| arg.as_str().unwrap()).collect();
    assert!(args.contains(&"--no-cache"));
}
