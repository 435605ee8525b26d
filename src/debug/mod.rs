//! Debugging Dalec builds through the buildx debug adapter.
//!
//! A debug session starts from a [`DebugConfiguration`], the JSON object an editor stores
//! in its launch configurations. It is resolved in two passes:
//!
//! 1. [`resolve_debug_configuration`] fills defaults before variables are substituted:
//!    the spec falls back to the active Dalec spec, the context to the workspace folder or
//!    the spec's directory
//! 2. [`resolve_with_substituted_variables`] validates the final values and produces a
//!    [`LaunchRequest`] with absolute paths and a typed build-argument map
//!
//! [`adapter_descriptor`] turns a launch request into the `docker buildx dap build`
//! process that speaks the Debug Adapter Protocol, and [`proxy`] runs that process while
//! remapping breakpoint positions with [`breakpoints`].

pub mod breakpoints;
pub mod protocol;
pub mod proxy;

pub use breakpoints::{BreakpointMapper, OpenDocuments, SourceLayout};
pub use protocol::DapMessage;
pub use proxy::run_adapter_proxy;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::command::{BuildInputs, BuildMode, CommandAssembler};
use crate::constants::{BUILDX_EXPERIMENTAL_ENV, DEBUG_TYPE};
use crate::core::DalecError;
use crate::selection::{is_remote_context, resolve_context_value};
use crate::utils::platform::absolute_path;

const LAUNCH_REQUEST: &str = "launch";

/// A launch configuration as stored by an editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfiguration {
    /// Debugger type, always `dalec-buildx` once resolved.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// `launch`; `attach` is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Must be an object of scalar values when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_args: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_contexts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_cache: bool,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn invalid(reason: &str) -> anyhow::Error {
    DalecError::InvalidDebugConfiguration {
        reason: reason.to_string(),
    }
    .into()
}

fn require_target(config: &DebugConfiguration) -> Result<()> {
    if non_empty(config.target.as_deref()).is_none() {
        return Err(invalid("A Dalec target name is required (debug configuration \"target\")"));
    }
    Ok(())
}

/// First pass over a launch configuration, before `${...}` variables are substituted.
///
/// `folder` is the workspace folder the configuration belongs to and `active_spec` the
/// Dalec spec the user is looking at, if any.
///
/// # Errors
///
/// [`DalecError::InvalidDebugConfiguration`] for non-launch requests, a missing target or
/// when no spec file can be determined.
pub fn resolve_debug_configuration(
    mut config: DebugConfiguration,
    folder: Option<&Path>,
    active_spec: Option<&Path>,
) -> Result<DebugConfiguration> {
    config.kind = DEBUG_TYPE.to_string();
    let request = config.request.get_or_insert_with(|| LAUNCH_REQUEST.to_string());
    if request.as_str() != LAUNCH_REQUEST {
        return Err(invalid("Dalec Buildx debugger only supports launch requests"));
    }
    require_target(&config)?;

    let spec_file = match non_empty(config.spec_file.as_deref()) {
        Some(spec) => spec.to_string(),
        None => active_spec
            .map(|path| path.display().to_string())
            .ok_or_else(|| invalid("No Dalec spec file set. Provide \"specFile\" or open a Dalec spec"))?,
    };

    if non_empty(config.context.as_deref()).is_none() {
        config.context = match folder {
            Some(folder) => Some(folder.display().to_string()),
            None if !spec_file.contains("${") => {
                Path::new(&spec_file).parent().map(|dir| dir.display().to_string())
            }
            None => None,
        };
    }
    config.spec_file = Some(spec_file);
    Ok(config)
}

/// A fully resolved launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub name: String,
    pub target: String,
    pub spec_file: PathBuf,
    /// Absolute directory, or a remote reference passed through verbatim.
    pub context: String,
    pub build_args: BTreeMap<String, String>,
    pub build_contexts: BTreeMap<String, String>,
    pub no_cache: bool,
}

fn resolve_launch_path(value: &str, folder: Option<&Path>) -> Result<PathBuf> {
    let path = Path::new(value);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    match folder {
        Some(folder) => Ok(folder.join(path)),
        None => absolute_path(path),
    }
}

/// Named build contexts follow the prompt rule: remote references verbatim, local paths
/// against the workspace folder.
fn resolve_build_context(value: &str, folder: Option<&Path>) -> Result<String> {
    match folder {
        Some(folder) => resolve_context_value(value, folder),
        None if is_remote_context(value.trim()) => Ok(value.trim().to_string()),
        None => Ok(resolve_launch_path(value.trim(), None)?.display().to_string()),
    }
}

fn scalar_to_string(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(DalecError::InvalidBuildArgs {
            reason: format!("value of '{name}' must be a string"),
        }
        .into()),
    }
}

/// Convert a `buildArgs` value into a map.
///
/// # Errors
///
/// [`DalecError::InvalidBuildArgs`] when the value is not an object of scalars.
pub fn parse_build_args(value: Option<&Value>) -> Result<BTreeMap<String, String>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, value)| Ok((name.clone(), scalar_to_string(name, value)?)))
            .collect(),
        Some(_) => Err(DalecError::InvalidBuildArgs {
            reason: "value must be an object map".to_string(),
        }
        .into()),
    }
}

/// Second pass, on the configuration with variables substituted.
///
/// Relative paths resolve against `folder` (or the current directory), and the spec file
/// must exist.
///
/// # Errors
///
/// [`DalecError::InvalidDebugConfiguration`] for a missing target or spec,
/// [`DalecError::SpecFileNotFound`] when the spec is not on disk and
/// [`DalecError::InvalidBuildArgs`] for a malformed `buildArgs`.
pub async fn resolve_with_substituted_variables(
    config: &DebugConfiguration,
    folder: Option<&Path>,
) -> Result<LaunchRequest> {
    require_target(config)?;
    let target = non_empty(config.target.as_deref()).unwrap_or_default().to_string();

    let spec = non_empty(config.spec_file.as_deref()).ok_or_else(|| invalid("Dalec spec file could not be resolved"))?;
    let spec_file = resolve_launch_path(spec, folder)?;
    if tokio::fs::metadata(&spec_file).await.is_err() {
        return Err(DalecError::SpecFileNotFound {
            path: spec_file.display().to_string(),
        }
        .into());
    }

    let context = match non_empty(config.context.as_deref()) {
        Some(remote) if is_remote_context(remote) => remote.to_string(),
        Some(local) => resolve_launch_path(local, folder)?.display().to_string(),
        None => spec_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .display()
            .to_string(),
    };

    let build_args = parse_build_args(config.build_args.as_ref())?;
    let build_contexts = config
        .build_contexts
        .iter()
        .map(|(name, value)| Ok((name.clone(), resolve_build_context(value, folder)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;
    let name = if config.name.is_empty() {
        format!("Dalec: Debug {target}")
    } else {
        config.name.clone()
    };

    Ok(LaunchRequest {
        name,
        target,
        spec_file,
        context,
        build_args,
        build_contexts,
        no_cache: config.no_cache,
    })
}

/// How to start the debug adapter process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchDescriptor {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// The `docker buildx dap build` process for `launch`.
///
/// The adapter runs in the context directory; remote contexts run next to the spec.
pub fn adapter_descriptor(
    assembler: &CommandAssembler,
    launch: &LaunchRequest,
    extra_env: &BTreeMap<String, String>,
) -> LaunchDescriptor {
    let invocation = assembler.assemble(
        BuildMode::Debug,
        &BuildInputs {
            target: &launch.target,
            spec_path: &launch.spec_file,
            context: &launch.context,
            build_args: &launch.build_args,
            build_contexts: &launch.build_contexts,
            no_cache: launch.no_cache,
        },
    );

    let cwd = if is_remote_context(&launch.context) {
        launch.spec_file.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        PathBuf::from(&launch.context)
    };

    let mut env = extra_env.clone();
    env.insert(BUILDX_EXPERIMENTAL_ENV.to_string(), "1".to_string());

    LaunchDescriptor {
        command: invocation.program,
        args: invocation.args,
        cwd,
        env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DalecError;
    use serde_json::json;
    use tempfile::TempDir;

    fn error_of(result: Result<impl std::fmt::Debug>) -> DalecError {
        result.unwrap_err().downcast::<DalecError>().unwrap()
    }

    fn configuration(value: Value) -> DebugConfiguration {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_pass_defaults() {
        let config = configuration(json!({"target": "azlinux3"}));
        let resolved =
            resolve_debug_configuration(config, Some(Path::new("/ws")), Some(Path::new("/ws/specs/dalec.yml"))).unwrap();
        assert_eq!(resolved.kind, "dalec-buildx");
        assert_eq!(resolved.request.as_deref(), Some("launch"));
        assert_eq!(resolved.spec_file.unwrap(), Path::new("/ws/specs/dalec.yml").display().to_string());
        assert_eq!(resolved.context.unwrap(), Path::new("/ws").display().to_string());
    }

    #[test]
    fn test_first_pass_context_without_folder() {
        let config = configuration(json!({"target": "t", "specFile": "/ws/specs/dalec.yml"}));
        let resolved = resolve_debug_configuration(config, None, None).unwrap();
        assert_eq!(resolved.context.unwrap(), Path::new("/ws/specs").display().to_string());

        let config = configuration(json!({"target": "t", "specFile": "${workspaceFolder}/dalec.yml"}));
        let resolved = resolve_debug_configuration(config, None, None).unwrap();
        assert_eq!(resolved.context, None);
    }

    #[test]
    fn test_first_pass_rejections() {
        let attach = configuration(json!({"request": "attach", "target": "t", "specFile": "a.yml"}));
        assert!(matches!(
            error_of(resolve_debug_configuration(attach, None, None)),
            DalecError::InvalidDebugConfiguration { .. }
        ));

        let no_target = configuration(json!({"specFile": "a.yml", "target": "  "}));
        assert!(matches!(
            error_of(resolve_debug_configuration(no_target, None, None)),
            DalecError::InvalidDebugConfiguration { .. }
        ));

        let no_spec = configuration(json!({"target": "t"}));
        assert!(matches!(
            error_of(resolve_debug_configuration(no_spec, None, None)),
            DalecError::InvalidDebugConfiguration { .. }
        ));
    }

    #[tokio::test]
    async fn test_second_pass_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("specs")).unwrap();
        std::fs::write(dir.path().join("specs/dalec.yml"), "# syntax=dalec\n").unwrap();

        let config = configuration(json!({
            "target": "t",
            "specFile": "specs/dalec.yml",
            "buildArgs": {"FOO": "bar", "N": 3, "FLAG": true}
        }));
        let launch = resolve_with_substituted_variables(&config, Some(dir.path())).await.unwrap();
        assert_eq!(launch.spec_file, dir.path().join("specs/dalec.yml"));
        assert_eq!(launch.context, dir.path().join("specs").display().to_string());
        assert_eq!(launch.name, "Dalec: Debug t");
        assert_eq!(launch.build_args.get("FOO").unwrap(), "bar");
        assert_eq!(launch.build_args.get("N").unwrap(), "3");
        assert_eq!(launch.build_args.get("FLAG").unwrap(), "true");

        let config = configuration(json!({"target": "t", "specFile": "specs/dalec.yml", "context": "src"}));
        let launch = resolve_with_substituted_variables(&config, Some(dir.path())).await.unwrap();
        assert_eq!(launch.context, dir.path().join("src").display().to_string());
    }

    #[tokio::test]
    async fn test_second_pass_resolves_build_contexts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dalec.yml"), "# syntax=dalec\n").unwrap();

        let config = configuration(json!({
            "target": "t",
            "specFile": "dalec.yml",
            "buildContexts": {
                "vendor": "third_party/vendor",
                "root": ".",
                "base": "docker-image://alpine:3.20",
                "abs": "/opt/src"
            }
        }));
        let launch = resolve_with_substituted_variables(&config, Some(dir.path())).await.unwrap();
        assert_eq!(launch.build_contexts["vendor"], dir.path().join("third_party/vendor").display().to_string());
        assert_eq!(launch.build_contexts["root"], dir.path().display().to_string());
        assert_eq!(launch.build_contexts["base"], "docker-image://alpine:3.20");
        assert_eq!(launch.build_contexts["abs"], Path::new("/opt/src").display().to_string());
    }

    #[tokio::test]
    async fn test_second_pass_errors() {
        let dir = TempDir::new().unwrap();
        let missing = configuration(json!({"target": "t", "specFile": "nope.yml"}));
        assert!(matches!(
            error_of(resolve_with_substituted_variables(&missing, Some(dir.path())).await),
            DalecError::SpecFileNotFound { .. }
        ));

        std::fs::write(dir.path().join("dalec.yml"), "# syntax=dalec\n").unwrap();
        for bad in [json!("FOO=bar"), json!(["FOO"]), json!({"FOO": {"nested": 1}}), json!({"FOO": null})] {
            let config = configuration(json!({"target": "t", "specFile": "dalec.yml", "buildArgs": bad}));
            assert!(matches!(
                error_of(resolve_with_substituted_variables(&config, Some(dir.path())).await),
                DalecError::InvalidBuildArgs { .. }
            ));
        }
    }

    #[test]
    fn test_adapter_descriptor() {
        let launch = LaunchRequest {
            name: "Dalec: Debug t".to_string(),
            target: "t".to_string(),
            spec_file: PathBuf::from("/ws/dalec.yml"),
            context: "/ws".to_string(),
            build_args: [("FOO".to_string(), "bar".to_string())].into(),
            build_contexts: BTreeMap::new(),
            no_cache: false,
        };
        let descriptor = adapter_descriptor(&CommandAssembler::default(), &launch, &BTreeMap::new());
        assert_eq!(descriptor.command, "docker");
        assert_eq!(&descriptor.args[..3], ["buildx", "dap", "build"]);
        assert_eq!(descriptor.args.last().unwrap(), &Path::new("/ws").display().to_string());
        assert_eq!(descriptor.cwd, PathBuf::from("/ws"));
        assert_eq!(descriptor.env.get("BUILDX_EXPERIMENTAL").unwrap(), "1");

        let remote = LaunchRequest {
            context: "https://example.com/repo.git".to_string(),
            ..launch
        };
        let descriptor = adapter_descriptor(&CommandAssembler::default(), &remote, &BTreeMap::new());
        assert_eq!(descriptor.cwd, PathBuf::from("/ws"));
    }
}
