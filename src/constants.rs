//! Global constants used throughout the dalec-assist codebase.
//!
//! This module contains cache lifetimes, well-known names and environment
//! variables that are shared by several modules. Defining them centrally
//! makes magic values discoverable.

use std::time::Duration;

/// How long a successful `--call targets` result stays fresh (5 minutes).
///
/// Stale entries are refreshed on the next lookup, but a failed refresh
/// still returns the stale value.
pub const FRONTEND_TARGET_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Ceiling on captured subprocess output and on one DAP message body (20 MiB).
pub const MAX_PROCESS_OUTPUT_BYTES: usize = 20 * 1024 * 1024;

/// Name of the implicit, unnamed build context.
pub const DEFAULT_CONTEXT_NAME: &str = "context";

/// Environment variable that enables experimental buildx features (`--call`, `dap`).
pub const BUILDX_EXPERIMENTAL_ENV: &str = "BUILDX_EXPERIMENTAL";

/// Default binary used to reach buildx.
pub const DEFAULT_BUILDX_BINARY: &str = "docker";

/// Default subcommand prefix placed after the binary.
pub const DEFAULT_BUILDX_SUBCOMMAND: &str = "buildx";

/// URI scheme registered with YAML schema services.
pub const SCHEMA_SCHEME: &str = "dalecspec";

/// Authority used in schema URIs when a document has no owning workspace.
pub const SCHEMA_GLOBAL_AUTHORITY: &str = "global";

/// Workspace-relative location of a schema override.
pub const WORKSPACE_SCHEMA_PATH: [&str; 2] = ["docs", "spec.schema.json"];

/// Location of the bundled schema relative to the data directory.
pub const FALLBACK_SCHEMA_PATH: [&str; 2] = ["schemas", "spec.schema.json"];

/// Debug configuration type understood by the buildx debug adapter integration.
pub const DEBUG_TYPE: &str = "dalec-buildx";

/// Pre-fill used for context prompts when nothing was chosen before.
pub const DEFAULT_CONTEXT_PROMPT_VALUE: &str = ".";
