//! dalec-assist - tooling for Dalec build specifications
//!
//! A helper for developers who build container images with `docker buildx` and the Dalec
//! frontend. It recognizes Dalec spec documents, extracts the facts a build needs (targets,
//! named build contexts, build arguments), discovers additional targets by asking the
//! frontend itself, collects the missing values interactively and assembles the exact
//! `docker buildx` command line, or a launch configuration for the buildx debug adapter.
//!
//! # Architecture Overview
//!
//! The crate is host-agnostic. Everything that would normally be provided by an editor
//! (prompts, terminals, notifications, subprocesses) is reached through the narrow traits
//! in [`host`]. The bundled CLI provides a terminal implementation of those traits.
//!
//! ```text
//!   tracker ──► spec (fact extraction)
//!      │
//!   session ──► targets (static + `--call targets`) ──► host::ProcessRunner
//!      │
//!      ├──────► selection (target / contexts / args) ──► host::UserPrompts
//!      │
//!      └──────► command (argv, shell rendering, launch descriptors) ──► host::OutputSink
//!
//!   debug::proxy ──► debug::breakpoints (column remapping of setBreakpoints)
//! ```
//!
//! # Core Modules
//!
//! - [`spec`] - Recognition marker and fact extraction (structural + line-scan fallback)
//! - [`tracker`] - Live mapping from open documents to their extracted facts
//! - [`targets`] - Target discovery through `docker buildx build --call targets`
//! - [`selection`] - Interactive target/context/argument collection and reuse rules
//! - [`command`] - `docker buildx` argv assembly and shell rendering
//! - [`debug`] - Debug configurations, DAP message model, breakpoint column mapping
//! - [`schema`] - JSON schema contributor for YAML validation services
//! - [`session`] - Coordinator owning all process-lifetime caches
//!
//! ## Supporting Modules
//! - [`cli`] - Command-line interface
//! - [`config`] - User configuration (`~/.dalec-assist/config.toml`)
//! - [`core`] - Error types and user-facing error reporting
//! - [`host`] - Capability traits and their terminal implementations
//! - [`utils`] - Platform helpers and progress spinners
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Show what dalec-assist knows about a spec
//! dalec-assist inspect ./dalec.yml
//!
//! # Build a target, prompting for contexts and build args
//! dalec-assist build ./dalec.yml
//!
//! # Emit a debug launch configuration for the buildx DAP adapter
//! dalec-assist debug ./dalec.yml --target azlinux3
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod constants;
pub mod core;
pub mod debug;
pub mod host;
pub mod schema;
pub mod selection;
pub mod session;
pub mod spec;
pub mod targets;
pub mod tracker;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
