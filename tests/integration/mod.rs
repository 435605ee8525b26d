//! Integration test suite for dalec-assist
//!
//! End-to-end tests that run the `dalec-assist` binary against temporary workspaces.
//! External tools are replaced by small shell scripts configured through `[buildx].command`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **build**: `build --dry-run` command rendering
//! - **dap**: launch configuration handling and the stdio proxy
//! - **debug**: launch configuration output
//! - **inspect**: recognition and fact output
//! - **schema**: schema URI and content
//! - **targets**: static and frontend target listing

#[path = "../common/mod.rs"]
mod common;

mod build;
mod dap;
mod debug;
mod inspect;
mod schema;
mod targets;
