//! Configuration for dalec-assist.
//!
//! There is a single user-level file, see [`global`] for its format and location.

pub mod global;

pub use global::{AssistConfig, BuildxConfig, SchemaConfig, TargetsConfig, TerminalConfig};
