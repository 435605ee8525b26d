//! Cross-platform utilities and helpers
//!
//! - [`platform`] - Home directory, path resolution and shell detection
//! - [`progress`] - Spinners for long-running operations

pub mod platform;
pub mod progress;

pub use progress::{ProgressBar, spinner_with_message};
