//! Test utilities for dalec-assist
//!
//! - [`fakes`] - scripted prompts, a fake process runner and a recording output sink
//! - [`fixtures`] - spec builders and temporary workspaces
//!
//! # Example
//!
//! ```rust,no_run
//! use dalec_assist::test_utils::{ScriptedAnswer, ScriptedPrompts, SpecFixture, TestWorkspace};
//!
//! let workspace = TestWorkspace::new().unwrap();
//! let spec = workspace
//!     .write_spec("dalec.yml", &SpecFixture::basic().named_context("vendor"))
//!     .unwrap();
//! let prompts = ScriptedPrompts::new([ScriptedAnswer::Input("./vendor".into())]);
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{AskedPrompt, FakeProcessRunner, RecordingOutput, ScriptedAnswer, ScriptedPrompts};
pub use fixtures::{SYNTAX_LINE, SpecFixture, TestWorkspace};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise `RUST_LOG`; with
/// neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=targets=debug,buildx=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
