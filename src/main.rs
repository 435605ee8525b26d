//! dalec-assist binary entry point.
//!
//! Parses arguments, runs the selected command and turns failures into a colored,
//! actionable message on stderr with exit code 1.

use anyhow::{Context, Result};
use clap::Parser;
use dalec_assist::cli;
use dalec_assist::core::user_friendly_error;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    let result = runtime.block_on(cli.execute());
    // `dap` may leave a stdin read parked on a blocking thread while the client keeps the
    // pipe open; don't wait for it.
    runtime.shutdown_background();

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
