//! Spinners for long-running `docker buildx` queries.
//!
//! Wraps `indicatif` with consistent styling. Spinners are hidden when progress output is
//! disabled (`--no-progress`), and `indicatif` already hides them when stderr is not a
//! terminal.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// A spinner with dalec-assist styling.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a spinner for an operation of unknown duration.
    ///
    /// The spinner uses Unicode Braille patterns (`⠋ ⠙ ⠹ ⠸ ⠼ ⠴ ⠦ ⠧ ⠇ ⠏`) and ticks every
    /// 100ms. When `enabled` is false a hidden bar is returned that ignores all calls.
    pub fn new_spinner(enabled: bool) -> Self {
        let bar = if enabled {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self { inner: bar }
    }

    /// Sets the message displayed next to the spinner.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Stops the spinner and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// Creates a spinner showing `msg`.
pub fn spinner_with_message(enabled: bool, msg: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner(enabled);
    spinner.set_message(msg);
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner_ignores_calls() {
        let spinner = spinner_with_message(false, "Querying");
        spinner.set_message("still querying");
        spinner.finish_and_clear();
    }
}
