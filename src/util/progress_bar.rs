
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Shared function to pull our busy-indicator styling
pub fn get_spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("|/-\\ ")
}

/// Busy indicator shown while an external engine runs; there is no progress to report
pub struct Spinner {
    bar: ProgressBar
}

impl Spinner {
    /// Starts ticking immediately with the given message.
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(get_spinner_style());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Stops and clears the indicator.
    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}
