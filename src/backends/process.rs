
use log::{debug, trace};
use std::process::Command;

use crate::backends::BackendError;
use crate::util::progress_bar::Spinner;

/// Everything captured from a finished external process
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, None if the process was killed by a signal
    pub exit_code: Option<i32>
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short failure description for error messages; prefers stderr.
    pub fn failure_message(&self) -> String {
        let stream = if self.stderr.trim().is_empty() { &self.stdout } else { &self.stderr };
        let code = match self.exit_code {
            Some(c) => format!("exit code {c}"),
            None => "terminated by signal".to_string()
        };
        format!("{code}: {}", stream.trim())
    }
}

/// Runs a command to completion, blocking until it exits, and captures both output streams.
/// No timeout is applied.
/// # Arguments
/// * `cmd` - the fully built command
/// * `label` - short description for the busy indicator
/// # Errors
/// * if the process cannot be launched
pub fn run_command(cmd: &mut Command, label: &str) -> Result<CommandOutput, BackendError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    debug!("Running command: {cmd:?}");

    let spinner = Spinner::start(label);
    let result = cmd.output();
    spinner.finish();

    let output = result.map_err(|source| BackendError::CommandLaunch { program, source })?;
    let captured = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code()
    };

    debug!("Command exit code: {:?}", captured.exit_code);
    trace!("Command stdout: {}", captured.stdout);
    if !captured.stderr.is_empty() {
        debug!("Command stderr: {}", captured.stderr.trim());
    }
    Ok(captured)
}
