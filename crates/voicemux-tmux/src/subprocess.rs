//! Subprocess execution with strict timeouts.
//!
//! Every tmux invocation goes through here so a wedged tmux server can
//! never hang the command path. `kill_on_drop(true)` guarantees cleanup
//! when the timeout fires.

use std::time::Duration;
use voicemux_command::SinkError;

/// Exit status of a completed command, for callers that branch on
/// non-zero exits (e.g. `has-session`).
#[derive(Debug)]
pub struct ExitStatus {
    code: Option<i32>,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

/// Runs a command and waits for it to exit, killing it on timeout.
pub async fn run_with_timeout(
    cmd: &str,
    args: &[&str],
    ms: u64,
) -> Result<ExitStatus, SinkError> {
    let mut command = tokio::process::Command::new(cmd);
    command
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    match tokio::time::timeout(Duration::from_millis(ms), child.wait()).await {
        Ok(Ok(status)) => Ok(ExitStatus {
            code: status.code(),
        }),
        Ok(Err(e)) => Err(SinkError::Io(e)),
        Err(_) => Err(SinkError::Timeout(ms)),
    }
}
