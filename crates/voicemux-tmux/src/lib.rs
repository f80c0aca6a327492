//! tmux implementation of the voicemux session sink.
//!
//! Sessions are plain tmux sessions addressed by name; text lands via
//! `send-keys -l` (literal, no key-name interpretation) and symbolic keys
//! map to tmux key names through a static table.

pub mod subprocess;

use async_trait::async_trait;
use subprocess::run_with_timeout;
use tracing::debug;
use voicemux_command::{SessionKey, SessionSink, SinkError};

const DEFAULT_TIMEOUT_MS: u64 = 3_000;

/// Session sink backed by the `tmux` binary.
pub struct TmuxSink {
    tmux_bin: String,
    timeout_ms: u64,
}

impl TmuxSink {
    pub fn new(tmux_bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<subprocess::ExitStatus, SinkError> {
        run_with_timeout(&self.tmux_bin, args, self.timeout_ms).await
    }

    async fn run_checked(&self, args: &[&str]) -> Result<(), SinkError> {
        let status = self.run(args).await?;
        if status.success() {
            Ok(())
        } else {
            Err(SinkError::CommandFailed(status.code().unwrap_or(-1)))
        }
    }
}

impl Default for TmuxSink {
    fn default() -> Self {
        Self::new("tmux")
    }
}

/// tmux key name for each symbolic key.
fn key_name(key: SessionKey) -> &'static str {
    match key {
        SessionKey::Enter => "Enter",
        SessionKey::Interrupt => "C-c",
        SessionKey::Tab => "Tab",
        SessionKey::Up => "Up",
        SessionKey::Down => "Down",
        SessionKey::Escape => "Escape",
        SessionKey::Undo => "C-z",
        SessionKey::Save => "C-s",
        SessionKey::DeleteLine => "C-u",
    }
}

#[async_trait]
impl SessionSink for TmuxSink {
    async fn exists(&self, session: &str) -> bool {
        match self.run(&["has-session", "-t", session]).await {
            Ok(status) => status.success(),
            Err(err) => {
                debug!(session, %err, "has-session query failed");
                false
            }
        }
    }

    async fn create(&self, session: &str) -> Result<(), SinkError> {
        debug!(session, "creating tmux session");
        self.run_checked(&["new-session", "-d", "-s", session]).await
    }

    async fn send_literal(&self, session: &str, text: &str) -> Result<(), SinkError> {
        self.run_checked(&["send-keys", "-t", session, "-l", text])
            .await
    }

    async fn send_key(&self, session: &str, key: SessionKey) -> Result<(), SinkError> {
        self.run_checked(&["send-keys", "-t", session, key_name(key)])
            .await
    }
}
