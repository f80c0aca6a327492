use async_trait::async_trait;
use thiserror::Error;

/// Symbolic key events the interpreter can dispatch, independent of any
/// multiplexer's own key naming. The sink owns the mapping to control
/// sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Enter,
    Interrupt,
    Tab,
    Up,
    Down,
    Escape,
    Undo,
    Save,
    DeleteLine,
}

impl SessionKey {
    pub fn name(&self) -> &'static str {
        match self {
            SessionKey::Enter => "Enter",
            SessionKey::Interrupt => "Interrupt",
            SessionKey::Tab => "Tab",
            SessionKey::Up => "Up",
            SessionKey::Down => "Down",
            SessionKey::Escape => "Escape",
            SessionKey::Undo => "Undo",
            SessionKey::Save => "Save",
            SessionKey::DeleteLine => "DeleteLine",
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to run multiplexer command: {0}")]
    Io(#[from] std::io::Error),

    #[error("multiplexer command timed out after {0} ms")]
    Timeout(u64),

    #[error("multiplexer command exited with status {0}")]
    CommandFailed(i32),
}

/// Named-session multiplexer contract.
///
/// All operations are fire-and-forget from the interpreter's perspective: a
/// failed send is reported upward as a status event, never escalated to
/// abort the pipeline.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Whether a session with this name currently exists.
    async fn exists(&self, session: &str) -> bool;

    /// Create the named session. Callers go through [`ensure_created`];
    /// implementations need not be idempotent themselves.
    ///
    /// [`ensure_created`]: SessionSink::ensure_created
    async fn create(&self, session: &str) -> Result<(), SinkError>;

    /// Inject text verbatim into the session.
    async fn send_literal(&self, session: &str, text: &str) -> Result<(), SinkError>;

    /// Dispatch a symbolic key event to the session.
    async fn send_key(&self, session: &str, key: SessionKey) -> Result<(), SinkError>;

    /// Create the session only if absent. Idempotent: an existing session
    /// triggers no create call.
    async fn ensure_created(&self, session: &str) -> Result<(), SinkError> {
        if self.exists(session).await {
            return Ok(());
        }
        self.create(session).await
    }
}
