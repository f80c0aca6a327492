use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use voicemux_command::StatusEvent;

/// Single-line terminal status display.
///
/// Renders `status │ sessions (active highlighted) │ last text` in place
/// with a carriage return. Updates arrive from every utterance worker and
/// from the main loop, so all mutation happens under one lock and each
/// update renders atomically. Log output goes to a file, never stdout, so
/// this line stays intact.
pub struct StatusLine {
    inner: Mutex<Inner>,
}

struct Inner {
    sessions: Vec<String>,
    active: String,
    status: String,
    last_text: String,
}

impl StatusLine {
    pub fn new(sessions: Vec<String>, active: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                sessions,
                active: active.into(),
                status: "Ready".to_string(),
                last_text: String::new(),
            }),
        })
    }

    /// Consumes status events until the channel closes.
    pub fn spawn(self: Arc<Self>, mut rx: mpsc::Receiver<StatusEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.apply(&event);
            }
        })
    }

    pub fn apply(&self, event: &StatusEvent) {
        let mut inner = self.inner.lock();
        match event {
            StatusEvent::Listening => {
                inner.status = "Listening".to_string();
            }
            StatusEvent::Transcribing => {
                inner.status = "Transcribing".to_string();
            }
            StatusEvent::Switched { session } => {
                inner.status = "Switched".to_string();
                inner.active = session.clone();
                inner.last_text = format!("→ {session}");
            }
            StatusEvent::KeySent { key } => {
                inner.status = "Sent key".to_string();
                inner.last_text = format!("⌨ {key}");
            }
            StatusEvent::Typed { text } => {
                inner.status = "Typed".to_string();
                inner.last_text = text.clone();
            }
            StatusEvent::Error { message } => {
                inner.status = "⚠ Error".to_string();
                inner.last_text = message.clone();
            }
        }
        inner.render();
    }

    pub fn active_session(&self) -> String {
        self.inner.lock().active.clone()
    }

    /// Move off the status line so the shell prompt lands cleanly.
    pub fn finish(&self) {
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout);
        let _ = stdout.flush();
    }
}

impl Inner {
    fn render(&self) {
        let sessions = self
            .sessions
            .iter()
            .map(|s| {
                if *s == self.active {
                    format!("\x1b[1;32m[{s}]\x1b[0m")
                } else {
                    s.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("  ");

        let mut stdout = std::io::stdout();
        let _ = write!(
            stdout,
            "\r\x1b[K🎙  {} │ {} │ {}",
            self.status,
            sessions,
            tail_chars(&self.last_text, 60)
        );
        let _ = stdout.flush();
    }
}

/// Last `n` characters of `s`, respecting char boundaries.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_short_strings_whole() {
        assert_eq!(tail_chars("hello", 60), "hello");
    }

    #[test]
    fn tail_cuts_on_char_boundaries() {
        let s = "ab→cd";
        assert_eq!(tail_chars(s, 3), "→cd");
        assert_eq!(tail_chars(s, 1), "d");
    }

    #[test]
    fn switch_event_updates_active_session() {
        let line = StatusLine::new(vec!["cli1".into(), "cli2".into()], "cli1");
        line.apply(&StatusEvent::Switched {
            session: "cli2".into(),
        });
        assert_eq!(line.active_session(), "cli2");
    }
}
