use crate::patterns::PatternTables;
use crate::sink::SessionSink;
use crate::status::StatusEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Result of one transcription attempt. Failures are a distinct variant so
/// an error message can never be mistaken for spoken content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandText {
    Text(String),
    Failed(String),
}

/// Routes transcribed utterances to the session sink.
///
/// Precedence per utterance: session switch, then symbolic key, then
/// literal text injection. Holds the active-session focus and a pending
/// separator flag so consecutive dictated fragments are joined with a
/// single space.
pub struct CommandInterpreter {
    sink: Arc<dyn SessionSink>,
    status_tx: mpsc::Sender<StatusEvent>,
    tables: PatternTables,
    active_session: String,
    pending_separator: bool,
}

impl CommandInterpreter {
    pub fn new(
        sink: Arc<dyn SessionSink>,
        status_tx: mpsc::Sender<StatusEvent>,
        default_session: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            sink,
            status_tx,
            tables: PatternTables::new()?,
            active_session: default_session.into(),
            pending_separator: false,
        })
    }

    pub fn active_session(&self) -> &str {
        &self.active_session
    }

    /// Process one transcription result. Each call is atomic with respect
    /// to the sink: exactly one branch runs, and sink failures are reported
    /// as status events while state still advances.
    pub async fn process(&mut self, input: CommandText) {
        let text = match input {
            CommandText::Failed(message) => {
                warn!(%message, "transcription failed");
                self.emit(StatusEvent::Error { message }).await;
                return;
            }
            CommandText::Text(text) => text,
        };

        if text.is_empty() {
            self.emit(StatusEvent::Error {
                message: "empty transcript".to_string(),
            })
            .await;
            return;
        }
        let normalized = normalize(&text);

        if let Some(session) = self.tables.find_session(&normalized) {
            // Existence is the authority, not intent: a misheard session
            // name is ignored without touching state.
            if self.sink.exists(session).await {
                self.active_session = session.to_string();
                self.pending_separator = false;
                self.emit(StatusEvent::Switched {
                    session: session.to_string(),
                })
                .await;
            } else {
                debug!(session, "ignoring switch to absent session");
            }
            return;
        }

        if let Some(key) = self.tables.find_key(&normalized) {
            match self.sink.send_key(&self.active_session, key).await {
                Ok(()) => self.emit(StatusEvent::KeySent { key }).await,
                Err(err) => {
                    self.emit(StatusEvent::Error {
                        message: err.to_string(),
                    })
                    .await
                }
            }
            self.pending_separator = false;
            return;
        }

        // Literal fallback injects the original text, not the normalized
        // form, so casing and punctuation survive.
        let result = async {
            if self.pending_separator {
                self.sink.send_literal(&self.active_session, " ").await?;
            }
            self.sink.send_literal(&self.active_session, &text).await
        }
        .await;
        match result {
            Ok(()) => self.emit(StatusEvent::Typed { text }).await,
            Err(err) => {
                self.emit(StatusEvent::Error {
                    message: err.to_string(),
                })
                .await
            }
        }
        self.pending_separator = true;
    }

    async fn emit(&self, event: StatusEvent) {
        let _ = self.status_tx.send(event).await;
    }
}

/// Lowercase, trim, drop a single trailing period.
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let trimmed = lowered.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{SessionKey, SinkError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SinkCall {
        Created(String),
        Literal { session: String, text: String },
        Key { session: String, key: SessionKey },
    }

    #[derive(Default)]
    struct RecordingSink {
        existing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<SinkCall>>,
        fail_sends: Mutex<bool>,
    }

    impl RecordingSink {
        fn with_sessions(names: &[&str]) -> Self {
            let sink = Self::default();
            let mut existing = sink.existing.lock();
            for name in names {
                existing.insert(name.to_string());
            }
            drop(existing);
            sink
        }

        fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl SessionSink for RecordingSink {
        async fn exists(&self, session: &str) -> bool {
            self.existing.lock().contains(session)
        }

        async fn create(&self, session: &str) -> Result<(), SinkError> {
            self.existing.lock().insert(session.to_string());
            self.calls.lock().push(SinkCall::Created(session.to_string()));
            Ok(())
        }

        async fn send_literal(&self, session: &str, text: &str) -> Result<(), SinkError> {
            if *self.fail_sends.lock() {
                return Err(SinkError::CommandFailed(1));
            }
            self.calls.lock().push(SinkCall::Literal {
                session: session.to_string(),
                text: text.to_string(),
            });
            Ok(())
        }

        async fn send_key(&self, session: &str, key: SessionKey) -> Result<(), SinkError> {
            if *self.fail_sends.lock() {
                return Err(SinkError::CommandFailed(1));
            }
            self.calls.lock().push(SinkCall::Key {
                session: session.to_string(),
                key,
            });
            Ok(())
        }
    }

    fn interpreter(
        sink: Arc<RecordingSink>,
    ) -> (CommandInterpreter, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let interp = CommandInterpreter::new(sink, tx, "cli1").unwrap();
        (interp, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<StatusEvent>) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn switches_to_existing_session() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1", "cli2"]));
        let (mut interp, mut rx) = interpreter(sink.clone());

        interp.process(CommandText::Text("cli two".into())).await;

        assert_eq!(interp.active_session(), "cli2");
        assert!(sink.calls().is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![StatusEvent::Switched {
                session: "cli2".into()
            }]
        );
    }

    #[tokio::test]
    async fn switch_to_absent_session_is_silently_ignored() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        let (mut interp, mut rx) = interpreter(sink.clone());

        interp.process(CommandText::Text("cli five".into())).await;

        assert_eq!(interp.active_session(), "cli1");
        assert!(sink.calls().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn send_it_dispatches_enter_and_clears_separator() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        let (mut interp, mut rx) = interpreter(sink.clone());

        interp.process(CommandText::Text("hello world".into())).await;
        interp.process(CommandText::Text("Send it.".into())).await;
        interp.process(CommandText::Text("ls -la".into())).await;

        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: "hello world".into()
                },
                SinkCall::Key {
                    session: "cli1".into(),
                    key: SessionKey::Enter
                },
                // no leading space after a key command
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: "ls -la".into()
                },
            ]
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                StatusEvent::Typed {
                    text: "hello world".into()
                },
                StatusEvent::KeySent {
                    key: SessionKey::Enter
                },
                StatusEvent::Typed {
                    text: "ls -la".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn consecutive_literal_utterances_are_joined_with_one_space() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        let (mut interp, _rx) = interpreter(sink.clone());

        interp
            .process(CommandText::Text("open the file".into()))
            .await;
        interp.process(CommandText::Text("and run it".into())).await;

        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: "open the file".into()
                },
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: " ".into()
                },
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: "and run it".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn session_switch_resets_separator() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1", "cli3"]));
        let (mut interp, _rx) = interpreter(sink.clone());

        interp.process(CommandText::Text("echo hi".into())).await;
        interp.process(CommandText::Text("cli three".into())).await;
        interp.process(CommandText::Text("pwd".into())).await;

        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: "echo hi".into()
                },
                SinkCall::Literal {
                    session: "cli3".into(),
                    text: "pwd".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn failed_transcription_makes_no_sink_call() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        let (mut interp, mut rx) = interpreter(sink.clone());

        interp
            .process(CommandText::Failed("connection refused".into()))
            .await;

        assert!(sink.calls().is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![StatusEvent::Error {
                message: "connection refused".into()
            }]
        );
    }

    #[tokio::test]
    async fn literal_text_keeps_original_casing_and_punctuation() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        let (mut interp, _rx) = interpreter(sink.clone());

        interp
            .process(CommandText::Text("Echo \"Hello, World!\"".into()))
            .await;

        assert_eq!(
            sink.calls(),
            vec![SinkCall::Literal {
                session: "cli1".into(),
                text: "Echo \"Hello, World!\"".into()
            }]
        );
    }

    #[tokio::test]
    async fn sink_failure_is_reported_but_state_still_advances() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        *sink.fail_sends.lock() = true;
        let (mut interp, mut rx) = interpreter(sink.clone());

        interp.process(CommandText::Text("echo hi".into())).await;

        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [StatusEvent::Error { .. }]));

        // separator flag advanced despite the failure
        *sink.fail_sends.lock() = false;
        interp.process(CommandText::Text("again".into())).await;
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: " ".into()
                },
                SinkCall::Literal {
                    session: "cli1".into(),
                    text: "again".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn punctuation_only_transcript_is_injected_literally() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        let (mut interp, mut rx) = interpreter(sink.clone());

        // Normalization strips the period but the literal branch still
        // injects the original text.
        interp.process(CommandText::Text(".".into())).await;

        assert_eq!(
            sink.calls(),
            vec![SinkCall::Literal {
                session: "cli1".into(),
                text: ".".into()
            }]
        );
        assert_eq!(drain(&mut rx), vec![StatusEvent::Typed { text: ".".into() }]);
    }

    #[tokio::test]
    async fn empty_transcript_is_reported_not_injected() {
        let sink = Arc::new(RecordingSink::with_sessions(&["cli1"]));
        let (mut interp, mut rx) = interpreter(sink.clone());

        interp.process(CommandText::Text(String::new())).await;

        assert!(sink.calls().is_empty());
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [StatusEvent::Error { .. }]
        ));
    }

    #[tokio::test]
    async fn ensure_created_skips_existing_sessions() {
        let sink = RecordingSink::with_sessions(&["cli1"]);

        sink.ensure_created("cli1").await.unwrap();
        sink.ensure_created("cli2").await.unwrap();
        sink.ensure_created("cli2").await.unwrap();

        assert_eq!(sink.calls(), vec![SinkCall::Created("cli2".into())]);
    }

    #[test]
    fn normalize_drops_one_trailing_period() {
        assert_eq!(normalize("  Send it.  "), "send it");
        assert_eq!(normalize("done.."), "done.");
        assert_eq!(normalize("Tab"), "tab");
    }
}
