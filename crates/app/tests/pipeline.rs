//! End-to-end pipeline test without audio hardware: synthetic frames drive
//! the segmenter, a scripted transcriber stands in for the network, and a
//! recording sink captures what would have reached tmux.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use voicemux_command::{
    CommandInterpreter, CommandText, SessionKey, SessionSink, SinkError, StatusEvent,
};
use voicemux_stt::{ScriptedTranscriber, Transcriber};
use voicemux_vad::{EnergyVad, SegmenterConfig, UtteranceSegmenter, VadConfig, FRAME_SIZE_SAMPLES};

#[derive(Debug, Clone, PartialEq, Eq)]
enum SinkCall {
    Literal { session: String, text: String },
    Key { session: String, key: SessionKey },
}

#[derive(Default)]
struct RecordingSink {
    existing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<SinkCall>>,
}

#[async_trait]
impl SessionSink for RecordingSink {
    async fn exists(&self, session: &str) -> bool {
        self.existing.lock().contains(session)
    }

    async fn create(&self, session: &str) -> Result<(), SinkError> {
        self.existing.lock().insert(session.to_string());
        Ok(())
    }

    async fn send_literal(&self, session: &str, text: &str) -> Result<(), SinkError> {
        self.calls.lock().push(SinkCall::Literal {
            session: session.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_key(&self, session: &str, key: SessionKey) -> Result<(), SinkError> {
        self.calls.lock().push(SinkCall::Key {
            session: session.to_string(),
            key,
        });
        Ok(())
    }
}

fn speech_frame() -> Vec<i16> {
    vec![3000i16; FRAME_SIZE_SAMPLES]
}

fn silence_frame() -> Vec<i16> {
    vec![0i16; FRAME_SIZE_SAMPLES]
}

/// Feed one spoken burst (5 speech frames + 30 silence frames) and return
/// the emitted utterance.
fn one_burst(segmenter: &mut UtteranceSegmenter) -> voicemux_vad::Utterance {
    for _ in 0..5 {
        assert!(segmenter.ingest(&speech_frame()).is_none());
    }
    let mut emitted = None;
    for _ in 0..30 {
        emitted = segmenter.ingest(&silence_frame());
    }
    emitted.expect("utterance after silence tail")
}

#[tokio::test]
async fn spoken_commands_flow_from_frames_to_sink() {
    let mut segmenter = UtteranceSegmenter::new(
        EnergyVad::new(&VadConfig::default()),
        &SegmenterConfig::default(),
    );

    let transcriber =
        ScriptedTranscriber::with_transcripts(["cli two", "echo hello", "Send it."]);

    let sink = Arc::new(RecordingSink::default());
    for session in ["cli1", "cli2"] {
        sink.ensure_created(session).await.unwrap();
    }

    let (status_tx, mut status_rx) = mpsc::channel::<StatusEvent>(32);
    let mut interpreter =
        CommandInterpreter::new(sink.clone(), status_tx, "cli1").unwrap();

    for _ in 0..3 {
        let utterance = one_burst(&mut segmenter);
        assert_eq!(utterance.sample_rate, 16_000);

        let text = match transcriber
            .transcribe(&utterance.samples, utterance.sample_rate)
            .await
        {
            Ok(text) => CommandText::Text(text),
            Err(err) => CommandText::Failed(err.to_string()),
        };
        interpreter.process(text).await;
    }

    assert_eq!(interpreter.active_session(), "cli2");
    assert_eq!(
        sink.calls.lock().clone(),
        vec![
            SinkCall::Literal {
                session: "cli2".into(),
                text: "echo hello".into()
            },
            SinkCall::Key {
                session: "cli2".into(),
                key: SessionKey::Enter
            },
        ]
    );

    let mut events = Vec::new();
    while let Ok(event) = status_rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            StatusEvent::Switched {
                session: "cli2".into()
            },
            StatusEvent::Typed {
                text: "echo hello".into()
            },
            StatusEvent::KeySent {
                key: SessionKey::Enter
            },
        ]
    );
}

#[tokio::test]
async fn failed_transcription_does_not_stop_the_next_utterance() {
    let mut segmenter = UtteranceSegmenter::new(
        EnergyVad::new(&VadConfig::default()),
        &SegmenterConfig::default(),
    );

    let transcriber = ScriptedTranscriber::new();
    transcriber.push_err(voicemux_stt::TranscriptionError::EmptyTranscript);
    transcriber.push_ok("ls");

    let sink = Arc::new(RecordingSink::default());
    sink.ensure_created("cli1").await.unwrap();

    let (status_tx, mut status_rx) = mpsc::channel::<StatusEvent>(32);
    let mut interpreter =
        CommandInterpreter::new(sink.clone(), status_tx, "cli1").unwrap();

    for _ in 0..2 {
        let utterance = one_burst(&mut segmenter);
        let text = match transcriber
            .transcribe(&utterance.samples, utterance.sample_rate)
            .await
        {
            Ok(text) => CommandText::Text(text),
            Err(err) => CommandText::Failed(err.to_string()),
        };
        interpreter.process(text).await;
    }

    // The bad utterance was reported and discarded; the good one landed.
    assert_eq!(
        sink.calls.lock().clone(),
        vec![SinkCall::Literal {
            session: "cli1".into(),
            text: "ls".into()
        }]
    );
    let mut events = Vec::new();
    while let Ok(event) = status_rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events[0], StatusEvent::Error { .. }));
    assert_eq!(
        events[1],
        StatusEvent::Typed {
            text: "ls".into()
        }
    );
}
