use crate::types::TranscriptionError;
use crate::Transcriber;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Deterministic transcriber for tests: returns queued results in order.
///
/// Once the queue is exhausted every call yields [`TranscriptionError::EmptyTranscript`].
pub struct ScriptedTranscriber {
    queue: Mutex<VecDeque<Result<String, TranscriptionError>>>,
}

impl ScriptedTranscriber {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_transcripts<I, S>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scripted = Self::new();
        for text in transcripts {
            scripted.push_ok(text);
        }
        scripted
    }

    pub fn push_ok(&self, text: impl Into<String>) {
        self.queue.lock().push_back(Ok(text.into()));
    }

    pub fn push_err(&self, err: TranscriptionError) {
        self.queue.lock().push_back(Err(err));
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Default for ScriptedTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(
        &self,
        _samples: &[i16],
        _sample_rate: u32,
    ) -> Result<String, TranscriptionError> {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or(Err(TranscriptionError::EmptyTranscript))
    }
}
