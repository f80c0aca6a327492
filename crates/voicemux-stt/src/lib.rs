//! Transcription gateway abstraction for voicemux
//!
//! The pipeline treats speech-to-text as an opaque, fallible call: PCM
//! samples in, text out. Failures are values: the audio path never sees a
//! panic from here, and an error can never be mistaken for a transcript.

pub mod scripted;
pub mod types;
pub mod wav;
pub mod whisper;

pub use scripted::ScriptedTranscriber;
pub use types::TranscriptionError;
pub use whisper::{WhisperApiClient, WhisperConfig};

/// Opaque utterance-to-text gateway.
///
/// The call may block for arbitrarily long (the core enforces no timeout);
/// callers dispatch it from a worker so frame ingestion continues.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<String, TranscriptionError>;
}
