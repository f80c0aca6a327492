use crate::sink::SessionKey;

/// Pipeline status events, produced by every stage and consumed by an
/// external display sink. This crate only produces them, never interprets
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Waiting for speech.
    Listening,
    /// An utterance was segmented and handed to the gateway.
    Transcribing,
    /// Session focus moved.
    Switched { session: String },
    /// A symbolic key event was dispatched.
    KeySent { key: SessionKey },
    /// Literal text was injected.
    Typed { text: String },
    /// A recovered failure (transcription, sink dispatch).
    Error { message: String },
}
