use crate::config::SegmenterConfig;
use crate::energy::EnergyVad;

/// One segmented span of speech, handed off to transcription exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Utterance {
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    /// No confirmed speech yet; candidate frames sit in a provisional buffer.
    Idle,
    /// Confirmed utterance in progress; every frame is buffered.
    Recording,
}

/// Counters for observability; read by the runtime's periodic stats log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmenterStats {
    pub frames_ingested: u64,
    pub utterances_emitted: u64,
    /// Speech bursts shorter than the minimum, dropped as noise.
    pub noise_bursts_dropped: u64,
    /// Utterances finalized by the hard duration cap rather than silence.
    pub cap_finalized: u64,
}

/// Utterance boundary state machine.
///
/// Driven one frame at a time from the chunker task. `ingest` does O(frame)
/// work and never blocks: classification, buffer append, counter updates.
/// Emission transfers ownership of the sample buffer to the caller, which
/// dispatches transcription elsewhere so ingestion continues uninterrupted.
///
/// Idle: speech frames accumulate in a provisional buffer until
/// `min_speech_frames` arrive consecutively; any non-speech frame before
/// that discards the burst entirely (no partial utterance is ever emitted).
/// Recording: every frame is kept, speech or not. `silence_frames`
/// consecutive non-speech frames finalize, as does reaching the buffered
/// equivalent of `max_record_secs` even mid-speech.
pub struct UtteranceSegmenter {
    vad: EnergyVad,
    state: SegmentState,

    pending: Vec<i16>,
    buffer: Vec<i16>,

    speech_streak: u32,
    silence_streak: u32,
    frames_buffered: usize,

    min_speech_frames: u32,
    silence_frames: u32,
    max_buffered_frames: usize,
    sample_rate_hz: u32,

    stats: SegmenterStats,
}

impl UtteranceSegmenter {
    pub fn new(vad: EnergyVad, config: &SegmenterConfig) -> Self {
        let frame_capacity = config.max_buffered_frames() * config.frame_size_samples;
        Self {
            vad,
            state: SegmentState::Idle,
            pending: Vec::new(),
            buffer: Vec::with_capacity(frame_capacity.min(config.sample_rate_hz as usize)),
            speech_streak: 0,
            silence_streak: 0,
            frames_buffered: 0,
            min_speech_frames: config.min_speech_frames,
            silence_frames: config.silence_frames,
            max_buffered_frames: config.max_buffered_frames(),
            sample_rate_hz: config.sample_rate_hz,
            stats: SegmenterStats::default(),
        }
    }

    /// Feed one fixed-size frame; returns a complete utterance when one ends.
    pub fn ingest(&mut self, frame: &[i16]) -> Option<Utterance> {
        self.stats.frames_ingested += 1;
        let is_speech = self.vad.is_speech(frame);

        match self.state {
            SegmentState::Idle => {
                if is_speech {
                    self.speech_streak += 1;
                    self.pending.extend_from_slice(frame);
                    if self.speech_streak >= self.min_speech_frames {
                        tracing::debug!(
                            frames = self.speech_streak,
                            "Speech confirmed, recording utterance"
                        );
                        self.buffer = std::mem::take(&mut self.pending);
                        self.frames_buffered = self.speech_streak as usize;
                        self.silence_streak = 0;
                        self.state = SegmentState::Recording;
                    }
                } else {
                    if !self.pending.is_empty() {
                        self.stats.noise_bursts_dropped += 1;
                        tracing::trace!(
                            frames = self.speech_streak,
                            "Speech burst below minimum, dropped as noise"
                        );
                    }
                    self.speech_streak = 0;
                    self.pending.clear();
                }
                None
            }
            SegmentState::Recording => {
                self.buffer.extend_from_slice(frame);
                self.frames_buffered += 1;

                if is_speech {
                    self.silence_streak = 0;
                } else {
                    self.silence_streak += 1;
                    if self.silence_streak >= self.silence_frames {
                        return Some(self.finalize());
                    }
                }

                // Hard cap, independent of the silence tail: a continuous
                // speech run is cut at exactly max_buffered_frames.
                if self.frames_buffered >= self.max_buffered_frames {
                    self.stats.cap_finalized += 1;
                    return Some(self.finalize());
                }

                None
            }
        }
    }

    /// Drop all buffered state and return to Idle. Used on shutdown; trailing
    /// audio never becomes a partial utterance.
    pub fn reset(&mut self) {
        self.state = SegmentState::Idle;
        self.pending.clear();
        self.buffer.clear();
        self.speech_streak = 0;
        self.silence_streak = 0;
        self.frames_buffered = 0;
    }

    pub fn is_recording(&self) -> bool {
        self.state == SegmentState::Recording
    }

    pub fn stats(&self) -> SegmenterStats {
        self.stats
    }

    fn finalize(&mut self) -> Utterance {
        let samples = std::mem::take(&mut self.buffer);
        self.state = SegmentState::Idle;
        self.speech_streak = 0;
        self.silence_streak = 0;
        self.frames_buffered = 0;
        self.stats.utterances_emitted += 1;
        tracing::debug!(
            samples = samples.len(),
            "Utterance finalized"
        );
        Utterance {
            samples,
            sample_rate: self.sample_rate_hz,
        }
    }
}
