use serde::{Deserialize, Serialize};

use super::constants::{FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};

/// Per-frame speech classification settings.
///
/// The threshold is on the raw 16-bit PCM scale, so 500 corresponds to a
/// quiet-room noise floor with normal speech comfortably above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadConfig {
    pub energy_threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 500.0,
        }
    }
}

/// Utterance boundary settings.
///
/// All durations are expressed in frames of `frame_size_samples` at
/// `sample_rate_hz`, matching how the segmenter counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    pub sample_rate_hz: u32,
    pub frame_size_samples: usize,
    /// Consecutive speech frames required before recording starts (~150ms).
    pub min_speech_frames: u32,
    /// Consecutive silence frames that end an utterance (~900ms).
    pub silence_frames: u32,
    /// Hard cap on a single utterance, in seconds.
    pub max_record_secs: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: SAMPLE_RATE_HZ,
            frame_size_samples: FRAME_SIZE_SAMPLES,
            min_speech_frames: 5,
            silence_frames: 30,
            max_record_secs: 15,
        }
    }
}

impl SegmenterConfig {
    pub fn frame_duration_ms(&self) -> f32 {
        (self.frame_size_samples as f32 * 1000.0) / self.sample_rate_hz as f32
    }

    /// Buffered-frame count at which recording is force-finalized.
    pub fn max_buffered_frames(&self) -> usize {
        (self.max_record_secs as usize * self.sample_rate_hz as usize) / self.frame_size_samples
    }
}
