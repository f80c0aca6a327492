//! Audio constants shared across the segmentation pipeline

/// Standard sample rate for all VAD processing (Hz)
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Frame duration in milliseconds
pub const FRAME_DURATION_MS: u32 = 30;

/// Standard frame size for all VAD processing (samples)
/// At 16kHz, 30ms frames = 480 samples
pub const FRAME_SIZE_SAMPLES: usize =
    (SAMPLE_RATE_HZ as usize * FRAME_DURATION_MS as usize) / 1000;

/// Standard number of channels for mono audio processing
pub const CHANNELS_MONO: u16 = 1;
