pub mod config;
pub mod constants;
pub mod energy;
pub mod segmenter;

pub use config::{SegmenterConfig, VadConfig};
pub use constants::{CHANNELS_MONO, FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
pub use energy::EnergyVad;
pub use segmenter::{SegmenterStats, Utterance, UtteranceSegmenter};
