pub mod capture;
pub mod chunker;
pub mod ring_buffer;
pub mod watchdog;

pub use capture::{list_input_devices, AudioCaptureThread, CaptureConfig, CaptureStats, DeviceConfig};
pub use chunker::{AudioFrame, ChunkerConfig, FrameChunker};
pub use ring_buffer::{AudioConsumer, AudioProducer, AudioRingBuffer};
pub use watchdog::WatchdogTimer;
