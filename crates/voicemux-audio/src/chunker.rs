use std::collections::VecDeque;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use super::ring_buffer::AudioConsumer;

/// Fixed-size mono frame emitted to the segmentation pipeline.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub timestamp_ms: u64,
}

pub struct ChunkerConfig {
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
}

/// Reassembles the capture stream into fixed frames.
///
/// cpal delivers device-sized buffers of interleaved samples; this task
/// drains the ring buffer, downmixes to mono, and broadcasts exact
/// `frame_size_samples`-length frames. Frame timestamps derive from the
/// emitted sample count, not wall-clock time, so they stay monotonic across
/// scheduling jitter.
pub struct FrameChunker {
    consumer: AudioConsumer,
    output_tx: broadcast::Sender<AudioFrame>,
    cfg: ChunkerConfig,
    channels: u16,
}

impl FrameChunker {
    pub fn new(
        consumer: AudioConsumer,
        output_tx: broadcast::Sender<AudioFrame>,
        cfg: ChunkerConfig,
        channels: u16,
    ) -> Self {
        Self {
            consumer,
            output_tx,
            cfg,
            channels,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let mut worker = ChunkerWorker {
            consumer: self.consumer,
            output_tx: self.output_tx,
            cfg: self.cfg,
            channels: self.channels,
            buffer: VecDeque::new(),
            scratch: Vec::new(),
            samples_emitted: 0,
        };
        tokio::spawn(async move {
            worker.run().await;
        })
    }
}

struct ChunkerWorker {
    consumer: AudioConsumer,
    output_tx: broadcast::Sender<AudioFrame>,
    cfg: ChunkerConfig,
    channels: u16,
    buffer: VecDeque<i16>,
    scratch: Vec<i16>,
    samples_emitted: u64,
}

impl ChunkerWorker {
    async fn run(&mut self) {
        tracing::info!(
            frame_size = self.cfg.frame_size_samples,
            channels = self.channels,
            "Frame chunker started"
        );

        loop {
            self.scratch.clear();
            let read = self.consumer.read(&mut self.scratch, 4096);
            if read > 0 {
                let mono = downmix(&self.scratch, self.channels);
                self.buffer.extend(mono);
                self.flush_ready_frames();
            } else {
                // A 30ms frame arrives every 30ms; polling at 10ms keeps
                // latency low without spinning.
                time::sleep(Duration::from_millis(10)).await;
            }
        }
    }

    fn flush_ready_frames(&mut self) {
        let fs = self.cfg.frame_size_samples;
        while self.buffer.len() >= fs {
            let samples: Vec<i16> = self.buffer.drain(..fs).collect();
            let timestamp_ms =
                (self.samples_emitted as u128 * 1000 / self.cfg.sample_rate_hz as u128) as u64;

            let frame = AudioFrame {
                samples,
                sample_rate: self.cfg.sample_rate_hz,
                timestamp_ms,
            };

            // A broadcast send fails only when no receiver is attached; the
            // pipeline is shutting down in that case, so just note it.
            if self.output_tx.send(frame).is_err() {
                tracing::warn!("No active listeners for audio frames");
            }

            self.samples_emitted += fs as u64;
        }
    }
}

/// Averages interleaved channels into mono; mono input passes through.
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::AudioRingBuffer;

    #[test]
    fn stereo_downmix_averages_pairs() {
        let samples = vec![1000i16, -1000, 900, -900, 800, -800, 700, -700];
        assert_eq!(downmix(&samples, 2), vec![0, 0, 0, 0]);
    }

    #[test]
    fn mono_passes_through() {
        let samples = vec![1i16, 2, 3];
        assert_eq!(downmix(&samples, 1), samples);
    }

    #[tokio::test]
    async fn emits_exact_frames_with_monotonic_timestamps() {
        let (mut producer, consumer) = AudioRingBuffer::new(4096).split();
        let (tx, mut rx) = broadcast::channel::<AudioFrame>(16);
        let chunker = FrameChunker::new(
            consumer,
            tx,
            ChunkerConfig {
                frame_size_samples: 480,
                sample_rate_hz: 16_000,
            },
            1,
        );

        // Two and a half frames worth of samples.
        producer.write(&vec![7i16; 1200]);
        let handle = chunker.spawn();

        let first = rx.recv().await.expect("first frame");
        let second = rx.recv().await.expect("second frame");
        assert_eq!(first.samples.len(), 480);
        assert_eq!(second.samples.len(), 480);
        assert_eq!(first.timestamp_ms, 0);
        assert_eq!(second.timestamp_ms, 30);

        // The remaining 240 samples stay buffered until more arrive.
        assert!(rx.try_recv().is_err());

        handle.abort();
        let _ = handle.await;
    }
}
