use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::ring_buffer::AudioProducer;
use super::watchdog::WatchdogTimer;
use voicemux_foundation::AudioError;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Preferred input device name; host default when None.
    pub device: Option<String>,
    /// The pipeline's sample rate. The device must run at this rate; no
    /// resampling happens downstream.
    pub sample_rate_hz: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate_hz: 16_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub buffers_captured: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub restarts: AtomicU64,
    pub last_buffer_time: RwLock<Option<Instant>>,
}

impl CaptureStats {
    /// Health check input: how long since the device last delivered audio.
    pub fn time_since_last_buffer(&self) -> Option<Duration> {
        self.last_buffer_time.read().map(|t| t.elapsed())
    }
}

/// List input device names for `--list-devices`.
pub fn list_input_devices() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::Fatal(format!("cannot enumerate input devices: {e}")))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Handle to the dedicated capture thread.
///
/// The cpal stream lives entirely on this thread (streams are not Send).
/// The callback only converts samples to i16, feeds the watchdog, and pushes
/// into the ring buffer; segmentation happens on the consumer side.
pub struct AudioCaptureThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    pub stats: Arc<CaptureStats>,
}

impl AudioCaptureThread {
    /// Spawns the capture thread. Returns the negotiated device config and a
    /// channel that carries at most one fatal capture error; receiving on it
    /// means the pipeline must shut down. Capture is the only component whose
    /// failure is fatal.
    pub fn spawn(
        config: CaptureConfig,
        audio_producer: AudioProducer,
    ) -> Result<
        (
            Self,
            DeviceConfig,
            crossbeam_channel::Receiver<AudioError>,
        ),
        AudioError,
    > {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = running.clone();
        let stats = Arc::new(CaptureStats::default());
        let stats_clone = stats.clone();

        let (init_tx, init_rx) = crossbeam_channel::bounded::<Result<DeviceConfig, AudioError>>(1);
        let (fatal_tx, fatal_rx) = crossbeam_channel::bounded::<AudioError>(1);

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let mut capture =
                    AudioCapture::new(config, audio_producer, stats_clone, running.clone());

                let dev_cfg = match capture.start() {
                    Ok(cfg) => cfg,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(dev_cfg));

                // Supervision loop: restart the stream when the watchdog
                // trips or the error callback flags the stream.
                while running.load(Ordering::Relaxed) {
                    if capture.watchdog.is_triggered()
                        || capture.restart_needed.load(Ordering::SeqCst)
                    {
                        tracing::warn!("Capture restart triggered (watchdog or stream error)");
                        capture.stop_stream();
                        capture.restart_needed.store(false, Ordering::SeqCst);
                        capture.stats.restarts.fetch_add(1, Ordering::Relaxed);

                        match capture.start() {
                            Ok(cfg) => {
                                tracing::info!(
                                    sample_rate = cfg.sample_rate,
                                    channels = cfg.channels,
                                    "Capture stream restarted"
                                );
                            }
                            Err(e) => {
                                tracing::error!("Failed to restart capture: {}", e);
                                let _ = fatal_tx.send(if e.is_fatal() {
                                    e
                                } else {
                                    AudioError::DeviceDisconnected
                                });
                                break;
                            }
                        }
                    }
                    thread::sleep(Duration::from_millis(100));
                }

                tracing::info!("Audio capture thread shutting down");
                capture.stop_stream();
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn audio thread: {e}")))?;

        let dev_cfg = match init_rx.recv_timeout(Duration::from_secs(3)) {
            Ok(Ok(cfg)) => cfg,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                shutdown.store(false, Ordering::Relaxed);
                let _ = handle.join();
                return Err(AudioError::Fatal(
                    "Capture thread did not report a device configuration in time".to_string(),
                ));
            }
        };

        Ok((
            Self {
                handle,
                shutdown,
                stats,
            },
            dev_cfg,
            fatal_rx,
        ))
    }

    pub fn stop(self) {
        self.shutdown.store(false, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

struct AudioCapture {
    config: CaptureConfig,
    stream: Option<Stream>,
    audio_producer: Arc<Mutex<AudioProducer>>,
    watchdog: WatchdogTimer,
    stats: Arc<CaptureStats>,
    running: Arc<AtomicBool>,
    restart_needed: Arc<AtomicBool>,
}

impl AudioCapture {
    fn new(
        config: CaptureConfig,
        audio_producer: AudioProducer,
        stats: Arc<CaptureStats>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            stream: None,
            audio_producer: Arc::new(Mutex::new(audio_producer)),
            watchdog: WatchdogTimer::new(Duration::from_secs(5)),
            stats,
            running,
            restart_needed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn start(&mut self) -> Result<DeviceConfig, AudioError> {
        let device = self.open_device()?;
        if let Ok(n) = device.name() {
            tracing::info!("Selected input device: {}", n);
        }

        let (stream_config, sample_format) = self.negotiate_config(&device)?;
        let device_config = DeviceConfig {
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
        };

        let stream = self.build_stream(device, stream_config, sample_format)?;
        stream.play()?;
        self.stream = Some(stream);
        self.watchdog.reset();
        Ok(device_config)
    }

    fn open_device(&self) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();
        match &self.config.device {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|e| {
                    AudioError::Fatal(format!("cannot enumerate input devices: {e}"))
                })?;
                devices
                    .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                    .ok_or_else(|| AudioError::DeviceNotFound {
                        name: Some(name.clone()),
                    })
            }
            None => host
                .default_input_device()
                .ok_or(AudioError::DeviceNotFound { name: None }),
        }
    }

    /// The pipeline runs at one fixed rate; pick a device config that can
    /// deliver it directly or refuse to start.
    fn negotiate_config(
        &self,
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), AudioError> {
        let target = cpal::SampleRate(self.config.sample_rate_hz);

        if let Ok(default_config) = device.default_input_config() {
            if default_config.sample_rate() == target {
                return Ok((
                    StreamConfig {
                        channels: default_config.channels(),
                        sample_rate: target,
                        buffer_size: cpal::BufferSize::Default,
                    },
                    default_config.sample_format(),
                ));
            }
        }

        let mut ranges: Vec<_> = device.supported_input_configs()?.collect();
        // Prefer mono and i16 when the device offers a choice.
        ranges.sort_by_key(|r| (r.channels(), r.sample_format() != SampleFormat::I16));
        for range in ranges {
            if range.min_sample_rate() <= target && target <= range.max_sample_rate() {
                let format = range.sample_format();
                let config: StreamConfig = range.with_sample_rate(target).into();
                return Ok((config, format));
            }
        }

        Err(AudioError::FormatNotSupported {
            format: format!(
                "device does not support {} Hz capture",
                self.config.sample_rate_hz
            ),
        })
    }

    fn build_stream(
        &mut self,
        device: cpal::Device,
        config: StreamConfig,
        sample_format: SampleFormat,
    ) -> Result<Stream, AudioError> {
        let audio_producer = Arc::clone(&self.audio_producer);
        let stats = Arc::clone(&self.stats);
        let watchdog = self.watchdog.clone();
        let running = Arc::clone(&self.running);
        let restart_needed = Arc::clone(&self.restart_needed);

        let err_fn = move |err: cpal::StreamError| {
            tracing::error!("Audio stream error: {}", err);
            restart_needed.store(true, Ordering::SeqCst);
        };

        // Shared post-conversion path: feed watchdog, push to ring buffer,
        // count drops. Nothing here blocks.
        let handle_i16 = move |i16_data: &[i16]| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            watchdog.feed();

            let written = audio_producer.lock().write(i16_data);
            stats.buffers_captured.fetch_add(1, Ordering::Relaxed);
            if written < i16_data.len() {
                stats
                    .samples_dropped
                    .fetch_add((i16_data.len() - written) as u64, Ordering::Relaxed);
            }
            *stats.last_buffer_time.write() = Some(Instant::now());
        };

        // Thread-local scratch keeps the conversion allocation-free in the
        // callback.
        thread_local! {
            static CONVERT_BUFFER: std::cell::RefCell<Vec<i16>> =
                const { std::cell::RefCell::new(Vec::new()) };
        }

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &_| {
                    handle_i16(data);
                },
                err_fn,
                None,
            )?,
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        for &s in data {
                            let clamped = s.clamp(-1.0, 1.0);
                            converted.push((clamped * 32767.0).round() as i16);
                        }
                        handle_i16(&converted);
                    });
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        for &s in data {
                            converted.push((s as i32 - 32768) as i16);
                        }
                        handle_i16(&converted);
                    });
                },
                err_fn,
                None,
            )?,
            other => {
                return Err(AudioError::FormatNotSupported {
                    format: format!("{:?}", other),
                });
            }
        };

        Ok(stream)
    }

    fn stop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }
}
