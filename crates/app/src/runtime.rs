use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use voicemux_audio::{
    AudioCaptureThread, AudioFrame, AudioRingBuffer, CaptureConfig, CaptureStats, ChunkerConfig,
    FrameChunker,
};
use voicemux_command::{CommandInterpreter, CommandText, SessionSink, StatusEvent};
use voicemux_foundation::{
    AppState, HealthCheck, HealthMonitor, ShutdownHandler, StateManager,
};
use voicemux_stt::Transcriber;
use voicemux_vad::{EnergyVad, SegmenterConfig, UtteranceSegmenter, VadConfig};

use crate::display::StatusLine;

const RING_BUFFER_SAMPLES: usize = 16_384 * 4;
const FRAME_CHANNEL_CAPACITY: usize = 200;
const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Everything the pipeline needs besides its two external collaborators.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub capture: CaptureConfig,
    pub vad: VadConfig,
    pub segmenter: SegmenterConfig,
    /// Session names, first entry is the initial focus.
    pub sessions: Vec<String>,
}

/// Health check fed by the capture thread's stats.
struct CaptureAliveCheck {
    stats: Arc<CaptureStats>,
    max_silence: Duration,
}

impl HealthCheck for CaptureAliveCheck {
    fn check(&self) -> Result<(), String> {
        match self.stats.time_since_last_buffer() {
            Some(elapsed) if elapsed > self.max_silence => Err(format!(
                "no audio buffers for {:.1}s",
                elapsed.as_secs_f32()
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "audio-capture"
    }
}

/// Builds the full pipeline and runs it until shutdown.
///
/// Capture runs on its own OS thread feeding a lock-free ring buffer; a
/// chunker task reassembles fixed 30ms frames and broadcasts them; the
/// segmenter task turns frames into utterances and hands each one to a
/// short-lived worker for transcription and command dispatch, so ingestion
/// never waits on the network.
pub async fn run(
    opts: RuntimeOptions,
    transcriber: Arc<dyn Transcriber>,
    sink: Arc<dyn SessionSink>,
) -> Result<()> {
    let default_session = opts
        .sessions
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("at least one session name is required"))?;

    let state_manager = StateManager::new();
    let shutdown = ShutdownHandler::new().install().await;

    for session in &opts.sessions {
        sink.ensure_created(session)
            .await
            .with_context(|| format!("failed to create session {session}"))?;
    }
    tracing::info!(sessions = ?opts.sessions, "Sessions ready");

    // --- Capture thread + ring buffer ---
    let (audio_producer, audio_consumer) = AudioRingBuffer::new(RING_BUFFER_SAMPLES).split();
    let (capture, device_config, fatal_rx) =
        AudioCaptureThread::spawn(opts.capture.clone(), audio_producer)?;
    tracing::info!(
        sample_rate = device_config.sample_rate,
        channels = device_config.channels,
        "Audio capture started"
    );

    let health_monitor = HealthMonitor::new(Duration::from_secs(10));
    health_monitor.register(Box::new(CaptureAliveCheck {
        stats: capture.stats.clone(),
        max_silence: Duration::from_secs(10),
    }));
    let _health_monitor = health_monitor.start();

    // --- Frame chunker ---
    let (frame_tx, _) = broadcast::channel::<AudioFrame>(FRAME_CHANNEL_CAPACITY);
    let chunker = FrameChunker::new(
        audio_consumer,
        frame_tx.clone(),
        ChunkerConfig {
            frame_size_samples: opts.segmenter.frame_size_samples,
            sample_rate_hz: opts.segmenter.sample_rate_hz,
        },
        device_config.channels,
    );
    let chunker_handle = chunker.spawn();

    // --- Status display ---
    let (status_tx, status_rx) = mpsc::channel::<StatusEvent>(STATUS_CHANNEL_CAPACITY);
    let status_line = StatusLine::new(opts.sessions.clone(), default_session.clone());
    let display_handle = status_line.clone().spawn(status_rx);

    // --- Interpreter + segmenter task ---
    let interpreter = Arc::new(Mutex::new(CommandInterpreter::new(
        sink,
        status_tx.clone(),
        default_session,
    )?));

    let segmenter_handle = spawn_segmenter(
        frame_tx.subscribe(),
        opts.vad,
        opts.segmenter.clone(),
        transcriber,
        interpreter,
        status_tx.clone(),
    );

    state_manager.transition(AppState::Listening)?;
    let _ = status_tx.send(StatusEvent::Listening).await;

    // --- Main loop ---
    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    let mut fatal_poll = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = fatal_poll.tick() => {
                if let Ok(err) = fatal_rx.try_recv() {
                    tracing::error!("Fatal capture error: {}", err);
                    let _ = status_tx.send(StatusEvent::Error {
                        message: err.to_string(),
                    }).await;
                    break;
                }
            }
            _ = stats_interval.tick() => {
                let stats = &capture.stats;
                tracing::info!(
                    buffers = stats.buffers_captured.load(std::sync::atomic::Ordering::Relaxed),
                    dropped = stats.samples_dropped.load(std::sync::atomic::Ordering::Relaxed),
                    restarts = stats.restarts.load(std::sync::atomic::Ordering::Relaxed),
                    "Capture stats"
                );
            }
        }
    }

    // --- Graceful shutdown: stop the frame source first, then the tasks ---
    tracing::info!("Beginning graceful shutdown");
    state_manager.transition(AppState::Stopping)?;

    capture.stop();
    tracing::info!("Audio capture stopped");

    chunker_handle.abort();
    segmenter_handle.abort();
    let _ = chunker_handle.await;
    let _ = segmenter_handle.await;

    // Closing the last status sender ends the display task.
    drop(status_tx);
    let _ = display_handle.await;
    status_line.finish();

    state_manager.transition(AppState::Stopped)?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Frame consumer: VAD + segmentation, with per-utterance dispatch workers.
fn spawn_segmenter(
    mut frame_rx: broadcast::Receiver<AudioFrame>,
    vad: VadConfig,
    config: SegmenterConfig,
    transcriber: Arc<dyn Transcriber>,
    interpreter: Arc<Mutex<CommandInterpreter>>,
    status_tx: mpsc::Sender<StatusEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut segmenter = UtteranceSegmenter::new(EnergyVad::new(&vad), &config);
        loop {
            match frame_rx.recv().await {
                Ok(frame) => {
                    if let Some(utterance) = segmenter.ingest(&frame.samples) {
                        tracing::debug!(
                            duration_ms = utterance.duration_ms(),
                            "Dispatching utterance"
                        );
                        let _ = status_tx.send(StatusEvent::Transcribing).await;

                        // One worker per utterance; segmentation keeps
                        // consuming live frames while this runs.
                        let transcriber = transcriber.clone();
                        let interpreter = interpreter.clone();
                        let status_tx = status_tx.clone();
                        tokio::spawn(async move {
                            let result = transcriber
                                .transcribe(&utterance.samples, utterance.sample_rate)
                                .await;
                            let text = match result {
                                Ok(text) => CommandText::Text(text),
                                Err(err) => CommandText::Failed(err.to_string()),
                            };
                            interpreter.lock().await.process(text).await;
                            let _ = status_tx.send(StatusEvent::Listening).await;
                        });
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Segmenter lagged, dropping frames");
                    segmenter.reset();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Frame stream closed, segmenter exiting");
                    break;
                }
            }
        }
    })
}
