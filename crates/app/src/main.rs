use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use voicemux_app::runtime::{self, RuntimeOptions};
use voicemux_audio::{list_input_devices, CaptureConfig};
use voicemux_stt::{WhisperApiClient, WhisperConfig};
use voicemux_tmux::TmuxSink;
use voicemux_vad::{SegmenterConfig, VadConfig};

#[derive(Parser, Debug)]
#[command(name = "voicemux", version, about = "Voice-controlled terminal multiplexer")]
struct Cli {
    /// Input device name; host default when omitted.
    #[arg(long)]
    device: Option<String>,

    /// List input devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// RMS speech threshold on the 16-bit PCM scale.
    #[arg(long, default_value_t = 500.0)]
    threshold: f32,

    /// Consecutive speech frames required to start recording.
    #[arg(long, default_value_t = 5)]
    min_speech_frames: u32,

    /// Consecutive silence frames that end an utterance.
    #[arg(long, default_value_t = 30)]
    silence_frames: u32,

    /// Hard cap on a single utterance, in seconds.
    #[arg(long, default_value_t = 15)]
    max_record_secs: u32,

    /// Transcription endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Transcription model name.
    #[arg(long)]
    model: Option<String>,

    /// Spoken language hint (ISO-639-1); auto-detect when omitted.
    #[arg(long)]
    language: Option<String>,

    /// API key for the transcription service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Comma-separated session names; the first gets initial focus.
    #[arg(long, value_delimiter = ',', default_value = "cli1,cli2,cli3,cli4,cli5")]
    sessions: Vec<String>,

    /// tmux binary to invoke.
    #[arg(long, default_value = "tmux")]
    tmux_bin: String,
}

/// File-only logging: stdout belongs to the status line.
fn init_logging() -> Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "voicemux.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(non_blocking_file)
        .with_env_filter(log_level)
        .with_ansi(false)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        for name in list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    init_logging()?;
    tracing::info!("Starting voicemux");

    let Some(api_key) = cli.api_key else {
        bail!("an API key is required: pass --api-key or set OPENAI_API_KEY");
    };
    if cli.sessions.is_empty() {
        bail!("--sessions must name at least one session");
    }

    let mut whisper = WhisperConfig::new(api_key);
    if let Some(endpoint) = cli.endpoint {
        whisper.endpoint = endpoint;
    }
    if let Some(model) = cli.model {
        whisper.model = model;
    }
    whisper.language = cli.language;

    let segmenter = SegmenterConfig {
        min_speech_frames: cli.min_speech_frames,
        silence_frames: cli.silence_frames,
        max_record_secs: cli.max_record_secs,
        ..SegmenterConfig::default()
    };

    let opts = RuntimeOptions {
        capture: CaptureConfig {
            device: cli.device,
            sample_rate_hz: segmenter.sample_rate_hz,
        },
        vad: VadConfig {
            energy_threshold: cli.threshold,
        },
        segmenter,
        sessions: cli.sessions,
    };

    runtime::run(
        opts,
        Arc::new(WhisperApiClient::new(whisper)),
        Arc::new(TmuxSink::new(cli.tmux_bin)),
    )
    .await
}
