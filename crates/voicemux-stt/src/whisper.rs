use crate::types::TranscriptionError;
use crate::wav::encode_wav_pcm16;
use crate::Transcriber;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";

/// Vocabulary hint biasing the model toward the command phrases the
/// interpreter recognizes.
pub const DEFAULT_PROMPT: &str = "cli one, cli two, cli three, cli four, cli five, \
send it, clear it, tab, escape, undo, save, delete line";

/// Remote transcription endpoint settings.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Full URL of the transcriptions endpoint.
    pub endpoint: String,
    /// Bearer token sent with each request.
    pub api_key: String,
    /// Model name forwarded in the multipart form.
    pub model: String,
    /// Optional vocabulary hint. `None` omits the field entirely.
    pub prompt: Option<String>,
    /// Optional ISO-639-1 language code. `None` lets the service detect.
    pub language: Option<String>,
}

impl WhisperConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            prompt: Some(DEFAULT_PROMPT.to_string()),
            language: None,
        }
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// HTTP client for an OpenAI-compatible `/audio/transcriptions` endpoint.
///
/// Each call uploads the utterance as an in-memory WAV and returns the
/// trimmed transcript. Network and service failures surface as
/// [`TranscriptionError`]; the caller decides how to recover.
pub struct WhisperApiClient {
    config: WhisperConfig,
    client: reqwest::Client,
}

impl WhisperApiClient {
    pub fn new(config: WhisperConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_form(&self, wav_bytes: Vec<u8>) -> Result<reqwest::multipart::Form, TranscriptionError> {
        let file_part = reqwest::multipart::Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|err| TranscriptionError::Encode(err.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone());

        if let Some(prompt) = &self.config.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        Ok(form)
    }
}

#[async_trait::async_trait]
impl Transcriber for WhisperApiClient {
    async fn transcribe(
        &self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<String, TranscriptionError> {
        let wav_bytes = encode_wav_pcm16(samples, sample_rate)?;
        debug!(
            samples = samples.len(),
            bytes = wav_bytes.len(),
            "uploading utterance for transcription"
        );

        let form = self.build_form(wav_bytes)?;
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|err| TranscriptionError::MalformedResponse(err.to_string()))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_whisper() {
        let config = WhisperConfig::new("sk-test");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, "whisper-1");
        assert!(config.prompt.as_deref().unwrap().contains("cli one"));
        assert!(config.language.is_none());
    }

    #[test]
    fn response_parsing_extracts_text_field() {
        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"{"text": " list files \n"}"#).unwrap();
        assert_eq!(parsed.text.trim(), "list files");
    }

    #[test]
    fn response_without_text_field_is_rejected() {
        let result: Result<TranscriptionResponse, _> =
            serde_json::from_str(r#"{"error": "boom"}"#);
        assert!(result.is_err());
    }
}
