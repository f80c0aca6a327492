use thiserror::Error;

/// Gateway failures, all recovered locally: the utterance is discarded, a
/// status event is reported, and listening resumes.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("failed to encode wav: {0}")]
    Encode(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status}: {message}")]
    Service { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("empty transcript")]
    EmptyTranscript,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_formats_status_and_message() {
        let err = TranscriptionError::Service {
            status: 401,
            message: "invalid api key".into(),
        };
        assert_eq!(
            err.to_string(),
            "service returned status 401: invalid api key"
        );
    }
}
