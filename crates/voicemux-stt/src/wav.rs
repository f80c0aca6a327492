use crate::types::TranscriptionError;
use std::io::Cursor;

/// Encodes mono 16-bit PCM into an in-memory WAV byte stream, the wire
/// format the transcription endpoint expects.
pub fn encode_wav_pcm16(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, TranscriptionError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|err| TranscriptionError::Encode(err.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|err| TranscriptionError::Encode(err.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|err| TranscriptionError::Encode(err.to_string()))?;
    }

    Ok(cursor.into_inner())
}
