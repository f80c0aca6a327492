use crate::config::VadConfig;

/// Energy-based per-frame speech classifier.
///
/// Pure function of one frame: no history, no side effects. A frame is
/// speech iff its RMS energy strictly exceeds the threshold, so boundary
/// equality classifies as non-speech.
#[derive(Debug, Clone, Copy)]
pub struct EnergyVad {
    threshold: f32,
}

impl EnergyVad {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            threshold: config.energy_threshold,
        }
    }

    /// RMS on the raw 16-bit PCM scale. Sum of squares accumulates in i64
    /// (a full-scale 480-sample frame stays well below i64::MAX); the mean
    /// and root are taken in f64 to avoid precision loss.
    pub fn rms(frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }

        let sum_squares: i64 = frame
            .iter()
            .map(|&sample| {
                let s = sample as i64;
                s * s
            })
            .sum();

        let mean_square = sum_squares as f64 / frame.len() as f64;
        mean_square.sqrt() as f32
    }

    pub fn is_speech(&self, frame: &[i16]) -> bool {
        Self::rms(frame) > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FRAME_SIZE_SAMPLES;

    fn vad(threshold: f32) -> EnergyVad {
        EnergyVad::new(&VadConfig {
            energy_threshold: threshold,
        })
    }

    #[test]
    fn silence_is_not_speech() {
        let silence = vec![0i16; FRAME_SIZE_SAMPLES];
        assert!(!vad(500.0).is_speech(&silence));
    }

    #[test]
    fn empty_frame_is_not_speech() {
        assert!(!vad(0.0).is_speech(&[]));
    }

    #[test]
    fn constant_amplitude_rms_equals_amplitude() {
        let frame = vec![1000i16; FRAME_SIZE_SAMPLES];
        assert!((EnergyVad::rms(&frame) - 1000.0).abs() < 0.5);
    }

    #[test]
    fn boundary_equality_is_not_speech() {
        // RMS of a constant-amplitude frame is exactly the amplitude.
        let frame = vec![500i16; FRAME_SIZE_SAMPLES];
        assert!(!vad(500.0).is_speech(&frame));
        assert!(vad(499.0).is_speech(&frame));
    }

    #[test]
    fn loud_frame_is_speech() {
        let frame = vec![5000i16, -5000, 5000, -5000];
        assert!(vad(500.0).is_speech(&frame));
    }

    #[test]
    fn sine_wave_rms() {
        let sine: Vec<i16> = (0..FRAME_SIZE_SAMPLES)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / FRAME_SIZE_SAMPLES as f32;
                (phase.sin() * 16384.0) as i16
            })
            .collect();
        // RMS of a full-cycle sine is amplitude / sqrt(2)
        let expected = 16384.0 / std::f32::consts::SQRT_2;
        assert!((EnergyVad::rms(&sine) - expected).abs() < 50.0);
    }
}
