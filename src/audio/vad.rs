use crate::{Result, VoxError};
use tracing::info;
use voice_activity_detector::VoiceActivityDetector as VadDetector;

/// Voice activity detection using Silero VAD
pub struct VoiceActivityDetector {
    detector: VadDetector,
    sample_rate: u32,
    threshold: f32,
}

impl VoiceActivityDetector {
    /// Create a detector for 8 kHz or 16 kHz mono audio.
    ///
    /// `threshold` is the speech probability (0.0-1.0) at or above which a
    /// chunk counts as speech.
    pub fn new(sample_rate: u32, threshold: f32) -> Result<Self> {
        if ![8000, 16000].contains(&sample_rate) {
            return Err(VoxError::ConfigError(format!(
                "Invalid sample rate: {}. Must be 8000 or 16000",
                sample_rate
            )));
        }

        let detector = VadDetector::builder()
            .sample_rate(sample_rate as i32)
            .chunk_size(chunk_size_for(sample_rate))
            .build()
            .map_err(|e| {
                VoxError::AudioProcessingError(format!("Failed to create VAD: {:?}", e))
            })?;

        info!(
            "Initialized VAD with sample rate: {}, threshold: {}",
            sample_rate, threshold
        );

        Ok(Self {
            detector,
            sample_rate,
            threshold: threshold.clamp(0.0, 1.0),
        })
    }

    /// Whether the chunk contains speech
    pub fn is_speech(&mut self, audio: &[f32]) -> bool {
        self.probability(audio) >= self.threshold
    }

    /// Speech probability for the chunk (0.0-1.0)
    pub fn probability(&mut self, audio: &[f32]) -> f32 {
        self.detector.predict(audio.iter().copied())
    }

    /// Reset the model state between capture sessions
    pub fn reset(&mut self) {
        self.detector.reset();
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per prediction (32 ms)
    pub fn chunk_size(&self) -> usize {
        chunk_size_for(self.sample_rate)
    }
}

fn chunk_size_for(sample_rate: u32) -> usize {
    match sample_rate {
        8000 => 256,
        _ => 512,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sample_rate() {
        assert!(VoiceActivityDetector::new(44100, 0.5).is_err());
    }

    #[test]
    fn test_silence_is_not_speech() {
        if let Ok(mut vad) = VoiceActivityDetector::new(16000, 0.5) {
            assert_eq!(vad.chunk_size(), 512);
            assert!(!vad.is_speech(&[0.0f32; 512]));
        }
    }

    #[test]
    fn test_threshold_is_clamped() {
        if let Ok(vad) = VoiceActivityDetector::new(16000, 1.7) {
            assert_eq!(vad.threshold(), 1.0);
        }
    }
}
