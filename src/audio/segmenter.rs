//! Splits a stream of classified audio chunks into utterances

use std::time::Duration;
use tracing::debug;

/// Timing rules for utterance segmentation
#[derive(Clone, Debug)]
pub struct SegmenterConfig {
    pub sample_rate: u32,
    /// Trailing silence that ends an utterance
    pub silence: Duration,
    /// Utterances shorter than this are dropped as noise
    pub min_utterance: Duration,
    /// Utterances are cut at this length even without a pause
    pub max_utterance: Duration,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            sample_rate: super::RECOGNIZER_SAMPLE_RATE,
            silence: Duration::from_millis(800),
            min_utterance: Duration::from_millis(300),
            max_utterance: Duration::from_secs(30),
        }
    }
}

/// Accumulates speech chunks and emits a whole utterance once the speaker
/// pauses long enough or the utterance hits the maximum length.
#[derive(Debug)]
pub struct UtteranceSegmenter {
    config: SegmenterConfig,
    buffer: Vec<f32>,
    in_speech: bool,
    /// Samples of silence since the last speech chunk
    silence_samples: usize,
}

impl UtteranceSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            in_speech: false,
            silence_samples: 0,
        }
    }

    fn samples_for(&self, duration: Duration) -> usize {
        (duration.as_millis() * self.config.sample_rate as u128 / 1000) as usize
    }

    /// Feed one chunk and its speech classification.
    ///
    /// Returns the samples of a finished utterance, if this chunk ended one.
    pub fn push(&mut self, chunk: &[f32], is_speech: bool) -> Option<Vec<f32>> {
        if is_speech {
            if !self.in_speech {
                debug!("Speech started");
                self.in_speech = true;
                self.buffer.clear();
            }
            self.buffer.extend_from_slice(chunk);
            self.silence_samples = 0;

            if self.buffer.len() >= self.samples_for(self.config.max_utterance) {
                debug!("Maximum utterance length reached");
                return self.take();
            }
            return None;
        }

        if !self.in_speech {
            return None;
        }

        self.buffer.extend_from_slice(chunk);
        self.silence_samples += chunk.len();

        if self.silence_samples < self.samples_for(self.config.silence) {
            return None;
        }

        let speech_len = self.buffer.len() - self.silence_samples;
        if speech_len < self.samples_for(self.config.min_utterance) {
            debug!("Utterance too short ({} samples), discarding", speech_len);
            self.reset();
            return None;
        }

        self.take()
    }

    /// Whether speech is currently being accumulated
    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Drop any partial utterance
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_speech = false;
        self.silence_samples = 0;
    }

    fn take(&mut self) -> Option<Vec<f32>> {
        let utterance = std::mem::take(&mut self.buffer);
        self.reset();
        Some(utterance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 512;

    fn segmenter() -> UtteranceSegmenter {
        UtteranceSegmenter::new(SegmenterConfig {
            sample_rate: 16000,
            silence: Duration::from_millis(96), // three chunks
            min_utterance: Duration::from_millis(64),
            max_utterance: Duration::from_millis(320),
        })
    }

    #[test]
    fn test_pause_ends_utterance() {
        let mut seg = segmenter();
        let chunk = [0.3f32; CHUNK];

        assert!(seg.push(&chunk, false).is_none());
        for _ in 0..4 {
            assert!(seg.push(&chunk, true).is_none());
        }
        assert!(seg.in_speech());
        assert!(seg.push(&chunk, false).is_none());
        assert!(seg.push(&chunk, false).is_none());

        let utterance = seg.push(&chunk, false).expect("utterance");
        assert_eq!(utterance.len(), 7 * CHUNK);
        assert!(!seg.in_speech());
    }

    #[test]
    fn test_short_blip_is_discarded() {
        let mut seg = segmenter();
        let chunk = [0.3f32; CHUNK];

        seg.push(&chunk, true);
        for _ in 0..3 {
            assert!(seg.push(&chunk, false).is_none());
        }
        assert!(!seg.in_speech());
    }

    #[test]
    fn test_long_speech_is_cut() {
        let mut seg = segmenter();
        let chunk = [0.3f32; CHUNK];

        // 320 ms at 16 kHz is exactly ten chunks
        for _ in 0..9 {
            assert!(seg.push(&chunk, true).is_none());
        }
        assert_eq!(seg.push(&chunk, true).map(|u| u.len()), Some(10 * CHUNK));
    }
}
