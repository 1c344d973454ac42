use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::Arc;

/// Samples kept for analysis (about a quarter second at 16 kHz)
pub const DEFAULT_CAPACITY: usize = 4096;

/// Level below which the meter reads zero
const FLOOR_DB: f32 = -60.0;

/// Amplitude feed shared between the audio callbacks and the UI.
///
/// Capture and playback both push mono samples; the UI reads levels
/// from the most recent window. Cloning shares the same buffer.
#[derive(Clone)]
pub struct AudioAnalyser {
    buffer: Arc<Mutex<HeapRb<f32>>>,
}

impl Default for AudioAnalyser {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for AudioAnalyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioAnalyser")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl AudioAnalyser {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(HeapRb::new(capacity.max(1)))),
        }
    }

    /// Append samples, dropping the oldest once full
    pub fn push(&self, samples: &[f32]) {
        let mut buffer = self.buffer.lock();
        for &sample in samples {
            if buffer.try_push(sample).is_err() {
                let _ = buffer.try_pop();
                let _ = buffer.try_push(sample);
            }
        }
    }

    /// Forget all samples, e.g. when capture stops
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity().get()
    }

    /// The most recent `count` samples, oldest first
    pub fn latest(&self, count: usize) -> Vec<f32> {
        let buffer = self.buffer.lock();
        let skip = buffer.occupied_len().saturating_sub(count);
        buffer.iter().skip(skip).copied().collect()
    }

    /// Root mean square of the most recent `window` samples
    pub fn rms(&self, window: usize) -> f32 {
        rms(&self.latest(window))
    }

    /// Largest absolute sample in the most recent `window` samples
    pub fn peak(&self, window: usize) -> f32 {
        self.latest(window)
            .iter()
            .fold(0.0f32, |max, s| max.max(s.abs()))
    }

    /// Overall loudness mapped to 0.0..=1.0 on a dB scale
    pub fn level(&self) -> f32 {
        normalized_level(self.rms(1024))
    }

    /// Loudness of `bars` consecutive slices of the buffer, each 0.0..=1.0
    pub fn bar_levels(&self, bars: usize) -> Vec<f32> {
        if bars == 0 {
            return Vec::new();
        }

        let samples = self.latest(usize::MAX);
        if samples.is_empty() {
            return vec![0.0; bars];
        }

        let slice = samples.len().div_ceil(bars).max(1);
        let mut levels: Vec<f32> = samples
            .chunks(slice)
            .map(|chunk| normalized_level(rms(chunk)))
            .collect();
        levels.resize(bars, 0.0);
        levels
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

fn normalized_level(rms: f32) -> f32 {
    if rms <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * rms.log10();
    ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0)
}
