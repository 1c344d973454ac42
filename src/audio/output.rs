use super::analyser::AudioAnalyser;
use crate::{Result, VoxError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
struct QueueState {
    utterance: Option<u64>,
    samples: VecDeque<f32>,
    /// No more samples will be appended for `utterance`
    complete: bool,
}

/// Mono samples waiting to be played, tagged with the utterance they belong to.
///
/// Only one utterance is queued at a time; beginning a new one discards the
/// previous one.
#[derive(Clone, Debug, Default)]
pub struct PlaybackQueue {
    state: Arc<Mutex<QueueState>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start queueing `id`, dropping anything still queued
    pub fn begin(&self, id: u64) {
        let mut state = self.state.lock();
        state.utterance = Some(id);
        state.samples.clear();
        state.complete = false;
    }

    /// Append samples for `id`. Returns `false` if `id` is no longer current.
    pub fn append(&self, id: u64, samples: &[f32]) -> bool {
        let mut state = self.state.lock();
        if state.utterance != Some(id) {
            return false;
        }
        state.samples.extend(samples.iter().copied());
        true
    }

    /// Mark `id` as fully synthesized
    pub fn finish(&self, id: u64) {
        let mut state = self.state.lock();
        if state.utterance == Some(id) {
            state.complete = true;
        }
    }

    /// Drop the current utterance, returning its id
    pub fn cancel(&self) -> Option<u64> {
        let mut state = self.state.lock();
        state.samples.clear();
        state.complete = false;
        state.utterance.take()
    }

    pub fn current(&self) -> Option<u64> {
        self.state.lock().utterance
    }

    /// Fill `out` with queued samples, padding with silence.
    ///
    /// Returns the id of the utterance that finished playing during this
    /// call, if any.
    pub fn fill(&self, out: &mut [f32]) -> Option<u64> {
        let mut state = self.state.lock();

        let available = state.samples.len().min(out.len());
        for (slot, sample) in out.iter_mut().zip(state.samples.drain(..available)) {
            *slot = sample;
        }
        out[available..].fill(0.0);

        if state.samples.is_empty() && state.complete {
            state.complete = false;
            return state.utterance.take();
        }
        None
    }
}

/// Playback on the default output device
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| VoxError::AudioDeviceError("No output device available".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_output_config()
            .map_err(|e| VoxError::AudioDeviceError(format!("Failed to get output config: {}", e)))?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start pulling from `queue`. `on_finished` runs on the audio thread
    /// each time an utterance drains completely.
    pub fn start<F>(
        &mut self,
        queue: PlaybackQueue,
        analyser: Option<AudioAnalyser>,
        on_finished: F,
    ) -> Result<()>
    where
        F: Fn(u64) + Send + 'static,
    {
        if self.stream.is_some() {
            warn!("Output stream already running");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let mut mono = Vec::new();

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    mono.resize(frames, 0.0);

                    let finished = queue.fill(&mut mono);

                    for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                        frame.fill(sample);
                    }

                    if let Some(analyser) = &analyser {
                        analyser.push(&mono);
                    }

                    if let Some(id) = finished {
                        on_finished(id);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                VoxError::AudioDeviceError(format!("Failed to build output stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            VoxError::AudioDeviceError(format!("Failed to start output stream: {}", e))
        })?;

        self.stream = Some(stream);
        info!("Started audio output at {} Hz", self.sample_rate());
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped audio output");
        }
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
