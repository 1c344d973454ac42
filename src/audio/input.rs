use super::analyser::AudioAnalyser;
use crate::{Result, VoxError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Microphone capture on the default input device.
///
/// Delivers mono f32 chunks at the device rate and mirrors them into an
/// optional analyser for the level meter.
pub struct AudioInput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    is_recording: Arc<Mutex<bool>>,
    analyser: Option<AudioAnalyser>,
}

impl AudioInput {
    /// Open the default input device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| VoxError::AudioDeviceError("No input device available".into()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| device_error("Failed to get input config", e))?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            is_recording: Arc::new(Mutex::new(false)),
            analyser: None,
        })
    }

    /// Mirror captured samples into `analyser`
    pub fn with_analyser(mut self, analyser: AudioAnalyser) -> Self {
        self.analyser = Some(analyser);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start capturing and send mono chunks to `audio_tx`
    pub fn start_recording(&mut self, audio_tx: Sender<Vec<f32>>) -> Result<()> {
        if *self.is_recording.lock() {
            warn!("Already recording");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let is_recording = Arc::clone(&self.is_recording);
        let analyser = self.analyser.clone();

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !*is_recording.lock() {
                        return;
                    }

                    let samples: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    if let Some(analyser) = &analyser {
                        analyser.push(&samples);
                    }

                    if let Err(e) = audio_tx.try_send(samples) {
                        debug!("Dropping captured audio: {}", e);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| device_error("Failed to build input stream", e))?;

        stream
            .play()
            .map_err(|e| device_error("Failed to start input stream", e))?;

        *self.is_recording.lock() = true;
        self.stream = Some(stream);

        info!("Started audio capture at {} Hz", self.sample_rate());
        Ok(())
    }

    pub fn stop_recording(&mut self) {
        *self.is_recording.lock() = false;

        if let Some(stream) = self.stream.take() {
            drop(stream);
            if let Some(analyser) = &self.analyser {
                analyser.clear();
            }
            info!("Stopped audio capture");
        }
    }

    pub fn is_recording(&self) -> bool {
        *self.is_recording.lock()
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop_recording();
    }
}

/// Backends report a refused microphone as a generic device error
fn device_error(context: &str, error: impl std::fmt::Display) -> VoxError {
    let message = format!("{}: {}", context, error);
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        VoxError::PermissionDenied(message)
    } else {
        VoxError::AudioDeviceError(message)
    }
}
