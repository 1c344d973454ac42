//! Text-to-speech with sherpa-rs VITS voices
//!
//! A worker thread synthesizes one sentence at a time and appends it to the
//! shared playback queue, so speech starts before the whole reply is done.
//! Cancelling clears the queue; the worker notices at the next sentence.

use crate::audio::output::PlaybackQueue;
use crate::audio::resampler::resample_audio;
use crate::config::VoiceConfig;
use crate::speech::platform::{PlatformEvent, Utterance, UtteranceId};
use crate::{Result, VoxError};
use crossbeam_channel::{bounded, Receiver, Sender};
use sherpa_rs::tts::{VitsTts, VitsTtsConfig};
use std::collections::HashMap;
use std::path::Path;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// One loaded VITS voice
pub struct TtsEngine {
    tts: VitsTts,
    speaker_id: i32,
}

impl TtsEngine {
    pub fn new(voice: &VoiceConfig) -> Result<Self> {
        for (what, path) in [("Model", &voice.model), ("Tokens file", &voice.tokens)] {
            if path.is_empty() || !Path::new(path).exists() {
                return Err(VoxError::ModelLoadError(format!(
                    "{} not found for voice {:?}: {}",
                    what, voice.name, path
                )));
            }
        }

        info!("Loading VITS voice {:?} from: {}", voice.name, voice.model);

        let config = VitsTtsConfig {
            model: voice.model.clone(),
            tokens: voice.tokens.clone(),
            data_dir: voice.data_dir.clone().unwrap_or_default(),
            length_scale: 1.0,
            noise_scale: 0.667,
            noise_scale_w: 0.8,
            ..Default::default()
        };

        Ok(Self {
            tts: VitsTts::new(config),
            speaker_id: voice.speaker_id,
        })
    }

    /// Synthesize `text`, returning samples and their sample rate
    pub fn synthesize(&mut self, text: &str) -> Result<(Vec<f32>, u32)> {
        let audio = self
            .tts
            .create(text, self.speaker_id, 1.0)
            .map_err(|e| VoxError::SynthesisError(format!("Synthesis failed: {}", e)))?;

        Ok((audio.samples, audio.sample_rate as u32))
    }
}

/// Split text into sentences so the first one can play while the rest
/// is synthesized
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?' | ';')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Resolve the configured voice for a voice URI, or the default voice
pub fn resolve_voice<'a>(voices: &'a [VoiceConfig], voice_uri: Option<&str>) -> Option<&'a VoiceConfig> {
    match voice_uri {
        Some(uri) => voices.iter().find(|v| v.voice_uri() == uri),
        None => voices.iter().find(|v| v.default).or_else(|| voices.first()),
    }
}

enum SynthCommand {
    Speak {
        utterance: Utterance,
        output_rate: u32,
    },
    Shutdown,
}

/// Handle to the synthesis thread
pub struct Synthesizer {
    command_tx: Sender<SynthCommand>,
    thread: Option<JoinHandle<()>>,
}

impl Synthesizer {
    pub fn start(
        voices: Vec<VoiceConfig>,
        queue: PlaybackQueue,
        events_tx: Sender<PlatformEvent>,
    ) -> Result<Self> {
        let (command_tx, command_rx) = bounded::<SynthCommand>(16);

        let thread = std::thread::Builder::new()
            .name("speech-synthesizer".to_string())
            .spawn(move || synth_loop(voices, queue, command_rx, events_tx))
            .map_err(|e| VoxError::SynthesisError(format!("Failed to spawn synthesizer: {}", e)))?;

        Ok(Self {
            command_tx,
            thread: Some(thread),
        })
    }

    /// Queue an utterance. The playback queue must already be on `utterance.id`.
    pub fn speak(&self, utterance: Utterance, output_rate: u32) -> Result<()> {
        self.command_tx
            .try_send(SynthCommand::Speak {
                utterance,
                output_rate,
            })
            .map_err(|e| VoxError::SynthesisError(format!("Synthesizer unavailable: {}", e)))
    }
}

impl Drop for Synthesizer {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SynthCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Synthesizer thread panicked");
            }
        }
    }
}

fn synth_loop(
    voices: Vec<VoiceConfig>,
    queue: PlaybackQueue,
    command_rx: Receiver<SynthCommand>,
    events_tx: Sender<PlatformEvent>,
) {
    info!("Synthesis worker started with {} voices", voices.len());
    let mut engines: HashMap<String, TtsEngine> = HashMap::new();

    loop {
        let (utterance, output_rate) = match command_rx.recv() {
            Ok(SynthCommand::Speak {
                utterance,
                output_rate,
            }) => (utterance, output_rate),
            Ok(SynthCommand::Shutdown) | Err(_) => break,
        };

        let id = utterance.id;
        if queue.current() != Some(id) {
            debug!("Utterance {} cancelled before synthesis", id);
            continue;
        }

        if let Err(error) = speak_utterance(&voices, &mut engines, &queue, &events_tx, utterance, output_rate) {
            warn!("Utterance {} failed: {}", id, error);
            if queue.current() == Some(id) {
                queue.cancel();
            }
            let _ = events_tx.send(PlatformEvent::UtteranceFailed { id, error });
        }
    }

    info!("Synthesis worker stopped");
}

fn speak_utterance(
    voices: &[VoiceConfig],
    engines: &mut HashMap<String, TtsEngine>,
    queue: &PlaybackQueue,
    events_tx: &Sender<PlatformEvent>,
    utterance: Utterance,
    output_rate: u32,
) -> Result<()> {
    let id: UtteranceId = utterance.id;
    let voice = resolve_voice(voices, utterance.voice_uri.as_deref()).ok_or_else(|| {
        VoxError::SynthesisError(match &utterance.voice_uri {
            Some(uri) => format!("Unknown voice {}", uri),
            None => "No voices configured".to_string(),
        })
    })?;

    let uri = voice.voice_uri();
    if !engines.contains_key(&uri) {
        let engine = TtsEngine::new(voice)?;
        engines.insert(uri.clone(), engine);
    }
    let engine = engines
        .get_mut(&uri)
        .ok_or_else(|| VoxError::SynthesisError(format!("Voice {} not loaded", uri)))?;

    let mut started = false;
    for sentence in split_sentences(&utterance.text) {
        if queue.current() != Some(id) {
            debug!("Utterance {} cancelled mid-synthesis", id);
            return Ok(());
        }

        let (samples, rate) = engine.synthesize(&sentence)?;
        let samples = resample_audio(&samples, rate, output_rate)?;

        if !queue.append(id, &samples) {
            return Ok(());
        }
        if !started {
            started = true;
            let _ = events_tx.send(PlatformEvent::UtteranceStarted(id));
        }
    }

    queue.finish(id);
    Ok(())
}
