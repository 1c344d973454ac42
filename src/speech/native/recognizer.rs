//! Continuous recognition: capture → resample → VAD segmentation → Whisper
//!
//! Two threads: the segmenter consumes microphone chunks and cuts them into
//! utterances; the transcriber runs Whisper on each utterance. Both report
//! readiness before `Recognizer::start` returns, so model load failures
//! surface as errors of the first `start_capture`.

use crate::audio::{
    AudioResampler, SegmenterConfig, UtteranceSegmenter, VoiceActivityDetector,
    RECOGNIZER_SAMPLE_RATE,
};
use crate::config::SpeechConfig;
use crate::speech::platform::PlatformEvent;
use crate::{Result, VoxError};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::path::Path;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Whisper speech-to-text engine
pub struct WhisperEngine {
    context: WhisperContext,
    language: Option<String>,
    n_threads: i32,
}

impl WhisperEngine {
    pub fn new(model_path: &Path, language: Option<String>, n_threads: i32) -> Result<Self> {
        info!("Loading Whisper model from: {:?}", model_path);

        if !model_path.exists() {
            return Err(VoxError::ModelLoadError(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        let context = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| VoxError::ModelLoadError("Invalid model path".to_string()))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| VoxError::ModelLoadError(format!("Failed to load Whisper model: {:?}", e)))?;

        info!("Whisper model loaded successfully");

        Ok(Self {
            context,
            language,
            n_threads,
        })
    }

    /// Transcribe 16 kHz mono samples
    pub fn transcribe(&self, samples: &[f32]) -> Result<String> {
        if samples.is_empty() {
            return Err(VoxError::RecognitionError("Empty audio segment".to_string()));
        }

        debug!(
            "Transcribing {} samples ({:.2}s)",
            samples.len(),
            samples.len() as f32 / RECOGNIZER_SAMPLE_RATE as f32
        );

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.n_threads);
        params.set_translate(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        if let Some(ref lang) = self.language {
            params.set_language(Some(lang));
        }

        let mut state = self.context.create_state().map_err(|e| {
            VoxError::RecognitionError(format!("Failed to create state: {:?}", e))
        })?;

        state
            .full(params, samples)
            .map_err(|e| VoxError::RecognitionError(format!("Transcription failed: {:?}", e)))?;

        let num_segments = state.full_n_segments().map_err(|e| {
            VoxError::RecognitionError(format!("Failed to get segments: {:?}", e))
        })?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state.full_get_segment_text(i).map_err(|e| {
                VoxError::RecognitionError(format!("Failed to get segment text: {:?}", e))
            })?;
            text.push_str(&segment);
        }

        Ok(clean_transcript(&text))
    }
}

/// Drop Whisper's non-speech annotations such as `[BLANK_AUDIO]` or `(music)`
pub fn clean_transcript(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

enum CaptureControl {
    /// A capture session starts at the given device rate
    Begin { sample_rate: u32 },
    /// The session ended; drop partial audio
    End,
    Shutdown,
}

struct Job {
    segment: u64,
    samples: Vec<f32>,
}

/// Handle to the recognition threads
pub struct Recognizer {
    audio_tx: Sender<Vec<f32>>,
    control_tx: Sender<CaptureControl>,
    threads: Vec<JoinHandle<()>>,
}

impl Recognizer {
    /// Load the models and start both threads
    pub fn start(config: &SpeechConfig, events_tx: Sender<PlatformEvent>) -> Result<Self> {
        let (audio_tx, audio_rx) = bounded::<Vec<f32>>(256);
        let (control_tx, control_rx) = bounded::<CaptureControl>(16);
        let (job_tx, job_rx) = bounded::<Job>(8);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(2);

        let segmenter_config = SegmenterConfig {
            sample_rate: RECOGNIZER_SAMPLE_RATE,
            silence: Duration::from_millis(config.silence_ms),
            min_utterance: Duration::from_millis(config.min_utterance_ms),
            max_utterance: Duration::from_secs_f32(config.max_utterance_secs),
        };
        let vad_threshold = config.vad_threshold;
        let segmenter_ready = ready_tx.clone();

        let segmenter = std::thread::Builder::new()
            .name("speech-segmenter".to_string())
            .spawn(move || {
                let vad = match VoiceActivityDetector::new(RECOGNIZER_SAMPLE_RATE, vad_threshold) {
                    Ok(vad) => {
                        let _ = segmenter_ready.send(Ok(()));
                        vad
                    }
                    Err(e) => {
                        error!("Failed to initialize VAD: {}", e);
                        let _ = segmenter_ready.send(Err(e));
                        return;
                    }
                };
                segmenter_loop(vad, segmenter_config, audio_rx, control_rx, job_tx);
            })
            .map_err(|e| VoxError::RecognitionError(format!("Failed to spawn segmenter: {}", e)))?;

        let model_path = config.whisper_model.clone();
        let language = config.language.clone();
        let n_threads = config.n_threads;

        let transcriber = std::thread::Builder::new()
            .name("speech-transcriber".to_string())
            .spawn(move || {
                let engine = match WhisperEngine::new(&model_path, language, n_threads) {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        error!("Failed to initialize Whisper engine: {}", e);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                transcriber_loop(engine, job_rx, events_tx);
            })
            .map_err(|e| {
                VoxError::RecognitionError(format!("Failed to spawn transcriber: {}", e))
            })?;

        let recognizer = Self {
            audio_tx,
            control_tx,
            threads: vec![segmenter, transcriber],
        };

        for _ in 0..2 {
            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(VoxError::RecognitionError(
                        "Recognizer thread exited during startup".to_string(),
                    ))
                }
            }
        }

        info!("Recognizer ready");
        Ok(recognizer)
    }

    /// Where the microphone should send its chunks
    pub fn audio_sender(&self) -> Sender<Vec<f32>> {
        self.audio_tx.clone()
    }

    pub fn begin(&self, sample_rate: u32) {
        let _ = self.control_tx.send(CaptureControl::Begin { sample_rate });
    }

    pub fn end(&self) {
        let _ = self.control_tx.send(CaptureControl::End);
    }
}

impl Drop for Recognizer {
    fn drop(&mut self) {
        let _ = self.control_tx.send(CaptureControl::Shutdown);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("Recognizer thread panicked");
            }
        }
    }
}

fn segmenter_loop(
    mut vad: VoiceActivityDetector,
    config: SegmenterConfig,
    audio_rx: Receiver<Vec<f32>>,
    control_rx: Receiver<CaptureControl>,
    job_tx: Sender<Job>,
) {
    let chunk_size = vad.chunk_size();
    let mut segmenter = UtteranceSegmenter::new(config);
    let mut resampler: Option<AudioResampler> = None;
    let mut pending: Vec<f32> = Vec::new();
    let mut active = false;
    let mut next_segment = 1u64;

    loop {
        select! {
            recv(control_rx) -> msg => match msg {
                Ok(CaptureControl::Begin { sample_rate }) => {
                    resampler = if sample_rate == RECOGNIZER_SAMPLE_RATE {
                        None
                    } else {
                        match AudioResampler::new(sample_rate, RECOGNIZER_SAMPLE_RATE) {
                            Ok(r) => Some(r),
                            Err(e) => {
                                error!("Cannot resample capture audio: {}", e);
                                continue;
                            }
                        }
                    };
                    vad.reset();
                    segmenter.reset();
                    pending.clear();
                    active = true;
                    debug!("Segmenter active at {} Hz input", sample_rate);
                }
                Ok(CaptureControl::End) => {
                    active = false;
                    segmenter.reset();
                    pending.clear();
                }
                Ok(CaptureControl::Shutdown) | Err(_) => break,
            },
            recv(audio_rx) -> msg => {
                let Ok(samples) = msg else { break };
                if !active {
                    continue;
                }

                let samples = match resampler.as_mut() {
                    Some(r) => match r.push(&samples) {
                        Ok(out) => out,
                        Err(e) => {
                            warn!("Dropping capture chunk: {}", e);
                            continue;
                        }
                    },
                    None => samples,
                };
                pending.extend_from_slice(&samples);

                while pending.len() >= chunk_size {
                    let chunk: Vec<f32> = pending.drain(..chunk_size).collect();
                    let is_speech = vad.is_speech(&chunk);
                    if let Some(utterance) = segmenter.push(&chunk, is_speech) {
                        let job = Job { segment: next_segment, samples: utterance };
                        next_segment += 1;
                        if job_tx.try_send(job).is_err() {
                            warn!("Transcriber busy, dropping utterance");
                        }
                    }
                }
            }
        }
    }

    debug!("Segmenter stopped");
}

fn transcriber_loop(engine: WhisperEngine, job_rx: Receiver<Job>, events_tx: Sender<PlatformEvent>) {
    info!("Transcription worker started");

    // Ends when the segmenter drops its sender
    while let Ok(job) = job_rx.recv() {
        let event = match engine.transcribe(&job.samples) {
            Ok(text) if text.is_empty() => {
                debug!("Segment {} had no words", job.segment);
                continue;
            }
            Ok(text) => PlatformEvent::Transcript {
                segment: job.segment,
                text,
                is_final: true,
            },
            Err(e) => {
                warn!("Transcription error: {}", e);
                PlatformEvent::RecognitionFailed(e)
            }
        };

        if events_tx.send(event).is_err() {
            break;
        }
    }

    info!("Transcription worker stopped");
}
