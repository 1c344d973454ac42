//! On-device speech: cpal capture and playback, Whisper recognition and
//! sherpa-rs synthesis

pub mod recognizer;
pub mod synthesizer;

use crate::audio::{AudioAnalyser, AudioInput, AudioOutput, PlaybackQueue};
use crate::config::SpeechConfig;
use crate::speech::platform::{PlatformEvent, SpeechPlatform, Utterance, VoiceDescriptor};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use recognizer::Recognizer;
use synthesizer::Synthesizer;
use tracing::{debug, info};

pub struct NativeSpeech {
    config: SpeechConfig,
    voices: Vec<VoiceDescriptor>,
    analyser: AudioAnalyser,
    events_tx: Sender<PlatformEvent>,
    events_rx: Receiver<PlatformEvent>,
    /// Started on first capture; loading Whisper takes a while
    recognizer: Option<Recognizer>,
    input: Option<AudioInput>,
    /// Opened on first utterance
    output: Option<AudioOutput>,
    queue: PlaybackQueue,
    synthesizer: Synthesizer,
}

impl NativeSpeech {
    pub fn open(config: &SpeechConfig) -> Result<Self> {
        let (events_tx, events_rx) = unbounded();
        let queue = PlaybackQueue::new();

        let voices = config
            .voices
            .iter()
            .map(|v| VoiceDescriptor::new(v.voice_uri(), v.name.clone(), v.lang.clone(), v.default))
            .collect();

        let synthesizer = Synthesizer::start(config.voices.clone(), queue.clone(), events_tx.clone())?;

        info!("Native speech platform opened");

        Ok(Self {
            config: config.clone(),
            voices,
            analyser: AudioAnalyser::default(),
            events_tx,
            events_rx,
            recognizer: None,
            input: None,
            output: None,
            queue,
            synthesizer,
        })
    }

    fn ensure_output(&mut self) -> Result<u32> {
        if let Some(output) = &self.output {
            return Ok(output.sample_rate());
        }

        let mut output = AudioOutput::new()?;
        let events_tx = self.events_tx.clone();
        output.start(self.queue.clone(), Some(self.analyser.clone()), move |id| {
            let _ = events_tx.try_send(PlatformEvent::UtteranceEnded(id));
        })?;

        let rate = output.sample_rate();
        self.output = Some(output);
        Ok(rate)
    }
}

impl SpeechPlatform for NativeSpeech {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.clone()
    }

    fn start_capture(&mut self) -> Result<()> {
        if self.input.is_some() {
            return Ok(());
        }

        if self.recognizer.is_none() {
            self.recognizer = Some(Recognizer::start(&self.config, self.events_tx.clone())?);
        }
        let Some(recognizer) = self.recognizer.as_ref() else {
            return Ok(());
        };

        let mut input = AudioInput::new()?.with_analyser(self.analyser.clone());
        recognizer.begin(input.sample_rate());
        if let Err(e) = input.start_recording(recognizer.audio_sender()) {
            recognizer.end();
            return Err(e);
        }

        self.input = Some(input);
        Ok(())
    }

    fn stop_capture(&mut self) {
        if let Some(mut input) = self.input.take() {
            input.stop_recording();
            if let Some(recognizer) = &self.recognizer {
                recognizer.end();
            }
            debug!("Capture stopped");
        }
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let output_rate = self.ensure_output()?;
        self.queue.begin(utterance.id);
        let id = utterance.id;
        if let Err(e) = self.synthesizer.speak(utterance, output_rate) {
            if self.queue.current() == Some(id) {
                self.queue.cancel();
            }
            return Err(e);
        }
        Ok(())
    }

    fn cancel_speech(&mut self) {
        if let Some(id) = self.queue.cancel() {
            debug!("Playback of utterance {} cancelled", id);
        }
    }

    fn analyser(&self) -> AudioAnalyser {
        self.analyser.clone()
    }

    fn events(&self) -> Receiver<PlatformEvent> {
        self.events_rx.clone()
    }
}
