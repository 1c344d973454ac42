//! Voice training wizard state

/// One prompt as the user read it
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingRecording {
    pub prompt_index: usize,
    pub transcript: String,
    /// Fraction of the prompt's words that were recognized
    pub score: f32,
    /// Loudest input sample while recording, 0.0..=1.0
    pub peak_level: f32,
}

/// Walks the user through a fixed list of phrases
#[derive(Clone, Debug)]
pub struct TrainingSession {
    prompts: Vec<String>,
    recordings: Vec<TrainingRecording>,
}

impl TrainingSession {
    pub fn new(prompts: Vec<String>) -> Self {
        Self {
            prompts,
            recordings: Vec::new(),
        }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Index of the prompt waiting to be read
    pub fn current_index(&self) -> usize {
        self.recordings.len()
    }

    pub fn current_prompt(&self) -> Option<&str> {
        self.prompts.get(self.current_index()).map(String::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.recordings.len() >= self.prompts.len()
    }

    /// Record a finalized utterance against the current prompt and advance.
    ///
    /// Returns `None` once every prompt has a recording.
    pub fn record(&mut self, transcript: &str, peak_level: f32) -> Option<&TrainingRecording> {
        let prompt_index = self.current_index();
        let prompt = self.prompts.get(prompt_index)?;

        self.recordings.push(TrainingRecording {
            prompt_index,
            transcript: transcript.trim().to_string(),
            score: word_match_score(prompt, transcript),
            peak_level: peak_level.clamp(0.0, 1.0),
        });
        self.recordings.last()
    }

    /// Discard the latest recording so its prompt can be read again
    pub fn redo_last(&mut self) -> Option<TrainingRecording> {
        self.recordings.pop()
    }

    pub fn recordings(&self) -> &[TrainingRecording] {
        &self.recordings
    }

    pub fn last_recording(&self) -> Option<&TrainingRecording> {
        self.recordings.last()
    }

    /// Mean score over all recordings, if any
    pub fn average_score(&self) -> Option<f32> {
        if self.recordings.is_empty() {
            return None;
        }
        let total: f32 = self.recordings.iter().map(|r| r.score).sum();
        Some(total / self.recordings.len() as f32)
    }
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Fraction of `expected`'s words found in `heard`, ignoring case and
/// punctuation. Each heard word can match once.
pub fn word_match_score(expected: &str, heard: &str) -> f32 {
    let expected = words(expected);
    if expected.is_empty() {
        return 1.0;
    }

    let mut heard = words(heard);
    let matched = expected
        .iter()
        .filter(|word| {
            if let Some(pos) = heard.iter().position(|h| h == *word) {
                heard.swap_remove(pos);
                true
            } else {
                false
            }
        })
        .count();

    matched as f32 / expected.len() as f32
}
