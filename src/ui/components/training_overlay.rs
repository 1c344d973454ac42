//! One-time voice training wizard
//!
//! Walks the user through the configured phrases. Each finalized utterance
//! is scored against its prompt; finishing or skipping leaves for the chat.

use crate::audio::AudioAnalyser;
use crate::controller::{Action, TrainingSession};
use crate::ui::components::LevelMeter;
use crate::ui::theme::Theme;
use egui::{self, RichText, Vec2};

pub struct TrainingOverlay<'a> {
    session: &'a TrainingSession,
    analyser: &'a AudioAnalyser,
    is_listening: bool,
    interim: &'a str,
    speech_error: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> TrainingOverlay<'a> {
    pub fn new(session: &'a TrainingSession, analyser: &'a AudioAnalyser, theme: &'a Theme) -> Self {
        Self {
            session,
            analyser,
            is_listening: false,
            interim: "",
            speech_error: None,
            theme,
        }
    }

    pub fn listening(mut self, is_listening: bool, interim: &'a str) -> Self {
        self.is_listening = is_listening;
        self.interim = interim;
        self
    }

    pub fn speech_error(mut self, error: Option<&'a str>) -> Self {
        self.speech_error = error;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> Option<Action> {
        let mut action = None;
        let total = self.session.prompts().len();

        ui.vertical_centered(|ui| {
            ui.set_max_width(520.0);
            ui.add_space(self.theme.spacing_lg * 2.0);

            ui.label(
                RichText::new("Voice training")
                    .size(26.0)
                    .strong()
                    .color(self.theme.text_primary),
            );
            ui.label(
                RichText::new("Read each phrase aloud so we can check your microphone and recognition.")
                    .color(self.theme.text_muted),
            );
            ui.add_space(self.theme.spacing_lg);

            match self.session.current_prompt() {
                Some(prompt) => {
                    let step = format!("Phrase {} of {}", self.session.current_index() + 1, total);
                    ui.label(RichText::new(step).size(12.0).color(self.theme.text_muted));

                    egui::Frame::none()
                        .fill(self.theme.bg_secondary)
                        .rounding(self.theme.card_rounding)
                        .inner_margin(self.theme.spacing)
                        .show(ui, |ui| {
                            let response = ui.label(
                                RichText::new(format!("“{}”", prompt))
                                    .size(20.0)
                                    .color(self.theme.text_primary),
                            );
                            let a11y = format!("Training prompt: {}", prompt);
                            response.widget_info(|| {
                                egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &a11y)
                            });
                        });

                    ui.add_space(self.theme.spacing);
                    LevelMeter::new(self.analyser, self.theme)
                        .height(48.0)
                        .color(self.theme.listening)
                        .active(self.is_listening)
                        .show(ui);

                    if !self.interim.is_empty() {
                        ui.label(RichText::new(self.interim).italics().color(self.theme.text_muted));
                    }

                    ui.add_space(self.theme.spacing);
                    let (text, label, next) = if self.is_listening {
                        ("⏹ Stop", "Stop recording", Action::StopListening)
                    } else {
                        ("🎤 Record", "Start recording", Action::StartListening)
                    };
                    let record = ui.add(egui::Button::new(RichText::new(text).size(16.0)).min_size(Vec2::new(140.0, 40.0)));
                    record.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, label));
                    if record.clicked() {
                        action = Some(next);
                    }
                }
                None => {
                    let summary = match self.session.average_score() {
                        Some(score) => format!("All phrases recorded. Recognition accuracy {:.0}%.", score * 100.0),
                        None => "Nothing to record.".to_string(),
                    };
                    ui.label(RichText::new(summary).size(16.0).color(self.theme.success));
                }
            }

            if let Some(last) = self.session.last_recording() {
                ui.add_space(self.theme.spacing_sm);
                ui.label(
                    RichText::new(format!(
                        "Heard: “{}” ({:.0}% match)",
                        last.transcript,
                        last.score * 100.0
                    ))
                    .size(12.0)
                    .color(self.theme.text_secondary),
                );
                if last.peak_level < 0.05 {
                    ui.label(
                        RichText::new("Your microphone level looks very low.")
                            .size(12.0)
                            .color(self.theme.warning),
                    );
                }
            }

            if let Some(error) = self.speech_error {
                ui.add_space(self.theme.spacing_sm);
                ui.label(RichText::new(error).size(12.0).color(self.theme.error));
            }

            ui.add_space(self.theme.spacing_lg);
            ui.horizontal(|ui| {
                if self.session.last_recording().is_some() {
                    let redo = ui.button("↺ Redo last");
                    redo.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Redo last phrase"));
                    if redo.clicked() {
                        action = Some(Action::RedoTrainingPrompt);
                    }
                }

                let complete = self.session.is_complete();
                let finish = ui.add_enabled(complete, egui::Button::new("Finish"));
                finish.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, complete, "Finish training"));
                if finish.clicked() {
                    action = Some(Action::FinishTraining);
                }

                let skip = ui.button("Skip");
                skip.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Skip training"));
                if skip.clicked() {
                    action = Some(Action::SkipTraining);
                }
            });
        });

        action
    }
}
