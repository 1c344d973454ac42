//! Settings window: voice picker and preview

use crate::controller::Action;
use crate::speech::VoiceDescriptor;
use crate::ui::theme::Theme;
use egui::{self, RichText};

pub struct SettingsModal<'a> {
    voices: &'a [VoiceDescriptor],
    selected: Option<&'a str>,
    speech_error: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> SettingsModal<'a> {
    pub fn new(voices: &'a [VoiceDescriptor], selected: Option<&'a str>, theme: &'a Theme) -> Self {
        Self {
            voices,
            selected,
            speech_error: None,
            theme,
        }
    }

    pub fn speech_error(mut self, error: Option<&'a str>) -> Self {
        self.speech_error = error;
        self
    }

    pub fn show(self, ctx: &egui::Context) -> Option<Action> {
        let mut action = None;
        let mut open = true;

        egui::Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(360.0)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(RichText::new("Voice").strong().color(self.theme.text_primary));
                ui.add_space(self.theme.spacing_sm);

                if self.voices.is_empty() {
                    ui.label(
                        RichText::new("No voices available on this system.")
                            .color(self.theme.text_muted),
                    );
                } else {
                    let selected_text = self
                        .selected
                        .and_then(|uri| self.voices.iter().find(|v| v.voice_uri == uri))
                        .map(VoiceDescriptor::label)
                        .unwrap_or_else(|| "Platform default".to_string());

                    let combo = egui::ComboBox::from_id_salt("voice_picker")
                        .width(300.0)
                        .selected_text(selected_text)
                        .show_ui(ui, |ui| {
                            for voice in self.voices {
                                let is_selected = self.selected == Some(voice.voice_uri.as_str());
                                if ui.selectable_label(is_selected, voice.label()).clicked() && !is_selected {
                                    action = Some(Action::SelectVoice(voice.voice_uri.clone()));
                                }
                            }
                        });
                    combo.response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::ComboBox, true, "Voice picker")
                    });
                }

                ui.add_space(self.theme.spacing_sm);

                ui.horizontal(|ui| {
                    let test = ui.add_enabled(!self.voices.is_empty(), egui::Button::new("▶ Test voice"));
                    test.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Button, !self.voices.is_empty(), "Test voice")
                    });
                    if test.clicked() {
                        action = Some(Action::TestVoice);
                    }
                });

                if let Some(error) = self.speech_error {
                    ui.add_space(self.theme.spacing_sm);
                    ui.label(RichText::new(error).size(12.0).color(self.theme.error));
                }

                ui.add_space(self.theme.spacing);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let close = ui.button("Close");
                    close.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Close settings")
                    });
                    if close.clicked() {
                        action = Some(Action::CloseSettings);
                    }
                });
            });

        if !open {
            action = Some(Action::CloseSettings);
        }
        action
    }
}
