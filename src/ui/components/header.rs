//! Top bar: title, speech status and the settings affordance

use crate::controller::Action;
use crate::ui::theme::Theme;
use egui::{self, RichText};

pub struct Header<'a> {
    theme: &'a Theme,
    voice_name: Option<&'a str>,
    is_listening: bool,
    is_speaking: bool,
    can_clear: bool,
}

impl<'a> Header<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            voice_name: None,
            is_listening: false,
            is_speaking: false,
            can_clear: false,
        }
    }

    pub fn voice(mut self, name: Option<&'a str>) -> Self {
        self.voice_name = name;
        self
    }

    pub fn speech_state(mut self, is_listening: bool, is_speaking: bool) -> Self {
        self.is_listening = is_listening;
        self.is_speaking = is_speaking;
        self
    }

    pub fn can_clear(mut self, can_clear: bool) -> Self {
        self.can_clear = can_clear;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> Option<Action> {
        let mut action = None;

        ui.horizontal(|ui| {
            ui.label(
                RichText::new("VoxChat")
                    .size(20.0)
                    .strong()
                    .color(self.theme.text_primary),
            );

            let status = if self.is_speaking {
                Some(("Speaking", self.theme.speaking))
            } else if self.is_listening {
                Some(("Listening", self.theme.listening))
            } else {
                None
            };
            if let Some((text, color)) = status {
                ui.label(RichText::new(format!("● {}", text)).size(12.0).color(color));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let settings = ui.button("⚙").on_hover_text("Settings");
                settings.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Open settings")
                });
                if settings.clicked() {
                    action = Some(Action::OpenSettings);
                }

                if self.is_speaking {
                    let stop = ui.button("🔇").on_hover_text("Stop speaking");
                    stop.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Stop speaking")
                    });
                    if stop.clicked() {
                        action = Some(Action::StopSpeaking);
                    }
                }

                let clear = ui
                    .add_enabled(self.can_clear, egui::Button::new("🗑"))
                    .on_hover_text("Clear chat");
                clear.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Button, self.can_clear, "Clear chat")
                });
                if clear.clicked() {
                    action = Some(Action::ClearChat);
                }

                if let Some(name) = self.voice_name {
                    ui.label(
                        RichText::new(format!("Voice: {}", name))
                            .size(12.0)
                            .color(self.theme.text_muted),
                    );
                }
            });
        });

        action
    }
}
