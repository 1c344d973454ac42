//! Input bar component
//!
//! Text entry with send, push-to-talk toggle and the live-mode switch.

use crate::controller::Action;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};

pub struct InputBar<'a> {
    text: &'a mut String,
    is_loading: bool,
    is_listening: bool,
    interim: &'a str,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(text: &'a mut String, theme: &'a Theme) -> Self {
        Self {
            text,
            is_loading: false,
            is_listening: false,
            interim: "",
            theme,
        }
    }

    pub fn loading(mut self, is_loading: bool) -> Self {
        self.is_loading = is_loading;
        self
    }

    /// Capture state and the transcript heard so far
    pub fn listening(mut self, is_listening: bool, interim: &'a str) -> Self {
        self.is_listening = is_listening;
        self.interim = interim;
        self
    }

    pub fn show(mut self, ui: &mut egui::Ui) -> Option<Action> {
        let mut action = None;

        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                if self.is_listening && !self.interim.is_empty() {
                    ui.label(
                        RichText::new(self.interim)
                            .italics()
                            .color(self.theme.text_muted),
                    );
                }

                ui.horizontal(|ui| {
                    if let Some(a) = self.show_mic_button(ui) {
                        action = Some(a);
                    }
                    if let Some(a) = self.show_text_input(ui) {
                        action = Some(a);
                    }
                    if let Some(a) = self.show_send_button(ui) {
                        action = Some(a);
                    }
                    if let Some(a) = self.show_live_button(ui) {
                        action = Some(a);
                    }
                });
            });

        action
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui) -> Option<Action> {
        let (icon, tooltip, label, color) = if self.is_listening {
            ("⏹", "Stop listening", "Stop listening", self.theme.listening)
        } else {
            ("🎤", "Dictate a message", "Start listening", self.theme.text_secondary)
        };

        let mut button = egui::Button::new(RichText::new(icon).size(18.0).color(color))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding);
        if self.is_listening {
            button = button.fill(self.theme.listening.gamma_multiply(0.2));
        }

        let response = ui.add_enabled(!self.is_loading, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, !self.is_loading, label));

        let button_rect = response.rect;
        let clicked = response.clicked();
        response.on_hover_text(tooltip);

        if self.is_listening {
            let t = ui.ctx().input(|i| i.time);
            let pulse = ((t * 3.0).sin() * 0.5 + 0.5) as f32;
            ui.painter().circle_stroke(
                button_rect.center(),
                button_rect.width() / 2.0 + 2.0 + pulse * 3.0,
                egui::Stroke::new(2.0 * pulse, self.theme.listening.gamma_multiply(1.0 - pulse * 0.5)),
            );
            ui.ctx().request_repaint();
        }

        if !clicked {
            return None;
        }
        Some(if self.is_listening {
            Action::StopListening
        } else {
            Action::StartListening
        })
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) -> Option<Action> {
        // Leave room for send and live buttons
        let available_width = (ui.available_width() - 110.0).max(80.0);

        let hint = if self.is_loading {
            "Waiting for reply..."
        } else {
            "Type a message..."
        };

        let text_edit = egui::TextEdit::singleline(&mut *self.text)
            .hint_text(hint)
            .desired_width(available_width)
            .font(egui::TextStyle::Body)
            .margin(egui::Margin::symmetric(12.0, 8.0))
            .id(egui::Id::new("message_input"));

        let response = ui.add_enabled(!self.is_loading, text_edit);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, !self.is_loading, "Message input")
        });

        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
        if submitted {
            let action = self.take_message();
            response.request_focus();
            return action;
        }
        None
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) -> Option<Action> {
        let can_send = !self.is_loading && !self.text.trim().is_empty();

        let button = egui::Button::new(RichText::new("➤").size(18.0).color(egui::Color32::WHITE))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding)
            .fill(if can_send {
                self.theme.primary
            } else {
                self.theme.text_muted
            });

        let response = ui.add_enabled(can_send, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, can_send, "Send message"));

        if response.on_hover_text("Send message (Enter)").clicked() {
            return self.take_message();
        }
        None
    }

    fn show_live_button(&mut self, ui: &mut egui::Ui) -> Option<Action> {
        let button = egui::Button::new(RichText::new("🎧 Live").size(14.0))
            .min_size(Vec2::new(56.0, 40.0))
            .rounding(self.theme.button_rounding);

        let response = ui.add(button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Start live mode"));

        if response.on_hover_text("Hands-free conversation").clicked() {
            Some(Action::ToggleLiveMode)
        } else {
            None
        }
    }

    /// Move the typed text into a send action, clearing the field
    fn take_message(&mut self) -> Option<Action> {
        if self.is_loading || self.text.trim().is_empty() {
            return None;
        }
        Some(Action::SendMessage(std::mem::take(self.text)))
    }
}
