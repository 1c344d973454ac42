//! Message list component
//!
//! Displays the conversation with the streaming reply, the typing indicator
//! and grounding sources.

use crate::controller::Action;
use crate::messages::{Message, MessageId};
use crate::ui::theme::Theme;
use egui::{self, Align, RichText, Stroke};

/// The typing indicator shows while a request is in flight and no reply
/// text has arrived yet
pub fn shows_typing_indicator(messages: &[Message], is_loading: bool) -> bool {
    is_loading && messages.last().is_some_and(Message::is_user)
}

pub struct MessageList<'a> {
    messages: &'a [Message],
    is_loading: bool,
    streaming_id: Option<MessageId>,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [Message], theme: &'a Theme) -> Self {
        Self {
            messages,
            is_loading: false,
            streaming_id: None,
            theme,
        }
    }

    pub fn loading(mut self, is_loading: bool) -> Self {
        self.is_loading = is_loading;
        self
    }

    pub fn streaming(mut self, id: Option<MessageId>) -> Self {
        self.streaming_id = id;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> Option<Action> {
        let mut action = None;

        egui::ScrollArea::vertical()
            .id_salt("message_list")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.add_space(self.theme.spacing);

                    if self.messages.is_empty() && !self.is_loading {
                        self.show_empty_state(ui);
                    } else {
                        for message in self.messages {
                            if let Some(a) = self.show_message(ui, message) {
                                action = Some(a);
                            }
                            ui.add_space(self.theme.spacing_sm);
                        }

                        if shows_typing_indicator(self.messages, self.is_loading) {
                            self.show_typing_indicator(ui);
                        }
                    }

                    ui.add_space(self.theme.spacing);
                });
            });

        action
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(100.0);

            ui.label(
                RichText::new("Start a conversation")
                    .size(24.0)
                    .color(self.theme.text_primary),
            );

            ui.add_space(self.theme.spacing);

            ui.label(
                RichText::new("Type below, press the microphone, or go live for a hands-free chat.")
                    .size(14.0)
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message(&self, ui: &mut egui::Ui, message: &Message) -> Option<Action> {
        let is_user = message.is_user();
        let is_streaming = self.streaming_id == Some(message.id);
        let text_color = self.theme.bubble_text(is_user);
        let align = if is_user { Align::RIGHT } else { Align::LEFT };
        let mut action = None;

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            ui.label(
                RichText::new(if is_user { "You" } else { "Assistant" })
                    .size(12.0)
                    .color(self.theme.text_muted),
            );

            ui.add_space(2.0);

            let max_width = ui.available_width() * 0.75;
            let bubble_color = if is_user {
                self.theme.user_bubble
            } else {
                self.theme.assistant_bubble
            };
            let stroke = if is_streaming {
                Stroke::new(1.0, self.theme.primary)
            } else {
                Stroke::NONE
            };

            egui::Frame::none()
                .fill(bubble_color)
                .stroke(stroke)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);

                    let a11y_label = if is_user {
                        format!("User message: {}", message.text)
                    } else if is_streaming {
                        format!("Streaming response: {}", message.text)
                    } else {
                        format!("Assistant response: {}", message.text)
                    };

                    ui.horizontal_wrapped(|ui| {
                        let response = ui.label(RichText::new(&message.text).color(text_color));
                        response.widget_info(|| {
                            egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &a11y_label)
                        });

                        if is_streaming {
                            let t = ui.ctx().input(|i| i.time);
                            if (t * 2.0).fract() < 0.5 {
                                ui.label(RichText::new("▎").color(self.theme.primary));
                            }
                            ui.ctx().request_repaint();
                        }
                    });

                    if !message.sources.is_empty() {
                        ui.add_space(4.0);
                        ui.separator();
                        ui.label(RichText::new("Sources").size(11.0).color(self.theme.text_muted));
                        for source in &message.sources {
                            ui.hyperlink_to(source.display_title(), &source.uri);
                        }
                    }
                });

            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(message.timestamp.format("%H:%M").to_string())
                        .size(10.0)
                        .color(self.theme.text_muted),
                );

                if message.is_model() && !is_streaming {
                    let response = ui
                        .small_button("🔊")
                        .on_hover_text("Read aloud");
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Speak message")
                    });
                    if response.clicked() {
                        action = Some(Action::SpeakMessage(message.id));
                    }
                }
            });
        });

        action
    }

    fn show_typing_indicator(&self, ui: &mut egui::Ui) {
        ui.with_layout(egui::Layout::top_down(Align::LEFT), |ui| {
            egui::Frame::none()
                .fill(self.theme.assistant_bubble)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    let t = ui.ctx().input(|i| i.time);
                    let alpha = ((t * 3.0).sin() * 0.35 + 0.65) as f32;
                    let response = ui.label(
                        RichText::new("● ● ●")
                            .size(10.0)
                            .color(self.theme.text_muted.gamma_multiply(alpha)),
                    );
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, "Typing indicator")
                    });
                });
        });

        ui.ctx().request_repaint();
    }
}
