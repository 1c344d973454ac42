//! Main application struct and eframe integration

use crate::controller::{Action, AppController, AppPhase};
use crate::ui::components::{
    ErrorBanner, Header, InputBar, LevelMeter, LiveOverlay, MessageList, SettingsModal, TrainingOverlay,
};
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, TopBottomPanel};
use std::time::Duration;
use tracing::info;

/// Poll interval while idle, so worker and platform events are picked up
/// without user input
const IDLE_REPAINT: Duration = Duration::from_millis(100);

pub struct VoxChatApp {
    controller: AppController,
    theme: Theme,
    /// Draft in the input bar
    input_text: String,
}

impl VoxChatApp {
    pub fn new(cc: &eframe::CreationContext<'_>, controller: AppController, theme: Theme) -> Self {
        theme.apply(&cc.egui_ctx);
        Self::with_controller(controller, theme)
    }

    /// Build without an eframe context, e.g. inside a test harness
    pub fn with_controller(controller: AppController, theme: Theme) -> Self {
        Self {
            controller,
            theme,
            input_text: String::new(),
        }
    }

    pub fn controller(&self) -> &AppController {
        &self.controller
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    /// Advance the controller and draw one frame
    pub fn frame(&mut self, ctx: &egui::Context) {
        self.controller.tick();

        let mut actions = Vec::new();
        match self.controller.phase() {
            AppPhase::Training => self.show_training(ctx, &mut actions),
            AppPhase::Chat if self.controller.is_live_mode() => self.show_live(ctx, &mut actions),
            AppPhase::Chat => {
                self.show_header(ctx, &mut actions);
                self.show_input_area(ctx, &mut actions);
                self.show_content(ctx, &mut actions);
            }
        }

        if self.controller.settings_open() {
            let speech = self.controller.speech();
            let modal = SettingsModal::new(speech.voices(), self.controller.selected_voice_uri(), &self.theme)
                .speech_error(speech.error());
            actions.extend(modal.show(ctx));
        }

        for action in actions {
            self.controller.apply(action);
        }

        let speech = self.controller.speech();
        if self.controller.chat().is_loading() || speech.is_listening() || speech.is_speaking() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(IDLE_REPAINT);
        }
    }

    fn show_header(&self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        let speech = self.controller.speech();
        let voice_name = self
            .controller
            .selected_voice_uri()
            .and_then(|uri| speech.voice(uri))
            .map(|v| v.name.as_str());
        let chat = self.controller.chat();

        TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                let header = Header::new(&self.theme)
                    .voice(voice_name)
                    .speech_state(speech.is_listening(), speech.is_speaking())
                    .can_clear(!chat.is_loading() && !chat.messages().is_empty());
                actions.extend(header.show(ui));
            });
    }

    fn show_input_area(&mut self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        let controller = &self.controller;
        let theme = &self.theme;
        let input_text = &mut self.input_text;
        let speech = controller.speech();
        let chat = controller.chat();

        TopBottomPanel::bottom("input_area")
            .frame(egui::Frame::none().fill(theme.bg_primary).inner_margin(theme.spacing))
            .show(ctx, |ui| {
                ui.vertical(|ui| {
                    if let Some(error) = chat.error_report() {
                        if ErrorBanner::new("Chat error", error, theme).show(ui) {
                            actions.push(Action::DismissChatError);
                        }
                        ui.add_space(theme.spacing_sm);
                    }

                    if let Some(error) = speech.error_report() {
                        if ErrorBanner::new("Speech error", error, theme).show(ui) {
                            actions.push(Action::DismissSpeechError);
                        }
                        ui.add_space(theme.spacing_sm);
                    }

                    if speech.is_listening() || speech.is_speaking() {
                        let color = if speech.is_speaking() {
                            theme.speaking
                        } else {
                            theme.listening
                        };
                        LevelMeter::new(&speech.analyser(), theme)
                            .height(40.0)
                            .color(color)
                            .show(ui);
                        ui.add_space(theme.spacing_sm);
                    }

                    let bar = InputBar::new(input_text, theme)
                        .loading(chat.is_loading())
                        .listening(speech.is_listening(), speech.interim_transcript());
                    actions.extend(bar.show(ui));
                });
            });
    }

    fn show_content(&self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        let chat = self.controller.chat();

        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(egui::Margin::symmetric(self.theme.spacing, 0.0)))
            .show(ctx, |ui| {
                let list = MessageList::new(chat.messages(), &self.theme)
                    .loading(chat.is_loading())
                    .streaming(chat.streaming_message_id());
                actions.extend(list.show(ui));
            });
    }

    fn show_training(&self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        let speech = self.controller.speech();
        let analyser = speech.analyser();

        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                let overlay = TrainingOverlay::new(self.controller.training(), &analyser, &self.theme)
                    .listening(speech.is_listening(), speech.interim_transcript())
                    .speech_error(speech.error());
                actions.extend(overlay.show(ui));
            });
    }

    fn show_live(&self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        let speech = self.controller.speech();
        let live = self.controller.live();
        let analyser = speech.analyser();

        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                let overlay = LiveOverlay::new(live.phase(), &analyser, &self.theme)
                    .pause_reason(live.pause_reason())
                    .interim(speech.interim_transcript());
                actions.extend(overlay.show(ui));
            });
    }
}

impl eframe::App for VoxChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.frame(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.apply(Action::StopListening);
        self.controller.apply(Action::StopSpeaking);
        info!("VoxChat shutting down");
    }
}
