//! Full-screen live conversation view

use crate::audio::AudioAnalyser;
use crate::controller::{Action, LivePhase};
use crate::ui::components::LevelMeter;
use crate::ui::theme::Theme;
use egui::{self, RichText, Vec2};

pub struct LiveOverlay<'a> {
    phase: LivePhase,
    pause_reason: Option<&'a str>,
    analyser: &'a AudioAnalyser,
    interim: &'a str,
    theme: &'a Theme,
}

impl<'a> LiveOverlay<'a> {
    pub fn new(phase: LivePhase, analyser: &'a AudioAnalyser, theme: &'a Theme) -> Self {
        Self {
            phase,
            pause_reason: None,
            analyser,
            interim: "",
            theme,
        }
    }

    pub fn pause_reason(mut self, reason: Option<&'a str>) -> Self {
        self.pause_reason = reason;
        self
    }

    pub fn interim(mut self, text: &'a str) -> Self {
        self.interim = text;
        self
    }

    fn phase_color(&self) -> egui::Color32 {
        match self.phase {
            LivePhase::Listening => self.theme.listening,
            LivePhase::Thinking => self.theme.warning,
            LivePhase::Speaking => self.theme.speaking,
            LivePhase::Paused => self.theme.text_muted,
        }
    }

    pub fn show(self, ui: &mut egui::Ui) -> Option<Action> {
        let mut action = None;
        let color = self.phase_color();

        ui.vertical_centered(|ui| {
            ui.set_max_width(560.0);
            ui.add_space(ui.available_height() * 0.2);

            let label = ui.label(RichText::new(self.phase.label()).size(30.0).strong().color(color));
            let a11y = format!("Live status: {}", self.phase.label());
            label.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &a11y));

            ui.add_space(self.theme.spacing_lg);

            let active = matches!(self.phase, LivePhase::Listening | LivePhase::Speaking);
            LevelMeter::new(self.analyser, self.theme)
                .height(120.0)
                .bars(48)
                .color(color)
                .active(active)
                .show(ui);

            ui.add_space(self.theme.spacing);
            if self.phase == LivePhase::Listening && !self.interim.is_empty() {
                ui.label(RichText::new(self.interim).size(16.0).italics().color(self.theme.text_secondary));
            }

            if let Some(reason) = self.pause_reason.filter(|_| self.phase == LivePhase::Paused) {
                ui.label(RichText::new(reason).color(self.theme.error));
                ui.add_space(self.theme.spacing_sm);
                let resume = ui.add(egui::Button::new("▶ Resume").min_size(Vec2::new(120.0, 36.0)));
                resume.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Resume live mode"));
                if resume.clicked() {
                    action = Some(Action::ResumeLive);
                }
            }

            ui.add_space(self.theme.spacing_lg);
            let end = ui.add(
                egui::Button::new(RichText::new("End conversation").color(egui::Color32::WHITE))
                    .fill(self.theme.error)
                    .min_size(Vec2::new(180.0, 44.0))
                    .rounding(self.theme.button_rounding),
            );
            end.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "End live mode"));
            if end.clicked() {
                action = Some(Action::ToggleLiveMode);
            }
        });

        action
    }
}
