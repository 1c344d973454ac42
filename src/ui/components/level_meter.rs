//! Audio level meter
//!
//! Draws the analyser's recent samples as centered bars, for capture and
//! playback alike.

use crate::audio::AudioAnalyser;
use crate::ui::theme::Theme;
use egui::{self, Color32, Pos2, Rect, Stroke, Vec2};

pub struct LevelMeter<'a> {
    analyser: &'a AudioAnalyser,
    theme: &'a Theme,
    color: Color32,
    height: f32,
    bars: usize,
    active: bool,
}

impl<'a> LevelMeter<'a> {
    pub fn new(analyser: &'a AudioAnalyser, theme: &'a Theme) -> Self {
        Self {
            analyser,
            theme,
            color: theme.meter_active,
            height: 60.0,
            bars: 32,
            active: true,
        }
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn bars(mut self, bars: usize) -> Self {
        self.bars = bars.max(1);
        self
    }

    pub fn color(mut self, color: Color32) -> Self {
        self.color = color;
        self
    }

    /// An inactive meter draws a flat line and stops requesting repaints
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> egui::Response {
        let desired_size = Vec2::new(ui.available_width(), self.height);
        let (rect, response) = ui.allocate_exact_size(desired_size, egui::Sense::hover());

        let painter = ui.painter();
        painter.rect_filled(rect, self.theme.card_rounding, self.theme.bg_secondary);

        let draw_rect = rect.shrink(8.0);
        let levels = if self.active {
            self.analyser.bar_levels(self.bars)
        } else {
            Vec::new()
        };

        if levels.iter().all(|l| *l <= 0.0) {
            let center_y = draw_rect.center().y;
            painter.line_segment(
                [
                    Pos2::new(draw_rect.left(), center_y),
                    Pos2::new(draw_rect.right(), center_y),
                ],
                Stroke::new(1.0, self.theme.meter_inactive),
            );
        } else {
            self.draw_bars(ui, draw_rect, &levels);
        }

        let level = if self.active { self.analyser.level() } else { 0.0 };
        response.widget_info(|| {
            egui::WidgetInfo::labeled(
                egui::WidgetType::ProgressIndicator,
                true,
                format!("Audio level {:.0}%", level * 100.0),
            )
        });

        if self.active {
            ui.ctx().request_repaint();
        }
        response
    }

    fn draw_bars(&self, ui: &egui::Ui, rect: Rect, levels: &[f32]) {
        let painter = ui.painter();
        let count = levels.len().max(1);
        let bar_width = rect.width() / count as f32;
        let bar_gap = (bar_width * 0.25).min(3.0);
        let center_y = rect.center().y;

        for (i, &level) in levels.iter().enumerate() {
            let height = (level.clamp(0.0, 1.0) * rect.height()).max(2.0);
            let x = rect.left() + i as f32 * bar_width + bar_width / 2.0;

            // brighter toward the middle
            let gradient = 1.0 - (i as f32 / count as f32 - 0.5).abs() * 0.3;

            painter.rect_filled(
                Rect::from_center_size(Pos2::new(x, center_y), Vec2::new(bar_width - bar_gap, height)),
                1.0,
                self.color.gamma_multiply(gradient),
            );
        }
    }
}
