//! Dismissable error strip shown above the control it belongs to

use crate::ui::theme::Theme;
use crate::ErrorReport;
use egui::{self, RichText};

pub struct ErrorBanner<'a> {
    label: &'a str,
    report: &'a ErrorReport,
    theme: &'a Theme,
}

impl<'a> ErrorBanner<'a> {
    /// `label` names the banner for accessibility, e.g. "Chat error"
    pub fn new(label: &'a str, report: &'a ErrorReport, theme: &'a Theme) -> Self {
        Self { label, report, theme }
    }

    /// Returns `true` when the user dismissed the banner
    pub fn show(self, ui: &mut egui::Ui) -> bool {
        let mut dismissed = false;

        egui::Frame::none()
            .fill(self.theme.error.gamma_multiply(0.15))
            .stroke(egui::Stroke::new(1.0, self.theme.error))
            .rounding(self.theme.button_rounding)
            .inner_margin(egui::Margin::symmetric(12.0, 6.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("⚠").color(self.theme.error));

                    ui.vertical(|ui| {
                        let summary = ui.label(RichText::new(&self.report.summary).color(self.theme.text_primary));
                        let a11y = format!("{}: {}", self.label, self.report.summary);
                        summary.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &a11y));

                        ui.label(
                            RichText::new(&self.report.detail)
                                .size(11.0)
                                .color(self.theme.text_muted),
                        );
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let close = ui.small_button("✕");
                        let close_label = format!("Dismiss {}", self.label.to_lowercase());
                        close.widget_info(|| {
                            egui::WidgetInfo::labeled(egui::WidgetType::Button, true, &close_label)
                        });
                        dismissed = close.clicked();
                    });
                });
            });

        dismissed
    }
}
