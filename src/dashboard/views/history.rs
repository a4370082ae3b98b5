//! History view - past translations, newest first

use egui::RichText;

use crate::dashboard::state::{DashboardState, StatusMessage, UiAction};
use crate::dashboard::theme::{section_frame, ThemeColors};

pub fn render_history_view(ui: &mut egui::Ui, state: &mut DashboardState) {
    ui.horizontal(|ui| {
        ui.heading(RichText::new("History").size(24.0).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Clear").clicked() {
                state.request(UiAction::ClearHistory);
            }
            if ui.button("Export CSV").clicked() {
                state.request(UiAction::ExportHistory);
            }
            if ui.button("Refresh").clicked() {
                state.request(UiAction::RefreshHistory);
            }
        });
    });
    ui.add_space(16.0);

    if state.history.is_empty() {
        ui.label(RichText::new("No translations yet.").color(ThemeColors::TEXT_MUTED));
        return;
    }

    let mut copied = false;
    egui::ScrollArea::vertical().show(ui, |ui| {
        for entry in &state.history {
            section_frame().show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(format!(
                            "{}  {} → {}",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.source_lang,
                            entry.target_lang
                        ))
                        .size(11.0)
                        .color(ThemeColors::TEXT_MUTED),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("Copy").clicked() && !entry.translated.is_empty() {
                            ui.ctx().copy_text(entry.translated.clone());
                            copied = true;
                        }
                    });
                });
                ui.label(RichText::new(&entry.original).color(ThemeColors::TEXT_SECONDARY));
                ui.label(&entry.translated);
            });
            ui.add_space(8.0);
        }
    });

    if copied {
        state.set_status(StatusMessage::info("Translation copied to the clipboard."));
    }
}
