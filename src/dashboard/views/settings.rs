//! Settings view - languages, hotkey and license

use egui::RichText;

use crate::config::AppConfig;
use crate::dashboard::state::{DashboardState, UiAction};
use crate::dashboard::theme::{section_frame, ThemeColors};
use crate::dashboard::views::{language_label, LANGUAGES};

pub fn render_settings_view(ui: &mut egui::Ui, state: &mut DashboardState, config: &AppConfig) {
    ui.heading(RichText::new("Settings").size(24.0).strong());
    ui.add_space(16.0);

    egui::ScrollArea::vertical().show(ui, |ui| {
        section_frame().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("Preferences").strong());
            ui.add_space(8.0);

            egui::Grid::new("preferences")
                .num_columns(2)
                .spacing([16.0, 10.0])
                .show(ui, |ui| {
                    ui.label("Source language:");
                    language_combo(ui, "source_language", &mut state.form.language_source, true);
                    ui.end_row();

                    ui.label("Target language:");
                    language_combo(ui, "target_language", &mut state.form.language_target, false);
                    ui.end_row();

                    ui.label("Capture hotkey:");
                    ui.add(
                        egui::TextEdit::singleline(&mut state.form.hotkey)
                            .hint_text("ctrl+shift+t")
                            .desired_width(180.0),
                    );
                    ui.end_row();
                });

            ui.add_space(12.0);
            if ui.button("Save").clicked() {
                state.request(UiAction::SaveSettings);
            }
        });

        ui.add_space(16.0);

        section_frame().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("License").strong());
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.label("License key:");
                ui.add(
                    egui::TextEdit::singleline(&mut state.form.license_key)
                        .hint_text("XXXX-XXXX-XXXX")
                        .desired_width(260.0),
                );
                let label = if config.license.is_pro() {
                    "Pro active"
                } else {
                    "Activate"
                };
                if ui.button(label).clicked() {
                    state.request(UiAction::ActivateLicense);
                }
            });

            ui.add_space(6.0);
            if let Some(device_id) = &config.license.device_id {
                ui.label(
                    RichText::new(format!("Device: {}", device_id))
                        .size(11.0)
                        .color(ThemeColors::TEXT_MUTED),
                );
            }

            ui.add_space(8.0);
            if ui.button("Manage subscription").clicked() {
                state.request(UiAction::ManageSubscription);
            }
        });
    });
}

fn language_combo(ui: &mut egui::Ui, id: &str, value: &mut String, allow_auto: bool) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(language_label(value).to_string())
        .width(180.0)
        .show_ui(ui, |ui| {
            for (code, label) in LANGUAGES.iter().filter(|(c, _)| allow_auto || *c != "auto") {
                ui.selectable_value(value, code.to_string(), *label);
            }
        });
}
