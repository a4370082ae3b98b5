//! Translate view - capture button, license and usage status, last result

use egui::RichText;

use crate::config::AppConfig;
use crate::dashboard::components::{CardStatus, StatusCard};
use crate::dashboard::state::{DashboardState, UiAction};
use crate::dashboard::theme::{section_frame, ThemeColors};
use crate::dashboard::views::language_label;
use crate::licensing::{LicenseStatus, UsagePolicy};

pub fn render_translate_view(
    ui: &mut egui::Ui,
    state: &mut DashboardState,
    config: &AppConfig,
    policy: &UsagePolicy,
    provider: &str,
) {
    ui.heading(RichText::new("Translate").size(24.0).strong());
    ui.add_space(6.0);
    ui.label(
        RichText::new(format!(
            "Press {} or the button below, then drag over the text to translate.",
            config.hotkey
        ))
        .color(ThemeColors::TEXT_SECONDARY),
    );
    ui.add_space(16.0);

    ui.horizontal(|ui| {
        let button = egui::Button::new(RichText::new("Capture region").size(16.0).strong())
            .fill(ThemeColors::ACCENT_PRIMARY)
            .min_size(egui::vec2(180.0, 40.0));
        if ui.add_enabled(state.capture.is_idle(), button).clicked() {
            state.request(UiAction::StartCapture);
        }
        ui.add_space(12.0);
        ui.label(format!(
            "{} → {}",
            language_label(&config.language_source),
            language_label(&config.language_target)
        ));
    });

    ui.add_space(20.0);

    ui.horizontal_wrapped(|ui| {
        license_card(config).show(ui);
        usage_card(config, policy).show(ui);
        StatusCard::new("Translation provider", provider, CardStatus::Neutral).show(ui);
    });

    if let Some(outcome) = &state.last_outcome {
        ui.add_space(20.0);
        section_frame().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("Last translation").strong());
            ui.add_space(8.0);
            egui::Grid::new("last_translation")
                .num_columns(2)
                .spacing([24.0, 6.0])
                .striped(true)
                .show(ui, |ui| {
                    for (line, block) in outcome.lines.iter().zip(&outcome.blocks) {
                        ui.label(RichText::new(&line.text).color(ThemeColors::TEXT_SECONDARY));
                        ui.label(&block.text);
                        ui.end_row();
                    }
                });
        });
    }
}

fn license_card(config: &AppConfig) -> StatusCard {
    let license = &config.license;
    if license.is_pro() {
        let card = StatusCard::new("License", "Pro", CardStatus::Good);
        match &license.expires_at {
            Some(expiry) => card.with_detail(format!("Expires {}", expiry)),
            None => card.with_detail("Unlimited translations"),
        }
    } else if license.status == LicenseStatus::Revoked {
        StatusCard::new("License", "Revoked", CardStatus::Error).with_detail("Enter a valid key in Settings")
    } else if license.has_key() {
        let plan = license.plan.clone().unwrap_or_else(|| "basic".to_string());
        StatusCard::new("License", plan, CardStatus::Neutral)
    } else {
        StatusCard::new("License", "Basic", CardStatus::Neutral)
    }
}

fn usage_card(config: &AppConfig, policy: &UsagePolicy) -> StatusCard {
    if policy.development_mode {
        return StatusCard::new("Usage today", "No limits", CardStatus::Warning).with_detail("Development mode");
    }
    if config.license.is_pro() {
        return StatusCard::new("Usage today", "Unlimited", CardStatus::Good);
    }

    let today = chrono::Local::now().date_naive();
    let used = if config.usage.last_use_date == Some(today) {
        config.usage.uses_today
    } else {
        0
    };
    let limit = policy.limit_for(&config.license);
    let status = if used >= limit {
        CardStatus::Error
    } else {
        CardStatus::Neutral
    };
    StatusCard::new("Usage today", format!("{} / {}", used, limit), status)
}
