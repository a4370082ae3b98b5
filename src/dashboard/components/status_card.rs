//! Small card showing one piece of status

use egui::{Color32, RichText, Rounding};

use crate::dashboard::theme::ThemeColors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Good,
    Neutral,
    Warning,
    Error,
}

impl CardStatus {
    pub fn color(&self) -> Color32 {
        match self {
            CardStatus::Good => ThemeColors::ACCENT_SUCCESS,
            CardStatus::Neutral => ThemeColors::TEXT_SECONDARY,
            CardStatus::Warning => ThemeColors::ACCENT_WARNING,
            CardStatus::Error => ThemeColors::ACCENT_ERROR,
        }
    }
}

pub struct StatusCard {
    pub title: String,
    pub value: String,
    pub detail: Option<String>,
    pub status: CardStatus,
}

impl StatusCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>, status: CardStatus) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            detail: None,
            status,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(ThemeColors::BG_MEDIUM)
            .rounding(Rounding::same(8.0))
            .inner_margin(14.0)
            .show(ui, |ui| {
                ui.set_min_width(170.0);
                ui.horizontal(|ui| {
                    let (dot, _) = ui.allocate_exact_size(egui::vec2(10.0, 20.0), egui::Sense::hover());
                    ui.painter().circle_filled(dot.center(), 4.0, self.status.color());

                    ui.vertical(|ui| {
                        ui.label(RichText::new(&self.title).size(12.0).color(ThemeColors::TEXT_MUTED));
                        ui.label(
                            RichText::new(&self.value)
                                .size(17.0)
                                .color(ThemeColors::TEXT_PRIMARY)
                                .strong(),
                        );
                        if let Some(detail) = &self.detail {
                            ui.label(RichText::new(detail).size(11.0).color(self.status.color()));
                        }
                    });
                });
            });
    }
}
