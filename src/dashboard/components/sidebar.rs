//! Sidebar navigation component

use egui::{Color32, RichText, Rounding, Sense, Vec2};

use crate::dashboard::state::DashboardView;
use crate::dashboard::theme::{color_with_alpha, ThemeColors};

/// Render the sidebar navigation
pub fn render_sidebar(ui: &mut egui::Ui, current_view: &mut DashboardView) {
    ui.vertical(|ui| {
        ui.add_space(16.0);
        ui.horizontal(|ui| {
            ui.add_space(12.0);
            ui.vertical(|ui| {
                ui.label(
                    RichText::new("ScreensTranslate")
                        .size(17.0)
                        .color(ThemeColors::ACCENT_PRIMARY)
                        .strong(),
                );
                ui.label(
                    RichText::new("Capture, read, translate")
                        .size(11.0)
                        .color(ThemeColors::TEXT_MUTED),
                );
            });
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(12.0);

        for view in DashboardView::ALL {
            if nav_button(ui, view, *current_view == view) {
                *current_view = view;
            }
            ui.add_space(4.0);
        }

        ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
            ui.add_space(12.0);
            ui.horizontal(|ui| {
                ui.add_space(12.0);
                ui.label(
                    RichText::new(concat!("v", env!("CARGO_PKG_VERSION")))
                        .size(10.0)
                        .color(ThemeColors::TEXT_MUTED),
                );
            });
        });
    });
}

fn nav_button(ui: &mut egui::Ui, view: DashboardView, is_selected: bool) -> bool {
    let size = Vec2::new(ui.available_width() - 16.0, 34.0);
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());

    if ui.is_rect_visible(rect) {
        let (bg, fg) = if is_selected {
            (color_with_alpha(ThemeColors::ACCENT_PRIMARY, 51), ThemeColors::ACCENT_PRIMARY)
        } else if response.hovered() {
            (ThemeColors::BG_HOVER, ThemeColors::TEXT_PRIMARY)
        } else {
            (Color32::TRANSPARENT, ThemeColors::TEXT_SECONDARY)
        };

        let painter = ui.painter();
        painter.rect_filled(rect.shrink2(Vec2::new(8.0, 0.0)), Rounding::same(6.0), bg);
        for (offset, text) in [(24.0, view.icon()), (48.0, view.name())] {
            painter.text(
                rect.left_center() + Vec2::new(offset, 0.0),
                egui::Align2::LEFT_CENTER,
                text,
                egui::FontId::proportional(14.0),
                fg,
            );
        }
    }

    response.clicked()
}
