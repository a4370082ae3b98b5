//! Custom egui widgets for the overlay

use egui::{Color32, FontId, Margin, Pos2, Rect, RichText, Rounding, UiBuilder, Vec2};

use super::OverlayBlock;

/// Style of the subtitle-like translation card
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub background: Color32,
    pub text_color: Color32,
    pub font_size: f32,
    pub corner_radius: f32,
    /// Gap between the card and the overlay edges
    pub outer_margin: f32,
    pub max_card_height: f32,
    pub padding: Margin,
    pub line_spacing: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            background: Color32::from_rgba_unmultiplied(0, 0, 0, 190),
            text_color: Color32::WHITE,
            font_size: 15.0,
            corner_radius: 10.0,
            outer_margin: 8.0,
            max_card_height: 220.0,
            padding: Margin::symmetric(12.0, 8.0),
            line_spacing: 4.0,
        }
    }
}

/// Card rectangle inside an overlay of `size`, anchored to the bottom
pub fn card_rect(size: Vec2, style: &OverlayStyle) -> Rect {
    let m = style.outer_margin;
    let height = (size.y - m * 2.0).min(style.max_card_height).max(0.0);
    let width = (size.x - m * 2.0).max(0.0);
    Rect::from_min_size(Pos2::new(m, size.y - height - m), Vec2::new(width, height))
}

/// Draw the translated lines; blank lines are skipped
pub fn draw_translation_card(ui: &mut egui::Ui, blocks: &[OverlayBlock], style: &OverlayStyle) {
    let rect = card_rect(ui.max_rect().size(), style).translate(ui.max_rect().min.to_vec2());

    ui.allocate_new_ui(UiBuilder::new().max_rect(rect), |ui| {
        egui::Frame::none()
            .fill(style.background)
            .rounding(Rounding::same(style.corner_radius))
            .inner_margin(style.padding)
            .show(ui, |ui| {
                ui.set_min_size(rect.size() - style.padding.sum());
                ui.spacing_mut().item_spacing.y = style.line_spacing;

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for block in blocks.iter().filter(|b| !b.text.trim().is_empty()) {
                        ui.add(
                            egui::Label::new(
                                RichText::new(&block.text)
                                    .color(style.text_color)
                                    .font(FontId::proportional(style.font_size)),
                            )
                            .wrap(),
                        );
                    }
                });
            });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_rect_anchored_to_bottom() {
        let style = OverlayStyle::default();
        let rect = card_rect(Vec2::new(300.0, 106.0), &style);

        assert!((rect.min.x - 8.0).abs() < 0.001);
        assert!((rect.width() - 284.0).abs() < 0.001);
        assert!((rect.height() - 90.0).abs() < 0.001);
        assert!((rect.max.y - 98.0).abs() < 0.001);
    }

    #[test]
    fn test_card_height_capped() {
        let style = OverlayStyle::default();
        let rect = card_rect(Vec2::new(400.0, 600.0), &style);

        assert!((rect.height() - 220.0).abs() < 0.001);
        assert!((rect.min.y - 372.0).abs() < 0.001);
    }
}
