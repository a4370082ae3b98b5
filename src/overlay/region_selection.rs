//! Region selection viewport
//!
//! Dims the screen and lets the user drag a rectangle to translate.

use egui::{Color32, FontId, Key, Pos2, Rect, Rounding, Stroke, ViewportBuilder, ViewportId};

use crate::capture::ScreenRect;

/// How a selection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionResult {
    /// Region in physical screen pixels
    Completed(ScreenRect),
    Cancelled,
}

/// Turn a drag between two points (in egui points) into a selection.
/// Drags that are too small in either direction cancel.
pub fn finish_selection(start: Pos2, end: Pos2, pixels_per_point: f32) -> SelectionResult {
    let rect = Rect::from_two_pos(start, end);
    let to_px = |v: f32| (v * pixels_per_point).round() as i32;

    let left = to_px(rect.min.x);
    let top = to_px(rect.min.y);
    let region = ScreenRect::new(left, top, to_px(rect.max.x) - left, to_px(rect.max.y) - top);

    if region.is_selectable() {
        SelectionResult::Completed(region)
    } else {
        SelectionResult::Cancelled
    }
}

/// Full-screen drag-to-select viewport
#[derive(Debug, Clone, Default)]
pub struct RegionSelection {
    start_point: Option<Pos2>,
    current_point: Option<Pos2>,
}

impl RegionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render for this frame. Returns `Some` once the user finished or
    /// cancelled the selection.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<SelectionResult> {
        let builder = ViewportBuilder::default()
            .with_title("Select region")
            .with_fullscreen(true)
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_taskbar(false);

        ctx.show_viewport_immediate(
            ViewportId::from_hash_of("region_selection"),
            builder,
            |ctx, _class| self.ui(ctx),
        )
    }

    fn ui(&mut self, ctx: &egui::Context) -> Option<SelectionResult> {
        if ctx.input(|i| i.key_pressed(Key::Escape) || i.viewport().close_requested()) {
            return Some(SelectionResult::Cancelled);
        }

        let pixels_per_point = ctx.pixels_per_point();
        let mut result = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let screen_rect = ui.max_rect();
                let response = ui.allocate_rect(screen_rect, egui::Sense::click_and_drag());
                let painter = ui.painter();

                painter.rect_filled(
                    screen_rect,
                    Rounding::ZERO,
                    Color32::from_rgba_unmultiplied(0, 0, 0, 80),
                );

                let pointer_pos = response.interact_pointer_pos();

                if response.drag_started() {
                    if let Some(pos) = pointer_pos {
                        self.start_point = Some(pos);
                        self.current_point = Some(pos);
                    }
                }

                if response.dragged() {
                    if let Some(pos) = pointer_pos {
                        self.current_point = Some(pos);
                    }
                }

                if response.drag_stopped() {
                    result = Some(match (self.start_point, self.current_point) {
                        (Some(start), Some(end)) => finish_selection(start, end, pixels_per_point),
                        _ => SelectionResult::Cancelled,
                    });
                    self.start_point = None;
                    self.current_point = None;
                }

                if let (Some(start), Some(current)) = (self.start_point, self.current_point) {
                    let selection = Rect::from_two_pos(start, current);
                    painter.rect_filled(
                        selection,
                        Rounding::ZERO,
                        Color32::from_rgba_unmultiplied(0, 180, 255, 60),
                    );
                    painter.rect_stroke(
                        selection,
                        Rounding::ZERO,
                        Stroke::new(2.0, Color32::from_rgb(0, 180, 255)),
                    );
                }

                painter.text(
                    Pos2::new(screen_rect.center().x, 30.0),
                    egui::Align2::CENTER_CENTER,
                    "Drag to select the text to translate. Press Esc to cancel.",
                    FontId::proportional(16.0),
                    Color32::WHITE,
                );
            });

        result
    }
}
