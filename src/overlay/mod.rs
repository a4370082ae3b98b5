//! Overlay Presentation Layer
//!
//! Fits the translated lines into a rectangle over the captured region and
//! shows them in a borderless, always-on-top viewport. Any click or Esc
//! closes it.

pub mod region_selection;
pub mod widgets;

use egui::{Key, ViewportBuilder, ViewportId};
use tracing::debug;

use crate::capture::ScreenRect;
use crate::overlay::widgets::{draw_translation_card, OverlayStyle};
use crate::vision::BoundingBox;

pub use region_selection::{RegionSelection, SelectionResult};

/// Sizing rule for the overlay rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    /// Approximate height of one rendered line
    pub line_height: i32,
    /// Vertical space around the text
    pub margin: i32,
    /// Upper bound on the computed minimum height
    pub max_min_height: i32,
}

impl Default for OverlayLayout {
    fn default() -> Self {
        Self {
            line_height: 22,
            margin: 40,
            max_min_height: 260,
        }
    }
}

impl OverlayLayout {
    /// Minimum overlay height for `line_count` lines (at least one line)
    pub fn min_height(&self, line_count: usize) -> i32 {
        let lines = i32::try_from(line_count.max(1)).unwrap_or(i32::MAX);
        lines
            .saturating_mul(self.line_height)
            .saturating_add(self.margin)
            .min(self.max_min_height)
    }
}

/// Translated text plus the geometry of the line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBlock {
    pub text: String,
    pub bounds: BoundingBox,
}

/// Compute the overlay rectangle for a capture.
///
/// A region shorter than the minimum height grows downwards; if that pushes
/// it past the bottom of `screen`, it moves up by exactly the overflow.
pub fn place_overlay(
    region: ScreenRect,
    line_count: usize,
    screen: Option<ScreenRect>,
    layout: &OverlayLayout,
) -> ScreenRect {
    let min_height = layout.min_height(line_count);
    if region.height >= min_height {
        return region;
    }

    let grown = ScreenRect {
        height: min_height,
        ..region
    };

    match screen {
        Some(screen) if grown.bottom() > screen.bottom() => {
            let overflow = grown.bottom() - screen.bottom();
            debug!("Overlay overflows screen by {}px, shifting up", overflow);
            grown.translated_y(-overflow)
        }
        _ => grown,
    }
}

/// A translation overlay currently on screen
pub struct TranslationOverlay {
    id: ViewportId,
    rect: ScreenRect,
    blocks: Vec<OverlayBlock>,
    style: OverlayStyle,
}

impl TranslationOverlay {
    pub fn new(rect: ScreenRect, blocks: Vec<OverlayBlock>) -> Self {
        Self {
            id: ViewportId::from_hash_of("translation_overlay"),
            rect,
            blocks,
            style: OverlayStyle::default(),
        }
    }

    /// Render for this frame. Returns `false` once the user dismissed it.
    pub fn show(&self, ctx: &egui::Context) -> bool {
        let ppp = ctx.native_pixels_per_point().unwrap_or(1.0);
        let builder = ViewportBuilder::default()
            .with_title("Translation")
            .with_position([self.rect.left as f32 / ppp, self.rect.top as f32 / ppp])
            .with_inner_size([self.rect.width as f32 / ppp, self.rect.height as f32 / ppp])
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_taskbar(false)
            .with_resizable(false);

        ctx.show_viewport_immediate(self.id, builder, |ctx, _class| {
            egui::CentralPanel::default()
                .frame(egui::Frame::none())
                .show(ctx, |ui| {
                    draw_translation_card(ui, &self.blocks, &self.style);
                });

            let dismissed = ctx.input(|i| {
                i.key_pressed(Key::Escape)
                    || i.pointer.any_pressed()
                    || i.viewport().close_requested()
            });
            !dismissed
        })
    }
}
