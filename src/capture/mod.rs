//! Screen Capture Layer
//!
//! Grabs the pixels of a rectangular screen region. On Windows this goes
//! through GDI; other platforms report the capture as unsupported and can
//! still feed the pipeline from an image file.

pub mod frame;
#[cfg(windows)]
mod gdi;

use thiserror::Error;

pub use frame::CapturedImage;

/// Selections at or below this size (in pixels, per side) are cancelled
pub const MIN_SELECTION_PX: i32 = 5;

/// Rectangle in screen pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// Width or height is zero or negative
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether a user selection is large enough to be worth capturing
    pub fn is_selectable(&self) -> bool {
        self.width > MIN_SELECTION_PX && self.height > MIN_SELECTION_PX
    }

    /// Move the rectangle vertically by `dy` pixels
    pub fn translated_y(&self, dy: i32) -> Self {
        Self {
            top: self.top + dy,
            ..*self
        }
    }
}

impl std::fmt::Display for ScreenRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.left, self.top)
    }
}

impl std::str::FromStr for ScreenRect {
    type Err = String;

    /// Parse `left,top,width,height`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid region '{}': {}", s, e))?;

        match parts.as_slice() {
            [left, top, width, height] => Ok(Self::new(*left, *top, *width, *height)),
            _ => Err(format!(
                "invalid region '{}': expected left,top,width,height",
                s
            )),
        }
    }
}

/// Capture failures; all of them abort the current attempt
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot capture a degenerate region ({0})")]
    DegenerateRegion(ScreenRect),
    #[error("screen capture failed: {0}")]
    Backend(String),
    #[error("screen capture is not supported on this platform")]
    Unsupported,
}

/// Source of screen pixels
pub trait ScreenGrabber {
    /// Grab exactly `region` as an RGB image
    fn grab(&self, region: ScreenRect) -> Result<CapturedImage, CaptureError>;

    /// Bounds of the primary screen, if known
    fn screen_bounds(&self) -> Option<ScreenRect>;
}

/// Grabber used on platforms without a capture backend
pub struct UnsupportedGrabber;

impl ScreenGrabber for UnsupportedGrabber {
    fn grab(&self, region: ScreenRect) -> Result<CapturedImage, CaptureError> {
        if region.is_degenerate() {
            return Err(CaptureError::DegenerateRegion(region));
        }
        Err(CaptureError::Unsupported)
    }

    fn screen_bounds(&self) -> Option<ScreenRect> {
        None
    }
}

/// Create the capture backend for the current platform
pub fn default_grabber() -> Box<dyn ScreenGrabber> {
    #[cfg(windows)]
    {
        Box::new(gdi::GdiGrabber)
    }
    #[cfg(not(windows))]
    {
        Box::new(UnsupportedGrabber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let rect: ScreenRect = "10, 20,300,40".parse().unwrap();
        assert_eq!(rect, ScreenRect::new(10, 20, 300, 40));
        assert_eq!(rect.right(), 310);
        assert_eq!(rect.bottom(), 60);
    }

    #[test]
    fn test_parse_region_invalid() {
        assert!("10,20,30".parse::<ScreenRect>().is_err());
        assert!("a,b,c,d".parse::<ScreenRect>().is_err());
    }

    #[test]
    fn test_selection_minimum() {
        assert!(!ScreenRect::new(0, 0, 5, 5).is_selectable());
        assert!(!ScreenRect::new(0, 0, 200, 5).is_selectable());
        assert!(ScreenRect::new(0, 0, 6, 6).is_selectable());
    }

    #[test]
    fn test_degenerate_region_rejected() {
        let grabber = UnsupportedGrabber;
        let result = grabber.grab(ScreenRect::new(0, 0, 0, 10));
        assert!(matches!(result, Err(CaptureError::DegenerateRegion(_))));
    }
}
