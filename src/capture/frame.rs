//! Captured image data for a selected screen region

use image::RgbImage;

use super::ScreenRect;

/// Pixels grabbed from the screen for one capture request
#[derive(Debug)]
pub struct CapturedImage {
    /// Decoded RGB pixels covering exactly `region`
    pub image: RgbImage,
    /// Screen rectangle the pixels were taken from
    pub region: ScreenRect,
}

impl CapturedImage {
    /// Create a new captured image
    pub fn new(image: RgbImage, region: ScreenRect) -> Self {
        Self { image, region }
    }

    /// Build an RGB image from a top-down BGRA buffer (GDI layout)
    pub fn from_bgra(bgra: &[u8], region: ScreenRect) -> Option<Self> {
        let width = u32::try_from(region.width).ok()?;
        let height = u32::try_from(region.height).ok()?;
        if bgra.len() < (width as usize) * (height as usize) * 4 {
            return None;
        }

        let rgb: Vec<u8> = bgra
            .chunks_exact(4)
            .take((width * height) as usize)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();

        RgbImage::from_raw(width, height, rgb).map(|image| Self::new(image, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bgra_swaps_channels() {
        let region = ScreenRect::new(10, 20, 2, 1);
        let bgra = [1, 2, 3, 255, 4, 5, 6, 255];

        let captured = CapturedImage::from_bgra(&bgra, region).unwrap();

        assert_eq!(captured.image.dimensions(), (2, 1));
        assert_eq!(captured.image.get_pixel(0, 0).0, [3, 2, 1]);
        assert_eq!(captured.image.get_pixel(1, 0).0, [6, 5, 4]);
        assert_eq!(captured.region, region);
    }

    #[test]
    fn test_from_bgra_short_buffer() {
        let region = ScreenRect::new(0, 0, 4, 4);
        assert!(CapturedImage::from_bgra(&[0; 12], region).is_none());
    }
}
