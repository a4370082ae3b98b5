//! Vision/OCR Layer
//!
//! Turns a captured image into text tokens using an external OCR engine
//! (Tesseract) and regroups those tokens into display lines.

pub mod lines;
pub mod tesseract;

pub use lines::reconstruct_lines;
pub use tesseract::{extract_text_tokens, OcrError, TesseractEngine, TextRecognizer};

/// Confidence threshold used when the caller has no preference
pub const DEFAULT_MIN_CONFIDENCE: f32 = 60.0;

/// Lower threshold used for interactive captures to avoid over-filtering
pub const INTERACTIVE_MIN_CONFIDENCE: f32 = 40.0;

/// Axis-aligned box in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Vertical center, used for geometric line clustering
    pub fn center_y(&self) -> f32 {
        self.y as f32 + self.height as f32 / 2.0
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

/// One OCR-recognized word with position and confidence
#[derive(Debug, Clone, PartialEq)]
pub struct TextToken {
    /// Recognized text (never empty)
    pub text: String,
    /// Word bounding box
    pub bounds: BoundingBox,
    /// Recognition confidence (0 - 100)
    pub confidence: f32,
    /// Paragraph number reported by the engine
    pub paragraph: Option<u32>,
    /// Block number reported by the engine
    pub block: Option<u32>,
    /// Line number reported by the engine
    pub line: Option<u32>,
}

impl TextToken {
    /// Token without any line metadata
    pub fn new(text: impl Into<String>, bounds: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bounds,
            confidence,
            paragraph: None,
            block: None,
            line: None,
        }
    }

    /// Attach engine line metadata
    pub fn with_layout(mut self, paragraph: u32, block: u32, line: u32) -> Self {
        self.paragraph = Some(paragraph).filter(|n| *n != 0);
        self.block = Some(block).filter(|n| *n != 0);
        self.line = Some(line).filter(|n| *n != 0);
        self
    }
}

/// Tokens merged into one visual line
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Space-joined token text, left to right
    pub text: String,
    /// Union of the member token boxes
    pub bounds: BoundingBox,
    /// Mean member confidence
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union() {
        let a = BoundingBox::new(10, 10, 20, 10);
        let b = BoundingBox::new(5, 15, 10, 20);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(5, 10, 25, 25));
        assert_eq!(u.right(), 30);
        assert_eq!(u.bottom(), 35);
    }

    #[test]
    fn test_layout_zero_is_absent() {
        let token = TextToken::new("hola", BoundingBox::default(), 90.0).with_layout(0, 1, 2);
        assert_eq!(token.paragraph, None);
        assert_eq!(token.block, Some(1));
        assert_eq!(token.line, Some(2));
    }
}
