//! Application Coordinator
//!
//! Runs one capture-translate cycle: usage gate, region capture, OCR, line
//! reconstruction, translation, history and overlay placement. Every stage is
//! synchronous and a failure at any of them aborts the attempt.

use chrono::NaiveDate;
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capture::{CaptureError, ScreenGrabber, ScreenRect};
use crate::config::AppConfig;
use crate::licensing::{check_and_register_use, UsagePolicy};
use crate::overlay::{place_overlay, OverlayBlock, OverlayLayout};
use crate::storage::HistoryStore;
use crate::translation::{TranslationClient, TranslationError};
use crate::vision::{extract_text_tokens, reconstruct_lines, OcrError, TextLine, TextRecognizer};

/// Why a capture-translate attempt produced nothing to show
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error("no text detected in the selected region")]
    NoText,
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error("{0}")]
    QuotaDenied(String),
}

impl PipelineError {
    /// Status text for the user
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Ocr(e) if e.is_engine_unavailable() => {
                "Tesseract OCR is not installed or cannot be found. Install it or set TESSERACT_CMD \
                 to its executable."
                    .to_string()
            }
            PipelineError::Ocr(_) => "Text recognition failed.".to_string(),
            PipelineError::Capture(CaptureError::Unsupported) => {
                "Screen capture is not available on this platform.".to_string()
            }
            PipelineError::Capture(_) => "Could not capture the selected region.".to_string(),
            PipelineError::NoText => "No text detected in the selected region.".to_string(),
            PipelineError::Translation(_) => "Translation error.".to_string(),
            PipelineError::QuotaDenied(message) => message.clone(),
        }
    }
}

/// Result of a successful attempt
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Source lines in display order
    pub lines: Vec<TextLine>,
    /// Translations paired with their source geometry
    pub blocks: Vec<OverlayBlock>,
    /// Where the overlay goes on screen
    pub overlay_rect: ScreenRect,
}

/// The capture-translate pipeline and its collaborators
pub struct TranslatePipeline {
    grabber: Box<dyn ScreenGrabber>,
    recognizer: Box<dyn TextRecognizer>,
    translator: TranslationClient,
    history: Option<HistoryStore>,
    layout: OverlayLayout,
}

impl TranslatePipeline {
    pub fn new(
        grabber: Box<dyn ScreenGrabber>,
        recognizer: Box<dyn TextRecognizer>,
        translator: TranslationClient,
    ) -> Self {
        Self {
            grabber,
            recognizer,
            translator,
            history: None,
            layout: OverlayLayout::default(),
        }
    }

    /// Record translated lines in `history`
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    pub fn translator(&self) -> &TranslationClient {
        &self.translator
    }

    /// Run the usage gate.
    ///
    /// The returned config carries the updated counters and must be persisted
    /// whether or not the attempt is allowed.
    pub fn authorize(
        &self,
        config: &AppConfig,
        policy: &UsagePolicy,
        today: NaiveDate,
    ) -> (AppConfig, Result<(), PipelineError>) {
        let check = check_and_register_use(config, policy, today);
        let verdict = if check.allowed {
            Ok(())
        } else {
            Err(PipelineError::QuotaDenied(check.message.unwrap_or_default()))
        };
        (check.config, verdict)
    }

    /// Capture `region` and translate the text found in it
    pub fn translate_region(
        &self,
        config: &AppConfig,
        region: ScreenRect,
        min_confidence: f32,
    ) -> Result<PipelineOutcome, PipelineError> {
        info!("Capturing region {}", region);
        let captured = self.grabber.grab(region)?;
        self.translate_image(config, &captured.image, captured.region, min_confidence)
    }

    /// Translate the text in an already captured image of `region`
    pub fn translate_image(
        &self,
        config: &AppConfig,
        image: &RgbImage,
        region: ScreenRect,
        min_confidence: f32,
    ) -> Result<PipelineOutcome, PipelineError> {
        let source = config.language_source.as_str();
        let target = config.language_target.as_str();

        let tokens = extract_text_tokens(self.recognizer.as_ref(), image, source, min_confidence)?;
        info!("OCR tokens detected: {}", tokens.len());
        if tokens.is_empty() {
            return Err(PipelineError::NoText);
        }

        let lines = reconstruct_lines(&tokens);
        info!("Lines grouped for overlay: {}", lines.len());

        let texts: Vec<String> = lines.iter().map(|l| l.text.clone()).collect();
        let translated = self
            .translator
            .translate_texts(&texts, source, target)
            .map_err(|e| {
                warn!("Translation failed: {}", e);
                e
            })?;

        let blocks: Vec<OverlayBlock> = lines
            .iter()
            .zip(translated)
            .map(|(line, text)| OverlayBlock {
                text,
                bounds: line.bounds,
            })
            .collect();

        self.record_history(&lines, &blocks, source, target);

        let overlay_rect = place_overlay(region, lines.len(), self.grabber.screen_bounds(), &self.layout);
        debug!("Overlay placed at {}", overlay_rect);

        Ok(PipelineOutcome {
            lines,
            blocks,
            overlay_rect,
        })
    }

    fn record_history(&self, lines: &[TextLine], blocks: &[OverlayBlock], source: &str, target: &str) {
        let Some(history) = &self.history else {
            return;
        };
        for (line, block) in lines.iter().zip(blocks) {
            if let Err(e) = history.add_entry(&line.text, &block.text, source, target) {
                warn!("Could not save history entry: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedImage;
    use crate::licensing::BASIC_DAILY_LIMIT;
    use crate::translation::TranslationProvider;
    use crate::vision::tesseract::OutputMode;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
        5\t1\t1\t1\t1\t1\t10\t10\t40\t20\t95\tHola\n\
        5\t1\t1\t1\t1\t2\t60\t10\t50\t20\t90\tmundo\n\
        5\t1\t1\t1\t2\t1\t10\t40\t40\t20\t91\tadiós\n";

    struct FakeGrabber {
        screen: Option<ScreenRect>,
    }

    impl ScreenGrabber for FakeGrabber {
        fn grab(&self, region: ScreenRect) -> Result<CapturedImage, CaptureError> {
            if region.is_degenerate() {
                return Err(CaptureError::DegenerateRegion(region));
            }
            Ok(CapturedImage::new(
                RgbImage::new(region.width as u32, region.height as u32),
                region,
            ))
        }

        fn screen_bounds(&self) -> Option<ScreenRect> {
            self.screen
        }
    }

    struct FakeRecognizer {
        tsv: Result<String, ()>,
    }

    impl TextRecognizer for FakeRecognizer {
        fn recognize(&self, _image: &RgbImage, _language: &str, mode: OutputMode) -> Result<String, OcrError> {
            match (&self.tsv, mode) {
                (Ok(tsv), OutputMode::Tsv) => Ok(tsv.clone()),
                (Ok(_), OutputMode::PlainText) => Ok(String::new()),
                (Err(()), _) => Err(OcrError::EngineNotFound("tesseract".into())),
            }
        }
    }

    fn pipeline(tsv: Result<&str, ()>) -> TranslatePipeline {
        pipeline_with(tsv, TranslationProvider::Demo)
    }

    fn pipeline_with(tsv: Result<&str, ()>, provider: TranslationProvider) -> TranslatePipeline {
        TranslatePipeline::new(
            Box::new(FakeGrabber {
                screen: Some(ScreenRect::new(0, 0, 1920, 1080)),
            }),
            Box::new(FakeRecognizer {
                tsv: tsv.map(str::to_string),
            }),
            TranslationClient::new(provider).unwrap(),
        )
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.language_source = "es".to_string();
        config.language_target = "en".to_string();
        config
    }

    #[test]
    fn test_translate_region_end_to_end() {
        let pipeline = pipeline(Ok(TSV));
        let region = ScreenRect::new(100, 1040, 200, 30);

        let outcome = pipeline.translate_region(&config(), region, 40.0).unwrap();

        assert_eq!(outcome.lines.len(), 2);
        assert_eq!(outcome.blocks[0].text, "Hola mundo [en]");
        assert_eq!(outcome.blocks[1].text, "adiós [en]");
        assert_eq!(outcome.blocks[0].bounds, outcome.lines[0].bounds);

        // 2 lines -> min height 84, bottom clamped to 1080
        assert_eq!(outcome.overlay_rect.height, 84);
        assert_eq!(outcome.overlay_rect.bottom(), 1080);
    }

    #[test]
    fn test_no_text_aborts() {
        let pipeline = pipeline(Ok(""));
        let err = pipeline
            .translate_region(&config(), ScreenRect::new(0, 0, 100, 100), 40.0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoText));
    }

    #[test]
    fn test_missing_engine_has_actionable_message() {
        let pipeline = pipeline(Err(()));
        let err = pipeline
            .translate_region(&config(), ScreenRect::new(0, 0, 100, 100), 40.0)
            .unwrap_err();
        assert!(err.user_message().contains("TESSERACT_CMD"));
    }

    #[test]
    fn test_degenerate_region_is_capture_error() {
        let pipeline = pipeline(Ok(TSV));
        let err = pipeline
            .translate_region(&config(), ScreenRect::new(0, 0, 0, 100), 40.0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Capture(CaptureError::DegenerateRegion(_))));
    }

    #[test]
    fn test_history_records_each_line() {
        let pipeline = pipeline(Ok(TSV)).with_history(HistoryStore::open_in_memory().unwrap());
        pipeline
            .translate_region(&config(), ScreenRect::new(0, 0, 200, 200), 40.0)
            .unwrap();

        let entries = pipeline.history().unwrap().recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].original, "adiós");
        assert_eq!(entries[0].translated, "adiós [en]");
        assert_eq!(entries[0].source_lang, "es");
    }

    #[test]
    fn test_history_write_failure_keeps_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = HistoryStore::open(&path).unwrap();
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE history;")
            .unwrap();

        let pipeline = pipeline(Ok(TSV)).with_history(store);
        let outcome = pipeline
            .translate_region(&config(), ScreenRect::new(0, 0, 200, 200), 40.0)
            .unwrap();

        assert_eq!(outcome.blocks.len(), 2);
        assert_eq!(outcome.blocks[0].text, "Hola mundo [en]");
    }

    #[test]
    fn test_translation_failure_aborts_without_history() {
        let provider = TranslationProvider::Generic {
            api_key: "k".to_string(),
            endpoint: "http://127.0.0.1:9/translate".to_string(),
        };
        let pipeline = pipeline_with(Ok(TSV), provider)
            .with_history(HistoryStore::open_in_memory().unwrap());

        let err = pipeline
            .translate_region(&config(), ScreenRect::new(0, 0, 200, 200), 40.0)
            .unwrap_err();

        assert!(matches!(err, PipelineError::Translation(_)));
        assert_eq!(err.user_message(), "Translation error.");
        assert!(pipeline.history().unwrap().recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_authorize_denies_after_quota() {
        let pipeline = pipeline(Ok(TSV));
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut config = config();
        config.usage.last_use_date = Some(today);
        config.usage.uses_today = BASIC_DAILY_LIMIT;

        let (next, verdict) = pipeline.authorize(&config, &UsagePolicy::default(), today);
        let err = verdict.unwrap_err();
        assert!(matches!(err, PipelineError::QuotaDenied(_)));
        assert!(err.user_message().contains("Upgrade to Pro"));
        assert_eq!(next.usage.uses_today, BASIC_DAILY_LIMIT);
    }
}
