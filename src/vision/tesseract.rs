//! Tesseract OCR backend
//!
//! Runs the `tesseract` executable as a subprocess, asks for TSV output and
//! parses it into [`TextToken`]s. When the structured pass yields nothing the
//! engine is asked again for plain text, which is returned as a single token
//! spanning the whole image.

use image::{ImageFormat, RgbImage};
use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{BoundingBox, TextToken};

/// UI language code → Tesseract traineddata code
const LANGUAGE_MAP: &[(&str, &str)] = &[
    ("es", "spa"),
    ("en", "eng"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("zh", "chi_sim"),
];

const FALLBACK_LANGUAGE: &str = "eng";

/// Page segmentation mode: a single uniform block of text
pub const DEFAULT_PAGE_SEGMENTATION_MODE: u32 = 6;

/// Errors raised while running the OCR engine
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not found at {0:?}")]
    EngineNotFound(PathBuf),
    #[error("OCR engine exited with {status}: {stderr}")]
    EngineFailed { status: String, stderr: String },
    #[error("failed to write OCR input image: {0}")]
    Image(#[from] image::ImageError),
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// The engine is missing or unusable, as opposed to a transient I/O problem
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, OcrError::EngineNotFound(_) | OcrError::EngineFailed { .. })
    }
}

/// Kind of output requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Tabular word output with boxes, confidence and layout numbers
    Tsv,
    /// Plain recognized text
    PlainText,
}

/// Something that can run OCR on an image and return raw engine output
pub trait TextRecognizer {
    fn recognize(&self, image: &RgbImage, language: &str, mode: OutputMode)
        -> Result<String, OcrError>;
}

/// Resolve a language hint to the engine's language argument.
///
/// `auto` becomes every supported language plus the fallback, joined with
/// `+` so Tesseract loads them all at once.
pub fn tesseract_language(code: &str) -> String {
    if code == "auto" {
        let codes: BTreeSet<&str> = LANGUAGE_MAP
            .iter()
            .map(|(_, tess)| *tess)
            .chain(std::iter::once(FALLBACK_LANGUAGE))
            .collect();
        return codes.into_iter().collect::<Vec<_>>().join("+");
    }

    LANGUAGE_MAP
        .iter()
        .find(|(ui, _)| *ui == code)
        .map(|(_, tess)| (*tess).to_string())
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
}

/// Run OCR and return tokens with confidence ≥ `min_confidence`.
///
/// Falls back to a single full-image token built from plain-text output when
/// the structured pass yields no tokens.
pub fn extract_text_tokens(
    recognizer: &dyn TextRecognizer,
    image: &RgbImage,
    language_hint: &str,
    min_confidence: f32,
) -> Result<Vec<TextToken>, OcrError> {
    let language = tesseract_language(language_hint);
    debug!("OCR language resolved: {} -> {}", language_hint, language);

    let tsv = recognizer.recognize(image, &language, OutputMode::Tsv)?;
    let tokens = parse_tsv(&tsv, min_confidence);
    if !tokens.is_empty() {
        debug!("OCR produced {} tokens", tokens.len());
        return Ok(tokens);
    }

    info!("No structured OCR tokens, retrying as plain text");
    let plain = match recognizer.recognize(image, &language, OutputMode::PlainText) {
        Ok(text) => text,
        Err(e) => {
            warn!("Plain-text OCR fallback failed: {}", e);
            return Ok(Vec::new());
        }
    };

    let text = plain.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let (width, height) = image.dimensions();
    Ok(vec![TextToken::new(
        text,
        BoundingBox::new(0, 0, width as i32, height as i32),
        100.0,
    )])
}

/// Parse Tesseract TSV output.
///
/// Columns are located by header name. Rows with empty text or confidence
/// below `min_confidence` are dropped; malformed numbers become zero.
pub fn parse_tsv(output: &str, min_confidence: f32) -> Vec<TextToken> {
    let mut rows = output.lines();
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    let columns: HashMap<&str, usize> = header
        .split('\t')
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();
    let column_count = columns.len();
    let Some(&text_idx) = columns.get("text") else {
        warn!("OCR output has no text column");
        return Vec::new();
    };

    let mut tokens = Vec::new();
    for row in rows {
        let fields: Vec<&str> = row.splitn(column_count, '\t').collect();
        let field = |name: &str| columns.get(name).and_then(|&i| fields.get(i)).copied();

        let text = fields.get(text_idx).map(|t| t.trim()).unwrap_or("");
        if text.is_empty() {
            continue;
        }

        let confidence = field("conf")
            .and_then(|v| v.trim().parse::<f32>().ok())
            .unwrap_or(0.0);
        if confidence < min_confidence {
            continue;
        }

        let int = |name: &str| -> i32 {
            field(name)
                .and_then(|v| v.trim().parse::<i32>().ok())
                .unwrap_or(0)
        };
        let index = |name: &str| -> u32 {
            field(name)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };

        tokens.push(
            TextToken::new(
                text,
                BoundingBox::new(int("left"), int("top"), int("width"), int("height")),
                confidence,
            )
            .with_layout(index("par_num"), index("block_num"), index("line_num")),
        );
    }

    tokens
}

/// Tesseract executable wrapper
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
    page_segmentation_mode: u32,
}

impl TesseractEngine {
    /// Locate the executable.
    ///
    /// Order: explicit path, `TESSERACT_CMD`, well-known install locations,
    /// then plain `tesseract` resolved through `PATH` at spawn time.
    pub fn locate(configured: Option<&Path>) -> Self {
        let command = Self::find_command(configured);
        info!("Using Tesseract command: {:?}", command);
        Self {
            command,
            page_segmentation_mode: DEFAULT_PAGE_SEGMENTATION_MODE,
        }
    }

    /// Override the page segmentation mode used for the TSV pass
    pub fn with_page_segmentation_mode(mut self, psm: u32) -> Self {
        self.page_segmentation_mode = psm;
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn find_command(configured: Option<&Path>) -> PathBuf {
        if let Some(path) = configured {
            if path.is_file() {
                return path.to_path_buf();
            }
            warn!("Configured Tesseract path does not exist: {:?}", path);
        }

        if let Ok(env_cmd) = std::env::var("TESSERACT_CMD") {
            let path = PathBuf::from(&env_cmd);
            if path.is_file() {
                debug!("Tesseract found via TESSERACT_CMD: {:?}", path);
                return path;
            }
            warn!("TESSERACT_CMD points to a missing file: {}", env_cmd);
        }

        for candidate in Self::install_candidates() {
            let path = Path::new(candidate);
            if path.is_file() {
                debug!("Tesseract found at {:?}", path);
                return path.to_path_buf();
            }
        }

        PathBuf::from("tesseract")
    }

    fn install_candidates() -> &'static [&'static str] {
        if cfg!(target_os = "windows") {
            &[
                r"C:\Program Files\Tesseract-OCR\tesseract.exe",
                r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
                r"C:\Tesseract-OCR\tesseract.exe",
            ]
        } else if cfg!(target_os = "macos") {
            &["/opt/homebrew/bin/tesseract", "/usr/local/bin/tesseract"]
        } else {
            &["/usr/bin/tesseract", "/usr/local/bin/tesseract"]
        }
    }

    fn build_command(&self, image_path: &Path, language: &str, mode: OutputMode) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(image_path).arg("stdout").arg("-l").arg(language);
        if mode == OutputMode::Tsv {
            cmd.arg("--psm")
                .arg(self.page_segmentation_mode.to_string())
                .arg("tsv");
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(
        &self,
        image: &RgbImage,
        language: &str,
        mode: OutputMode,
    ) -> Result<String, OcrError> {
        let mut input = tempfile::Builder::new()
            .prefix("screens-translate-")
            .suffix(".png")
            .tempfile()?;
        image.write_to(input.as_file_mut(), ImageFormat::Png)?;

        let mut cmd = self.build_command(input.path(), language, mode);
        debug!("Running OCR: {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                OcrError::EngineNotFound(self.command.clone())
            } else {
                OcrError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.chars().take(500).collect();
            warn!("Tesseract exited with {}: {}", output.status, stderr);
            return Err(OcrError::EngineFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
