//! Application Configuration
//!
//! User settings, license state and usage counters stored as a single JSON
//! document. State-changing operations return a new `AppConfig`; callers
//! persist it with [`save_config`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::licensing::{LicenseState, UsageState};
use crate::translation::TranslationSettings;
use crate::vision::tesseract::DEFAULT_PAGE_SEGMENTATION_MODE;
use crate::vision::{DEFAULT_MIN_CONFIDENCE, INTERACTIVE_MIN_CONFIDENCE};

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OCR / translation source language (`auto` for detection)
    pub language_source: String,
    /// Translation target language
    pub language_target: String,
    /// Global capture hotkey, e.g. `ctrl+shift+t`
    pub hotkey: String,
    /// Interface language
    pub ui_language: String,
    /// OCR settings
    pub ocr: OcrSettings,
    /// Translation provider settings
    pub translation: TranslationSettings,
    /// License state
    pub license: LicenseState,
    /// Daily usage counters
    pub usage: UsageState,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language_source: "auto".to_string(),
            language_target: "es".to_string(),
            hotkey: "ctrl+shift+t".to_string(),
            ui_language: "auto".to_string(),
            ocr: OcrSettings::default(),
            translation: TranslationSettings::default(),
            license: LicenseState::default(),
            usage: UsageState::default(),
        }
    }
}

/// OCR-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Minimum token confidence for batch use
    pub min_confidence: f32,
    /// Minimum token confidence for hotkey captures
    pub interactive_min_confidence: f32,
    /// Explicit Tesseract executable
    pub tesseract_path: Option<PathBuf>,
    /// Tesseract `--psm` value
    pub page_segmentation_mode: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            interactive_min_confidence: INTERACTIVE_MIN_CONFIDENCE,
            tesseract_path: None,
            page_segmentation_mode: DEFAULT_PAGE_SEGMENTATION_MODE,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file.
///
/// The document is written to a temporary file in the same directory and
/// renamed over `path`, so a crash mid-write leaves the previous file intact.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let content = serde_json::to_string_pretty(config)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Load configuration, falling back to defaults when the file is missing or
/// unreadable. The defaults are written back so the next start is clean.
pub fn load_or_default(path: &Path) -> AppConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            if path.exists() {
                warn!("Config at {} is unreadable, resetting: {:#}", path.display(), e);
            } else {
                info!("No config at {}, using defaults", path.display());
            }
            let config = AppConfig::default();
            if let Err(e) = save_config(&config, path) {
                warn!("Failed to write default config: {:#}", e);
            }
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licensing::LicenseStatus;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.language_source, "auto");
        assert_eq!(config.language_target, "es");
        assert_eq!(config.hotkey, "ctrl+shift+t");
        assert_eq!(config.ui_language, "auto");

        assert!((config.ocr.min_confidence - 60.0).abs() < 0.001);
        assert!((config.ocr.interactive_min_confidence - 40.0).abs() < 0.001);
        assert!(config.ocr.tesseract_path.is_none());
        assert_eq!(config.ocr.page_segmentation_mode, 6);

        assert!(config.license.license_key.is_empty());
        assert_eq!(config.license.status, LicenseStatus::Unset);
        assert_eq!(config.usage.uses_today, 0);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.language_target = "en".to_string();
        config.license.license_key = "ABCD-1234-EFGH".to_string();
        config.license.status = LicenseStatus::Active;
        config.usage.last_use_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        config.usage.uses_today = 3;

        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
        assert!(json.contains("\"status\": \"active\""));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"language_target": "fr", "ocr": {"min_confidence": 70}}"#).unwrap();

        assert_eq!(parsed.language_target, "fr");
        assert_eq!(parsed.language_source, "auto");
        assert!((parsed.ocr.min_confidence - 70.0).abs() < 0.001);
        assert_eq!(parsed.ocr.page_segmentation_mode, 6);
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.hotkey = "alt+q".to_string();
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.hotkey, "alt+q");
    }

    #[test]
    fn test_save_replaces_whole_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", "x".repeat(4096)).unwrap();

        save_config(&AppConfig::default(), temp_file.path()).unwrap();
        assert_eq!(load_config(temp_file.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_json() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid json {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_resets_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ broken").unwrap();

        let config = load_or_default(&path);
        assert_eq!(config, AppConfig::default());
        // Rewritten with defaults
        assert_eq!(load_config(&path).unwrap(), AppConfig::default());
    }
}
