//! Storage Layer
//!
//! Locates the per-user directories and persists translation history in
//! SQLite.

pub mod history;

use anyhow::Result;
use std::path::PathBuf;

pub use history::{HistoryEntry, HistoryStore};

const HISTORY_EXPORT_FILE_NAME: &str = "history.csv";

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "screenstranslate", "ScreensTranslate")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

/// Path of the JSON configuration document
pub fn config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(crate::config::CONFIG_FILE_NAME))
}

/// Path of the history database
pub fn history_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(history::HISTORY_FILE_NAME))
}

/// Where the dashboard writes its CSV export
pub fn history_export_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(HISTORY_EXPORT_FILE_NAME))
}
