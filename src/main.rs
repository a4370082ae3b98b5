//! ScreensTranslate - select a screen region, read it, translate it
//!
//! The text in the selected region is recognised with Tesseract, translated
//! by the configured provider and shown in a transient overlay on top of the
//! original.

mod app;
mod capture;
mod config;
mod dashboard;
mod hotkey;
mod licensing;
mod overlay;
mod shared;
mod storage;
mod translation;
mod vision;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::TranslatePipeline;
use crate::capture::ScreenRect;
use crate::config::AppConfig;
use crate::licensing::{
    activate_license, maybe_refresh_license, AppIdentity, HttpLicenseAuthority, LicenseAuthority,
    UsagePolicy,
};
use crate::storage::HistoryStore;
use crate::translation::TranslationClient;
use crate::vision::TesseractEngine;

/// ScreensTranslate - on-screen OCR and translation
#[derive(Parser, Debug)]
#[command(name = "screens-translate", version)]
#[command(about = "Select a screen region, OCR it and show a translated overlay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the control window and the global capture hotkey (default)
    Run,
    /// Translate a screen region or an image file once and print the result
    Translate(TranslateArgs),
    /// Activate a license key on this device
    Activate {
        /// License key
        key: String,
    },
    /// Show license, usage and engine status
    Status,
    /// List or clear past translations
    History {
        /// Delete all entries
        #[arg(long)]
        clear: bool,
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Write the whole history to a CSV file
        #[arg(long, conflicts_with = "clear")]
        export: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Screen region as left,top,width,height
    #[arg(long, required_unless_present = "image", conflicts_with = "image")]
    region: Option<ScreenRect>,
    /// PNG image to read instead of capturing the screen
    #[arg(long)]
    image: Option<PathBuf>,
    /// Minimum OCR token confidence (defaults to the configured value)
    #[arg(long)]
    min_confidence: Option<f32>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let config_path = storage::config_path()?;
    let mut config = config::load_or_default(&config_path);
    let device_id = config.license.device_id.clone();
    config.license.ensure_device_id();
    if config.license.device_id != device_id {
        config::save_config(&config, &config_path)?;
    }

    let identity = AppIdentity::from_env();
    let policy = UsagePolicy::from_env();
    let authority = match HttpLicenseAuthority::from_env() {
        Ok(authority) => authority,
        Err(e) => {
            warn!("License backend unavailable: {}", e);
            None
        }
    };
    let authority_ref = authority.as_ref().map(|a| a as &dyn LicenseAuthority);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            info!("ScreensTranslate {} starting", env!("CARGO_PKG_VERSION"));
            let config = refresh_license(config, &config_path, authority_ref, &identity)?;
            let pipeline = build_pipeline(&config)?;
            let ctx = dashboard::DashboardContext {
                config,
                config_path,
                pipeline,
                policy,
                authority,
                identity,
            };
            if let Err(e) = dashboard::run_dashboard(ctx) {
                tracing::error!("Dashboard error: {}", e);
            }
            info!("ScreensTranslate shutdown complete");
        }
        Command::Translate(args) => {
            let config = refresh_license(config, &config_path, authority_ref, &identity)?;
            translate_once(config, &config_path, &policy, args)?;
        }
        Command::Activate { key } => {
            let today = Local::now().date_naive();
            let result = activate_license(&config, &key, authority_ref, &identity, today);
            config::save_config(&result.config, &config_path)?;
            if !result.success() {
                bail!("{}", result.message);
            }
            println!("{}", result.message);
        }
        Command::Status => print_status(&config, &config_path, &policy)?,
        Command::History {
            clear,
            limit,
            export,
        } => {
            let history = HistoryStore::open_or_empty(&storage::history_path()?)?;
            if let Some(path) = export {
                let written = history.export_csv(&path)?;
                println!("Exported {} entries to {}", written, path.display());
            } else if clear {
                let removed = history.clear()?;
                println!("Removed {} entries", removed);
            } else {
                for entry in history.recent(limit)? {
                    println!(
                        "{} [{} -> {}] {} => {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.source_lang,
                        entry.target_lang,
                        entry.original,
                        entry.translated
                    );
                }
            }
        }
    }

    Ok(())
}

/// Daily license revalidation; the result is persisted when it changed
fn refresh_license(
    config: AppConfig,
    config_path: &Path,
    authority: Option<&dyn LicenseAuthority>,
    identity: &AppIdentity,
) -> Result<AppConfig> {
    let today = Local::now().date_naive();
    let refreshed = maybe_refresh_license(&config, authority, identity, today);
    if refreshed != config {
        config::save_config(&refreshed, config_path)?;
    }
    Ok(refreshed)
}

fn build_pipeline(config: &AppConfig) -> Result<TranslatePipeline> {
    let engine = TesseractEngine::locate(config.ocr.tesseract_path.as_deref())
        .with_page_segmentation_mode(config.ocr.page_segmentation_mode);
    info!("OCR engine: {}", engine.command().display());

    let translator = TranslationClient::from_settings(&config.translation)?;
    let history = HistoryStore::open_or_empty(&storage::history_path()?)?;

    Ok(
        TranslatePipeline::new(capture::default_grabber(), Box::new(engine), translator)
            .with_history(history),
    )
}

fn translate_once(
    config: AppConfig,
    config_path: &Path,
    policy: &UsagePolicy,
    args: TranslateArgs,
) -> Result<()> {
    let pipeline = build_pipeline(&config)?;
    let today = Local::now().date_naive();
    let (config, verdict) = pipeline.authorize(&config, policy, today);
    config::save_config(&config, config_path)?;
    if let Err(e) = verdict {
        bail!("{}", e.user_message());
    }

    let min_confidence = args.min_confidence.unwrap_or(config.ocr.min_confidence);
    let result = match (args.region, args.image) {
        (Some(region), _) => pipeline.translate_region(&config, region, min_confidence),
        (None, Some(path)) => {
            let image = image::open(&path)
                .with_context(|| format!("reading {}", path.display()))?
                .to_rgb8();
            let (width, height) = image.dimensions();
            let region = ScreenRect::new(0, 0, width as i32, height as i32);
            pipeline.translate_image(&config, &image, region, min_confidence)
        }
        (None, None) => bail!("either --region or --image is required"),
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => bail!("{} ({})", e.user_message(), e),
    };

    for (line, block) in outcome.lines.iter().zip(&outcome.blocks) {
        println!("{} => {}", line.text, block.text);
    }
    println!("overlay: {}", outcome.overlay_rect);
    Ok(())
}

fn print_status(config: &AppConfig, config_path: &Path, policy: &UsagePolicy) -> Result<()> {
    let license = &config.license;
    let translator = TranslationClient::from_settings(&config.translation)?;
    let engine = TesseractEngine::locate(config.ocr.tesseract_path.as_deref());

    println!("config:      {}", config_path.display());
    if license.has_key() {
        println!("license:     {} ({:?})", license.masked_key(), license.status);
    } else {
        println!("license:     none ({:?})", license.status);
    }
    println!("plan:        {}", license.plan.as_deref().unwrap_or("-"));
    println!("pro:         {}", license.is_pro());
    if let Some(expiry) = &license.expires_at {
        println!("expires:     {}", expiry);
    }
    println!("device:      {}", license.device_id.as_deref().unwrap_or("-"));

    if policy.development_mode {
        println!("usage:       unlimited (development mode)");
    } else if license.is_pro() {
        println!("usage:       unlimited");
    } else {
        let today = Local::now().date_naive();
        let used = if config.usage.last_use_date == Some(today) {
            config.usage.uses_today
        } else {
            0
        };
        println!("usage:       {}/{} today", used, policy.limit_for(license));
    }

    println!("languages:   {} -> {}", config.language_source, config.language_target);
    println!("hotkey:      {}", config.hotkey);
    println!("translation: {}", translator.provider().name());
    println!("ocr engine:  {}", engine.command().display());
    Ok(())
}
