//! Dashboard application entry point

use chrono::Local;
use crossbeam_channel::{unbounded, Receiver};
use eframe::egui;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::app::TranslatePipeline;
use crate::config::{save_config, AppConfig};
use crate::dashboard::components::render_sidebar;
use crate::dashboard::state::{CaptureState, DashboardState, DashboardView, StatusMessage, StatusLevel, UiAction};
use crate::dashboard::theme::{self, ThemeColors};
use crate::dashboard::views::{render_history_view, render_settings_view, render_translate_view};
use crate::hotkey::HotkeyManager;
use crate::licensing::{activate_license, AppIdentity, HttpLicenseAuthority, LicenseAuthority, UsagePolicy};
use crate::overlay::TranslationOverlay;
use crate::shared::AppEvent;

const DEFAULT_MANAGE_SUBSCRIPTION_URL: &str = "https://screenstranslate.com/account";
const HISTORY_PAGE: usize = 200;

/// Everything the control window needs, assembled in `main`
pub struct DashboardContext {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub pipeline: TranslatePipeline,
    pub policy: UsagePolicy,
    pub authority: Option<HttpLicenseAuthority>,
    pub identity: AppIdentity,
}

/// The control window
pub struct DashboardApp {
    ctx: DashboardContext,
    state: DashboardState,
    theme_applied: bool,
    events: Receiver<AppEvent>,
    hotkeys: Option<HotkeyManager>,
}

impl DashboardApp {
    pub fn new(ctx: DashboardContext, egui_ctx: &egui::Context) -> Self {
        let (tx, events) = unbounded();
        let waker = egui_ctx.clone();

        let hotkeys = match HotkeyManager::new(tx, move || waker.request_repaint()) {
            Ok(mut manager) => {
                if let Err(e) = manager.register(&ctx.config.hotkey) {
                    warn!("Global hotkey unavailable: {:#}", e);
                }
                Some(manager)
            }
            Err(e) => {
                warn!("Global hotkeys disabled: {:#}", e);
                None
            }
        };

        let mut state = DashboardState::new(&ctx.config);
        if let Some(history) = ctx.pipeline.history() {
            state.history = history.recent(HISTORY_PAGE).unwrap_or_default();
        }

        Self {
            ctx,
            state,
            theme_applied: false,
            events,
            hotkeys,
        }
    }

    /// Create eframe options for the control window
    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([820.0, 560.0])
                .with_min_inner_size([640.0, 440.0])
                .with_title("ScreensTranslate"),
            ..Default::default()
        }
    }

    /// Replace the in-memory config and write it to disk
    fn commit(&mut self, config: AppConfig) {
        self.ctx.config = config;
        if let Err(e) = save_config(&self.ctx.config, &self.ctx.config_path) {
            error!("Failed to save config: {:#}", e);
            self.state.set_status(StatusMessage::error("Could not save settings."));
        }
    }

    fn authority(&self) -> Option<&dyn LicenseAuthority> {
        self.ctx.authority.as_ref().map(|a| a as &dyn LicenseAuthority)
    }

    /// Gate the attempt and open the selection viewport
    fn begin_capture(&mut self) {
        let today = Local::now().date_naive();
        let (config, verdict) = self.ctx.pipeline.authorize(&self.ctx.config, &self.ctx.policy, today);
        self.commit(config);

        match verdict {
            Ok(()) => {
                self.state.capture.begin_selection();
            }
            Err(e) => {
                self.state.capture = CaptureState::Idle;
                self.state.set_status(StatusMessage::error(e.user_message()));
            }
        }
    }

    fn run_capture(&mut self, region: crate::capture::ScreenRect) {
        let min_confidence = self.ctx.config.ocr.interactive_min_confidence;
        match self.ctx.pipeline.translate_region(&self.ctx.config, region, min_confidence) {
            Ok(outcome) => {
                let overlay = TranslationOverlay::new(outcome.overlay_rect, outcome.blocks.clone());
                self.state.capture = CaptureState::Showing(overlay);
                self.state.last_outcome = Some(outcome);
                self.state.set_status(StatusMessage::info(
                    "Translation shown. Press Esc or click to close.",
                ));
                self.refresh_history();
            }
            Err(e) => {
                warn!("Capture failed: {}", e);
                self.state.set_status(StatusMessage::error(e.user_message()));
            }
        }
    }

    fn refresh_history(&mut self) {
        if let Some(history) = self.ctx.pipeline.history() {
            match history.recent(HISTORY_PAGE) {
                Ok(entries) => self.state.history = entries,
                Err(e) => warn!("Could not read history: {:#}", e),
            }
        }
    }

    fn export_history(&mut self) {
        let Some(history) = self.ctx.pipeline.history() else {
            return;
        };
        let exported = crate::storage::history_export_path()
            .and_then(|path| history.export_csv(&path).map(|count| (path, count)));

        match exported {
            Ok((path, count)) => {
                info!("Exported {} history entries to {}", count, path.display());
                self.state.set_status(StatusMessage::info(format!(
                    "Exported {} entries to {}",
                    count,
                    path.display()
                )));
            }
            Err(e) => {
                warn!("Could not export history: {:#}", e);
                self.state.set_status(StatusMessage::error("Could not export the history."));
            }
        }
    }

    fn save_settings(&mut self) {
        let config = self.state.form.apply_to(&self.ctx.config);

        if let Some(hotkeys) = self.hotkeys.as_mut() {
            if let Err(e) = hotkeys.register(&config.hotkey) {
                warn!("Invalid hotkey '{}': {:#}", config.hotkey, e);
                self.state.set_status(StatusMessage::error(format!("Invalid hotkey: {}", config.hotkey)));
                return;
            }
        }

        self.state.form.hotkey = config.hotkey.clone();
        self.commit(config);
        info!("Settings saved");
        self.state.set_status(StatusMessage::info("Settings saved."));
    }

    fn activate(&mut self) {
        let today = Local::now().date_naive();
        let key = self.state.form.license_key.clone();
        let result = activate_license(&self.ctx.config, &key, self.authority(), &self.ctx.identity, today);

        self.state
            .form
            .apply_activation(result.outcome, &result.config.license.license_key);
        let status = if result.success() {
            StatusMessage::info(result.message.clone())
        } else {
            StatusMessage::error(result.message.clone())
        };
        self.commit(result.config);
        self.state.set_status(status);
    }

    fn process_actions(&mut self, ctx: &egui::Context) {
        for action in std::mem::take(&mut self.state.actions) {
            match action {
                UiAction::StartCapture => self.begin_capture(),
                UiAction::SaveSettings => self.save_settings(),
                UiAction::ActivateLicense => self.activate(),
                UiAction::ManageSubscription => {
                    let url = std::env::var("SCREENSTRANSLATE_MANAGE_SUBSCRIPTION_URL")
                        .unwrap_or_else(|_| DEFAULT_MANAGE_SUBSCRIPTION_URL.to_string());
                    ctx.open_url(egui::OpenUrl::new_tab(url));
                }
                UiAction::RefreshHistory => self.refresh_history(),
                UiAction::ExportHistory => self.export_history(),
                UiAction::ClearHistory => {
                    if let Some(history) = self.ctx.pipeline.history() {
                        if let Err(e) = history.clear() {
                            warn!("Could not clear history: {:#}", e);
                        }
                    }
                    self.state.history.clear();
                }
            }
        }
    }

    /// Drive the selection / capture / overlay cycle for this frame
    fn update_capture(&mut self, ctx: &egui::Context) {
        match &mut self.state.capture {
            CaptureState::Idle => {}
            CaptureState::Selecting(selection) => {
                if let Some(result) = selection.show(ctx) {
                    if !self.state.capture.finish_selection(result) {
                        self.state.set_status(StatusMessage::info("Selection cancelled."));
                    }
                    ctx.request_repaint();
                }
            }
            CaptureState::PendingCapture { .. } => {
                if let Some(region) = self.state.capture.tick_pending() {
                    self.run_capture(region);
                }
                ctx.request_repaint();
            }
            CaptureState::Showing(overlay) => {
                if !overlay.show(ctx) {
                    self.state.capture = CaptureState::Idle;
                }
            }
        }
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        if self.state.status.as_ref().is_some_and(|s| s.is_expired()) {
            self.state.status = None;
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            match &self.state.status {
                Some(status) => {
                    let color = match status.level {
                        StatusLevel::Info => ThemeColors::TEXT_SECONDARY,
                        StatusLevel::Error => ThemeColors::ACCENT_ERROR,
                    };
                    ui.label(egui::RichText::new(&status.text).color(color));
                    ctx.request_repaint_after(std::time::Duration::from_millis(500));
                }
                None => {
                    ui.label(egui::RichText::new("Ready").color(ThemeColors::TEXT_MUTED));
                }
            }
            ui.add_space(2.0);
        });
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        while let Ok(event) = self.events.try_recv() {
            match event {
                AppEvent::CaptureRequested => {
                    info!("Capture requested by hotkey");
                    self.begin_capture();
                }
            }
        }

        self.process_actions(ctx);
        self.update_capture(ctx);
        self.render_status_bar(ctx);

        egui::SidePanel::left("sidebar")
            .resizable(false)
            .default_width(170.0)
            .show(ctx, |ui| {
                render_sidebar(ui, &mut self.state.current_view);
            });

        let provider = self.ctx.pipeline.translator().provider().name();
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().inner_margin(20.0).show(ui, |ui| match self.state.current_view {
                DashboardView::Translate => {
                    render_translate_view(ui, &mut self.state, &self.ctx.config, &self.ctx.policy, provider)
                }
                DashboardView::Settings => render_settings_view(ui, &mut self.state, &self.ctx.config),
                DashboardView::History => render_history_view(ui, &mut self.state),
            });
        });
    }

    /// Transparent so the overlay and selection viewports show the screen
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }
}

/// Run the control window (blocking)
pub fn run_dashboard(ctx: DashboardContext) -> Result<(), eframe::Error> {
    eframe::run_native(
        "ScreensTranslate",
        DashboardApp::options(),
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(ctx, &cc.egui_ctx)))),
    )
}
