//! Dashboard view state management

use std::time::{Duration, Instant};

use crate::app::PipelineOutcome;
use crate::capture::ScreenRect;
use crate::config::AppConfig;
use crate::licensing::ActivationOutcome;
use crate::overlay::{RegionSelection, SelectionResult, TranslationOverlay};
use crate::storage::HistoryEntry;

/// Frames to wait after the selection viewport closes before grabbing pixels,
/// so the dimmed selection layer is not captured
pub const CAPTURE_SETTLE_FRAMES: u8 = 2;

/// How long a status message stays visible
pub const STATUS_DURATION: Duration = Duration::from_secs(5);

/// Current view in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardView {
    #[default]
    Translate,
    Settings,
    History,
}

impl DashboardView {
    pub const ALL: [DashboardView; 3] = [
        DashboardView::Translate,
        DashboardView::Settings,
        DashboardView::History,
    ];

    /// Get the display name for this view
    pub fn name(&self) -> &'static str {
        match self {
            DashboardView::Translate => "Translate",
            DashboardView::Settings => "Settings",
            DashboardView::History => "History",
        }
    }

    /// Get the icon character for this view
    pub fn icon(&self) -> &'static str {
        match self {
            DashboardView::Translate => "T",
            DashboardView::Settings => "S",
            DashboardView::History => "H",
        }
    }
}

/// Capture-translate cycle. Only one is ever in flight.
#[derive(Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// Region selection viewport is open
    Selecting(RegionSelection),
    /// Waiting for the selection viewport to disappear from screen
    PendingCapture { region: ScreenRect, frames_left: u8 },
    /// Translation overlay is visible
    Showing(TranslationOverlay),
}

impl CaptureState {
    /// Start a new selection, dropping any selection or overlay in progress
    pub fn begin_selection(&mut self) {
        *self = CaptureState::Selecting(RegionSelection::new());
    }

    /// Apply the outcome of the selection viewport.
    /// Returns `false` if the selection was cancelled.
    pub fn finish_selection(&mut self, result: SelectionResult) -> bool {
        match result {
            SelectionResult::Completed(region) => {
                *self = CaptureState::PendingCapture {
                    region,
                    frames_left: CAPTURE_SETTLE_FRAMES,
                };
                true
            }
            SelectionResult::Cancelled => {
                *self = CaptureState::Idle;
                false
            }
        }
    }

    /// Count down one frame; yields the region once it is safe to capture
    pub fn tick_pending(&mut self) -> Option<ScreenRect> {
        let CaptureState::PendingCapture { region, frames_left } = self else {
            return None;
        };
        if *frames_left > 0 {
            *frames_left -= 1;
            return None;
        }
        let region = *region;
        *self = CaptureState::Idle;
        Some(region)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// Transient message shown at the bottom of the window
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub shown_at: Instant,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, StatusLevel::Info)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, StatusLevel::Error)
    }

    fn new(text: impl Into<String>, level: StatusLevel) -> Self {
        Self {
            text: text.into(),
            level,
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() > STATUS_DURATION
    }
}

/// Editable copy of the user preferences; applied on Save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub language_source: String,
    pub language_target: String,
    pub hotkey: String,
    pub license_key: String,
}

impl SettingsForm {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language_source: config.language_source.clone(),
            language_target: config.language_target.clone(),
            hotkey: config.hotkey.clone(),
            license_key: config.license.license_key.clone(),
        }
    }

    /// Copy the preferences into `config`; the license key is only changed
    /// through activation
    pub fn apply_to(&self, config: &AppConfig) -> AppConfig {
        let mut next = config.clone();
        next.language_source = self.language_source.clone();
        next.language_target = self.language_target.clone();
        next.hotkey = self.hotkey.trim().to_lowercase();
        next
    }

    /// Show the stored key after activation changed it. A rejected or
    /// unreachable attempt keeps what the user typed.
    pub fn apply_activation(&mut self, outcome: ActivationOutcome, stored_key: &str) {
        if matches!(outcome, ActivationOutcome::Activated | ActivationOutcome::Revoked) {
            self.license_key = stored_key.to_string();
        }
    }
}

/// Requests raised by the views, handled by the app after rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    StartCapture,
    SaveSettings,
    ActivateLicense,
    ManageSubscription,
    RefreshHistory,
    ClearHistory,
    ExportHistory,
}

/// All dashboard-local state
#[derive(Default)]
pub struct DashboardState {
    pub current_view: DashboardView,
    pub capture: CaptureState,
    pub form: SettingsForm,
    pub status: Option<StatusMessage>,
    pub last_outcome: Option<PipelineOutcome>,
    pub history: Vec<HistoryEntry>,
    pub actions: Vec<UiAction>,
}

impl DashboardState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            form: SettingsForm::from_config(config),
            ..Self::default()
        }
    }

    pub fn request(&mut self, action: UiAction) {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }
}
