//! Events delivered to the UI thread

/// Cross-thread notifications drained by the control window each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The global capture hotkey was pressed
    CaptureRequested,
}
