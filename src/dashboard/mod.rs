//! Dashboard UI Module
//!
//! The control window: capture button, preferences, license activation and
//! translation history. It also owns the selection and overlay viewports.

pub mod app;
pub mod components;
pub mod state;
pub mod theme;
pub mod views;

pub use app::{run_dashboard, DashboardContext};
