//! Messaging between background listeners and the UI thread

pub mod messages;

pub use messages::AppEvent;
