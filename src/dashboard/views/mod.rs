//! Dashboard views

pub mod history;
pub mod settings;
pub mod translate;

pub use history::render_history_view;
pub use settings::render_settings_view;
pub use translate::render_translate_view;

/// Languages offered in the pickers: (code, label)
pub const LANGUAGES: [(&str, &str); 10] = [
    ("auto", "Auto-detect"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
];

pub fn language_label(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or(code)
}
