//! Global capture hotkey
//!
//! The OS delivers hotkey events on its own listener thread. The handler
//! installed here only forwards an [`AppEvent`] over a channel and wakes the
//! UI; everything else happens on the UI thread.

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::Sender;
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use tracing::{debug, info};

use crate::shared::AppEvent;

const LETTERS: [Code; 26] = [
    Code::KeyA, Code::KeyB, Code::KeyC, Code::KeyD, Code::KeyE, Code::KeyF, Code::KeyG,
    Code::KeyH, Code::KeyI, Code::KeyJ, Code::KeyK, Code::KeyL, Code::KeyM, Code::KeyN,
    Code::KeyO, Code::KeyP, Code::KeyQ, Code::KeyR, Code::KeyS, Code::KeyT, Code::KeyU,
    Code::KeyV, Code::KeyW, Code::KeyX, Code::KeyY, Code::KeyZ,
];

const DIGITS: [Code; 10] = [
    Code::Digit0, Code::Digit1, Code::Digit2, Code::Digit3, Code::Digit4,
    Code::Digit5, Code::Digit6, Code::Digit7, Code::Digit8, Code::Digit9,
];

const FUNCTION_KEYS: [Code; 12] = [
    Code::F1, Code::F2, Code::F3, Code::F4, Code::F5, Code::F6,
    Code::F7, Code::F8, Code::F9, Code::F10, Code::F11, Code::F12,
];

/// Parse a hotkey such as `ctrl+shift+t` or `alt+f8`.
///
/// Tokens are case-insensitive; every token but the last must be a modifier.
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    let parts: Vec<String> = hotkey_str
        .split('+')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let Some((key, mods)) = parts.split_last() else {
        bail!("Empty hotkey");
    };

    let mut modifiers = Modifiers::empty();
    for m in mods {
        modifiers |= match m.as_str() {
            "ctrl" | "control" => Modifiers::CONTROL,
            "shift" => Modifiers::SHIFT,
            "alt" => Modifiers::ALT,
            "cmd" | "win" | "super" | "meta" => Modifiers::SUPER,
            other => bail!("Unsupported hotkey modifier: {}", other),
        };
    }

    let code = parse_key_code(key)?;
    let modifiers = (!modifiers.is_empty()).then_some(modifiers);
    Ok(HotKey::new(modifiers, code))
}

/// Parse the main key of a hotkey (already lower-cased)
fn parse_key_code(key: &str) -> Result<Code> {
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_lowercase() {
            return Ok(LETTERS[(c as u8 - b'a') as usize]);
        }
        if c.is_ascii_digit() {
            return Ok(DIGITS[(c as u8 - b'0') as usize]);
        }
    }

    if let Some(n) = key.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        if (1..=FUNCTION_KEYS.len()).contains(&n) {
            return Ok(FUNCTION_KEYS[n - 1]);
        }
    }

    let code = match key {
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "insert" | "ins" => Code::Insert,
        "delete" | "del" => Code::Delete,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" | "pgup" => Code::PageUp,
        "pagedown" | "pgdn" => Code::PageDown,
        "printscreen" | "print" => Code::PrintScreen,
        _ => return Err(anyhow!("Unknown key: {}", key)),
    };
    Ok(code)
}

/// Owns the OS hotkey registration for the capture shortcut
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    registered: Option<HotKey>,
}

impl HotkeyManager {
    /// Create the manager and route presses to `events`.
    ///
    /// `wake` is called after each send so an idle UI loop notices the event.
    pub fn new<W>(events: Sender<AppEvent>, wake: W) -> Result<Self>
    where
        W: Fn() + Send + Sync + 'static,
    {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| anyhow!("Failed to create hotkey manager: {:?}", e))?;

        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.state() == HotKeyState::Pressed {
                debug!("Hotkey {} pressed", event.id());
                if events.send(AppEvent::CaptureRequested).is_ok() {
                    wake();
                }
            }
        }));

        Ok(Self {
            manager,
            registered: None,
        })
    }

    /// Register `hotkey_str`, replacing any previous registration
    pub fn register(&mut self, hotkey_str: &str) -> Result<()> {
        let hotkey = parse_hotkey(hotkey_str)?;
        if self.registered.as_ref().map(HotKey::id) == Some(hotkey.id()) {
            return Ok(());
        }

        self.unregister();
        self.manager
            .register(hotkey)
            .map_err(|e| anyhow!("Failed to register hotkey '{}': {:?}", hotkey_str, e))?;
        self.registered = Some(hotkey);
        info!("Registered capture hotkey: {}", hotkey_str);
        Ok(())
    }

    pub fn unregister(&mut self) {
        if let Some(hotkey) = self.registered.take() {
            let _ = self.manager.unregister(hotkey);
        }
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_hotkey() {
        let hotkey = parse_hotkey("ctrl+shift+t").unwrap();
        assert_eq!(hotkey, HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyT));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(parse_hotkey("Ctrl+Shift+T").unwrap(), parse_hotkey("ctrl+shift+t").unwrap());
    }

    #[test]
    fn test_parse_function_key() {
        let hotkey = parse_hotkey("alt+f8").unwrap();
        assert_eq!(hotkey, HotKey::new(Some(Modifiers::ALT), Code::F8));
        assert_eq!(parse_hotkey("F12").unwrap(), HotKey::new(None, Code::F12));
    }

    #[test]
    fn test_parse_cmd_and_win_are_super() {
        assert_eq!(parse_hotkey("cmd+1").unwrap(), parse_hotkey("win+1").unwrap());
    }

    #[test]
    fn test_parse_unknown_modifier() {
        assert!(parse_hotkey("hyper+t").is_err());
    }

    #[test]
    fn test_parse_invalid_key() {
        assert!(parse_hotkey("ctrl+f13").is_err());
        assert!(parse_hotkey("ctrl+InvalidKey").is_err());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_hotkey("").is_err());
        assert!(parse_hotkey(" + ").is_err());
    }
}
