//! Key and shortcut translation.
//!
//! Grammar: `key := base | modifier ("-" modifier)? "-" base`
//!
//! Modifiers are `C` (Ctrl), `S` (Shift) and `M` (Meta/Alt), at most two.
//! The base vocabulary is a–z, 0–9, F1–F12 and a fixed set of navigation and
//! editing keys. A descriptor prefixed with `RAW:` carries a literal payload
//! instead.
//!
//! A parsed [`KeyDescriptor`] is always valid: parsing runs to completion
//! before anything can be dispatched, so a rejected descriptor never reaches
//! the backend.

use crate::backend::SessionBackend;
use crate::error::{BridgeError, BridgeResult};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Prefix marking a raw literal payload.
pub const RAW_PREFIX: &str = "RAW:";

/// Maximum number of modifiers in one descriptor.
pub const MAX_MODIFIERS: usize = 2;

/// A key modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Shift,
    Meta,
}

impl Modifier {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "C" => Some(Self::Ctrl),
            "S" => Some(Self::Shift),
            "M" => Some(Self::Meta),
            _ => None,
        }
    }

    /// Grammar spelling (`C`, `S`, `M`).
    pub fn token(self) -> &'static str {
        match self {
            Self::Ctrl => "C",
            Self::Shift => "S",
            Self::Meta => "M",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ctrl => "Ctrl",
            Self::Shift => "Shift",
            Self::Meta => "Alt",
        }
    }
}

/// A base key from the fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKey {
    /// A lowercase letter or a digit.
    Char(char),
    /// Function key F1–F12.
    F(u8),
    Tab,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    Escape,
    Enter,
    Backspace,
    Up,
    Down,
    Left,
    Right,
}

impl BaseKey {
    fn parse(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return (c.is_ascii_lowercase() || c.is_ascii_digit()).then_some(Self::Char(c));
        }

        if let Some(digits) = token.strip_prefix('F') {
            if digits.starts_with('0') || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            return match digits.parse::<u8>() {
                Ok(n @ 1..=12) => Some(Self::F(n)),
                _ => None,
            };
        }

        let key = match token {
            "Tab" => Self::Tab,
            "Home" => Self::Home,
            "End" => Self::End,
            "Insert" => Self::Insert,
            "Delete" => Self::Delete,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Escape" => Self::Escape,
            "Enter" => Self::Enter,
            "Backspace" | "BSpace" => Self::Backspace,
            "Up" => Self::Up,
            "Down" => Self::Down,
            "Left" => Self::Left,
            "Right" => Self::Right,
            _ => return None,
        };
        Some(key)
    }

    /// Grammar spelling of this key.
    pub fn name(self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::F(n) => format!("F{n}"),
            Self::Tab => "Tab".into(),
            Self::Home => "Home".into(),
            Self::End => "End".into(),
            Self::Insert => "Insert".into(),
            Self::Delete => "Delete".into(),
            Self::PageUp => "PageUp".into(),
            Self::PageDown => "PageDown".into(),
            Self::Escape => "Escape".into(),
            Self::Enter => "Enter".into(),
            Self::Backspace => "Backspace".into(),
            Self::Up => "Up".into(),
            Self::Down => "Down".into(),
            Self::Left => "Left".into(),
            Self::Right => "Right".into(),
        }
    }

    /// Spelling understood by the multiplexer's named-key mode.
    fn backend_token(self) -> String {
        match self {
            Self::Insert => "IC".into(),
            Self::Delete => "DC".into(),
            Self::PageUp => "PPage".into(),
            Self::PageDown => "NPage".into(),
            Self::Backspace => "BSpace".into(),
            other => other.name(),
        }
    }
}

/// Shift combinations the multiplexer mishandles as named keys. These are
/// sent as raw escape sequences through the literal path instead.
const SHIFT_OVERRIDES: &[(BaseKey, &str)] = &[
    (BaseKey::Tab, "\x1b[Z"),
    (BaseKey::Up, "\x1b[1;2A"),
    (BaseKey::Down, "\x1b[1;2B"),
    (BaseKey::Right, "\x1b[1;2C"),
    (BaseKey::Left, "\x1b[1;2D"),
    (BaseKey::Home, "\x1b[1;2H"),
    (BaseKey::End, "\x1b[1;2F"),
];

/// Legacy human-readable shortcut names and the descriptor each stands for.
const LEGACY_SHORTCUTS: &[(&str, &str)] = &[
    ("up", "Up"),
    ("down", "Down"),
    ("left", "Left"),
    ("right", "Right"),
    ("escape", "Escape"),
    ("home", "Home"),
    ("end", "End"),
    ("pageup", "PageUp"),
    ("pagedown", "PageDown"),
    ("backspace", "BSpace"),
    ("enter", "Enter"),
    ("paste", "C-v"),
    ("ctrl_c", "C-c"),
    ("shift_up", "S-Up"),
    ("shift_down", "S-Down"),
    ("shift_tab", "S-Tab"),
];

/// Legacy shortcut names with the descriptor each maps to.
pub fn legacy_shortcuts() -> impl Iterator<Item = (&'static str, &'static str)> {
    LEGACY_SHORTCUTS.iter().copied()
}

/// Up to two modifiers plus one base key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    modifiers: Vec<Modifier>,
    base: BaseKey,
}

impl KeyCombo {
    /// Display label such as `Ctrl+Shift+C`.
    pub fn label(&self) -> String {
        let mut parts: Vec<String> = self.modifiers.iter().map(|m| m.label().to_string()).collect();
        parts.push(self.base.name().to_uppercase());
        parts.join("+")
    }

    fn shift_override(&self) -> Option<&'static str> {
        if self.modifiers != [Modifier::Shift] {
            return None;
        }
        SHIFT_OVERRIDES
            .iter()
            .find(|(base, _)| *base == self.base)
            .map(|(_, seq)| *seq)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}-", m.token())?;
        }
        write!(f, "{}", self.base.name())
    }
}

/// A validated key descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDescriptor {
    /// Modifiers plus a base key.
    Combo(KeyCombo),
    /// A literal payload (`RAW:` prefix stripped).
    Raw(String),
}

/// What a descriptor turns into at the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Dispatch through the backend's named-key mode.
    Named(String),
    /// Dispatch through the backend's literal input mode.
    Literal(String),
}

impl KeyDescriptor {
    /// Parse a grammar descriptor or a `RAW:` literal.
    pub fn parse(descriptor: &str) -> BridgeResult<Self> {
        let invalid = || BridgeError::InvalidKey(descriptor.to_string());

        if let Some(payload) = descriptor.strip_prefix(RAW_PREFIX) {
            if payload.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Raw(payload.to_string()));
        }

        if descriptor.is_empty() {
            return Err(invalid());
        }

        let parts: Vec<&str> = descriptor.split('-').collect();
        let (base_token, modifier_tokens) = parts.split_last().ok_or_else(invalid)?;

        if modifier_tokens.len() > MAX_MODIFIERS {
            return Err(invalid());
        }

        let mut modifiers = Vec::with_capacity(modifier_tokens.len());
        for token in modifier_tokens {
            let modifier = Modifier::from_token(token).ok_or_else(invalid)?;
            if modifiers.contains(&modifier) {
                return Err(invalid());
            }
            modifiers.push(modifier);
        }

        let base = BaseKey::parse(base_token).ok_or_else(invalid)?;

        Ok(Self::Combo(KeyCombo { modifiers, base }))
    }

    /// Resolve a legacy shortcut name (e.g. `ctrl_c`, `shift_tab`).
    pub fn from_legacy(name: &str) -> BridgeResult<Self> {
        let (_, descriptor) = LEGACY_SHORTCUTS
            .iter()
            .find(|(legacy, _)| *legacy == name)
            .ok_or_else(|| BridgeError::InvalidKey(name.to_string()))?;
        Self::parse(descriptor)
    }

    /// Translate into a backend action.
    ///
    /// Unmodified letters and digits are typed literally. Shift combinations
    /// in the override table become raw escape sequences. Everything else is
    /// a named key.
    pub fn action(&self) -> KeyAction {
        match self {
            Self::Raw(payload) => KeyAction::Literal(payload.clone()),
            Self::Combo(combo) => {
                if let Some(seq) = combo.shift_override() {
                    return KeyAction::Literal(seq.to_string());
                }
                match combo.base {
                    BaseKey::Char(c) if combo.modifiers.is_empty() => {
                        KeyAction::Literal(c.to_string())
                    }
                    base => {
                        let mut token = String::new();
                        for m in &combo.modifiers {
                            token.push_str(m.token());
                            token.push('-');
                        }
                        token.push_str(&base.backend_token());
                        KeyAction::Named(token)
                    }
                }
            }
        }
    }
}

impl FromStr for KeyDescriptor {
    type Err = BridgeError;

    fn from_str(s: &str) -> BridgeResult<Self> {
        Self::parse(s)
    }
}

/// Send a validated key to a session.
///
/// Checks the session exists, then issues exactly one backend call.
pub fn dispatch(
    backend: &dyn SessionBackend,
    session: &str,
    key: &KeyDescriptor,
) -> BridgeResult<()> {
    if !backend.exists(session) {
        return Err(BridgeError::NotFound(session.to_string()));
    }

    match key.action() {
        KeyAction::Named(token) => {
            debug!(session, key = %token, "sending named key");
            backend.send_named(session, &token)
        }
        KeyAction::Literal(payload) => {
            debug!(session, bytes = payload.len(), "sending literal key payload");
            backend.send_literal(session, &payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;

    fn action(s: &str) -> KeyAction {
        KeyDescriptor::parse(s).unwrap().action()
    }

    #[test]
    fn plain_letter_is_literal() {
        assert_eq!(action("a"), KeyAction::Literal("a".into()));
        assert_eq!(action("7"), KeyAction::Literal("7".into()));
    }

    #[test]
    fn ctrl_c_is_named() {
        assert_eq!(action("C-c"), KeyAction::Named("C-c".into()));
    }

    #[test]
    fn shift_tab_uses_override() {
        assert_eq!(action("S-Tab"), KeyAction::Literal("\x1b[Z".into()));
        assert_eq!(action("S-Up"), KeyAction::Literal("\x1b[1;2A".into()));
        assert_eq!(action("S-End"), KeyAction::Literal("\x1b[1;2F".into()));
    }

    #[test]
    fn override_requires_shift_alone() {
        assert_eq!(action("C-S-Up"), KeyAction::Named("C-S-Up".into()));
        assert_eq!(action("Tab"), KeyAction::Named("Tab".into()));
    }

    #[test]
    fn two_modifiers_accepted() {
        assert_eq!(action("C-S-c"), KeyAction::Named("C-S-c".into()));
        assert_eq!(action("M-x"), KeyAction::Named("M-x".into()));
    }

    #[test]
    fn backend_spellings() {
        assert_eq!(action("PageUp"), KeyAction::Named("PPage".into()));
        assert_eq!(action("PageDown"), KeyAction::Named("NPage".into()));
        assert_eq!(action("Insert"), KeyAction::Named("IC".into()));
        assert_eq!(action("C-Delete"), KeyAction::Named("C-DC".into()));
        assert_eq!(action("BSpace"), KeyAction::Named("BSpace".into()));
        assert_eq!(action("F12"), KeyAction::Named("F12".into()));
    }

    #[test]
    fn rejects_invalid_descriptors() {
        for bad in [
            "", "Z-z", "C-S-M-c", "C-C-c", "F13", "F0", "F01", "A", "c-c", "C-", "-", "Space",
            "RAW:",
        ] {
            assert!(
                matches!(KeyDescriptor::parse(bad), Err(BridgeError::InvalidKey(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn raw_payload() {
        assert_eq!(action("RAW:\x1b[Z"), KeyAction::Literal("\x1b[Z".into()));
    }

    #[test]
    fn legacy_names_follow_override_rule() {
        let shift_tab = KeyDescriptor::from_legacy("shift_tab").unwrap();
        assert_eq!(shift_tab.action(), KeyAction::Literal("\x1b[Z".into()));

        let shift_up = KeyDescriptor::from_legacy("shift_up").unwrap();
        assert_eq!(shift_up.action(), KeyAction::Literal("\x1b[1;2A".into()));

        let ctrl_c = KeyDescriptor::from_legacy("ctrl_c").unwrap();
        assert_eq!(ctrl_c.action(), KeyAction::Named("C-c".into()));

        assert!(KeyDescriptor::from_legacy("ctrl_z").is_err());
    }

    #[test]
    fn every_legacy_entry_parses() {
        for (name, _) in legacy_shortcuts() {
            assert!(KeyDescriptor::from_legacy(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn labels_and_display() {
        let KeyDescriptor::Combo(combo) = KeyDescriptor::parse("C-S-c").unwrap() else {
            panic!("expected combo");
        };
        assert_eq!(combo.label(), "Ctrl+Shift+C");
        assert_eq!(combo.to_string(), "C-S-c");
    }

    #[test]
    fn dispatch_routes_by_action() {
        let backend = RecordingBackend::with_session("s1");

        dispatch(&backend, "s1", &"C-c".parse().unwrap()).unwrap();
        dispatch(&backend, "s1", &"S-Tab".parse().unwrap()).unwrap();

        assert_eq!(backend.named(), vec!["C-c".to_string()]);
        assert_eq!(backend.literals(), vec!["\x1b[Z".to_string()]);
    }

    #[test]
    fn dispatch_to_missing_session_sends_nothing() {
        let backend = RecordingBackend::with_session("s1");
        let err = dispatch(&backend, "nope", &"C-c".parse().unwrap()).unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
        assert!(backend.named().is_empty());
        assert!(backend.literals().is_empty());
    }
}
