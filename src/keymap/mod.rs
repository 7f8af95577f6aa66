//! Host key bindings.
//!
//! These are checked before a key reaches the [`sheetwise_core::Document`],
//! so a bound combo never doubles as grid input.

mod parse;

pub use parse::{parse_action, parse_key_combo};

use std::collections::HashMap;

use sheetwise_core::{Key, KeyInput, StyleKey};

const MAX_BINDINGS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostAction {
    Save,
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleStrikethrough,
    /// Clear contents and formatting of the selection.
    ClearSelection,
}

impl HostAction {
    /// The style a toggle action flips.
    pub fn style_key(self) -> Option<StyleKey> {
        match self {
            HostAction::ToggleBold => Some(StyleKey::Bold),
            HostAction::ToggleItalic => Some(StyleKey::Italic),
            HostAction::ToggleUnderline => Some(StyleKey::Underline),
            HostAction::ToggleStrikethrough => Some(StyleKey::Strikethrough),
            HostAction::Save | HostAction::ClearSelection => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyCombo {
    pub const fn ctrl(key: Key) -> Self {
        KeyCombo {
            key,
            ctrl: true,
            shift: false,
        }
    }

    /// Letters match regardless of case; the shift flag still has to agree.
    pub fn matches(&self, input: &KeyInput) -> bool {
        if self.ctrl != input.ctrl || self.shift != input.shift {
            return false;
        }
        match (self.key, input.key) {
            (Key::Char(a), Key::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        }
    }

    pub fn display(&self) -> String {
        let mut out = String::new();
        if self.ctrl {
            out.push_str("C-");
        }
        if self.shift {
            out.push_str("S-");
        }
        match self.key {
            Key::Char(' ') => out.push_str("Space"),
            Key::Char(c) => out.push(c),
            other => out.push_str(&format!("{:?}", other)),
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub combo: KeyCombo,
    pub action: HostAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keymap {
    bindings: Vec<Binding>,
}

impl Default for Keymap {
    fn default() -> Self {
        let bind = |key, action| Binding {
            combo: KeyCombo::ctrl(key),
            action,
        };
        Keymap {
            bindings: vec![
                bind(Key::Char('s'), HostAction::Save),
                bind(Key::Char('b'), HostAction::ToggleBold),
                bind(Key::Char('i'), HostAction::ToggleItalic),
                bind(Key::Char('u'), HostAction::ToggleUnderline),
                bind(Key::Char('5'), HostAction::ToggleStrikethrough),
                bind(Key::Delete, HostAction::ClearSelection),
            ],
        }
    }
}

impl Keymap {
    /// The default bindings with user entries layered on top. An entry
    /// replaces any binding on the same combo; the action `"none"` unbinds
    /// it. Bad entries are skipped and reported.
    pub fn with_overrides(raw: &HashMap<String, String>) -> (Self, Vec<String>) {
        let mut keymap = Keymap::default();
        let mut warnings = Vec::new();
        if raw.len() > MAX_BINDINGS {
            warnings.push(format!(
                "Too many bindings: {} (max {})",
                raw.len(),
                MAX_BINDINGS
            ));
            return (keymap, warnings);
        }

        // Sorted so duplicate reports are stable.
        let mut entries: Vec<(&String, &String)> = raw.iter().collect();
        entries.sort();
        let mut seen: Vec<KeyCombo> = Vec::new();
        for (combo_str, action_str) in entries {
            let combo = match parse_key_combo(combo_str) {
                Ok(combo) => combo,
                Err(err) => {
                    warnings.push(format!("Invalid key '{}': {}", combo_str, err));
                    continue;
                }
            };
            if seen.contains(&combo) {
                warnings.push(format!("Duplicate key '{}' in bindings", combo.display()));
                continue;
            }
            let action = if action_str.trim().eq_ignore_ascii_case("none") {
                None
            } else {
                match parse_action(action_str) {
                    Some(action) => Some(action),
                    None => {
                        warnings.push(format!("Invalid action '{}'", action_str));
                        continue;
                    }
                }
            };
            seen.push(combo);
            keymap.bindings.retain(|b| b.combo != combo);
            if let Some(action) = action {
                keymap.bindings.push(Binding { combo, action });
            }
        }
        (keymap, warnings)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn action_for(&self, input: &KeyInput) -> Option<HostAction> {
        self.bindings
            .iter()
            .find(|b| b.combo.matches(input))
            .map(|b| b.action)
    }

    /// First combo bound to `action`, for tooltips.
    pub fn combo_for(&self, action: HostAction) -> Option<KeyCombo> {
        self.bindings
            .iter()
            .find(|b| b.action == action)
            .map(|b| b.combo)
    }
}
