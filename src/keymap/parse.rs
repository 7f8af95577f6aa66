use super::{HostAction, KeyCombo};
use sheetwise_core::Key;

/// Parse a combo such as `"C-s"`, `"ctrl-shift-x"` or `"Delete"`.
pub fn parse_key_combo(input: &str) -> Result<KeyCombo, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty key".to_string());
    }
    if let Some(ch) = parse_single_char(trimmed) {
        return Ok(KeyCombo {
            key: Key::Char(ch),
            ctrl: false,
            shift: false,
        });
    }

    let ((ctrl, shift), key_part) = if !trimmed.contains('-') {
        ((false, false), trimmed)
    } else if let Some(mod_str) = trimmed.strip_suffix('-') {
        let mod_str = mod_str.trim_end_matches('-');
        if mod_str.is_empty() {
            return Err("missing modifier before '-'".to_string());
        }
        (parse_modifiers(mod_str)?, "-")
    } else {
        let mut split = trimmed.rsplitn(2, '-');
        let key_part = split.next().ok_or_else(|| "empty key".to_string())?;
        let mod_str = split.next().unwrap_or_default();
        (parse_modifiers(mod_str)?, key_part)
    };

    let key = parse_key_code(key_part)?;
    Ok(KeyCombo { key, ctrl, shift })
}

/// Returns `(ctrl, shift)`.
fn parse_modifiers(input: &str) -> Result<(bool, bool), String> {
    let (mut ctrl, mut shift) = (false, false);
    for part in input.split('-') {
        let raw = part.trim();
        if raw.is_empty() {
            return Err("empty modifier segment".to_string());
        }
        let flag = match raw.to_ascii_lowercase().as_str() {
            "c" | "ctrl" | "control" | "cmd" => &mut ctrl,
            "s" | "shift" => &mut shift,
            _ => return Err(format!("unknown modifier '{}'", raw)),
        };
        if *flag {
            return Err(format!("duplicate modifier '{}'", raw));
        }
        *flag = true;
    }
    Ok((ctrl, shift))
}

fn parse_key_code(input: &str) -> Result<Key, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty key".to_string());
    }
    if let Some(ch) = parse_single_char(trimmed) {
        return Ok(Key::Char(ch));
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => Ok(Key::Enter),
        "esc" | "escape" => Ok(Key::Escape),
        "backspace" => Ok(Key::Backspace),
        "delete" | "del" => Ok(Key::Delete),
        "tab" => Ok(Key::Tab),
        "home" => Ok(Key::Home),
        "end" => Ok(Key::End),
        "left" => Ok(Key::Left),
        "right" => Ok(Key::Right),
        "up" => Ok(Key::Up),
        "down" => Ok(Key::Down),
        "f2" => Ok(Key::F2),
        "space" | "spc" => Ok(Key::Char(' ')),
        "dash" | "minus" => Ok(Key::Char('-')),
        "plus" => Ok(Key::Char('+')),
        "comma" => Ok(Key::Char(',')),
        "period" | "dot" => Ok(Key::Char('.')),
        "slash" => Ok(Key::Char('/')),
        "backslash" => Ok(Key::Char('\\')),
        "semicolon" => Ok(Key::Char(';')),
        "equal" => Ok(Key::Char('=')),
        _ => Err(format!("unknown key '{}'", input)),
    }
}

fn parse_single_char(input: &str) -> Option<char> {
    let mut chars = input.chars();
    let ch = chars.next()?;
    if chars.next().is_none() {
        Some(ch.to_ascii_lowercase())
    } else {
        None
    }
}

pub fn parse_action(input: &str) -> Option<HostAction> {
    match input.trim().to_ascii_lowercase().as_str() {
        "save" => Some(HostAction::Save),
        "toggle_bold" | "bold" => Some(HostAction::ToggleBold),
        "toggle_italic" | "italic" => Some(HostAction::ToggleItalic),
        "toggle_underline" | "underline" => Some(HostAction::ToggleUnderline),
        "toggle_strikethrough" | "strikethrough" => Some(HostAction::ToggleStrikethrough),
        "clear_selection" => Some(HostAction::ClearSelection),
        _ => None,
    }
}
