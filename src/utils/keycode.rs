//! Key-combination strings ("Shift+1", "Ctrl+Alt+F5", "Space")
//!
//! Combos are `+`-separated: any number of modifiers followed by exactly one
//! key. Parsing is case-insensitive; `Display` yields the canonical spelling,
//! which is also what duplicate detection compares.

use crate::error::CompanionError;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub code: Code,
}

impl KeyCombo {
    pub fn new(modifiers: Modifiers, code: Code) -> Self {
        Self { modifiers, code }
    }

    pub fn to_hotkey(self) -> HotKey {
        let mods = if self.modifiers.is_empty() {
            None
        } else {
            Some(self.modifiers)
        };
        HotKey::new(mods, self.code)
    }
}

/// Parse a combo string straight into a registrable hotkey
pub fn parse_key_combo(combo: &str) -> Result<HotKey, CompanionError> {
    Ok(combo.parse::<KeyCombo>()?.to_hotkey())
}

/// Canonical spelling of a combo, used to compare user input
pub fn normalize_combo(combo: &str) -> Result<String, CompanionError> {
    Ok(combo.parse::<KeyCombo>()?.to_string())
}

fn parse_modifier(token: &str) -> Option<Modifiers> {
    match token.to_ascii_lowercase().as_str() {
        "shift" => Some(Modifiers::SHIFT),
        "ctrl" | "control" => Some(Modifiers::CONTROL),
        "alt" | "option" => Some(Modifiers::ALT),
        "cmd" | "command" | "super" | "meta" => Some(Modifiers::SUPER),
        _ => None,
    }
}

/// Map a key name to its physical key code
pub fn key_to_code(key: &str) -> Option<Code> {
    let upper = key.to_ascii_uppercase();

    if upper.len() == 1 {
        let ch = upper.chars().next()?;
        return match ch {
            'A'..='Z' => letter_code(ch),
            '0'..='9' => digit_code(ch),
            '-' => Some(Code::Minus),
            '=' => Some(Code::Equal),
            '[' => Some(Code::BracketLeft),
            ']' => Some(Code::BracketRight),
            ';' => Some(Code::Semicolon),
            '\'' => Some(Code::Quote),
            '`' => Some(Code::Backquote),
            '\\' => Some(Code::Backslash),
            ',' => Some(Code::Comma),
            '.' => Some(Code::Period),
            '/' => Some(Code::Slash),
            _ => None,
        };
    }

    match upper.as_str() {
        "SPACE" => Some(Code::Space),
        "ENTER" | "RETURN" => Some(Code::Enter),
        "TAB" => Some(Code::Tab),
        "ESC" | "ESCAPE" => Some(Code::Escape),
        "BACKSPACE" => Some(Code::Backspace),
        "UP" | "ARROWUP" => Some(Code::ArrowUp),
        "DOWN" | "ARROWDOWN" => Some(Code::ArrowDown),
        "LEFT" | "ARROWLEFT" => Some(Code::ArrowLeft),
        "RIGHT" | "ARROWRIGHT" => Some(Code::ArrowRight),
        "F1" => Some(Code::F1),
        "F2" => Some(Code::F2),
        "F3" => Some(Code::F3),
        "F4" => Some(Code::F4),
        "F5" => Some(Code::F5),
        "F6" => Some(Code::F6),
        "F7" => Some(Code::F7),
        "F8" => Some(Code::F8),
        "F9" => Some(Code::F9),
        "F10" => Some(Code::F10),
        "F11" => Some(Code::F11),
        "F12" => Some(Code::F12),
        _ => None,
    }
}

fn letter_code(ch: char) -> Option<Code> {
    let code = match ch {
        'A' => Code::KeyA,
        'B' => Code::KeyB,
        'C' => Code::KeyC,
        'D' => Code::KeyD,
        'E' => Code::KeyE,
        'F' => Code::KeyF,
        'G' => Code::KeyG,
        'H' => Code::KeyH,
        'I' => Code::KeyI,
        'J' => Code::KeyJ,
        'K' => Code::KeyK,
        'L' => Code::KeyL,
        'M' => Code::KeyM,
        'N' => Code::KeyN,
        'O' => Code::KeyO,
        'P' => Code::KeyP,
        'Q' => Code::KeyQ,
        'R' => Code::KeyR,
        'S' => Code::KeyS,
        'T' => Code::KeyT,
        'U' => Code::KeyU,
        'V' => Code::KeyV,
        'W' => Code::KeyW,
        'X' => Code::KeyX,
        'Y' => Code::KeyY,
        'Z' => Code::KeyZ,
        _ => return None,
    };
    Some(code)
}

fn digit_code(ch: char) -> Option<Code> {
    let code = match ch {
        '0' => Code::Digit0,
        '1' => Code::Digit1,
        '2' => Code::Digit2,
        '3' => Code::Digit3,
        '4' => Code::Digit4,
        '5' => Code::Digit5,
        '6' => Code::Digit6,
        '7' => Code::Digit7,
        '8' => Code::Digit8,
        '9' => Code::Digit9,
        _ => return None,
    };
    Some(code)
}

/// Display label for a key code (inverse of `key_to_code`)
pub fn code_label(code: Code) -> Option<&'static str> {
    let label = match code {
        Code::KeyA => "A",
        Code::KeyB => "B",
        Code::KeyC => "C",
        Code::KeyD => "D",
        Code::KeyE => "E",
        Code::KeyF => "F",
        Code::KeyG => "G",
        Code::KeyH => "H",
        Code::KeyI => "I",
        Code::KeyJ => "J",
        Code::KeyK => "K",
        Code::KeyL => "L",
        Code::KeyM => "M",
        Code::KeyN => "N",
        Code::KeyO => "O",
        Code::KeyP => "P",
        Code::KeyQ => "Q",
        Code::KeyR => "R",
        Code::KeyS => "S",
        Code::KeyT => "T",
        Code::KeyU => "U",
        Code::KeyV => "V",
        Code::KeyW => "W",
        Code::KeyX => "X",
        Code::KeyY => "Y",
        Code::KeyZ => "Z",
        Code::Digit0 => "0",
        Code::Digit1 => "1",
        Code::Digit2 => "2",
        Code::Digit3 => "3",
        Code::Digit4 => "4",
        Code::Digit5 => "5",
        Code::Digit6 => "6",
        Code::Digit7 => "7",
        Code::Digit8 => "8",
        Code::Digit9 => "9",
        Code::Minus => "-",
        Code::Equal => "=",
        Code::BracketLeft => "[",
        Code::BracketRight => "]",
        Code::Semicolon => ";",
        Code::Quote => "'",
        Code::Backquote => "`",
        Code::Backslash => "\\",
        Code::Comma => ",",
        Code::Period => ".",
        Code::Slash => "/",
        Code::Space => "Space",
        Code::Enter => "Enter",
        Code::Tab => "Tab",
        Code::Escape => "Escape",
        Code::Backspace => "Backspace",
        Code::ArrowUp => "Up",
        Code::ArrowDown => "Down",
        Code::ArrowLeft => "Left",
        Code::ArrowRight => "Right",
        Code::F1 => "F1",
        Code::F2 => "F2",
        Code::F3 => "F3",
        Code::F4 => "F4",
        Code::F5 => "F5",
        Code::F6 => "F6",
        Code::F7 => "F7",
        Code::F8 => "F8",
        Code::F9 => "F9",
        Code::F10 => "F10",
        Code::F11 => "F11",
        Code::F12 => "F12",
        _ => return None,
    };
    Some(label)
}

impl FromStr for KeyCombo {
    type Err = CompanionError;

    fn from_str(combo: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CompanionError::InvalidKeyCombo {
            combo: combo.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = combo.trim();
        if trimmed.is_empty() {
            return Err(invalid("combination is empty"));
        }

        let mut modifiers = Modifiers::empty();
        let mut code = None;

        for token in trimmed.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(invalid("empty key between '+' separators"));
            }
            if let Some(modifier) = parse_modifier(token) {
                if code.is_some() {
                    return Err(invalid("modifiers must come before the key"));
                }
                modifiers |= modifier;
                continue;
            }
            if code.is_some() {
                return Err(invalid("only one non-modifier key is allowed"));
            }
            code = Some(key_to_code(token).ok_or_else(|| invalid(&format!("unknown key '{}'", token)))?);
        }

        let code = code.ok_or_else(|| invalid("a non-modifier key is required"))?;
        Ok(KeyCombo { modifiers, code })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::SUPER, "Cmd"),
        ];
        for (modifier, name) in order {
            if self.modifiers.contains(modifier) {
                write!(f, "{}+", name)?;
            }
        }
        match code_label(self.code) {
            Some(label) => f.write_str(label),
            None => write!(f, "{:?}", self.code),
        }
    }
}
