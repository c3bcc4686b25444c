use global_hotkey::hotkey::{Code, Modifiers};
use phasmo_companion::utils::keycode::{code_label, key_to_code, normalize_combo, parse_key_combo, KeyCombo};
use phasmo_companion::CompanionError;

fn combo(s: &str) -> KeyCombo {
    s.parse().unwrap()
}

#[test]
fn test_single_keys() {
    assert_eq!(combo("Space"), KeyCombo::new(Modifiers::empty(), Code::Space));
    assert_eq!(combo("a"), KeyCombo::new(Modifiers::empty(), Code::KeyA));
    assert_eq!(combo("F12"), KeyCombo::new(Modifiers::empty(), Code::F12));
    assert_eq!(combo("esc"), KeyCombo::new(Modifiers::empty(), Code::Escape));
}

#[test]
fn test_modifier_combos() {
    assert_eq!(combo("Shift+1"), KeyCombo::new(Modifiers::SHIFT, Code::Digit1));
    assert_eq!(combo("Shift+-"), KeyCombo::new(Modifiers::SHIFT, Code::Minus));
    assert_eq!(
        combo("ctrl+alt+F5"),
        KeyCombo::new(Modifiers::CONTROL | Modifiers::ALT, Code::F5)
    );
    assert_eq!(
        combo("Command+Option+K"),
        KeyCombo::new(Modifiers::SUPER | Modifiers::ALT, Code::KeyK)
    );
}

#[test]
fn test_parse_is_case_insensitive() {
    assert_eq!(combo("SHIFT+s"), combo("shift+S"));
    assert_eq!(combo("control+enter"), combo("Ctrl+Return"));
}

#[test]
fn test_canonical_display() {
    assert_eq!(combo("shift+ctrl+x").to_string(), "Ctrl+Shift+X");
    assert_eq!(combo("meta+alt+shift+ctrl+f1").to_string(), "Ctrl+Alt+Shift+Cmd+F1");
    assert_eq!(combo("space").to_string(), "Space");
    assert_eq!(normalize_combo(" shift + 9 ").unwrap(), "Shift+9");
}

#[test]
fn test_all_letters_and_digits() {
    for ch in 'A'..='Z' {
        let code = key_to_code(&ch.to_string()).unwrap();
        assert_eq!(code_label(code), Some(ch.to_string().as_str()));
        assert_eq!(key_to_code(&ch.to_ascii_lowercase().to_string()), Some(code));
    }
    for ch in '0'..='9' {
        let code = key_to_code(&ch.to_string()).unwrap();
        assert_eq!(code_label(code), Some(ch.to_string().as_str()));
    }
}

#[test]
fn test_punctuation_keys() {
    for key in ["-", "=", "[", "]", ";", "'", "`", "\\", ",", ".", "/"] {
        let code = key_to_code(key).unwrap();
        assert_eq!(code_label(code), Some(key));
    }
}

#[test]
fn test_invalid_combos() {
    for bad in ["", "   ", "Shift+", "Shift", "Ctrl+Alt", "A+B", "1+Shift", "Shift++", "Hyper+A", "F13", "Shift+Numpad1"] {
        match bad.parse::<KeyCombo>() {
            Err(CompanionError::InvalidKeyCombo { combo, .. }) => assert_eq!(combo, bad),
            other => panic!("{:?} should be rejected, got {:?}", bad, other),
        }
    }
}

#[test]
fn test_parse_key_combo_matches_hotkey_id() {
    let hotkey = parse_key_combo("Shift+S").unwrap();
    assert_eq!(hotkey.id(), combo("shift+s").to_hotkey().id());
    assert_ne!(hotkey.id(), combo("S").to_hotkey().id());
}
