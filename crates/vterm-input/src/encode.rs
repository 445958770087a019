//! Wire-byte encoding for key/char events that fall through the binding
//! table unmatched, translating the event to wire bytes.

use crate::event::{CharEvent, EventKind, Key, KeyEvent, Modifiers};

/// The subset of terminal mode state that changes how a key encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeModes {
    /// DECCKM: cursor keys emit `SS3`/application forms instead of `CSI`.
    pub app_cursor_keys: bool,
    /// DECKPAM: keypad emits application forms instead of plain digits.
    pub app_keypad: bool,
    /// Bracketed paste (mode 2004): wrap pasted text in `CSI 200~`/`201~`.
    pub bracketed_paste: bool,
}

/// Encode a key event that no binding claimed. Release events never
/// produce wire bytes (xterm-compatible terminals don't report key-up).
#[must_use]
pub fn encode_key(ev: &KeyEvent, modes: EncodeModes) -> Vec<u8> {
    if ev.kind == EventKind::Release {
        return Vec::new();
    }
    let mods = ev.modifiers;
    match ev.key {
        Key::Enter => carriage(mods),
        Key::Escape => vec![0x1b],
        Key::Backspace => vec![0x7f],
        Key::Tab => {
            if mods.contains(Modifiers::SHIFT) {
                csi_final(mods, "Z")
            } else {
                vec![b'\t']
            }
        }
        Key::BackTab => csi_final(mods, "Z"),
        Key::Delete => csi_tilde(mods, 3),
        Key::Insert => csi_tilde(mods, 2),
        Key::Home => cursor_key(mods, modes.app_cursor_keys, 'H'),
        Key::End => cursor_key(mods, modes.app_cursor_keys, 'F'),
        Key::PageUp => csi_tilde(mods, 5),
        Key::PageDown => csi_tilde(mods, 6),
        Key::Up => cursor_key(mods, modes.app_cursor_keys, 'A'),
        Key::Down => cursor_key(mods, modes.app_cursor_keys, 'B'),
        Key::Right => cursor_key(mods, modes.app_cursor_keys, 'C'),
        Key::Left => cursor_key(mods, modes.app_cursor_keys, 'D'),
        Key::F(n) => function_key(mods, n),
        Key::KeypadEnter => keypad(mods, modes.app_keypad, 'M', b"\r"),
        Key::KeypadPlus => keypad(mods, modes.app_keypad, 'l', b"+"),
        Key::KeypadMinus => keypad(mods, modes.app_keypad, 'm', b"-"),
        Key::KeypadMultiply => keypad(mods, modes.app_keypad, 'j', b"*"),
        Key::KeypadDivide => keypad(mods, modes.app_keypad, 'o', b"/"),
        Key::KeypadDecimal => keypad(mods, modes.app_keypad, 'n', b"."),
        Key::KeypadDigit(d) => {
            let ch = [b'0' + (d % 10)];
            let ss3_final = (b'p' + d) as char;
            keypad(mods, modes.app_keypad, ss3_final, &ch)
        }
    }
}

/// Encode a printable-character event (ctrl-letter collapsing, alt-prefix
/// per xterm `metaSendsEscape`).
#[must_use]
pub fn encode_char(ev: &CharEvent) -> Vec<u8> {
    if ev.kind == EventKind::Release {
        return Vec::new();
    }
    let mut out = Vec::new();
    if ev.modifiers.contains(Modifiers::ALT) {
        out.push(0x1b);
    }
    if ev.modifiers.contains(Modifiers::CTRL) {
        if let Some(b) = ctrl_collapse(ev.ch) {
            out.push(b);
            return out;
        }
    }
    let mut buf = [0u8; 4];
    out.extend_from_slice(ev.ch.encode_utf8(&mut buf).as_bytes());
    out
}

/// Wrap pasted text in bracketed-paste markers when enabled.
#[must_use]
pub fn encode_paste(text: &str, bracketed: bool) -> Vec<u8> {
    if !bracketed {
        return text.as_bytes().to_vec();
    }
    let mut out = Vec::with_capacity(text.len() + 12);
    out.extend_from_slice(b"\x1b[200~");
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(b"\x1b[201~");
    out
}

fn ctrl_collapse(ch: char) -> Option<u8> {
    let upper = ch.to_ascii_uppercase();
    match upper {
        '@'..='_' => Some(upper as u8 - 0x40),
        '?' => Some(0x7f),
        _ => None,
    }
}

fn carriage(mods: Modifiers) -> Vec<u8> {
    if mods.is_empty() { vec![b'\r'] } else { csi_final(mods, "u") }
}

/// Cursor keys: `CSI A`-style in normal mode, `SS3 A` in DECCKM application
/// mode when unmodified; any modifier forces the CSI form with a modifier
/// parameter (xterm convention).
fn cursor_key(mods: Modifiers, app_cursor: bool, final_byte: char) -> Vec<u8> {
    if mods.is_empty() {
        if app_cursor {
            vec![0x1b, b'O', final_byte as u8]
        } else {
            vec![0x1b, b'[', final_byte as u8]
        }
    } else {
        csi_final(mods, &final_byte.to_string())
    }
}

fn function_key(mods: Modifiers, n: u8) -> Vec<u8> {
    // F1-F4 use SS3/CSI single-letter forms; F5+ use CSI ~ numeric forms.
    match n {
        1..=4 => {
            let final_byte = (b'P' + (n - 1)) as char;
            if mods.is_empty() {
                vec![0x1b, b'O', final_byte as u8]
            } else {
                csi_final(mods, &final_byte.to_string())
            }
        }
        _ => {
            let code = match n {
                5 => 15,
                6 => 17,
                7 => 18,
                8 => 19,
                9 => 20,
                10 => 21,
                11 => 23,
                12 => 24,
                13 => 25,
                14 => 26,
                15 => 28,
                16 => 29,
                17 => 31,
                18 => 32,
                19 => 33,
                20 => 34,
                other => u16::from(other),
            };
            csi_tilde(mods, code)
        }
    }
}

fn keypad(mods: Modifiers, app_keypad: bool, ss3_final: char, numeric: &[u8]) -> Vec<u8> {
    if app_keypad && mods.is_empty() {
        vec![0x1b, b'O', ss3_final as u8]
    } else {
        numeric.to_vec()
    }
}

/// `CSI 1 ; <mods> <final>` (or bare `CSI <final>` when unmodified).
fn csi_final(mods: Modifiers, final_str: &str) -> Vec<u8> {
    let mut s = String::from("\x1b[");
    if !mods.is_empty() {
        s.push_str("1;");
        s.push_str(&mods.xterm_value().to_string());
    }
    s.push_str(final_str);
    s.into_bytes()
}

/// `CSI <n> ; <mods> ~` (or bare `CSI <n> ~` when unmodified).
fn csi_tilde(mods: Modifiers, n: u16) -> Vec<u8> {
    let mut s = format!("\x1b[{n}");
    if !mods.is_empty() {
        s.push(';');
        s.push_str(&mods.xterm_value().to_string());
    }
    s.push('~');
    s.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn key(k: Key, mods: Modifiers) -> KeyEvent {
        KeyEvent { key: k, modifiers: mods, kind: EventKind::Press, timestamp: Instant::now() }
    }

    #[test]
    fn plain_up_arrow_normal_mode() {
        let bytes = encode_key(&key(Key::Up, Modifiers::NONE), EncodeModes::default());
        assert_eq!(bytes, b"\x1b[A");
    }

    #[test]
    fn plain_up_arrow_app_cursor_mode() {
        let modes = EncodeModes { app_cursor_keys: true, ..Default::default() };
        let bytes = encode_key(&key(Key::Up, Modifiers::NONE), modes);
        assert_eq!(bytes, b"\x1bOA");
    }

    #[test]
    fn shift_up_arrow_uses_modifier_csi() {
        let bytes = encode_key(&key(Key::Up, Modifiers::SHIFT), EncodeModes::default());
        assert_eq!(bytes, b"\x1b[1;2A");
    }

    #[test]
    fn delete_key_is_csi_tilde() {
        let bytes = encode_key(&key(Key::Delete, Modifiers::NONE), EncodeModes::default());
        assert_eq!(bytes, b"\x1b[3~");
    }

    #[test]
    fn ctrl_a_collapses_to_soh() {
        let ev = CharEvent {
            ch: 'a',
            modifiers: Modifiers::CTRL,
            kind: EventKind::Press,
            timestamp: Instant::now(),
        };
        assert_eq!(encode_char(&ev), vec![0x01]);
    }

    #[test]
    fn alt_char_prefixes_escape() {
        let ev = CharEvent {
            ch: 'x',
            modifiers: Modifiers::ALT,
            kind: EventKind::Press,
            timestamp: Instant::now(),
        };
        assert_eq!(encode_char(&ev), vec![0x1b, b'x']);
    }

    #[test]
    fn bracketed_paste_wraps_text() {
        let bytes = encode_paste("hi", true);
        assert_eq!(bytes, b"\x1b[200~hi\x1b[201~");
    }

    #[test]
    fn unbracketed_paste_is_literal() {
        let bytes = encode_paste("hi", false);
        assert_eq!(bytes, b"hi");
    }
}
