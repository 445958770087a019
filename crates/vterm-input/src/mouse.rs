//! Mouse-reporting wire encoding: the tracking mode selects which events
//! are reported at all, the encoding selects how coordinates and buttons
//! are packed into the escape sequence.

use crate::event::{Modifiers, MouseButton, MouseEvent, MouseEventKind};

/// Which events the host program asked to receive (DEC private modes
/// 9/1000/1002/1003).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    #[default]
    Off,
    /// Mode 9: press only.
    X10,
    /// Mode 1000: press and release.
    Normal,
    /// Mode 1002: press, release, and drag while a button is held.
    ButtonEvent,
    /// Mode 1003: all motion, even with no button held.
    AnyEvent,
    /// Mode 1001: press/release plus a highlight-tracking query/response
    /// round-trip; we report like `Normal` and let the session layer run
    /// the query protocol separately — full highlight-tracking query
    /// semantics are out of scope here.
    Highlight,
}

/// How a reported event is packed onto the wire (DEC private modes
/// 1005/1006/1015; legacy X10 is the implicit default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingEncoding {
    #[default]
    Legacy,
    /// Mode 1006: `CSI < btn ; col ; row M/m`, no coordinate limit.
    Sgr,
    /// Mode 1015: urxvt's `CSI btn ; col ; row M`.
    Urxvt,
    /// Mode 1005: UTF-8-packed legacy coordinates (extends legacy's
    /// 223-column/row cap into the thousands).
    Utf8,
}

/// Encode a mouse event per the active tracking mode/encoding, or `None`
/// if the current tracking mode doesn't report this kind of event.
#[must_use]
pub fn encode_mouse(
    ev: &MouseEvent,
    mode: TrackingMode,
    encoding: TrackingEncoding,
) -> Option<Vec<u8>> {
    if mode == TrackingMode::Off {
        return None;
    }
    let reportable = match (mode, ev.kind) {
        (TrackingMode::X10, MouseEventKind::Press(_)) => true,
        (TrackingMode::X10, _) => false,
        (_, MouseEventKind::Move) => mode == TrackingMode::AnyEvent,
        _ => true,
    };
    if !reportable {
        return None;
    }

    let (code, release) = button_code(ev.kind, ev.modifiers);
    let col = ev.cell_col + 1;
    let row = ev.cell_row + 1;

    Some(match encoding {
        TrackingEncoding::Sgr => {
            let final_byte = if release { 'm' } else { 'M' };
            format!("\x1b[<{code};{col};{row}{final_byte}").into_bytes()
        }
        TrackingEncoding::Urxvt => {
            let packed = if release { 3 } else { code };
            format!("\x1b[{packed};{col};{row}M").into_bytes()
        }
        TrackingEncoding::Legacy => {
            let packed = if release { 3 } else { code };
            legacy_bytes(packed, col, row, false)
        }
        TrackingEncoding::Utf8 => {
            let packed = if release { 3 } else { code };
            legacy_bytes(packed, col, row, true)
        }
    })
}

/// Returns the xterm button/motion code and whether this is a release
/// (legacy/urxvt always report release as plain button-3, independent of
/// which button was let go; SGR instead keeps the real button and flips
/// the final byte to lowercase `m`).
fn button_code(kind: MouseEventKind, mods: Modifiers) -> (u32, bool) {
    let base = match kind {
        MouseEventKind::Press(b) | MouseEventKind::Drag(b) => button_index(b),
        MouseEventKind::Release(b) => button_index(b),
        MouseEventKind::Move => 3,
        MouseEventKind::ScrollUp => 64,
        MouseEventKind::ScrollDown => 65,
        MouseEventKind::ScrollLeft => 66,
        MouseEventKind::ScrollRight => 67,
    };
    let motion_bit = matches!(kind, MouseEventKind::Drag(_) | MouseEventKind::Move) as u32 * 32;
    let mod_bits = (mods.contains(Modifiers::SHIFT) as u32) * 4
        + (mods.contains(Modifiers::ALT) as u32) * 8
        + (mods.contains(Modifiers::CTRL) as u32) * 16;
    let release = matches!(kind, MouseEventKind::Release(_));
    (base + motion_bit + mod_bits, release)
}

fn button_index(b: MouseButton) -> u32 {
    match b {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
    }
}

/// Legacy `CSI M <btn+32> <col+32> <row+32>` encoding. Coordinates above
/// 223 overflow a single byte; when `utf8` is set they're packed as UTF-8
/// code points instead of clamped (mode 1005), matching xterm's behavior.
fn legacy_bytes(code: u32, col: u16, row: u16, utf8: bool) -> Vec<u8> {
    let mut out = vec![0x1b, b'[', b'M'];
    out.push((code + 32) as u8);
    push_coord(&mut out, col, utf8);
    push_coord(&mut out, row, utf8);
    out
}

fn push_coord(out: &mut Vec<u8>, value: u16, utf8: bool) {
    let point = u32::from(value) + 32;
    if utf8 {
        let mut buf = [0u8; 4];
        if let Some(ch) = char::from_u32(point) {
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            return;
        }
    }
    out.push(point.min(255) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(button: MouseButton, col: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Press(button),
            modifiers: Modifiers::NONE,
            cell_row: row,
            cell_col: col,
            pixel_x: 0,
            pixel_y: 0,
        }
    }

    #[test]
    fn x10_mode_ignores_release() {
        let ev = MouseEvent { kind: MouseEventKind::Release(MouseButton::Left), ..press(MouseButton::Left, 0, 0) };
        assert_eq!(encode_mouse(&ev, TrackingMode::X10, TrackingEncoding::Sgr), None);
    }

    #[test]
    fn sgr_press_and_release() {
        let ev = press(MouseButton::Left, 4, 9);
        let bytes = encode_mouse(&ev, TrackingMode::Normal, TrackingEncoding::Sgr).unwrap();
        assert_eq!(bytes, b"\x1b[<0;5;10M");

        let rel = MouseEvent { kind: MouseEventKind::Release(MouseButton::Left), ..ev };
        let bytes = encode_mouse(&rel, TrackingMode::Normal, TrackingEncoding::Sgr).unwrap();
        assert_eq!(bytes, b"\x1b[<0;5;10m");
    }

    #[test]
    fn legacy_release_is_always_button_three() {
        let rel = MouseEvent {
            kind: MouseEventKind::Release(MouseButton::Right),
            modifiers: Modifiers::NONE,
            cell_row: 0,
            cell_col: 0,
            pixel_x: 0,
            pixel_y: 0,
        };
        let bytes = encode_mouse(&rel, TrackingMode::Normal, TrackingEncoding::Legacy).unwrap();
        assert_eq!(bytes, vec![0x1b, b'[', b'M', 3 + 32, 1 + 32, 1 + 32]);
    }

    #[test]
    fn any_event_mode_reports_bare_motion() {
        let mv = MouseEvent {
            kind: MouseEventKind::Move,
            modifiers: Modifiers::NONE,
            cell_row: 2,
            cell_col: 2,
            pixel_x: 0,
            pixel_y: 0,
        };
        assert!(encode_mouse(&mv, TrackingMode::ButtonEvent, TrackingEncoding::Sgr).is_none());
        assert!(encode_mouse(&mv, TrackingMode::AnyEvent, TrackingEncoding::Sgr).is_some());
    }

    #[test]
    fn scroll_up_reports_as_button_64() {
        let ev = MouseEvent {
            kind: MouseEventKind::ScrollUp,
            modifiers: Modifiers::NONE,
            cell_row: 0,
            cell_col: 0,
            pixel_x: 0,
            pixel_y: 0,
        };
        let bytes = encode_mouse(&ev, TrackingMode::Normal, TrackingEncoding::Sgr).unwrap();
        assert_eq!(bytes, b"\x1b[<64;1;1M");
    }
}
