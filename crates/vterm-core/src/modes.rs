//! ANSI standard modes (SM/RM) and DEC private modes (CSI `?` SM/RM),
//! plus the configuration-time "frozen mode" override.
//!
//! Frozen modes: a set of DEC mode numbers declared frozen at configuration
//! time. Guest attempts to set or reset a frozen mode are silently ignored;
//! DECRQM still reports the frozen value.

use std::collections::HashSet;

/// DEC private modes (CSI `?` SM/RM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecModes {
    pub app_cursor_keys: bool,
    pub dec_ansi: bool,
    pub column_132: bool,
    pub reverse_video: bool,
    pub origin: bool,
    pub autowrap: bool,
    pub mouse_x10: bool,
    pub mouse_normal_tracking: bool,
    pub mouse_button_tracking: bool,
    pub mouse_any_motion: bool,
    pub cursor_blink: bool,
    pub cursor_visible: bool,
    pub alt_screen_47: bool,
    pub alt_screen_save_1047: bool,
    pub alt_screen_save_cursor_1049: bool,
    pub left_right_margin: bool,
    pub focus_reporting: bool,
    pub mouse_utf8_1005: bool,
    pub mouse_sgr_1006: bool,
    pub mouse_urxvt_1015: bool,
    pub alt_scroll_mouse: bool,
    pub bracketed_paste: bool,
    pub synchronized_output: bool,
    pub sixel_scrolling: bool,
    /// DECKPAM/DECKPNM (`ESC =`/`ESC >`): not a CSI `?` SM/RM mode number
    /// (no DECRQM query applies), toggled directly by the ESC singles.
    pub app_keypad: bool,
}

impl Default for DecModes {
    fn default() -> Self {
        Self {
            app_cursor_keys: false,
            dec_ansi: false,
            column_132: false,
            reverse_video: false,
            origin: false,
            autowrap: true,
            mouse_x10: false,
            mouse_normal_tracking: false,
            mouse_button_tracking: false,
            mouse_any_motion: false,
            cursor_blink: true,
            cursor_visible: true,
            alt_screen_47: false,
            alt_screen_save_1047: false,
            alt_screen_save_cursor_1049: false,
            left_right_margin: false,
            focus_reporting: false,
            mouse_utf8_1005: false,
            mouse_sgr_1006: false,
            mouse_urxvt_1015: false,
            alt_scroll_mouse: false,
            bracketed_paste: false,
            synchronized_output: false,
            sixel_scrolling: true,
            app_keypad: false,
        }
    }
}

impl DecModes {
    /// Apply `value` to the mode numbered `number`. Returns `false` if the
    /// number is not a recognized DEC private mode.
    fn apply(&mut self, number: u16, value: bool) -> bool {
        match number {
            1 => self.app_cursor_keys = value,
            2 => self.dec_ansi = value,
            3 => self.column_132 = value,
            5 => self.reverse_video = value,
            6 => self.origin = value,
            7 => self.autowrap = value,
            9 => self.mouse_x10 = value,
            12 => self.cursor_blink = value,
            25 => self.cursor_visible = value,
            47 => self.alt_screen_47 = value,
            69 => self.left_right_margin = value,
            80 => self.sixel_scrolling = value,
            1000 => self.mouse_normal_tracking = value,
            1002 => self.mouse_button_tracking = value,
            1003 => self.mouse_any_motion = value,
            1004 => self.focus_reporting = value,
            1005 => self.mouse_utf8_1005 = value,
            1006 => self.mouse_sgr_1006 = value,
            1007 => self.alt_scroll_mouse = value,
            1015 => self.mouse_urxvt_1015 = value,
            1047 => self.alt_screen_save_1047 = value,
            1049 => self.alt_screen_save_cursor_1049 = value,
            2004 => self.bracketed_paste = value,
            2026 => self.synchronized_output = value,
            _ => return false,
        }
        true
    }

    /// Current value of mode `number`, or `None` if unrecognized.
    fn get(&self, number: u16) -> Option<bool> {
        Some(match number {
            1 => self.app_cursor_keys,
            2 => self.dec_ansi,
            3 => self.column_132,
            5 => self.reverse_video,
            6 => self.origin,
            7 => self.autowrap,
            9 => self.mouse_x10,
            12 => self.cursor_blink,
            25 => self.cursor_visible,
            47 => self.alt_screen_47,
            69 => self.left_right_margin,
            80 => self.sixel_scrolling,
            1000 => self.mouse_normal_tracking,
            1002 => self.mouse_button_tracking,
            1003 => self.mouse_any_motion,
            1004 => self.focus_reporting,
            1005 => self.mouse_utf8_1005,
            1006 => self.mouse_sgr_1006,
            1007 => self.alt_scroll_mouse,
            1015 => self.mouse_urxvt_1015,
            1047 => self.alt_screen_save_1047,
            1049 => self.alt_screen_save_cursor_1049,
            2004 => self.bracketed_paste,
            2026 => self.synchronized_output,
            _ => return None,
        })
    }
}

/// ANSI standard modes (CSI SM/RM without a `?` leader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnsiModes {
    /// IRM, mode 4: insert mode.
    pub insert: bool,
    /// LNM, mode 20: linefeed/newline mode.
    pub linefeed_newline: bool,
}

impl AnsiModes {
    fn apply(&mut self, number: u16, value: bool) -> bool {
        match number {
            4 => self.insert = value,
            20 => self.linefeed_newline = value,
            _ => return false,
        }
        true
    }

    fn get(&self, number: u16) -> Option<bool> {
        Some(match number {
            4 => self.insert,
            20 => self.linefeed_newline,
            _ => return None,
        })
    }
}

/// Aggregate mode state for one `ScreenState`: DEC private modes, ANSI
/// standard modes, and the configuration-time frozen-mode override.
#[derive(Debug, Clone, Default)]
pub struct Modes {
    pub dec: DecModes,
    pub ansi: AnsiModes,
    frozen: HashSet<u16>,
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a DEC mode number frozen; further guest set/reset attempts on
    /// it become no-ops.
    pub fn freeze(&mut self, number: u16) {
        self.frozen.insert(number);
    }

    pub fn unfreeze(&mut self, number: u16) {
        self.frozen.remove(&number);
    }

    pub fn is_frozen(&self, number: u16) -> bool {
        self.frozen.contains(&number)
    }

    /// Set a DEC private mode. Returns `false` if `number` is unrecognized;
    /// a frozen mode returns `true` (recognized) without changing state.
    pub fn set_dec(&mut self, number: u16, value: bool) -> bool {
        if self.is_frozen(number) {
            return self.dec.get(number).is_some();
        }
        self.dec.apply(number, value)
    }

    /// DECRQM-style query: `None` for an unrecognized mode.
    pub fn query_dec(&self, number: u16) -> Option<bool> {
        self.dec.get(number)
    }

    pub fn set_ansi(&mut self, number: u16, value: bool) -> bool {
        self.ansi.apply(number, value)
    }

    pub fn query_ansi(&self, number: u16) -> Option<bool> {
        self.ansi.get(number)
    }

    /// DECKPAM (`value = true`) / DECKPNM (`value = false`): set directly,
    /// bypassing `set_dec`'s mode-number freeze lookup since this isn't a
    /// numbered DEC private mode.
    pub fn set_app_keypad(&mut self, value: bool) {
        self.dec.app_keypad = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autowrap_defaults_to_set() {
        let modes = Modes::new();
        assert_eq!(modes.query_dec(7), Some(true));
    }

    #[test]
    fn unrecognized_mode_query_is_none() {
        let modes = Modes::new();
        assert_eq!(modes.query_dec(31337), None);
    }

    #[test]
    fn set_and_query_round_trip() {
        let mut modes = Modes::new();
        assert!(modes.set_dec(7, false));
        assert_eq!(modes.query_dec(7), Some(false));
    }

    #[test]
    fn frozen_mode_ignores_guest_writes() {
        let mut modes = Modes::new();
        modes.freeze(7);
        assert!(modes.set_dec(7, false), "frozen mode is still recognized");
        assert_eq!(
            modes.query_dec(7),
            Some(true),
            "frozen mode must not change"
        );
    }

    #[test]
    fn ansi_insert_mode_round_trips() {
        let mut modes = Modes::new();
        assert!(modes.set_ansi(4, true));
        assert_eq!(modes.query_ansi(4), Some(true));
    }

    #[test]
    fn app_keypad_defaults_off_and_sets_directly() {
        let mut modes = Modes::new();
        assert!(!modes.dec.app_keypad);
        modes.set_app_keypad(true);
        assert!(modes.dec.app_keypad);
    }
}
