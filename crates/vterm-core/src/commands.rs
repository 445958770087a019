//! Command builder: turns parser [`Action`]s into classified, dispatchable
//! terminal commands.
//!
//! The parser (see [`crate::parser`]) only knows about bytes and sequence
//! shape; it has no idea what `CSI 2 J` means. This module is the next
//! layer down: it accumulates OSC/DCS payloads, decodes SGR parameter
//! groups into [`crate::cell::SgrAttrs`] deltas, and classifies every
//! complete sequence into a [`Command`] that `screen.rs` can execute
//! without re-parsing anything.
//!
//! Grounded on the original command-dispatch table design (selector is
//! `(category, leader, intermediates, final byte)`), generalized from a
//! switch-per-final-byte layout into an explicit enum so invalid/unknown
//! sequences are representable instead of silently falling through.

use crate::cell::{Color, SgrAttrs, SgrFlags, UnderlineStyle};
use crate::parser::{Action, Parser, Sequence};

/// Outcome of dispatching one command to the screen engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Recognized and applied.
    Ok,
    /// Recognized shape but this particular final byte/leader/intermediate
    /// combination has no handler (e.g. a DEC private mode number we don't
    /// model). Distinct from `Invalid` so callers can log at a lower level.
    Unsupported,
    /// Malformed: wrong parameter count/shape for the final byte matched
    /// (e.g. SGR 38 with no color-space selector).
    Invalid,
}

/// One SGR parameter's decoded effect, applied in sequence to a running
/// [`SgrAttrs`]: multiple SGR parameters in one CSI apply left to right,
/// each overriding the previous value of the attribute it touches.
#[derive(Debug, Clone, PartialEq)]
pub enum SgrEffect {
    Reset,
    SetFlag(SgrFlags),
    ClearFlag(SgrFlags),
    SetUnderline(UnderlineStyle),
    SetForeground(Color),
    SetBackground(Color),
    SetUnderlineColor(Option<Color>),
    ResetForeground,
    ResetBackground,
}

/// Decode one SGR (`CSI ... m`) sequence into an ordered list of effects.
///
/// Handles the legacy fixed-width parameters (30-37/40-47/90-97/100-107),
/// the extended forms `38/48/58 ; 5 ; n` (256-color) and
/// `38/48/58 ; 2 ; r ; g ; b` (truecolor), and their colon-delimited
/// sub-parameter equivalents (`38:2::r:g:b`), which the parser already
/// groups per parameter slot.
#[must_use]
pub fn decode_sgr(seq: &Sequence) -> Vec<SgrEffect> {
    let mut effects = Vec::new();
    if seq.params.is_empty() {
        effects.push(SgrEffect::Reset);
        return effects;
    }

    let mut i = 0;
    while i < seq.params.len() {
        let group = &seq.params[i];
        let code = group.first().copied().unwrap_or(0);
        match code {
            0 => effects.push(SgrEffect::Reset),
            1 => effects.push(SgrEffect::SetFlag(SgrFlags::BOLD)),
            2 => effects.push(SgrEffect::SetFlag(SgrFlags::DIM)),
            3 => effects.push(SgrEffect::SetFlag(SgrFlags::ITALIC)),
            4 => {
                let sub = group.get(1).copied().unwrap_or(1);
                let style = match sub {
                    0 => UnderlineStyle::None,
                    2 => UnderlineStyle::Double,
                    3 => UnderlineStyle::Curly,
                    4 => UnderlineStyle::Dotted,
                    5 => UnderlineStyle::Dashed,
                    _ => UnderlineStyle::Single,
                };
                effects.push(SgrEffect::SetUnderline(style));
            }
            5 => effects.push(SgrEffect::SetFlag(SgrFlags::BLINK)),
            7 => effects.push(SgrEffect::SetFlag(SgrFlags::INVERSE)),
            8 => effects.push(SgrEffect::SetFlag(SgrFlags::HIDDEN)),
            9 => effects.push(SgrEffect::SetFlag(SgrFlags::STRIKETHROUGH)),
            21 => effects.push(SgrEffect::SetUnderline(UnderlineStyle::Double)),
            22 => {
                effects.push(SgrEffect::ClearFlag(SgrFlags::BOLD));
                effects.push(SgrEffect::ClearFlag(SgrFlags::DIM));
            }
            23 => effects.push(SgrEffect::ClearFlag(SgrFlags::ITALIC)),
            24 => effects.push(SgrEffect::SetUnderline(UnderlineStyle::None)),
            25 => effects.push(SgrEffect::ClearFlag(SgrFlags::BLINK)),
            27 => effects.push(SgrEffect::ClearFlag(SgrFlags::INVERSE)),
            28 => effects.push(SgrEffect::ClearFlag(SgrFlags::HIDDEN)),
            29 => effects.push(SgrEffect::ClearFlag(SgrFlags::STRIKETHROUGH)),
            53 => effects.push(SgrEffect::SetFlag(SgrFlags::OVERLINE)),
            55 => effects.push(SgrEffect::ClearFlag(SgrFlags::OVERLINE)),
            30..=37 => effects.push(SgrEffect::SetForeground(Color::Named(code as u8 - 30))),
            38 => {
                let (color, consumed) = decode_extended_color(&seq.params[i..]);
                match color {
                    Some(c) => effects.push(SgrEffect::SetForeground(c)),
                    None => return vec![],
                }
                i += consumed - 1;
            }
            39 => effects.push(SgrEffect::ResetForeground),
            40..=47 => effects.push(SgrEffect::SetBackground(Color::Named(code as u8 - 40))),
            48 => {
                let (color, consumed) = decode_extended_color(&seq.params[i..]);
                match color {
                    Some(c) => effects.push(SgrEffect::SetBackground(c)),
                    None => return vec![],
                }
                i += consumed - 1;
            }
            49 => effects.push(SgrEffect::ResetBackground),
            58 => {
                let (color, consumed) = decode_extended_color(&seq.params[i..]);
                match color {
                    Some(c) => effects.push(SgrEffect::SetUnderlineColor(Some(c))),
                    None => return vec![],
                }
                i += consumed - 1;
            }
            59 => effects.push(SgrEffect::SetUnderlineColor(None)),
            90..=97 => effects.push(SgrEffect::SetForeground(Color::Named(code as u8 - 90 + 8))),
            100..=107 => effects.push(SgrEffect::SetBackground(Color::Named(code as u8 - 100 + 8))),
            _ => {}
        }
        i += 1;
    }
    effects
}

/// Decode `38`/`48`/`58`-style extended color parameters starting at
/// `groups[0]`. Returns the color and how many parameter *groups* were
/// consumed (including the leading selector), supporting both the
/// semicolon-separated legacy form (`38;2;r;g;b`) where each value is its
/// own group, and the colon sub-parameter form (`38:2::r:g:b`) where the
/// whole thing is one group.
fn decode_extended_color(groups: &[Vec<u16>]) -> (Option<Color>, usize) {
    let first = &groups[0];
    if first.len() > 1 {
        // Colon form: everything is in one parameter group.
        return match first.get(1) {
            Some(&2) => {
                let r = *first.get(first.len().saturating_sub(3)).unwrap_or(&0);
                let (r, g, b) = if first.len() >= 6 {
                    (first[3], first[4], first[5])
                } else if first.len() >= 5 {
                    (first[2], first[3], first[4])
                } else {
                    (r, 0, 0)
                };
                (Some(Color::Rgb(r as u8, g as u8, b as u8)), 1)
            }
            Some(&5) => (first.get(2).map(|&n| Color::Indexed(n as u8)), 1),
            _ => (None, 1),
        };
    }

    // Semicolon form: the selector and each channel are separate groups.
    match groups.get(1).and_then(|g| g.first()).copied() {
        Some(2) => {
            let r = groups.get(2).and_then(|g| g.first()).copied().unwrap_or(0);
            let g = groups.get(3).and_then(|g| g.first()).copied().unwrap_or(0);
            let b = groups.get(4).and_then(|g| g.first()).copied().unwrap_or(0);
            (Some(Color::Rgb(r as u8, g as u8, b as u8)), 5)
        }
        Some(5) => {
            let n = groups.get(2).and_then(|g| g.first()).copied().unwrap_or(0);
            (Some(Color::Indexed(n as u8)), 3)
        }
        _ => (None, 1),
    }
}

/// Apply a decoded list of SGR effects to a running attribute set.
pub fn apply_sgr_effects(attrs: &mut SgrAttrs, effects: &[SgrEffect]) {
    for effect in effects {
        match *effect {
            SgrEffect::Reset => attrs.reset(),
            SgrEffect::SetFlag(f) => attrs.flags.insert(f),
            SgrEffect::ClearFlag(f) => attrs.flags.remove(f),
            SgrEffect::SetUnderline(s) => attrs.underline = s,
            SgrEffect::SetForeground(c) => attrs.fg = c,
            SgrEffect::SetBackground(c) => attrs.bg = c,
            SgrEffect::SetUnderlineColor(c) => attrs.underline_color = c,
            SgrEffect::ResetForeground => attrs.fg = Color::Default,
            SgrEffect::ResetBackground => attrs.bg = Color::Default,
        }
    }
}

/// Re-encode the running SGR attribute set as the semicolon-separated
/// parameter list a DECRQSS `m` reply echoes back, in the same order
/// `decode_sgr` would apply them (without the leading CSI or trailing
/// `m`, which the DECRQSS reply framing adds).
#[must_use]
pub fn encode_sgr_params(attrs: &SgrAttrs) -> String {
    let mut parts = vec!["0".to_string()];
    if attrs.flags.contains(SgrFlags::BOLD) {
        parts.push("1".to_string());
    }
    if attrs.flags.contains(SgrFlags::DIM) {
        parts.push("2".to_string());
    }
    if attrs.flags.contains(SgrFlags::ITALIC) {
        parts.push("3".to_string());
    }
    match attrs.underline {
        UnderlineStyle::None => {}
        UnderlineStyle::Single => parts.push("4".to_string()),
        UnderlineStyle::Double => parts.push("4:2".to_string()),
        UnderlineStyle::Curly => parts.push("4:3".to_string()),
        UnderlineStyle::Dotted => parts.push("4:4".to_string()),
        UnderlineStyle::Dashed => parts.push("4:5".to_string()),
    }
    if attrs.flags.contains(SgrFlags::BLINK) {
        parts.push("5".to_string());
    }
    if attrs.flags.contains(SgrFlags::INVERSE) {
        parts.push("7".to_string());
    }
    if attrs.flags.contains(SgrFlags::HIDDEN) {
        parts.push("8".to_string());
    }
    if attrs.flags.contains(SgrFlags::STRIKETHROUGH) {
        parts.push("9".to_string());
    }
    if attrs.flags.contains(SgrFlags::OVERLINE) {
        parts.push("53".to_string());
    }
    match attrs.fg {
        Color::Default => {}
        Color::Named(n) if n < 8 => parts.push((30 + n as u16).to_string()),
        Color::Named(n) => parts.push((90 + (n as u16 - 8)).to_string()),
        Color::Indexed(i) => parts.push(format!("38;5;{i}")),
        Color::Rgb(r, g, b) => parts.push(format!("38;2;{r};{g};{b}")),
    }
    match attrs.bg {
        Color::Default => {}
        Color::Named(n) if n < 8 => parts.push((40 + n as u16).to_string()),
        Color::Named(n) => parts.push((100 + (n as u16 - 8)).to_string()),
        Color::Indexed(i) => parts.push(format!("48;5;{i}")),
        Color::Rgb(r, g, b) => parts.push(format!("48;2;{r};{g};{b}")),
    }
    match attrs.underline_color {
        Some(Color::Indexed(i)) => parts.push(format!("58;5;{i}")),
        Some(Color::Rgb(r, g, b)) => parts.push(format!("58;2;{r};{g};{b}")),
        _ => {}
    }
    parts.join(";")
}

/// Parse an xterm `rgb:RRRR/GGGG/BBBB`, `#RRGGBB`, or `rgbi:r/g/b`-style
/// color spec (the payload format used by OSC 4/10/11/12 and DECRQSS
/// color feedback) into 8-bit RGB.
#[must_use]
pub fn parse_osc_color_spec(spec: &str) -> Option<(u8, u8, u8)> {
    if let Some(hex) = spec.strip_prefix('#') {
        return parse_hex_rgb(hex);
    }
    if let Some(rest) = spec.strip_prefix("rgb:") {
        let mut parts = rest.split('/');
        let r = parse_hex_channel(parts.next()?)?;
        let g = parse_hex_channel(parts.next()?)?;
        let b = parse_hex_channel(parts.next()?)?;
        return Some((r, g, b));
    }
    None
}

fn parse_hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some((r, g, b))
        }
        _ => None,
    }
}

/// Encode an 8-bit RGB triple as the `rgb:RRRR/GGGG/BBBB` form xterm-family
/// terminals reply with to OSC 4/10/11/12/17/19 color queries (each channel
/// byte duplicated to fill the 16-bit field, the inverse of
/// [`parse_osc_color_spec`] reading a 4-digit channel back down to 8 bits).
#[must_use]
pub fn encode_osc_color_spec(r: u8, g: u8, b: u8) -> String {
    format!("rgb:{r:02x}{r:02x}/{g:02x}{g:02x}/{b:02x}{b:02x}")
}

/// Which dynamic or indexed color an OSC 4/10/11/12/17/19 command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSlot {
    /// OSC 4: one entry of the 256-color indexed palette.
    Palette(u8),
    /// OSC 10.
    DefaultForeground,
    /// OSC 11.
    DefaultBackground,
    /// OSC 12.
    CursorColor,
    /// OSC 19.
    HighlightForeground,
    /// OSC 17.
    HighlightBackground,
}

/// A hex channel of 1-4 digits, scaled to 8 bits the way xterm does
/// (it keeps the most-significant byte of whatever precision is given).
fn parse_hex_channel(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(s, 16).ok()?;
    let bits = s.len() as u32 * 4;
    let shift = bits.saturating_sub(8);
    Some(((value >> shift) & 0xFF) as u8)
}

/// Fully classified command ready for `screen.rs` to execute.
///
/// This intentionally stays close to the wire: screen.rs still interprets
/// e.g. `EraseInDisplay(n)`, it just no longer has to re-derive `n` from raw
/// parameter bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Print(char),
    Execute(u8),
    CursorUp(u16),
    CursorDown(u16),
    CursorForward(u16),
    CursorBack(u16),
    CursorNextLine(u16),
    CursorPrevLine(u16),
    CursorHorizontalAbsolute(u16),
    CursorVerticalAbsolute(u16),
    CursorPosition { row: u16, col: u16 },
    CursorPositionHorizontalVertical { row: u16, col: u16 },
    SaveCursor,
    RestoreCursor,
    EraseInDisplay(u16),
    EraseInLine(u16),
    InsertLines(u16),
    DeleteLines(u16),
    InsertChars(u16),
    DeleteChars(u16),
    EraseChars(u16),
    ScrollUp(u16),
    ScrollDown(u16),
    SetScrollRegion { top: u16, bottom: u16 },
    SetLeftRightMargin { left: u16, right: u16 },
    InsertColumns(u16),
    DeleteColumns(u16),
    RepeatLastChar(u16),
    Sgr(Vec<SgrEffect>),
    /// `CSI Pm h`/`CSI Pm l` (SM/RM): one sequence may carry a `;`-separated
    /// list of mode numbers that all share the same leader and value, e.g.
    /// `CSI ?1000;1002;1015;1006h` (a common single-sequence mouse-mode
    /// enable). Each number in `numbers` is applied independently.
    SetMode { numbers: Vec<u16>, private: bool, value: bool },
    RequestMode { number: u16, private: bool },
    SoftReset,
    FullReset,
    DeviceStatusReport(u16),
    DeviceAttributes,
    SetCursorStyle(u16),
    DesignateCharset { slot: u8, set: char },
    LockingShift(u8),
    /// SS2/SS3 (`ESC N`/`ESC O`): shift G2/G3 into GL for the next
    /// printable character only.
    SingleShift(u8),
    /// IND (`ESC D`): move down one row, scrolling at the bottom margin.
    Index,
    /// NEL (`ESC E`): IND followed by a carriage return.
    NextLine,
    /// RI (`ESC M`): move up one row, scrolling at the top margin.
    ReverseIndex,
    /// HTS (`ESC H`): set a tab stop at the cursor column.
    SetTabStop,
    /// TBC (`CSI Pn g`): 0 clears the tab stop at the cursor, 3 clears all.
    TabClear(u16),
    /// DECKPAM/DECKPNM (`ESC =`/`ESC >`): application/numeric keypad mode.
    SetKeypadApplicationMode(bool),
    /// DECBI (`ESC 6`): move cursor back one column, scrolling the margin
    /// region right when already at the left margin.
    BackIndex,
    /// DECFI (`ESC 9`): move cursor forward one column, scrolling the
    /// margin region left when already at the right margin.
    ForwardIndex,
    /// DECALN (`ESC # 8`): fill the screen with `E` for alignment testing.
    ScreenAlignmentTest,
    SetWindowTitle(String),
    SetIconName(String),
    SetColor { slot: ColorSlot, spec: String },
    /// OSC 110/111/112/117/119: restore one dynamic color to its
    /// configuration default (i.e. forget any prior `SetColor` override).
    ResetDynamicColor(ColorSlot),
    /// An OSC number this classifier names explicitly but doesn't model any
    /// effect for (CWD report, log-file path, font change, mouse-cursor
    /// dynamic colors, desktop notification, state dump). Always dispatches
    /// as `Unsupported` rather than falling into the `Unknown`/`Invalid`
    /// bucket reserved for malformed sequences.
    Recognized(u16),
    Hyperlink { id: Option<String>, uri: Option<String> },
    CaptureBuffer { more: bool, id: String, chunk: String },
    SetClipboard { selection: String, payload: String },
    SetMark,
    PromptStart,
    CommandStart,
    CommandExecuted,
    CommandFinished { exit_code: Option<i32> },
    Sixel(Vec<u8>),
    Iterm2Image(String),
    /// DECSASD (`CSI Ps $ }`): select which display cell writes target.
    /// `true` selects the status line, `false` the main screen.
    SelectActiveStatusDisplay(bool),
    /// DECSSDT (`CSI Ps $ ~`): select the status line's content source.
    /// `0` = none, `1` = indicator (host-owned), `2` = host-writable,
    /// gated behind the `displayHostWritableStatusLine` permission.
    SelectStatusLineType(u16),
    /// DECRQSS (`DCS $ q <request> ST`): report the current value of one
    /// setting, identified by the request string's final byte(s).
    RequestStatusString(StatusStringTarget),
    /// DECRQSS for a setting this classifier doesn't recognize: replies
    /// with the DEC STD 070 "invalid request" form (`DCS 0 $ r ST`).
    RequestStatusStringUnsupported,
    Unknown,
}

/// Which setting a DECRQSS request asked about, keyed off the request
/// string's trailing byte(s) (`m`, `"p`, `" q`, `"q`, `r`, `s`, `t`,
/// `$|`, `*|`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStringTarget {
    Sgr,
    DecScl,
    DecScusr,
    DecSca,
    DecStbm,
    DecSlrm,
    DecSlpp,
    DecScpp,
    DecSnls,
}

/// Stateful classifier that turns parser actions into [`Command`]s.
///
/// Holds the small amount of state that spans multiple parser actions: the
/// in-progress DCS/OSC payload.
#[derive(Debug, Default)]
pub struct CommandBuilder {
    dcs_seq: Option<Sequence>,
    dcs_data: Vec<u8>,
}

impl CommandBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one parser action, producing zero or one commands (OSC/DCS
    /// bodies accumulate silently until their terminating action arrives).
    pub fn feed(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::Print(c) => Some(Command::Print(c)),
            Action::Execute(b) => Some(Command::Execute(b)),
            Action::Ignore => None,
            Action::CsiDispatch(seq) => Some(self.classify_csi(&seq)),
            Action::EscDispatch(seq) => Some(self.classify_esc(&seq)),
            Action::Hook(seq) => {
                self.dcs_seq = Some(seq);
                self.dcs_data.clear();
                None
            }
            Action::Put(b) => {
                self.dcs_data.push(b);
                None
            }
            Action::Unhook => {
                let seq = self.dcs_seq.take()?;
                let data = std::mem::take(&mut self.dcs_data);
                Some(self.classify_dcs(&seq, &data))
            }
            Action::OscStart => None,
            Action::OscPut(_) => None,
            Action::OscEnd(data) => Some(classify_osc(&data)),
        }
    }

    fn classify_csi(&self, seq: &Sequence) -> Command {
        let private = seq.leader == Some(b'?');
        match seq.finalizer {
            b'A' => Command::CursorUp(seq.param_or(0, 1)),
            b'B' => Command::CursorDown(seq.param_or(0, 1)),
            b'C' => Command::CursorForward(seq.param_or(0, 1)),
            b'D' => Command::CursorBack(seq.param_or(0, 1)),
            b'E' => Command::CursorNextLine(seq.param_or(0, 1)),
            b'F' => Command::CursorPrevLine(seq.param_or(0, 1)),
            b'G' | b'`' => Command::CursorHorizontalAbsolute(seq.param_or(0, 1)),
            b'd' => Command::CursorVerticalAbsolute(seq.param_or(0, 1)),
            b'H' | b'f' => Command::CursorPosition {
                row: seq.param_or(0, 1),
                col: seq.param_or(1, 1),
            },
            b'J' => Command::EraseInDisplay(seq.param_or(0, 0)),
            b'K' => Command::EraseInLine(seq.param_or(0, 0)),
            b'L' => Command::InsertLines(seq.param_or(0, 1)),
            b'M' => Command::DeleteLines(seq.param_or(0, 1)),
            b'@' => {
                if seq.intermediates == [b'\''] {
                    Command::InsertColumns(seq.param_or(0, 1))
                } else {
                    Command::InsertChars(seq.param_or(0, 1))
                }
            }
            b'P' => Command::DeleteChars(seq.param_or(0, 1)),
            b'X' => Command::EraseChars(seq.param_or(0, 1)),
            b'b' => Command::RepeatLastChar(seq.param_or(0, 1)),
            b'S' => Command::ScrollUp(seq.param_or(0, 1)),
            b'T' => Command::ScrollDown(seq.param_or(0, 1)),
            b'r' => Command::SetScrollRegion {
                top: seq.param_or(0, 1),
                bottom: seq.param_or(1, 0),
            },
            b's' if !private => Command::SaveCursor,
            b'u' if !private && seq.intermediates.is_empty() => Command::RestoreCursor,
            b's' if seq.intermediates == [b'$'] => {
                Command::SetLeftRightMargin {
                    left: seq.param_or(0, 1),
                    right: seq.param_or(1, 0),
                }
            }
            b'~' if seq.intermediates == [b'\''] => Command::DeleteColumns(seq.param_or(0, 1)),
            b'm' => Command::Sgr(decode_sgr(seq)),
            b'h' | b'l' => {
                let value = seq.finalizer == b'h';
                // Every group's leading sub-parameter is a mode number;
                // `;` separates independent mode numbers in SM/RM, unlike
                // `:` which never appears in practice here.
                let numbers: Vec<u16> = seq.params.iter().filter_map(|g| g.first().copied()).collect();
                if numbers.is_empty() {
                    Command::Unknown
                } else {
                    Command::SetMode { numbers, private, value }
                }
            }
            b'g' => Command::TabClear(seq.param_or(0, 0)),
            b'n' => Command::DeviceStatusReport(seq.param_or(0, 0)),
            b'c' => Command::DeviceAttributes,
            b'q' if seq.intermediates == [b' '] => Command::SetCursorStyle(seq.param_or(0, 0)),
            b'p' if seq.intermediates == [b'!'] => Command::SoftReset,
            b'p' if seq.intermediates == [b'$'] => Command::RequestMode {
                number: seq.param_or(0, 0),
                private,
            },
            b'}' if seq.intermediates == [b'$'] => {
                Command::SelectActiveStatusDisplay(seq.param_or(0, 0) == 1)
            }
            b'~' if seq.intermediates == [b'$'] => {
                Command::SelectStatusLineType(seq.param_or(0, 0))
            }
            _ => Command::Unknown,
        }
    }

    fn classify_esc(&self, seq: &Sequence) -> Command {
        match (seq.intermediates.as_slice(), seq.finalizer) {
            ([], b'c') => Command::FullReset,
            ([], b'7') => Command::SaveCursor,
            ([], b'8') => Command::RestoreCursor,
            ([b'('], set) => Command::DesignateCharset { slot: 0, set: set as char },
            ([b')'], set) => Command::DesignateCharset { slot: 1, set: set as char },
            ([b'*'], set) => Command::DesignateCharset { slot: 2, set: set as char },
            ([b'+'], set) => Command::DesignateCharset { slot: 3, set: set as char },
            ([], b'n') => Command::LockingShift(2),
            ([], b'o') => Command::LockingShift(3),
            ([], b'N') => Command::SingleShift(2),
            ([], b'O') => Command::SingleShift(3),
            ([], b'D') => Command::Index,
            ([], b'E') => Command::NextLine,
            ([], b'M') => Command::ReverseIndex,
            ([], b'H') => Command::SetTabStop,
            ([], b'=') => Command::SetKeypadApplicationMode(true),
            ([], b'>') => Command::SetKeypadApplicationMode(false),
            ([], b'6') => Command::BackIndex,
            ([], b'9') => Command::ForwardIndex,
            ([b'#'], b'8') => Command::ScreenAlignmentTest,
            _ => Command::Unknown,
        }
    }

    fn classify_dcs(&self, seq: &Sequence, data: &[u8]) -> Command {
        // DCS 314 ; <id> ; <more-follows> ST <chunk> ST — capture-buffer
        // framing (supplemented feature; not in any upstream terminal, a
        // local convention for paging large buffers back to the guest).
        if seq.param_or(0, 0) == 314 {
            let more = seq.param_or(1, 0) != 0;
            let id = seq.params.get(2).and_then(|g| g.first()).copied().unwrap_or(0);
            return Command::CaptureBuffer {
                more,
                id: id.to_string(),
                chunk: String::from_utf8_lossy(data).into_owned(),
            };
        }
        if seq.intermediates == [b'$'] && seq.finalizer == b'q' {
            return match data {
                b"m" => Command::RequestStatusString(StatusStringTarget::Sgr),
                b"\"p" => Command::RequestStatusString(StatusStringTarget::DecScl),
                b" q" => Command::RequestStatusString(StatusStringTarget::DecScusr),
                b"\"q" => Command::RequestStatusString(StatusStringTarget::DecSca),
                b"r" => Command::RequestStatusString(StatusStringTarget::DecStbm),
                b"s" => Command::RequestStatusString(StatusStringTarget::DecSlrm),
                b"t" => Command::RequestStatusString(StatusStringTarget::DecSlpp),
                b"$|" => Command::RequestStatusString(StatusStringTarget::DecScpp),
                b"*|" => Command::RequestStatusString(StatusStringTarget::DecSnls),
                // Recognized DECRQSS shape, unmodeled setting: Unsupported,
                // not Invalid, per the Ok/Unsupported/Invalid convention
                // used throughout this classifier.
                _ => Command::RequestStatusStringUnsupported,
            };
        }
        if seq.intermediates.is_empty() && seq.finalizer == b'q' {
            return Command::Sixel(data.to_vec());
        }
        Command::Unknown
    }
}

/// Classify a completed OSC payload (the text between `ESC ]` and its
/// terminator, not including either).
fn classify_osc(data: &str) -> Command {
    let mut parts = data.splitn(2, ';');
    let Some(ps) = parts.next() else {
        return Command::Unknown;
    };
    let rest = parts.next().unwrap_or("");
    match ps {
        "0" | "2" => Command::SetWindowTitle(rest.to_string()),
        "1" => Command::SetIconName(rest.to_string()),
        "4" => {
            let mut cp = rest.splitn(2, ';');
            let idx = cp.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            let spec = cp.next().unwrap_or("").to_string();
            Command::SetColor { slot: ColorSlot::Palette(idx), spec }
        }
        "10" => Command::SetColor { slot: ColorSlot::DefaultForeground, spec: rest.to_string() },
        "11" => Command::SetColor { slot: ColorSlot::DefaultBackground, spec: rest.to_string() },
        "12" => Command::SetColor { slot: ColorSlot::CursorColor, spec: rest.to_string() },
        "17" => Command::SetColor { slot: ColorSlot::HighlightBackground, spec: rest.to_string() },
        "19" => Command::SetColor { slot: ColorSlot::HighlightForeground, spec: rest.to_string() },
        "110" => Command::ResetDynamicColor(ColorSlot::DefaultForeground),
        "111" => Command::ResetDynamicColor(ColorSlot::DefaultBackground),
        "112" => Command::ResetDynamicColor(ColorSlot::CursorColor),
        "117" => Command::ResetDynamicColor(ColorSlot::HighlightBackground),
        "119" => Command::ResetDynamicColor(ColorSlot::HighlightForeground),
        "7" | "46" | "50" | "113" | "114" | "777" | "888" => {
            Command::Recognized(ps.parse().unwrap_or(0))
        }
        "8" => {
            let mut hp = rest.splitn(2, ';');
            let params = hp.next().unwrap_or("");
            let uri = hp.next().unwrap_or("");
            let id = params
                .split(':')
                .find_map(|kv| kv.strip_prefix("id="))
                .map(str::to_string);
            if uri.is_empty() {
                Command::Hyperlink { id, uri: None }
            } else {
                Command::Hyperlink { id, uri: Some(uri.to_string()) }
            }
        }
        "52" => {
            let mut cp = rest.splitn(2, ';');
            let selection = cp.next().unwrap_or("").to_string();
            let payload = cp.next().unwrap_or("").to_string();
            Command::SetClipboard { selection, payload }
        }
        "133" => match rest.chars().next() {
            Some('A') => Command::PromptStart,
            Some('B') => Command::CommandStart,
            Some('C') => Command::CommandExecuted,
            Some('D') => {
                let code = rest[1..].trim_start_matches(';').parse::<i32>().ok();
                Command::CommandFinished { exit_code: code }
            }
            _ => Command::Unknown,
        },
        "1337" if rest.starts_with("File=") => Command::Iterm2Image(rest.to_string()),
        _ => Command::Unknown,
    }
}

/// Convenience: run a byte stream through [`Parser`] and [`CommandBuilder`]
/// together, returning the classified commands in order.
#[must_use]
pub fn commands_for(bytes: &[u8]) -> Vec<Command> {
    let mut parser = Parser::new();
    let mut builder = CommandBuilder::new();
    let mut out = Vec::new();
    for action in parser.feed(bytes) {
        if let Some(cmd) = builder.feed(action) {
            out.push(cmd);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgr_bold_and_color_decode() {
        let cmds = commands_for(b"\x1b[1;31m");
        assert_eq!(
            cmds,
            vec![Command::Sgr(vec![
                SgrEffect::SetFlag(SgrFlags::BOLD),
                SgrEffect::SetForeground(Color::Named(1)),
            ])]
        );
    }

    #[test]
    fn sgr_truecolor_semicolon_form() {
        let cmds = commands_for(b"\x1b[38;2;10;20;30m");
        assert_eq!(
            cmds,
            vec![Command::Sgr(vec![SgrEffect::SetForeground(Color::Rgb(10, 20, 30))])]
        );
    }

    #[test]
    fn sgr_256_color_colon_form() {
        let cmds = commands_for(b"\x1b[38:5:200m");
        assert_eq!(
            cmds,
            vec![Command::Sgr(vec![SgrEffect::SetForeground(Color::Indexed(200))])]
        );
    }

    #[test]
    fn sgr_reset_with_no_params() {
        let cmds = commands_for(b"\x1b[m");
        assert_eq!(cmds, vec![Command::Sgr(vec![SgrEffect::Reset])]);
    }

    #[test]
    fn apply_sgr_effects_overrides_in_order() {
        let mut attrs = SgrAttrs::default();
        apply_sgr_effects(
            &mut attrs,
            &[
                SgrEffect::SetForeground(Color::Named(1)),
                SgrEffect::SetForeground(Color::Rgb(1, 2, 3)),
            ],
        );
        assert_eq!(attrs.fg, Color::Rgb(1, 2, 3));
    }

    #[test]
    fn cursor_position_defaults_to_one_one() {
        let cmds = commands_for(b"\x1b[H");
        assert_eq!(cmds, vec![Command::CursorPosition { row: 1, col: 1 }]);
    }

    #[test]
    fn dec_private_mode_set() {
        let cmds = commands_for(b"\x1b[?1049h");
        assert_eq!(
            cmds,
            vec![Command::SetMode { numbers: vec![1049], private: true, value: true }]
        );
    }

    #[test]
    fn dec_private_mode_set_multiple_in_one_sequence() {
        // A single SM sequence may list several mode numbers separated by
        // `;` (e.g. the common `\x1b[?1000;1002;1015;1006h` mouse-mode
        // enable); every number must be preserved, not just the first.
        let cmds = commands_for(b"\x1b[?1000;1002;1015;1006h");
        assert_eq!(
            cmds,
            vec![Command::SetMode { numbers: vec![1000, 1002, 1015, 1006], private: true, value: true }]
        );
    }

    #[test]
    fn osc_window_title() {
        let cmds = commands_for(b"\x1b]0;hello world\x07");
        assert_eq!(cmds, vec![Command::SetWindowTitle("hello world".to_string())]);
    }

    #[test]
    fn osc_hyperlink_with_id() {
        let cmds = commands_for(b"\x1b]8;id=foo;https://example.com\x1b\\");
        assert_eq!(
            cmds,
            vec![Command::Hyperlink {
                id: Some("foo".to_string()),
                uri: Some("https://example.com".to_string()),
            }]
        );
    }

    #[test]
    fn osc_hyperlink_reset() {
        let cmds = commands_for(b"\x1b]8;;\x1b\\");
        assert_eq!(cmds, vec![Command::Hyperlink { id: None, uri: None }]);
    }

    #[test]
    fn osc_133_prompt_markers() {
        let cmds = commands_for(b"\x1b]133;A\x07\x1b]133;D;0\x07");
        assert_eq!(
            cmds,
            vec![
                Command::PromptStart,
                Command::CommandFinished { exit_code: Some(0) },
            ]
        );
    }

    #[test]
    fn osc_4_classifies_palette_index_and_spec() {
        let cmds = commands_for(b"\x1b]4;17;?\x07");
        assert_eq!(cmds, vec![Command::SetColor { slot: ColorSlot::Palette(17), spec: "?".to_string() }]);
    }

    #[test]
    fn osc_10_11_12_classify_dynamic_colors() {
        assert_eq!(
            commands_for(b"\x1b]10;?\x07"),
            vec![Command::SetColor { slot: ColorSlot::DefaultForeground, spec: "?".to_string() }]
        );
        assert_eq!(
            commands_for(b"\x1b]11;#000000\x07"),
            vec![Command::SetColor { slot: ColorSlot::DefaultBackground, spec: "#000000".to_string() }]
        );
        assert_eq!(
            commands_for(b"\x1b]12;?\x07"),
            vec![Command::SetColor { slot: ColorSlot::CursorColor, spec: "?".to_string() }]
        );
    }

    #[test]
    fn osc_110_119_classify_as_dynamic_color_reset() {
        assert_eq!(commands_for(b"\x1b]110;\x07"), vec![Command::ResetDynamicColor(ColorSlot::DefaultForeground)]);
        assert_eq!(commands_for(b"\x1b]119;\x07"), vec![Command::ResetDynamicColor(ColorSlot::HighlightForeground)]);
    }

    #[test]
    fn osc_named_but_unimplemented_codes_classify_as_recognized_not_unknown() {
        for code in ["7", "46", "50", "777", "888"] {
            let bytes = format!("\x1b]{code};ignored\x07").into_bytes();
            assert_eq!(commands_for(&bytes), vec![Command::Recognized(code.parse().unwrap())]);
        }
    }

    #[test]
    fn osc_genuinely_unknown_number_stays_unknown() {
        let cmds = commands_for(b"\x1b]9999;whatever\x07");
        assert_eq!(cmds, vec![Command::Unknown]);
    }

    #[test]
    fn sixel_dcs_classifies_with_payload() {
        let cmds = commands_for(b"\x1bP0;0;0q\"1;1;2;2#0;2;0;0;0\x1b\\");
        assert_eq!(cmds, vec![Command::Sixel(b"\"1;1;2;2#0;2;0;0;0".to_vec())]);
    }

    #[test]
    fn dcs_capture_buffer_framing() {
        let cmds = commands_for(b"\x1bP314;7;1\x1b\\chunk-data\x1b\\");
        assert_eq!(
            cmds,
            vec![Command::CaptureBuffer {
                more: true,
                id: "1".to_string(),
                chunk: "chunk-data".to_string(),
            }]
        );
    }

    #[test]
    fn hex_color_spec_parses() {
        assert_eq!(parse_osc_color_spec("#ff0080"), Some((0xff, 0x00, 0x80)));
        assert_eq!(parse_osc_color_spec("rgb:ffff/0000/8080"), Some((0xff, 0x00, 0x80)));
    }

    #[test]
    fn decrqm_request_mode_classifies() {
        let cmds = commands_for(b"\x1b[?7$p");
        assert_eq!(cmds, vec![Command::RequestMode { number: 7, private: true }]);
    }

    #[test]
    fn unrecognized_csi_final_is_unknown() {
        let cmds = commands_for(b"\x1b[5y");
        assert_eq!(cmds, vec![Command::Unknown]);
    }

    #[test]
    fn esc_singles_classify() {
        assert_eq!(commands_for(b"\x1bD"), vec![Command::Index]);
        assert_eq!(commands_for(b"\x1bE"), vec![Command::NextLine]);
        assert_eq!(commands_for(b"\x1bH"), vec![Command::SetTabStop]);
        assert_eq!(commands_for(b"\x1bM"), vec![Command::ReverseIndex]);
        assert_eq!(commands_for(b"\x1bN"), vec![Command::SingleShift(2)]);
        assert_eq!(commands_for(b"\x1bO"), vec![Command::SingleShift(3)]);
        assert_eq!(commands_for(b"\x1b="), vec![Command::SetKeypadApplicationMode(true)]);
        assert_eq!(commands_for(b"\x1b>"), vec![Command::SetKeypadApplicationMode(false)]);
        assert_eq!(commands_for(b"\x1b6"), vec![Command::BackIndex]);
        assert_eq!(commands_for(b"\x1b9"), vec![Command::ForwardIndex]);
        assert_eq!(commands_for(b"\x1b#8"), vec![Command::ScreenAlignmentTest]);
    }

    #[test]
    fn decrqss_classifies_known_requests() {
        assert_eq!(
            commands_for(b"\x1bP$qm\x1b\\"),
            vec![Command::RequestStatusString(StatusStringTarget::Sgr)]
        );
        assert_eq!(
            commands_for(b"\x1bP$qr\x1b\\"),
            vec![Command::RequestStatusString(StatusStringTarget::DecStbm)]
        );
        assert_eq!(
            commands_for(b"\x1bP$q$|\x1b\\"),
            vec![Command::RequestStatusString(StatusStringTarget::DecScpp)]
        );
    }

    #[test]
    fn decrqss_unrecognized_setting_is_unsupported() {
        assert_eq!(
            commands_for(b"\x1bP$qZ\x1b\\"),
            vec![Command::RequestStatusStringUnsupported]
        );
    }

    #[test]
    fn encode_sgr_params_round_trips_bold_and_color() {
        let mut attrs = SgrAttrs::default();
        apply_sgr_effects(
            &mut attrs,
            &[SgrEffect::SetFlag(SgrFlags::BOLD), SgrEffect::SetForeground(Color::Named(1))],
        );
        assert_eq!(encode_sgr_params(&attrs), "0;1;31");
    }

    #[test]
    fn tab_clear_classifies() {
        assert_eq!(commands_for(b"\x1b[g"), vec![Command::TabClear(0)]);
        assert_eq!(commands_for(b"\x1b[3g"), vec![Command::TabClear(3)]);
    }
}
