//! Screen engine: the stateful aggregate that executes classified
//! [`crate::commands::Command`]s against a [`Grid`] + [`Cursor`] +
//! [`Modes`] + [`Scrollback`], and the top-level [`Terminal`] that owns a
//! primary/alternate pair of these plus the shared [`Parser`]/
//! [`CommandBuilder`] pipeline, image pool, and selection/search state.
//!
//! This is where the parser's and command builder's purely syntactic
//! output acquires meaning: `CSI 2 J` becomes "blank the whole grid with
//! the current background colour", `OSC 0` becomes "the window title
//! changed", and so on.

use std::collections::HashMap;

use crate::cell::{Cell, Color, HyperlinkId, HyperlinkRegistry, SgrAttrs};
use crate::commands::{self, Command, CommandBuilder, ColorSlot, StatusStringTarget};
pub use crate::commands::DispatchOutcome;
use crate::cursor::{Cursor, SavedCursor};
use crate::grid::Grid;
use crate::image::{
    self, ImageAlignment, ImageFormat, ImagePool, ImageResizePolicy, DEFAULT_CELL_PIXEL_HEIGHT,
    DEFAULT_CELL_PIXEL_WIDTH,
};
use crate::modes::Modes;
use crate::parser::Parser;
use crate::patch::DirtyTracker;
use crate::scrollback::{Scrollback, ScrollbackCapacity};
use crate::selection::{BufferPos, Selection};

/// Host-facing callbacks for events that don't fit the grid/cursor model:
/// the bell, title changes, clipboard writes, and guest-requested replies
/// that must be written back to the PTY. All methods default to no-ops so
/// callers only override what they care about.
pub trait ScreenEvents {
    fn on_bell(&mut self) {}
    fn on_title_changed(&mut self, _title: &str) {}
    fn on_icon_name_changed(&mut self, _name: &str) {}
    /// `selection` is the OSC 52 selection-buffer name (`c`, `p`, ...);
    /// `payload` is still base64-encoded, as delivered on the wire.
    fn on_clipboard_write(&mut self, _selection: &str, _payload: &str) {}
    fn on_capture_chunk(&mut self, _id: &str, _more: bool, _chunk: &str) {}
    /// Bytes that must be written back to the guest (DSR/DA/DECRQM
    /// responses). Order matches dispatch order.
    fn on_reply(&mut self, _bytes: &[u8]) {}
    /// Spec §6.4: the `displayHostWritableStatusLine` permission, checked
    /// when the guest requests `DECSSDT` type 2 (host-writable). Defaults
    /// to allowed; a host wires its `Ask`/`Deny` policy here.
    fn on_host_writable_status_line_requested(&mut self) -> bool {
        true
    }
    /// OSC 133 `SetMark` (shell-integration prompt mark), as a combined
    /// scrollback+viewport position so it survives further scrollback
    /// growth; consumed by `CopyPreviousMarkRange`, which needs a mark to
    /// copy back to.
    fn on_mark(&mut self, _pos: BufferPos) {}
}

/// A no-op event sink, useful for tests and headless replay.
#[derive(Debug, Default)]
pub struct NullEvents;
impl ScreenEvents for NullEvents {}

/// Scroll-region margins. `left`/`right` only constrain scrolling and
/// column insert/delete when [`crate::modes::DecModes::left_right_margin`]
/// is set (DECSLRM, mode 69); otherwise the full row width is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

impl Margins {
    fn full(cols: u16, rows: u16) -> Self {
        Self {
            top: 0,
            bottom: rows,
            left: 0,
            right: cols,
        }
    }
}

/// One of the four G0-G3 charset slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSlot {
    Ascii,
    Uk,
    DecSpecialGraphics,
}

impl CharsetSlot {
    fn from_final(set: char) -> Self {
        match set {
            'A' => Self::Uk,
            '0' => Self::DecSpecialGraphics,
            _ => Self::Ascii,
        }
    }

    /// Translate one printable character through this charset.
    fn translate(self, ch: char) -> char {
        match self {
            Self::Ascii => ch,
            Self::Uk => if ch == '#' { '£' } else { ch },
            Self::DecSpecialGraphics => dec_special_graphics(ch),
        }
    }
}

/// VT100 DEC Special Graphics line-drawing set, 0x60-0x7e.
fn dec_special_graphics(ch: char) -> char {
    match ch {
        '`' => '◆',
        'a' => '▒',
        'b' => '\u{2409}',
        'c' => '\u{240c}',
        'd' => '\u{240d}',
        'e' => '\u{240a}',
        'f' => '°',
        'g' => '±',
        'h' => '\u{2424}',
        'i' => '\u{240b}',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        other => other,
    }
}

/// G0-G3 designations plus the active GL/GR slot and a pending single
/// shift (SS2/SS3, consumed by the next printable character).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharsetState {
    g: [CharsetSlot; 4],
    gl: u8,
    single_shift: Option<u8>,
}

impl Default for CharsetState {
    fn default() -> Self {
        Self {
            g: [CharsetSlot::Ascii; 4],
            gl: 0,
            single_shift: None,
        }
    }
}

impl CharsetState {
    fn designate(&mut self, slot: u8, set: char) {
        if let Some(entry) = self.g.get_mut(slot as usize) {
            *entry = CharsetSlot::from_final(set);
        }
    }

    fn locking_shift(&mut self, slot: u8) {
        self.gl = slot.min(3);
    }

    fn single_shift(&mut self, slot: u8) {
        self.single_shift = Some(slot.min(3));
    }

    /// Translate one printable character, consuming any pending single
    /// shift in the process.
    fn translate(&mut self, ch: char) -> char {
        let slot = self.single_shift.take().unwrap_or(self.gl);
        self.g[slot as usize].translate(ch)
    }
}

/// The state of one screen buffer (primary or alternate): grid, cursor,
/// modes, margins, charsets, tab stops, and the per-screen hyperlink
/// registry. The alternate screen has no scrollback: switching to it
/// does not touch history.
#[derive(Debug)]
pub struct ScreenState {
    pub grid: Grid,
    pub scrollback: Option<Scrollback>,
    pub cursor: Cursor,
    saved_cursor: Option<SavedCursor>,
    pub modes: Modes,
    pub margins: Margins,
    pub charsets: CharsetState,
    pub attrs: SgrAttrs,
    pub hyperlinks: HyperlinkRegistry,
    pub dirty: DirtyTracker,
    tabstops: Vec<bool>,
    last_printed: Option<char>,
    current_hyperlink: HyperlinkId,
}

impl ScreenState {
    fn new(cols: u16, rows: u16, scrollback: Option<Scrollback>) -> Self {
        Self {
            grid: Grid::new(cols, rows),
            scrollback,
            cursor: Cursor::new(),
            saved_cursor: None,
            modes: Modes::new(),
            margins: Margins::full(cols, rows),
            charsets: CharsetState::default(),
            attrs: SgrAttrs::default(),
            hyperlinks: HyperlinkRegistry::new(),
            dirty: DirtyTracker::new(rows),
            tabstops: default_tabstops(cols),
            last_printed: None,
            current_hyperlink: 0,
        }
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        let cursor_row = self.cursor.row;
        let new_cursor_row = match self.scrollback.as_mut() {
            Some(sb) => self.grid.resize_with_scrollback(cols, rows, cursor_row, sb),
            None => {
                self.grid.resize(cols, rows);
                cursor_row.min(rows.saturating_sub(1))
            }
        };
        self.cursor.row = new_cursor_row;
        self.cursor.clamp(cols, rows);
        self.margins = Margins::full(cols, rows);
        self.tabstops = default_tabstops(cols);
        self.dirty.resize(rows);
    }

    /// Effective left column a cursor motion/scroll may not cross, given
    /// whether DECSLRM is engaged.
    fn left_margin(&self) -> u16 {
        if self.modes.dec.left_right_margin {
            self.margins.left
        } else {
            0
        }
    }

    fn right_margin(&self) -> u16 {
        if self.modes.dec.left_right_margin {
            self.margins.right
        } else {
            self.grid.cols()
        }
    }

    fn top_margin(&self) -> u16 {
        self.margins.top
    }

    fn bottom_margin(&self) -> u16 {
        self.margins.bottom
    }

    fn bg(&self) -> Color {
        self.attrs.bg
    }

    fn next_tabstop(&self, col: u16) -> u16 {
        let cols = self.grid.cols();
        for c in (col + 1)..cols {
            if self.tabstops.get(c as usize).copied().unwrap_or(false) {
                return c;
            }
        }
        cols.saturating_sub(1)
    }

    fn set_tabstop_here(&mut self) {
        if let Some(slot) = self.tabstops.get_mut(self.cursor.col as usize) {
            *slot = true;
        }
    }

    fn clear_tabstop_here(&mut self) {
        if let Some(slot) = self.tabstops.get_mut(self.cursor.col as usize) {
            *slot = false;
        }
    }

    fn clear_all_tabstops(&mut self) {
        self.tabstops.fill(false);
    }

    /// IND/LF semantics: move down one row, scrolling the margin region
    /// up (into scrollback, if attached and the scroll spans the full
    /// row width) when already at the bottom margin.
    fn index(&mut self) {
        let bottom = self.bottom_margin().min(self.grid.rows());
        let top = self.top_margin();
        if self.cursor.row + 1 < bottom {
            self.cursor.row += 1;
            return;
        }
        let bg = self.bg();
        let (left, right) = (self.left_margin(), self.right_margin());
        if left == 0 && right == self.grid.cols() {
            match self.scrollback.as_mut() {
                Some(sb) => self.grid.scroll_up_into(top, bottom, 1, sb, bg),
                None => self.grid.scroll_up(top, bottom, 1, bg),
            }
        } else {
            self.grid.scroll_up_region(top, bottom, left, right, 1, bg);
        }
    }

    /// RI: move up one row, scrolling down at the top margin.
    fn reverse_index(&mut self) {
        let top = self.top_margin();
        if self.cursor.row > top {
            self.cursor.row -= 1;
            return;
        }
        let bottom = self.bottom_margin().min(self.grid.rows());
        let bg = self.bg();
        let (left, right) = (self.left_margin(), self.right_margin());
        if left == 0 && right == self.grid.cols() {
            match self.scrollback.as_mut() {
                Some(sb) => self.grid.scroll_down_from(top, bottom, 1, sb, bg),
                None => self.grid.scroll_down(top, bottom, 1, bg),
            }
        } else {
            self.grid.scroll_down_region(top, bottom, left, right, 1, bg);
        }
    }

    fn carriage_return(&mut self) {
        self.cursor.col = self.left_margin();
        self.cursor.set_pending_wrap(false);
    }

    /// Print one already-translated character, handling auto-wrap,
    /// insert mode, and wide-char placement.
    fn print(&mut self, ch: char) {
        let ch = self.charsets.translate(ch);
        let width = Cell::display_width(ch);
        if width == 0 {
            // Combining mark: attach to the previously written cell.
            let row = self.cursor.row;
            let col = self.cursor.col.saturating_sub(1);
            if let Some(cell) = self.grid.cell_mut(row, col) {
                cell.push_combining(ch);
            }
            return;
        }

        let right = self.right_margin();
        if self.cursor.pending_wrap() && self.modes.dec.autowrap {
            self.carriage_return_soft();
            self.index();
        }

        if self.cursor.col + u16::from(width) > right {
            if self.modes.dec.autowrap {
                self.carriage_return_soft();
                self.index();
            } else {
                self.cursor.col = right.saturating_sub(u16::from(width));
            }
        }

        if self.modes.ansi.insert {
            let bg = self.bg();
            self.grid.insert_chars(self.cursor.row, self.cursor.col, width as u16, bg);
        }

        if width == 2 {
            self.grid.write_wide_char(self.cursor.row, self.cursor.col, ch, self.attrs);
        } else {
            self.grid.write_printable(self.cursor.row, self.cursor.col, ch, self.attrs);
        }
        if self.current_hyperlink != 0 {
            if let Some(cell) = self.grid.cell_mut(self.cursor.row, self.cursor.col) {
                cell.hyperlink = self.current_hyperlink;
            }
            if width == 2 {
                if let Some(cont) = self.grid.cell_mut(self.cursor.row, self.cursor.col + 1) {
                    cont.hyperlink = self.current_hyperlink;
                }
            }
        }
        self.dirty.mark_range(self.cursor.row, self.cursor.col, self.cursor.col + u16::from(width));
        self.last_printed = Some(ch);

        let advanced = self.cursor.col + u16::from(width);
        if advanced >= right {
            self.cursor.col = right.saturating_sub(1);
            self.cursor.set_pending_wrap(true);
        } else {
            self.cursor.col = advanced;
            self.cursor.set_pending_wrap(false);
        }
    }

    /// Like [`Self::carriage_return`] but does not clear pending-wrap,
    /// since the caller (auto-wrap in `print`) immediately follows with
    /// `index()`, which does the real cursor move.
    fn carriage_return_soft(&mut self) {
        self.cursor.col = self.left_margin();
    }
}

fn default_tabstops(cols: u16) -> Vec<bool> {
    (0..cols).map(|c| c != 0 && c % 8 == 0).collect()
}

/// Outcome of one `Terminal::dispatch` call paired with any bytes that
/// must be written back to the guest.
#[derive(Debug, Default)]
pub struct DispatchResult {
    pub outcome: DispatchOutcome,
    pub reply: Option<Vec<u8>>,
}

impl DispatchResult {
    fn ok() -> Self {
        Self { outcome: DispatchOutcome::Ok, reply: None }
    }

    fn unsupported() -> Self {
        Self { outcome: DispatchOutcome::Unsupported, reply: None }
    }

    fn invalid() -> Self {
        Self { outcome: DispatchOutcome::Invalid, reply: None }
    }

    fn with_reply(reply: Vec<u8>) -> Self {
        Self { outcome: DispatchOutcome::Ok, reply: Some(reply) }
    }
}

/// Guest-configurable color overrides (OSC 4 indexed palette entries, plus
/// the OSC 10/11/12/17/19 dynamic default-foreground/background/cursor/
/// highlight colors). Unset entries fall back to whatever the frontend's
/// own color table supplies; `ResetDynamicColor` puts an entry back to
/// unset rather than to any particular color this crate would have to own.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    pub indexed: HashMap<u8, (u8, u8, u8)>,
    pub default_foreground: Option<(u8, u8, u8)>,
    pub default_background: Option<(u8, u8, u8)>,
    pub cursor_color: Option<(u8, u8, u8)>,
    pub highlight_foreground: Option<(u8, u8, u8)>,
    pub highlight_background: Option<(u8, u8, u8)>,
}

impl Palette {
    fn get(&self, slot: ColorSlot) -> Option<(u8, u8, u8)> {
        match slot {
            ColorSlot::Palette(idx) => self.indexed.get(&idx).copied(),
            ColorSlot::DefaultForeground => self.default_foreground,
            ColorSlot::DefaultBackground => self.default_background,
            ColorSlot::CursorColor => self.cursor_color,
            ColorSlot::HighlightForeground => self.highlight_foreground,
            ColorSlot::HighlightBackground => self.highlight_background,
        }
    }

    fn set(&mut self, slot: ColorSlot, rgb: (u8, u8, u8)) {
        match slot {
            ColorSlot::Palette(idx) => {
                self.indexed.insert(idx, rgb);
            }
            ColorSlot::DefaultForeground => self.default_foreground = Some(rgb),
            ColorSlot::DefaultBackground => self.default_background = Some(rgb),
            ColorSlot::CursorColor => self.cursor_color = Some(rgb),
            ColorSlot::HighlightForeground => self.highlight_foreground = Some(rgb),
            ColorSlot::HighlightBackground => self.highlight_background = Some(rgb),
        }
    }

    fn reset(&mut self, slot: ColorSlot) {
        match slot {
            ColorSlot::Palette(idx) => {
                self.indexed.remove(&idx);
            }
            ColorSlot::DefaultForeground => self.default_foreground = None,
            ColorSlot::DefaultBackground => self.default_background = None,
            ColorSlot::CursorColor => self.cursor_color = None,
            ColorSlot::HighlightForeground => self.highlight_foreground = None,
            ColorSlot::HighlightBackground => self.highlight_background = None,
        }
    }

    /// The OSC number a reply naming this slot is framed under (its own
    /// number for a set/query reply; `SetColor`'s classifier already keyed
    /// indexed-palette replies on the raw index rather than this number).
    fn reply_prefix(slot: ColorSlot) -> String {
        match slot {
            ColorSlot::Palette(idx) => format!("4;{idx}"),
            ColorSlot::DefaultForeground => "10".to_string(),
            ColorSlot::DefaultBackground => "11".to_string(),
            ColorSlot::CursorColor => "12".to_string(),
            ColorSlot::HighlightForeground => "19".to_string(),
            ColorSlot::HighlightBackground => "17".to_string(),
        }
    }
}

/// Incremental search state: a live query plus the last match location
/// in the combined scrollback+viewport buffer.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub last_match: Option<BufferPos>,
}

/// What the one-row status line currently shows, selected by DECSSDT.
/// Some VT implementations model this as a `Screen<StatusDisplayType>`
/// specialization; here it collapses to a tag on a single extra
/// one-row [`ScreenState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusDisplay {
    #[default]
    None,
    Indicator,
    HostWritable,
}

/// The full terminal: primary/alternate screen pair, the shared VT
/// parser + command classifier, the image pool, and selection/search
/// state that survives screen switches.
pub struct Terminal {
    parser: Parser,
    builder: CommandBuilder,
    primary: ScreenState,
    alternate: ScreenState,
    alt_active: bool,
    pub images: ImagePool,
    pub palette: Palette,
    pub selection: Option<Selection>,
    pub search: SearchState,
    pub title: String,
    pub icon_name: String,
    pub status_display: StatusDisplay,
    pub status_line: ScreenState,
    active_status_display: bool,
}

impl Terminal {
    #[must_use]
    pub fn new(cols: u16, rows: u16, scrollback_capacity: usize) -> Self {
        Self {
            parser: Parser::new(),
            builder: CommandBuilder::new(),
            primary: ScreenState::new(cols, rows, Some(Scrollback::new(scrollback_capacity))),
            alternate: ScreenState::new(cols, rows, None),
            alt_active: false,
            images: ImagePool::new(256),
            palette: Palette::default(),
            selection: None,
            search: SearchState::default(),
            title: String::new(),
            icon_name: String::new(),
            status_display: StatusDisplay::None,
            status_line: ScreenState::new(cols, 1, None),
            active_status_display: false,
        }
    }

    #[must_use]
    pub fn with_unbounded_scrollback(cols: u16, rows: u16) -> Self {
        let mut term = Self::new(cols, rows, 0);
        term.primary.scrollback = Some(Scrollback::unbounded());
        term
    }

    #[must_use]
    pub fn active(&self) -> &ScreenState {
        if self.active_status_display {
            &self.status_line
        } else if self.alt_active {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn active_mut(&mut self) -> &mut ScreenState {
        if self.active_status_display {
            &mut self.status_line
        } else if self.alt_active {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    /// Like [`Self::active_mut`] paired with the image pool, borrowed
    /// disjointly so callers can place fragments into cells while also
    /// registering/releasing them in the pool.
    fn active_screen_and_images(&mut self) -> (&mut ScreenState, &mut ImagePool) {
        let screen = if self.active_status_display {
            &mut self.status_line
        } else if self.alt_active {
            &mut self.alternate
        } else {
            &mut self.primary
        };
        (screen, &mut self.images)
    }

    #[must_use]
    pub fn is_alt_screen(&self) -> bool {
        self.alt_active
    }

    /// Directly place the active screen's cursor, clamped to bounds.
    /// For host-driven restoration (e.g. a vi-mode host restoring the real
    /// cursor on leaving normal mode) rather than guest-originated motion —
    /// bypasses margins and origin mode, unlike `CursorPosition` dispatch.
    pub fn set_cursor_position(&mut self, row: u16, col: u16) {
        let screen = self.active_mut();
        screen.cursor.move_to(row, col);
        let (cols, rows) = (screen.grid.cols(), screen.grid.rows());
        screen.cursor.clamp(cols, rows);
    }

    /// Number of scrollback lines above the active viewport, i.e. the
    /// combined-buffer index of viewport row 0.
    #[must_use]
    pub fn viewport_top(&self) -> u32 {
        self.active().scrollback.as_ref().map_or(0, |sb| sb.len() as u32)
    }

    /// Drop all scrollback history on the active screen. `RIS`/`DECSTR`
    /// leave scrollback alone by design, so a host-facing "clear history"
    /// action needs this alongside a full/soft reset rather than as part
    /// of one.
    pub fn clear_scrollback(&mut self) {
        if let Some(sb) = self.active_mut().scrollback.as_mut() {
            sb.clear();
        }
    }

    /// Declare a DEC mode number frozen on both screens: a configuration-time
    /// override that ignores any later SM/RM attempt to change it.
    pub fn freeze_mode(&mut self, number: u16) {
        self.primary.modes.freeze(number);
        self.alternate.modes.freeze(number);
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.primary.resize(cols, rows);
        self.alternate.resize(cols, rows);
        self.status_line.resize(cols, 1);
    }

    /// Feed raw guest bytes through the parser and command classifier,
    /// applying every resulting command to the active screen.
    pub fn feed(&mut self, bytes: &[u8], events: &mut dyn ScreenEvents) {
        let actions = self.parser.feed(bytes);
        for action in actions {
            if let Some(cmd) = self.builder.feed(action) {
                let _ = self.dispatch(cmd, events);
            }
        }
    }

    /// Dispatch one already-classified command. Exposed separately from
    /// [`Self::feed`] so callers that already have a `Command` (e.g.
    /// replaying a capture buffer) don't need to re-encode it to bytes.
    pub fn dispatch(&mut self, cmd: Command, events: &mut dyn ScreenEvents) -> DispatchResult {
        #[cfg(feature = "tracing")]
        let cmd_debug = format!("{cmd:?}");
        let result = self.dispatch_inner(cmd, events);
        #[cfg(feature = "tracing")]
        match result.outcome {
            DispatchOutcome::Invalid => tracing::warn!(cmd = %cmd_debug, "invalid command"),
            DispatchOutcome::Unsupported => tracing::debug!(cmd = %cmd_debug, "unsupported command"),
            DispatchOutcome::Ok => tracing::trace!(cmd = %cmd_debug, "dispatched command"),
        }
        result
    }

    fn dispatch_inner(&mut self, cmd: Command, events: &mut dyn ScreenEvents) -> DispatchResult {
        match cmd {
            Command::Print(ch) => {
                self.active_mut().print(ch);
                DispatchResult::ok()
            }
            Command::Execute(b) => self.execute(b, events),
            Command::CursorUp(n) => self.move_cursor(0, -(n as i32)),
            Command::CursorDown(n) => self.move_cursor(0, n as i32),
            Command::CursorForward(n) => self.move_cursor(n as i32, 0),
            Command::CursorBack(n) => self.move_cursor(-(n as i32), 0),
            Command::CursorNextLine(n) => {
                let screen = self.active_mut();
                screen.cursor.col = screen.left_margin();
                self.move_cursor(0, n as i32)
            }
            Command::CursorPrevLine(n) => {
                let screen = self.active_mut();
                screen.cursor.col = screen.left_margin();
                self.move_cursor(0, -(n as i32))
            }
            Command::CursorHorizontalAbsolute(col) => {
                let screen = self.active_mut();
                screen.cursor.col = (col.saturating_sub(1)).min(screen.grid.cols().saturating_sub(1));
                screen.cursor.set_pending_wrap(false);
                DispatchResult::ok()
            }
            Command::CursorVerticalAbsolute(row) => {
                let screen = self.active_mut();
                screen.cursor.row = (row.saturating_sub(1)).min(screen.grid.rows().saturating_sub(1));
                screen.cursor.set_pending_wrap(false);
                DispatchResult::ok()
            }
            Command::CursorPosition { row, col } | Command::CursorPositionHorizontalVertical { row, col } => {
                let screen = self.active_mut();
                let origin = screen.modes.dec.origin;
                let row_base = if origin { screen.top_margin() } else { 0 };
                let col_base = if origin { screen.left_margin() } else { 0 };
                screen.cursor.row = (row_base + row.saturating_sub(1)).min(screen.grid.rows().saturating_sub(1));
                screen.cursor.col = (col_base + col.saturating_sub(1)).min(screen.grid.cols().saturating_sub(1));
                screen.cursor.set_pending_wrap(false);
                DispatchResult::ok()
            }
            Command::SaveCursor => {
                let screen = self.active_mut();
                let origin = screen.modes.dec.origin;
                screen.saved_cursor = Some(SavedCursor::capture(&screen.cursor, screen.attrs, origin));
                DispatchResult::ok()
            }
            Command::RestoreCursor => {
                let screen = self.active_mut();
                if let Some(saved) = screen.saved_cursor {
                    saved.restore_into(&mut screen.cursor);
                    screen.attrs = saved.attrs;
                }
                DispatchResult::ok()
            }
            Command::EraseInDisplay(n) => self.erase_in_display(n),
            Command::EraseInLine(n) => self.erase_in_line(n),
            Command::InsertLines(n) => {
                let screen = self.active_mut();
                let (top, bottom) = (screen.top_margin(), screen.bottom_margin());
                let row = screen.cursor.row;
                let bg = screen.bg();
                screen.grid.insert_lines(row, n, top, bottom, bg);
                DispatchResult::ok()
            }
            Command::DeleteLines(n) => {
                let screen = self.active_mut();
                let (top, bottom) = (screen.top_margin(), screen.bottom_margin());
                let row = screen.cursor.row;
                let bg = screen.bg();
                screen.grid.delete_lines(row, n, top, bottom, bg);
                DispatchResult::ok()
            }
            Command::InsertChars(n) => {
                let screen = self.active_mut();
                let (row, col, bg) = (screen.cursor.row, screen.cursor.col, screen.bg());
                screen.grid.insert_chars(row, col, n, bg);
                DispatchResult::ok()
            }
            Command::DeleteChars(n) => {
                let screen = self.active_mut();
                let (row, col, bg) = (screen.cursor.row, screen.cursor.col, screen.bg());
                screen.grid.delete_chars(row, col, n, bg);
                DispatchResult::ok()
            }
            Command::EraseChars(n) => {
                let screen = self.active_mut();
                let (row, col, bg) = (screen.cursor.row, screen.cursor.col, screen.bg());
                screen.grid.erase_chars(row, col, n, bg);
                DispatchResult::ok()
            }
            Command::InsertColumns(n) => {
                let screen = self.active_mut();
                let (top, bottom, left, right) = (
                    screen.top_margin(),
                    screen.bottom_margin(),
                    screen.left_margin(),
                    screen.right_margin(),
                );
                let (col, bg) = (screen.cursor.col, screen.bg());
                screen.grid.insert_columns(col, n, top, bottom, left, right, bg);
                DispatchResult::ok()
            }
            Command::DeleteColumns(n) => {
                let screen = self.active_mut();
                let (top, bottom, left, right) = (
                    screen.top_margin(),
                    screen.bottom_margin(),
                    screen.left_margin(),
                    screen.right_margin(),
                );
                let (col, bg) = (screen.cursor.col, screen.bg());
                screen.grid.delete_columns(col, n, top, bottom, left, right, bg);
                DispatchResult::ok()
            }
            Command::ScrollUp(n) => {
                let screen = self.active_mut();
                let (top, bottom, left, right, bg) = (
                    screen.top_margin(),
                    screen.bottom_margin(),
                    screen.left_margin(),
                    screen.right_margin(),
                    screen.bg(),
                );
                if left == 0 && right == screen.grid.cols() {
                    match screen.scrollback.as_mut() {
                        Some(sb) => screen.grid.scroll_up_into(top, bottom, n, sb, bg),
                        None => screen.grid.scroll_up(top, bottom, n, bg),
                    }
                } else {
                    screen.grid.scroll_up_region(top, bottom, left, right, n, bg);
                }
                DispatchResult::ok()
            }
            Command::ScrollDown(n) => {
                let screen = self.active_mut();
                let (top, bottom, left, right, bg) = (
                    screen.top_margin(),
                    screen.bottom_margin(),
                    screen.left_margin(),
                    screen.right_margin(),
                    screen.bg(),
                );
                if left == 0 && right == screen.grid.cols() {
                    match screen.scrollback.as_mut() {
                        Some(sb) => screen.grid.scroll_down_from(top, bottom, n, sb, bg),
                        None => screen.grid.scroll_down(top, bottom, n, bg),
                    }
                } else {
                    screen.grid.scroll_down_region(top, bottom, left, right, n, bg);
                }
                DispatchResult::ok()
            }
            Command::SetScrollRegion { top, bottom } => {
                let screen = self.active_mut();
                let rows = screen.grid.rows();
                let bottom = if bottom == 0 { rows } else { bottom.min(rows) };
                let top = top.saturating_sub(1);
                if top >= bottom {
                    return DispatchResult::invalid();
                }
                screen.margins.top = top;
                screen.margins.bottom = bottom;
                screen.cursor.row = screen.top_margin();
                screen.cursor.col = screen.left_margin();
                DispatchResult::ok()
            }
            Command::SetLeftRightMargin { left, right } => {
                let screen = self.active_mut();
                if !screen.modes.dec.left_right_margin {
                    return DispatchResult::unsupported();
                }
                let cols = screen.grid.cols();
                let right = if right == 0 { cols } else { right.min(cols) };
                let left = left.saturating_sub(1);
                if left >= right {
                    return DispatchResult::invalid();
                }
                screen.margins.left = left;
                screen.margins.right = right;
                screen.cursor.row = screen.top_margin();
                screen.cursor.col = screen.left_margin();
                DispatchResult::ok()
            }
            Command::RepeatLastChar(n) => {
                let screen = self.active_mut();
                if let Some(ch) = screen.last_printed {
                    for _ in 0..n {
                        screen.print(ch);
                    }
                    DispatchResult::ok()
                } else {
                    DispatchResult::unsupported()
                }
            }
            Command::Sgr(effects) => {
                let screen = self.active_mut();
                commands::apply_sgr_effects(&mut screen.attrs, &effects);
                DispatchResult::ok()
            }
            Command::SetMode { numbers, private, value } => {
                let mut outcome = DispatchOutcome::Ok;
                let mut reply = Vec::new();
                for number in numbers {
                    let result = self.set_mode(number, private, value);
                    if result.outcome == DispatchOutcome::Invalid {
                        outcome = DispatchOutcome::Invalid;
                    } else if result.outcome == DispatchOutcome::Unsupported && outcome == DispatchOutcome::Ok {
                        outcome = DispatchOutcome::Unsupported;
                    }
                    if let Some(bytes) = result.reply {
                        reply.extend(bytes);
                    }
                }
                DispatchResult { outcome, reply: if reply.is_empty() { None } else { Some(reply) } }
            }
            Command::RequestMode { number, private } => self.request_mode(number, private),
            Command::SoftReset => {
                self.soft_reset();
                DispatchResult::ok()
            }
            Command::FullReset => {
                self.full_reset();
                DispatchResult::ok()
            }
            Command::DeviceStatusReport(n) => self.device_status_report(n),
            Command::DeviceAttributes => {
                DispatchResult::with_reply(b"\x1b[?62;22c".to_vec())
            }
            Command::SetCursorStyle(n) => self.set_cursor_style(n),
            Command::DesignateCharset { slot, set } => {
                self.active_mut().charsets.designate(slot, set);
                DispatchResult::ok()
            }
            Command::LockingShift(slot) => {
                self.active_mut().charsets.locking_shift(slot);
                DispatchResult::ok()
            }
            Command::SingleShift(slot) => {
                self.active_mut().charsets.single_shift(slot);
                DispatchResult::ok()
            }
            Command::Index => {
                self.active_mut().index();
                DispatchResult::ok()
            }
            Command::NextLine => {
                self.active_mut().index();
                self.active_mut().carriage_return();
                DispatchResult::ok()
            }
            Command::ReverseIndex => {
                self.active_mut().reverse_index();
                DispatchResult::ok()
            }
            Command::SetTabStop => {
                self.active_mut().set_tabstop_here();
                DispatchResult::ok()
            }
            Command::TabClear(n) => {
                let screen = self.active_mut();
                match n {
                    0 => screen.clear_tabstop_here(),
                    3 => screen.clear_all_tabstops(),
                    _ => return DispatchResult::unsupported(),
                }
                DispatchResult::ok()
            }
            Command::SetKeypadApplicationMode(value) => {
                self.active_mut().modes.set_app_keypad(value);
                DispatchResult::ok()
            }
            Command::BackIndex => {
                let screen = self.active_mut();
                let left = screen.left_margin();
                if screen.cursor.col > left {
                    screen.cursor.col -= 1;
                } else {
                    let (top, bottom, right, bg) = (
                        screen.top_margin(),
                        screen.bottom_margin(),
                        screen.right_margin(),
                        screen.bg(),
                    );
                    screen.grid.insert_columns(left, 1, top, bottom, left, right, bg);
                }
                DispatchResult::ok()
            }
            Command::ForwardIndex => {
                let screen = self.active_mut();
                let right = screen.right_margin();
                if screen.cursor.col + 1 < right {
                    screen.cursor.col += 1;
                } else {
                    let (top, bottom, left, bg) = (
                        screen.top_margin(),
                        screen.bottom_margin(),
                        screen.left_margin(),
                        screen.bg(),
                    );
                    screen.grid.delete_columns(left, 1, top, bottom, left, right, bg);
                }
                DispatchResult::ok()
            }
            Command::ScreenAlignmentTest => {
                let screen = self.active_mut();
                let (cols, rows) = (screen.grid.cols(), screen.grid.rows());
                let attrs = SgrAttrs::default();
                for row in 0..rows {
                    for col in 0..cols {
                        screen.grid.write_printable(row, col, 'E', attrs);
                    }
                    screen.dirty.mark_all(row, cols);
                }
                DispatchResult::ok()
            }
            Command::SetWindowTitle(title) => {
                events.on_title_changed(&title);
                self.title = title;
                DispatchResult::ok()
            }
            Command::SetIconName(name) => {
                events.on_icon_name_changed(&name);
                self.icon_name = name;
                DispatchResult::ok()
            }
            Command::SetColor { slot, spec } => self.set_color(slot, &spec),
            Command::ResetDynamicColor(slot) => {
                self.palette.reset(slot);
                DispatchResult::ok()
            }
            Command::Recognized(_) => DispatchResult::unsupported(),
            Command::Hyperlink { id, uri } => {
                let screen = self.active_mut();
                screen.hyperlinks.release_id(screen.current_hyperlink);
                screen.current_hyperlink = match uri {
                    Some(uri) if !uri.is_empty() => {
                        let key = match id {
                            Some(explicit) => format!("{explicit}\0{uri}"),
                            None => uri,
                        };
                        screen.hyperlinks.acquire(&key)
                    }
                    _ => 0,
                };
                DispatchResult::ok()
            }
            Command::CaptureBuffer { more, id, chunk } => {
                events.on_capture_chunk(&id, more, &chunk);
                DispatchResult::ok()
            }
            Command::SetClipboard { selection, payload } => {
                events.on_clipboard_write(&selection, &payload);
                DispatchResult::ok()
            }
            Command::SetMark => {
                let screen = self.active();
                let sb_len = screen.scrollback.as_ref().map(Scrollback::len).unwrap_or(0);
                let pos = BufferPos::from_viewport(sb_len, screen.cursor.row, screen.cursor.col);
                events.on_mark(pos);
                DispatchResult::ok()
            }
            Command::PromptStart | Command::CommandStart
            | Command::CommandExecuted | Command::CommandFinished { .. } => DispatchResult::ok(),
            Command::Sixel(payload) => self.place_sixel_image(&payload),
            Command::Iterm2Image(payload) => self.place_iterm2_image(&payload),
            Command::SelectActiveStatusDisplay(status_line) => {
                self.active_status_display = status_line && self.status_display != StatusDisplay::None;
                DispatchResult::ok()
            }
            Command::SelectStatusLineType(kind) => {
                self.status_display = match kind {
                    1 => StatusDisplay::Indicator,
                    2 if events.on_host_writable_status_line_requested() => StatusDisplay::HostWritable,
                    2 => StatusDisplay::None,
                    _ => StatusDisplay::None,
                };
                if self.status_display == StatusDisplay::None {
                    self.active_status_display = false;
                }
                DispatchResult::ok()
            }
            Command::RequestStatusString(target) => self.request_status_string(target),
            Command::RequestStatusStringUnsupported => {
                DispatchResult { outcome: DispatchOutcome::Unsupported, reply: Some(b"\x1bP0$r\x1b\\".to_vec()) }
            }
            Command::Unknown => DispatchResult::invalid(),
        }
    }

    fn move_cursor(&mut self, dcol: i32, drow: i32) -> DispatchResult {
        let screen = self.active_mut();
        let (left, right) = (screen.left_margin(), screen.right_margin());
        let (top, bottom) = (screen.top_margin(), screen.bottom_margin().min(screen.grid.rows()));
        let new_col = (screen.cursor.col as i32 + dcol).clamp(left as i32, right.saturating_sub(1) as i32);
        let new_row = (screen.cursor.row as i32 + drow).clamp(top as i32, bottom.saturating_sub(1) as i32);
        screen.cursor.col = new_col as u16;
        screen.cursor.row = new_row as u16;
        screen.cursor.set_pending_wrap(false);
        DispatchResult::ok()
    }

    fn execute(&mut self, b: u8, events: &mut dyn ScreenEvents) -> DispatchResult {
        match b {
            0x07 => {
                events.on_bell();
                DispatchResult::ok()
            }
            0x08 => {
                let screen = self.active_mut();
                let left = screen.left_margin();
                if screen.cursor.col > left {
                    screen.cursor.col -= 1;
                }
                screen.cursor.set_pending_wrap(false);
                DispatchResult::ok()
            }
            0x09 => {
                let screen = self.active_mut();
                let next = screen.next_tabstop(screen.cursor.col);
                screen.cursor.col = next;
                DispatchResult::ok()
            }
            0x0a | 0x0b | 0x0c => {
                let newline_mode = self.active().modes.ansi.linefeed_newline;
                self.active_mut().index();
                if newline_mode {
                    self.active_mut().carriage_return();
                }
                DispatchResult::ok()
            }
            0x0d => {
                self.active_mut().carriage_return();
                DispatchResult::ok()
            }
            0x0e => {
                self.active_mut().charsets.locking_shift(1);
                DispatchResult::ok()
            }
            0x0f => {
                self.active_mut().charsets.locking_shift(0);
                DispatchResult::ok()
            }
            _ => DispatchResult::unsupported(),
        }
    }

    fn erase_in_display(&mut self, n: u16) -> DispatchResult {
        let screen = self.active_mut();
        let bg = screen.bg();
        let (row, col) = (screen.cursor.row, screen.cursor.col);
        match n {
            0 => screen.grid.erase_below(row, col, bg),
            1 => screen.grid.erase_above(row, col, bg),
            2 | 3 => screen.grid.erase_all(bg),
            _ => return DispatchResult::invalid(),
        }
        DispatchResult::ok()
    }

    fn erase_in_line(&mut self, n: u16) -> DispatchResult {
        let screen = self.active_mut();
        let bg = screen.bg();
        let (row, col) = (screen.cursor.row, screen.cursor.col);
        match n {
            0 => screen.grid.erase_line_right(row, col, bg),
            1 => screen.grid.erase_line_left(row, col, bg),
            2 => screen.grid.erase_line(row, bg),
            _ => return DispatchResult::invalid(),
        }
        DispatchResult::ok()
    }

    fn set_mode(&mut self, number: u16, private: bool, value: bool) -> DispatchResult {
        if !private {
            let screen = self.active_mut();
            return if screen.modes.set_ansi(number, value) {
                DispatchResult::ok()
            } else {
                DispatchResult::unsupported()
            };
        }

        // DEC private modes 47/1047/1049 switch the alternate screen; the
        // modal state itself still lives on `Modes` for DECRQM, but the
        // switch is a `Terminal`-level concern (it touches which
        // `ScreenState` is active), so it's handled here rather than
        // inside `ScreenState::modes.set_dec`.
        match number {
            47 | 1047 => {
                self.switch_alt_screen(value, number == 1047);
                self.active_mut().modes.set_dec(number, value);
                DispatchResult::ok()
            }
            1049 => {
                if value {
                    self.active_mut().saved_cursor = Some(SavedCursor::capture(
                        &self.active().cursor,
                        self.active().attrs,
                        self.active().modes.dec.origin,
                    ));
                    self.switch_alt_screen(true, true);
                } else {
                    self.switch_alt_screen(false, true);
                    let screen = self.active_mut();
                    if let Some(saved) = screen.saved_cursor.take() {
                        saved.restore_into(&mut screen.cursor);
                        screen.attrs = saved.attrs;
                    }
                }
                self.primary.modes.set_dec(1049, value);
                DispatchResult::ok()
            }
            _ => {
                let screen = self.active_mut();
                if screen.modes.set_dec(number, value) {
                    DispatchResult::ok()
                } else {
                    DispatchResult::unsupported()
                }
            }
        }
    }

    fn switch_alt_screen(&mut self, to_alt: bool, clear_on_enter: bool) {
        if self.alt_active == to_alt {
            return;
        }
        self.alt_active = to_alt;
        if to_alt && clear_on_enter {
            let bg = self.active().bg();
            self.active_mut().grid.erase_all(bg);
        }
    }

    fn request_mode(&mut self, number: u16, private: bool) -> DispatchResult {
        let screen = self.active();
        let value = if private {
            screen.modes.query_dec(number)
        } else {
            screen.modes.query_ansi(number)
        };
        // DECRQM reply: CSI ? Ps ; Pm $ y  (Pm: 0=not recognized, 1=set, 2=reset).
        let pm = match value {
            None => 0,
            Some(true) => 1,
            Some(false) => 2,
        };
        let leader = if private { "?" } else { "" };
        let reply = format!("\x1b[{leader}{number};{pm}$y").into_bytes();
        DispatchResult::with_reply(reply)
    }

    fn device_status_report(&mut self, n: u16) -> DispatchResult {
        match n {
            5 => DispatchResult::with_reply(b"\x1b[0n".to_vec()),
            6 => {
                let screen = self.active();
                let origin = screen.modes.dec.origin;
                let row = screen.cursor.row - if origin { screen.top_margin() } else { 0 } + 1;
                let col = screen.cursor.col - if origin { screen.left_margin() } else { 0 } + 1;
                DispatchResult::with_reply(format!("\x1b[{row};{col}R").into_bytes())
            }
            _ => DispatchResult::unsupported(),
        }
    }

    /// DECRQSS reply: `DCS 1 $ r <Pt> ST`, where `Pt` is the current value
    /// of the requested setting followed by the request string's own
    /// identifying suffix, per DEC STD 070.
    /// OSC 4/10/11/12/17/19: set or (when `spec` is `?`) query one palette
    /// or dynamic-default color.
    fn set_color(&mut self, slot: ColorSlot, spec: &str) -> DispatchResult {
        if spec == "?" {
            return match self.palette.get(slot) {
                Some((r, g, b)) => DispatchResult::with_reply(
                    format!(
                        "\x1b]{};{}\x1b\\",
                        Palette::reply_prefix(slot),
                        commands::encode_osc_color_spec(r, g, b)
                    )
                    .into_bytes(),
                ),
                None => DispatchResult::unsupported(),
            };
        }
        match commands::parse_osc_color_spec(spec) {
            Some((r, g, b)) => {
                self.palette.set(slot, (r, g, b));
                DispatchResult::ok()
            }
            None => DispatchResult::invalid(),
        }
    }

    /// Decode a sixel DCS payload's declared size (falling back to a
    /// one-cell placeholder span when it sets no raster attributes),
    /// register a correctly-sized placeholder image, and place its
    /// fragments into the grid starting at the cursor. No sixel color/
    /// pixel decoder lives in this stack, so the stored pixel buffer is a
    /// zeroed placeholder of the right size; what's real here is the
    /// geometry, the pool bookkeeping, and the grid placement.
    fn place_sixel_image(&mut self, payload: &[u8]) -> DispatchResult {
        let (pixel_width, pixel_height) = image::parse_sixel_raster_attributes(payload)
            .unwrap_or((DEFAULT_CELL_PIXEL_WIDTH, DEFAULT_CELL_PIXEL_HEIGHT));
        self.place_image(ImageFormat::Sixel, pixel_width, pixel_height)
    }

    /// OSC 1337 iTerm2 inline image: place a placeholder the declared cell
    /// span covers (falling back to one cell when the size is given in
    /// pixels/percent this crate has no font metrics to resolve).
    fn place_iterm2_image(&mut self, payload: &str) -> DispatchResult {
        let spec = image::parse_iterm2_image(payload);
        let cols = spec.width_cells.unwrap_or(1).max(1);
        let rows = spec.height_cells.unwrap_or(1).max(1);
        let pixel_width = u32::from(cols) * DEFAULT_CELL_PIXEL_WIDTH;
        let pixel_height = u32::from(rows) * DEFAULT_CELL_PIXEL_HEIGHT;
        self.place_image(ImageFormat::Iterm2, pixel_width, pixel_height)
    }

    fn place_image(&mut self, format: ImageFormat, pixel_width: u32, pixel_height: u32) -> DispatchResult {
        let cell_cols = pixel_width.div_ceil(DEFAULT_CELL_PIXEL_WIDTH).max(1) as u16;
        let cell_rows = pixel_height.div_ceil(DEFAULT_CELL_PIXEL_HEIGHT).max(1) as u16;
        let screen = self.active();
        let (grid_cols, grid_rows) = (screen.grid.cols(), screen.grid.rows());
        let (origin_row, origin_col) = (screen.cursor.row, screen.cursor.col);
        let span_cols = cell_cols.min(grid_cols.saturating_sub(origin_col)).max(1);
        let span_rows = cell_rows.min(grid_rows.saturating_sub(origin_row)).max(1);
        let data = vec![0u8; pixel_width as usize * pixel_height as usize * 4];
        let id = self.images.register(
            format,
            pixel_width,
            pixel_height,
            span_cols,
            span_rows,
            ImageAlignment::TopLeft,
            ImageResizePolicy::Stretch,
            data,
        );
        let (screen, images) = self.active_screen_and_images();
        for r in 0..span_rows {
            for c in 0..span_cols {
                let (row, col) = (origin_row + r, origin_col + c);
                if let Some(cell) = screen.grid.cell_mut(row, col) {
                    if let Some(old) = cell.image.take() {
                        images.release_fragment(old);
                    }
                    cell.image = images.fragment_ref(id, c, r);
                }
            }
            screen.dirty.mark_all(origin_row + r, grid_cols);
        }
        DispatchResult::ok()
    }

    fn request_status_string(&mut self, target: StatusStringTarget) -> DispatchResult {
        use crate::cursor::CursorShape;
        let screen = self.active();
        let pt = match target {
            StatusStringTarget::Sgr => format!("{}m", commands::encode_sgr_params(&screen.attrs)),
            // Conformance level isn't separately tracked; report the same
            // VT220-ish level advertised by the primary DA reply, 7-bit
            // controls (this implementation never emits C1 8-bit codes).
            StatusStringTarget::DecScl => "62;1\"p".to_string(),
            StatusStringTarget::DecScusr => {
                let n = match (screen.cursor.shape, screen.cursor.blinking) {
                    (CursorShape::Block, true) => 1,
                    (CursorShape::Block, false) => 2,
                    (CursorShape::Underline, true) => 3,
                    (CursorShape::Underline, false) => 4,
                    (CursorShape::Bar, true) => 5,
                    (CursorShape::Bar, false) => 6,
                };
                format!("{n} q")
            }
            // Character protection (DECSCA) isn't modeled; cells are never
            // marked protected, so the answerback is always "unprotected".
            StatusStringTarget::DecSca => "0\"q".to_string(),
            StatusStringTarget::DecStbm => format!("{};{}r", screen.margins.top + 1, screen.margins.bottom),
            StatusStringTarget::DecSlrm => format!("{};{}s", screen.margins.left + 1, screen.margins.right),
            StatusStringTarget::DecSlpp => format!("{}t", screen.grid.rows()),
            StatusStringTarget::DecScpp => format!("{}$|", screen.grid.cols()),
            StatusStringTarget::DecSnls => format!("{}*|", screen.grid.rows()),
        };
        DispatchResult::with_reply(format!("\x1bP1$r{pt}\x1b\\").into_bytes())
    }

    fn set_cursor_style(&mut self, n: u16) -> DispatchResult {
        use crate::cursor::CursorShape;
        let screen = self.active_mut();
        let (shape, blinking) = match n {
            0 | 1 => (CursorShape::Block, true),
            2 => (CursorShape::Block, false),
            3 => (CursorShape::Underline, true),
            4 => (CursorShape::Underline, false),
            5 => (CursorShape::Bar, true),
            6 => (CursorShape::Bar, false),
            _ => return DispatchResult::invalid(),
        };
        screen.cursor.shape = shape;
        screen.cursor.blinking = blinking;
        DispatchResult::ok()
    }

    fn soft_reset(&mut self) {
        let screen = self.active_mut();
        screen.attrs = SgrAttrs::default();
        screen.cursor.set_pending_wrap(false);
        screen.cursor.visible = true;
        screen.margins = Margins::full(screen.grid.cols(), screen.grid.rows());
        screen.saved_cursor = None;
        screen.charsets = CharsetState::default();
    }

    fn full_reset(&mut self) {
        let (cols, rows) = (self.primary.grid.cols(), self.primary.grid.rows());
        let scrollback_capacity = self
            .primary
            .scrollback
            .as_ref()
            .map(Scrollback::capacity_policy)
            .unwrap_or(ScrollbackCapacity::Fixed(0));
        self.primary = ScreenState::new(
            cols,
            rows,
            Some(match scrollback_capacity {
                ScrollbackCapacity::Fixed(k) => Scrollback::new(k),
                ScrollbackCapacity::Unbounded => Scrollback::unbounded(),
            }),
        );
        self.alternate = ScreenState::new(cols, rows, None);
        self.alt_active = false;
        self.title.clear();
        self.icon_name.clear();
    }

    /// Run a search in the given direction starting just past the last
    /// match (or from the cursor if there is none yet). Updates
    /// `self.search.last_match` and returns it.
    pub fn search_forward(&mut self, query: &str) -> Option<BufferPos> {
        self.search.query = query.to_string();
        let screen = self.active();
        let sb_len = screen.scrollback.as_ref().map(Scrollback::len).unwrap_or(0) as u32;
        let total = sb_len + screen.grid.rows() as u32;
        let start = self
            .search
            .last_match
            .map(|p| p.line + 1)
            .unwrap_or(0)
            .min(total);
        let found = (start..total).find_map(|line| self.line_text(line).find(query).map(|col| BufferPos::new(line, col as u16)));
        self.search.last_match = found;
        found
    }

    pub fn search_backward(&mut self, query: &str) -> Option<BufferPos> {
        self.search.query = query.to_string();
        let screen = self.active();
        let sb_len = screen.scrollback.as_ref().map(Scrollback::len).unwrap_or(0) as u32;
        let total = sb_len + screen.grid.rows() as u32;
        let start = self.search.last_match.map(|p| p.line).unwrap_or(total);
        let found = (0..start).rev().find_map(|line| self.line_text(line).find(query).map(|col| BufferPos::new(line, col as u16)));
        self.search.last_match = found;
        found
    }

    fn line_text(&self, line: u32) -> String {
        let screen = self.active();
        let sb_len = screen.scrollback.as_ref().map(Scrollback::len).unwrap_or(0) as u32;
        if line < sb_len {
            screen
                .scrollback
                .as_ref()
                .and_then(|sb| sb.get(line as usize))
                .map(|l| l.cells.iter().map(Cell::content).collect())
                .unwrap_or_default()
        } else {
            let row = (line - sb_len) as u16;
            screen
                .grid
                .row_cells(row)
                .map(|cells| cells.iter().map(Cell::content).collect())
                .unwrap_or_default()
        }
    }
}
