//! Vi mode state machine: the modal cursor, its operators, and the glue
//! between motions/text-objects and a host's selection + clipboard.

use vterm_core::selection::{Selection, SelectionShape};
use vterm_core::{BufferPos, Grid, Scrollback};

use crate::buffer::{BufferView, CellLocation};
use crate::jump::JumpHistory;
use crate::motion::{self, FindCharState, Motion, Viewport};
use crate::text_object::{self, Object, Scope, TextObjectSpan};
use crate::word::WordClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal terminal pass-through; vi mode is inactive.
    Insert,
    Normal,
    Visual,
    VisualLine,
    VisualBlock,
}

/// The operators a vi-mode command can invoke: move the cursor, yank,
/// paste (optionally stripped), open the selection, or reverse-search
/// the word under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    MoveCursor,
    Yank,
    Paste,
    PasteStripped,
    Open,
    ReverseSearchCurrentWord,
}

/// Snapshot of the real (PTY-driven) cursor + viewport taken on entering
/// normal mode, restored on leaving it.
#[derive(Debug, Clone, Copy)]
pub struct RealCursorSnapshot {
    pub row: u16,
    pub col: u16,
    pub viewport_top: u32,
}

/// Host-facing effects an operator can request, since `vterm-vi` has no
/// clipboard or hyperlink-launcher of its own.
#[derive(Debug, Clone)]
pub enum ViEffect {
    /// Yanked text ready for the clipboard collaborator.
    Yank(String),
    /// `gx`-style "open" on the hyperlink/URL under the selection.
    Open(String),
    /// Reverse-search the word under the cursor (`*`/`#` equivalent).
    ReverseSearch(String),
    /// Paste request: insert `text` (optionally stripped of trailing
    /// whitespace) back into Insert mode at the PTY.
    Paste { text: String, stripped: bool },
}

/// The vi command layer's full state for one terminal.
pub struct ViState {
    pub mode: Mode,
    pub cursor: CellLocation,
    visual_anchor: Option<CellLocation>,
    pub jump: JumpHistory,
    pub words: WordClassifier,
    find_state: FindCharState,
    snapshot: Option<RealCursorSnapshot>,
    /// Leaving insert mode after yank: yank writes the extracted text to
    /// the clipboard collaborator and optionally leaves insert mode
    /// afterwards.
    pub leave_insert_after_yank: bool,
}

impl Default for ViState {
    fn default() -> Self {
        Self {
            mode: Mode::Insert,
            cursor: CellLocation::new(0, 0),
            visual_anchor: None,
            jump: JumpHistory::default(),
            words: WordClassifier::default(),
            find_state: FindCharState::default(),
            snapshot: None,
            leave_insert_after_yank: false,
        }
    }
}

impl ViState {
    #[must_use]
    pub fn new(words: WordClassifier) -> Self {
        Self { words, ..Self::default() }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mode != Mode::Insert
    }

    /// Enter normal mode, snapshotting the real cursor/viewport so
    /// [`Self::leave`] can restore them.
    pub fn enter_normal(&mut self, real_row: u16, real_col: u16, viewport_top: u32) {
        self.mode = Mode::Normal;
        self.visual_anchor = None;
        self.snapshot = Some(RealCursorSnapshot { row: real_row, col: real_col, viewport_top });
        self.cursor = CellLocation::new(viewport_top + real_row as u32, real_col);
    }

    /// Leave vi mode entirely, restoring the real cursor/viewport and
    /// clearing any selection.
    #[must_use]
    pub fn leave(&mut self) -> Option<RealCursorSnapshot> {
        self.mode = Mode::Insert;
        self.visual_anchor = None;
        self.snapshot.take()
    }

    pub fn enter_visual(&mut self, mode: Mode) {
        debug_assert!(matches!(mode, Mode::Visual | Mode::VisualLine | Mode::VisualBlock));
        self.mode = mode;
        self.visual_anchor = Some(self.cursor);
    }

    /// Back to Normal mode from any Visual variant, keeping the cursor.
    pub fn exit_visual(&mut self) {
        if self.mode != Mode::Normal {
            self.mode = Mode::Normal;
        }
        self.visual_anchor = None;
    }

    /// The current selection implied by visual mode, if any.
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        let anchor = self.visual_anchor?;
        let shape = match self.mode {
            Mode::Visual => SelectionShape::Linear,
            Mode::VisualLine => SelectionShape::FullLine,
            Mode::VisualBlock => SelectionShape::Rectangular,
            Mode::Normal | Mode::Insert => return None,
        };
        Some(Selection::with_shape(
            BufferPos::new(anchor.line, anchor.col),
            BufferPos::new(self.cursor.line, self.cursor.col),
            shape,
        ))
    }

    /// Apply one motion, recording jump history when the motion demands it
    /// and remembering `f`/`F`/`t`/`T` targets for `;`/`,` repeat.
    pub fn apply_motion(
        &mut self,
        grid: &Grid,
        scrollback: &Scrollback,
        viewport: Viewport,
        motion: Motion,
        count: u32,
    ) {
        if motion.is_jump() {
            self.jump.push(self.cursor);
        }
        if matches!(
            motion,
            Motion::ToChar { .. } | Motion::TillBeforeChar(_) | Motion::TillAfterChar(_)
        ) {
            self.find_state.last = Some(motion);
        }
        let buf = BufferView::new(grid, scrollback);
        self.cursor = motion::apply(&buf, &self.words, viewport, self.cursor, motion, count);
    }

    /// `;`: repeat the last `f`/`F`/`t`/`T`.
    pub fn repeat_find(&mut self, grid: &Grid, scrollback: &Scrollback, viewport: Viewport, count: u32) {
        if let Some(m) = self.find_state.last {
            let buf = BufferView::new(grid, scrollback);
            self.cursor = motion::apply(&buf, &self.words, viewport, self.cursor, m, count);
        }
    }

    /// `,`: repeat the last `f`/`F`/`t`/`T` with direction reversed.
    pub fn repeat_find_reversed(
        &mut self,
        grid: &Grid,
        scrollback: &Scrollback,
        viewport: Viewport,
        count: u32,
    ) {
        let Some(m) = self.find_state.last else { return };
        let reversed = match m {
            Motion::ToChar { ch, forward } => Motion::ToChar { ch, forward: !forward },
            Motion::TillBeforeChar(ch) => Motion::TillAfterChar(ch),
            Motion::TillAfterChar(ch) => Motion::TillBeforeChar(ch),
            other => other,
        };
        let buf = BufferView::new(grid, scrollback);
        self.cursor = motion::apply(&buf, &self.words, viewport, self.cursor, reversed, count);
    }

    /// Resolve a text object at the cursor. In Visual mode this also
    /// sets the visual anchor/cursor to the span's bounds.
    pub fn apply_text_object(
        &mut self,
        grid: &Grid,
        scrollback: &Scrollback,
        scope: Scope,
        object: Object,
        marked_lines: &[u32],
    ) -> Option<TextObjectSpan> {
        let buf = BufferView::new(grid, scrollback);
        let span = text_object::resolve(&buf, &self.words, self.cursor, scope, object, marked_lines)?;
        if self.mode != Mode::Normal {
            self.visual_anchor = Some(span.start);
            self.cursor = span.end;
        }
        Some(span)
    }

    /// `ge`/`gv`-style jump: explicit jump-to-mark using the jumplist.
    pub fn jump_back(&mut self) {
        if let Some(loc) = self.jump.back(self.cursor) {
            self.cursor = loc;
        }
    }

    pub fn jump_forward(&mut self) {
        if let Some(loc) = self.jump.forward() {
            self.cursor = loc;
        }
    }

    pub fn toggle_last_jump(&mut self) {
        if let Some(loc) = self.jump.toggle_last(self.cursor) {
            self.cursor = loc;
        }
    }

    /// Execute `op` against the current span (visual selection or, in
    /// Normal mode, a single-character span at the cursor) and return the
    /// host-facing effect, if any.
    #[must_use]
    pub fn execute(
        &mut self,
        grid: &Grid,
        scrollback: &Scrollback,
        op: Operator,
    ) -> Option<ViEffect> {
        let sel = self.selection().unwrap_or_else(|| {
            Selection::new(
                BufferPos::new(self.cursor.line, self.cursor.col),
                BufferPos::new(self.cursor.line, self.cursor.col),
            )
        });
        let text = sel.extract_text(grid, scrollback);
        let effect = match op {
            Operator::MoveCursor => None,
            Operator::Yank => Some(ViEffect::Yank(text)),
            Operator::Paste => Some(ViEffect::Paste { text, stripped: false }),
            Operator::PasteStripped => Some(ViEffect::Paste { text, stripped: true }),
            Operator::Open => Some(ViEffect::Open(text)),
            Operator::ReverseSearchCurrentWord => Some(ViEffect::ReverseSearch(text)),
        };
        if matches!(op, Operator::Yank) {
            self.exit_visual();
        }
        effect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::test_support::{grid_from_lines, scrollback_from_lines};

    #[test]
    fn enter_and_leave_restores_snapshot() {
        let mut vi = ViState::default();
        vi.enter_normal(3, 4, 10);
        assert_eq!(vi.cursor, CellLocation::new(13, 4));
        let snap = vi.leave().unwrap();
        assert_eq!((snap.row, snap.col, snap.viewport_top), (3, 4, 10));
        assert_eq!(vi.mode, Mode::Insert);
    }

    #[test]
    fn visual_selection_tracks_anchor_and_cursor() {
        let mut vi = ViState::default();
        vi.cursor = CellLocation::new(0, 2);
        vi.enter_visual(Mode::Visual);
        vi.cursor = CellLocation::new(0, 5);
        let sel = vi.selection().unwrap();
        assert_eq!(sel.start, BufferPos::new(0, 2));
        assert_eq!(sel.end, BufferPos::new(0, 5));
    }

    #[test]
    fn yank_extracts_selection_text_and_exits_visual() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["hello world"]);
        let mut vi = ViState::default();
        vi.cursor = CellLocation::new(0, 0);
        vi.enter_visual(Mode::Visual);
        vi.cursor = CellLocation::new(0, 4);
        let effect = vi.execute(&grid, &sb, Operator::Yank).unwrap();
        match effect {
            ViEffect::Yank(text) => assert_eq!(text, "hello"),
            _ => panic!("expected yank"),
        }
        assert_eq!(vi.mode, Mode::Normal);
    }
}
