//! Cursor position, visibility, shape, and the pending-wrap bit.

use crate::cell::SgrAttrs;

/// Cursor glyph shape, set via DECSCUSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

/// Live cursor state for one screen buffer.
///
/// Pending-wrap is a one-bit state set after writing into the rightmost
/// column; it is consumed by the next printable codepoint (which first
/// performs a newline + CR) and cleared by any explicit cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
    pub visible: bool,
    pub shape: CursorShape,
    pub blinking: bool,
    pending_wrap: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            visible: true,
            shape: CursorShape::default(),
            blinking: true,
            pending_wrap: false,
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_wrap(&self) -> bool {
        self.pending_wrap
    }

    pub fn set_pending_wrap(&mut self, pending: bool) {
        self.pending_wrap = pending;
    }

    /// Move to an explicit position, clearing pending-wrap as every
    /// explicit cursor move does.
    pub fn move_to(&mut self, row: u16, col: u16) {
        self.row = row;
        self.col = col;
        self.pending_wrap = false;
    }

    /// Clamp the cursor into `[0, cols) x [0, rows)`.
    pub fn clamp(&mut self, cols: u16, rows: u16) {
        if cols > 0 {
            self.col = self.col.min(cols - 1);
        } else {
            self.col = 0;
        }
        if rows > 0 {
            self.row = self.row.min(rows - 1);
        } else {
            self.row = 0;
        }
    }
}

/// Cursor state saved by DECSC and restored by DECRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedCursor {
    pub row: u16,
    pub col: u16,
    pub attrs: SgrAttrs,
    pub pending_wrap: bool,
    pub origin_mode: bool,
}

impl SavedCursor {
    pub fn capture(cursor: &Cursor, attrs: SgrAttrs, origin_mode: bool) -> Self {
        Self {
            row: cursor.row,
            col: cursor.col,
            attrs,
            pending_wrap: cursor.pending_wrap,
            origin_mode,
        }
    }

    pub fn restore_into(&self, cursor: &mut Cursor) {
        cursor.row = self.row;
        cursor.col = self.col;
        cursor.pending_wrap = self.pending_wrap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cursor_is_visible_at_origin() {
        let c = Cursor::default();
        assert_eq!((c.row, c.col), (0, 0));
        assert!(c.visible);
        assert!(!c.pending_wrap());
    }

    #[test]
    fn move_to_clears_pending_wrap() {
        let mut c = Cursor::default();
        c.set_pending_wrap(true);
        c.move_to(2, 3);
        assert!(!c.pending_wrap());
        assert_eq!((c.row, c.col), (2, 3));
    }

    #[test]
    fn clamp_keeps_cursor_in_bounds() {
        let mut c = Cursor::default();
        c.move_to(100, 100);
        c.clamp(10, 5);
        assert_eq!((c.row, c.col), (4, 9));
    }

    #[test]
    fn save_restore_round_trips() {
        let mut cursor = Cursor::default();
        cursor.move_to(3, 4);
        cursor.set_pending_wrap(true);
        let saved = SavedCursor::capture(&cursor, SgrAttrs::default(), true);
        let mut restored = Cursor::default();
        saved.restore_into(&mut restored);
        assert_eq!(restored.row, 3);
        assert_eq!(restored.col, 4);
        assert!(restored.pending_wrap());
    }
}
