//! Read-only view over a `vterm-core` grid + scrollback as one combined,
//! 0-indexed line buffer, the coordinate space vi motions operate in.
//!
//! `vterm-core::selection` has an equivalent combined-buffer walk but keeps
//! its helpers private to that module; motions need the same indexing from
//! a different crate, so it is reimplemented here against the grid's and
//! scrollback's public accessors rather than duplicating `Selection`'s
//! private API surface.

use vterm_core::{Cell, Grid, Scrollback};

/// A location in the combined scrollback+viewport buffer. Distinct from
/// the real PTY [`vterm_core::Cursor`]: the cursor in non-Insert modes
/// is an independent `CellLocation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellLocation {
    pub line: u32,
    pub col: u16,
}

impl CellLocation {
    #[must_use]
    pub const fn new(line: u32, col: u16) -> Self {
        Self { line, col }
    }
}

/// Borrowed read-only view over a terminal's grid + scrollback, scoped to
/// the lifetime of one motion/text-object computation.
pub struct BufferView<'a> {
    pub grid: &'a Grid,
    pub scrollback: &'a Scrollback,
}

impl<'a> BufferView<'a> {
    #[must_use]
    pub fn new(grid: &'a Grid, scrollback: &'a Scrollback) -> Self {
        Self { grid, scrollback }
    }

    #[must_use]
    pub fn cols(&self) -> u16 {
        self.grid.cols()
    }

    /// Total number of logical rows: scrollback + viewport.
    #[must_use]
    pub fn total_lines(&self) -> u32 {
        (self.scrollback.len() + self.grid.rows() as usize) as u32
    }

    /// The first viewport row's combined-buffer line index.
    #[must_use]
    pub fn viewport_start(&self) -> u32 {
        self.scrollback.len() as u32
    }

    #[must_use]
    pub fn cell(&self, line: u32, col: u16) -> Option<&'a Cell> {
        let sb_len = self.scrollback.len() as u32;
        if line < sb_len {
            self.scrollback.get(line as usize).and_then(|l| l.cells.get(col as usize))
        } else {
            let row = (line - sb_len) as u16;
            self.grid.cell(row, col)
        }
    }

    #[must_use]
    pub fn char_at(&self, loc: CellLocation) -> char {
        self.cell(loc.line, loc.col).map(Cell::content).unwrap_or(' ')
    }

    /// Whether `next_line` is a soft-wrap continuation of the line before
    /// it (i.e. no logical newline between them).
    #[must_use]
    pub fn continues_previous(&self, next_line: u32) -> bool {
        let sb_len = self.scrollback.len() as u32;
        if next_line == 0 || next_line > self.total_lines() {
            return false;
        }
        if next_line < sb_len {
            self.scrollback.get(next_line as usize).map(|l| l.wrapped).unwrap_or(false)
        } else if next_line == sb_len {
            // Boundary between scrollback and viewport carries no wrap flag
            // in this model (the grid's row 0 wrap state isn't tracked
            // separately); treated as a hard break.
            false
        } else {
            false
        }
    }

    /// The rightmost non-blank, non-wide-continuation column on `line`, or
    /// `None` if the line is entirely blank.
    #[must_use]
    pub fn last_nonblank_col(&self, line: u32) -> Option<u16> {
        let cols = self.cols();
        if cols == 0 {
            return None;
        }
        for col in (0..cols).rev() {
            if let Some(cell) = self.cell(line, col) {
                if !cell.is_wide_continuation() && cell.content() != ' ' && cell.content() != '\0'
                {
                    return Some(col);
                }
            }
        }
        None
    }

    #[must_use]
    pub fn clamp(&self, loc: CellLocation) -> CellLocation {
        let total = self.total_lines();
        let line = loc.line.min(total.saturating_sub(1));
        let col = loc.col.min(self.cols().saturating_sub(1));
        CellLocation::new(line, col)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use vterm_core::Cell as RawCell;

    pub fn grid_from_lines(cols: u16, lines: &[&str]) -> Grid {
        let rows = lines.len() as u16;
        let mut g = Grid::new(cols, rows);
        for (r, text) in lines.iter().enumerate() {
            for (c, ch) in text.chars().enumerate() {
                if c >= cols as usize {
                    break;
                }
                g.cell_mut(r as u16, c as u16).unwrap().set_content(ch, 1);
            }
        }
        g
    }

    pub fn scrollback_from_lines(lines: &[(&str, bool)]) -> Scrollback {
        let mut sb = Scrollback::new(64);
        for (text, wrapped) in lines {
            let cells: Vec<RawCell> = text.chars().map(RawCell::new).collect();
            sb.push_row(&cells, *wrapped);
        }
        sb
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{grid_from_lines, scrollback_from_lines};
    use super::*;

    #[test]
    fn total_lines_combines_scrollback_and_viewport() {
        let grid = grid_from_lines(10, &["one", "two"]);
        let sb = scrollback_from_lines(&[("zero", false)]);
        let view = BufferView::new(&grid, &sb);
        assert_eq!(view.total_lines(), 3);
        assert_eq!(view.viewport_start(), 1);
    }

    #[test]
    fn cell_reads_across_the_scrollback_viewport_boundary() {
        let grid = grid_from_lines(10, &["viewport"]);
        let sb = scrollback_from_lines(&[("history", false)]);
        let view = BufferView::new(&grid, &sb);
        assert_eq!(view.char_at(CellLocation::new(0, 0)), 'h');
        assert_eq!(view.char_at(CellLocation::new(1, 0)), 'v');
    }

    #[test]
    fn continues_previous_reads_the_scrollback_wrap_flag() {
        let grid = grid_from_lines(10, &["c"]);
        let sb = scrollback_from_lines(&[("a", false), ("b", true)]);
        let view = BufferView::new(&grid, &sb);
        assert!(view.continues_previous(1), "line 1 ('b') was pushed as wrapped");
        assert!(!view.continues_previous(0), "line 0 has no predecessor");
    }

    #[test]
    fn continues_previous_treats_the_viewport_boundary_as_a_hard_break() {
        let grid = grid_from_lines(10, &["viewport"]);
        let sb = scrollback_from_lines(&[("history", true)]);
        let view = BufferView::new(&grid, &sb);
        assert!(!view.continues_previous(1), "scrollback-to-viewport boundary has no wrap state");
    }

    #[test]
    fn last_nonblank_col_skips_trailing_spaces() {
        let grid = grid_from_lines(10, &["ab  "]);
        let sb = scrollback_from_lines(&[]);
        let view = BufferView::new(&grid, &sb);
        assert_eq!(view.last_nonblank_col(0), Some(1));
    }

    #[test]
    fn last_nonblank_col_is_none_for_an_entirely_blank_line() {
        let grid = grid_from_lines(10, &["          "]);
        let sb = scrollback_from_lines(&[]);
        let view = BufferView::new(&grid, &sb);
        assert_eq!(view.last_nonblank_col(0), None);
    }

    #[test]
    fn clamp_pulls_an_out_of_range_location_back_onto_the_buffer() {
        let grid = grid_from_lines(5, &["x"]);
        let sb = scrollback_from_lines(&[]);
        let view = BufferView::new(&grid, &sb);
        assert_eq!(view.clamp(CellLocation::new(50, 50)), CellLocation::new(0, 4));
    }
}
