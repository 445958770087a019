//! Double-buffered render model: a frame-sized array of
//! [`RenderCell`]s built from the live grid/scrollback/cursor/image state,
//! with a trivial [`RenderLine`] form for rows a host can blit without a
//! per-cell walk.
//!
//! Grouped runs (`group_start`/`group_end`) generalize the contiguous
//! same-attribute spans [`vterm_core::patch::ChangeRun`] already tracks
//! for dirty-diffing, applied here to every row instead of only changed
//! ones, since a renderer wants run boundaries whether or not the row
//! changed since the last frame.

use vterm_core::{
    Cell, Color, ImageFragmentRef, ScreenState, Scrollback, SgrAttrs, SgrFlags, UnderlineStyle,
};

/// One visible cell, ready for the host's glyph shaper/rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCell {
    pub row: u16,
    pub col: u16,
    /// The cell's grapheme cluster: base codepoint plus any combining marks.
    pub codepoints: String,
    pub fg: Color,
    pub bg: Color,
    pub flags: SgrFlags,
    pub underline: UnderlineStyle,
    pub underline_color: Option<Color>,
    pub image: Option<ImageFragmentRef>,
    /// First cell of a run sharing identical attributes.
    pub group_start: bool,
    /// Last cell of a run sharing identical attributes.
    pub group_end: bool,
    pub cursor_here: bool,
}

/// Trivial form for a row that is entirely one background with no text,
/// image, or cursor — the common case for blank scrollback/viewport rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLine {
    pub row: u16,
    pub cols: u16,
    pub bg: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderRow {
    Cells(Vec<RenderCell>),
    Blank(RenderLine),
}

/// One fully-built frame: one [`RenderRow`] per visible grid row.
#[derive(Debug, Clone, Default)]
pub struct RenderFrame {
    pub cols: u16,
    pub rows: Vec<RenderRow>,
}

impl RenderFrame {
    /// Build the live viewport (no scrollback offset).
    #[must_use]
    pub fn build(screen: &ScreenState, cursor_visible: bool) -> Self {
        Self::build_scrolled(screen, cursor_visible, 0)
    }

    /// Build a frame `scroll_offset` lines back into scrollback history
    /// (`0` is the live viewport, matching `ScrollToBottom`). Offsets
    /// beyond the available history clamp to the oldest possible window.
    /// The cursor never renders while scrolled back, matching how a host
    /// terminal freezes cursor display during a scrollback review.
    #[must_use]
    pub fn build_scrolled(screen: &ScreenState, cursor_visible: bool, scroll_offset: u32) -> Self {
        let cols = screen.grid.cols();
        let row_count = screen.grid.rows();
        let sb_len = screen.scrollback.as_ref().map(Scrollback::len).unwrap_or(0) as u32;
        let offset = scroll_offset.min(sb_len);

        let mut rows = Vec::with_capacity(row_count as usize);
        if offset == 0 {
            for row in 0..row_count {
                let cursor_col = (cursor_visible && screen.cursor.row == row).then_some(screen.cursor.col);
                rows.push(build_row(row, cols, screen.grid.row_cells(row), cursor_col));
            }
        } else {
            for viewport_row in 0..row_count {
                let combined = sb_len - offset + u32::from(viewport_row);
                let cells = combined_row_cells(screen, combined, sb_len);
                rows.push(build_row(viewport_row, cols, cells, None));
            }
        }
        Self { cols, rows }
    }
}

fn combined_row_cells(screen: &ScreenState, combined_line: u32, sb_len: u32) -> Option<&[Cell]> {
    if combined_line < sb_len {
        screen
            .scrollback
            .as_ref()
            .and_then(|sb| sb.get(combined_line as usize))
            .map(|line| line.cells.as_slice())
    } else {
        screen.grid.row_cells((combined_line - sb_len) as u16)
    }
}

fn build_row(row: u16, cols: u16, cells: Option<&[Cell]>, cursor_col: Option<u16>) -> RenderRow {
    let Some(cells) = cells else {
        return RenderRow::Blank(RenderLine { row, cols, bg: Color::Default });
    };

    if cursor_col.is_none() && is_uniform_blank(cells, cols) {
        let bg = cells.first().map(|c| c.attrs.bg).unwrap_or_default();
        return RenderRow::Blank(RenderLine { row, cols, bg });
    }

    let mut out: Vec<RenderCell> = Vec::with_capacity(cols as usize);
    let mut prev_attrs: Option<SgrAttrs> = None;
    for col in 0..cols {
        let cell = cells.get(col as usize).copied().unwrap_or_default();
        if cell.is_wide_continuation() {
            continue;
        }
        let same_run = prev_attrs == Some(cell.attrs);
        if same_run {
            if let Some(last) = out.last_mut() {
                last.group_end = false;
            }
        }
        out.push(RenderCell {
            row,
            col,
            codepoints: cell.grapheme(),
            fg: cell.attrs.fg,
            bg: cell.attrs.bg,
            flags: cell.attrs.flags,
            underline: cell.attrs.underline,
            underline_color: cell.attrs.underline_color,
            image: cell.image,
            group_start: !same_run,
            group_end: true,
            cursor_here: cursor_col == Some(col),
        });
        prev_attrs = Some(cell.attrs);
    }
    RenderRow::Cells(out)
}

fn is_uniform_blank(cells: &[Cell], cols: u16) -> bool {
    let first = cells.first().copied().unwrap_or_default();
    (0..cols).all(|col| {
        let c = cells.get(col as usize).copied().unwrap_or_default();
        c.content() == ' ' && c.combining().is_empty() && c.image.is_none() && c.hyperlink == 0 && c.attrs == first.attrs
    })
}

/// Double-buffered holder: a UI thread reads `ready()` while the I/O
/// thread (or whoever just applied guest bytes) builds the next frame
/// into `current` and atomically swaps it in.
#[derive(Debug, Default)]
pub struct RenderBuffer {
    ready: RenderFrame,
}

impl RenderBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh frame from `screen` and swap it in, returning the
    /// frame that was previously ready.
    pub fn swap(&mut self, screen: &ScreenState, cursor_visible: bool) -> RenderFrame {
        self.swap_scrolled(screen, cursor_visible, 0)
    }

    /// Same as [`Self::swap`], viewing `scroll_offset` lines back into
    /// scrollback.
    pub fn swap_scrolled(&mut self, screen: &ScreenState, cursor_visible: bool, scroll_offset: u32) -> RenderFrame {
        let next = RenderFrame::build_scrolled(screen, cursor_visible, scroll_offset);
        std::mem::replace(&mut self.ready, next)
    }

    #[must_use]
    pub fn ready(&self) -> &RenderFrame {
        &self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vterm_core::Terminal;

    #[test]
    fn blank_row_collapses_to_render_line() {
        let term = Terminal::new(10, 3, 100);
        let frame = RenderFrame::build(term.active(), true);
        match &frame.rows[1] {
            RenderRow::Blank(line) => assert_eq!(line.cols, 10),
            RenderRow::Cells(_) => panic!("expected blank row away from cursor"),
        }
    }

    #[test]
    fn cursor_row_is_expanded_into_cells() {
        let term = Terminal::new(10, 3, 100);
        let frame = RenderFrame::build(term.active(), true);
        match &frame.rows[0] {
            RenderRow::Cells(cells) => {
                assert_eq!(cells.len(), 10);
                assert!(cells[0].cursor_here);
            }
            RenderRow::Blank(_) => panic!("cursor row must expand to cells"),
        }
    }

    #[test]
    fn printed_text_breaks_runs_on_attribute_change() {
        use vterm_core::screen::NullEvents;
        let mut term = Terminal::new(10, 1, 100);
        let mut events = NullEvents;
        term.feed(b"ab\x1b[1mcd", &mut events);
        let frame = RenderFrame::build(term.active(), false);
        let RenderRow::Cells(cells) = &frame.rows[0] else { panic!("expected cells") };
        assert!(!cells[0].group_end, "first of a two-cell run is not the last");
        assert!(cells[1].group_end, "second cell ends the 'ab' run");
        assert!(cells[2].group_start, "bold 'c' starts a new run");
    }

    #[test]
    fn swap_returns_previous_ready_frame() {
        let term = Terminal::new(4, 2, 10);
        let mut buf = RenderBuffer::new();
        let first = buf.swap(term.active(), true);
        assert_eq!(first.rows.len(), 0);
        assert_eq!(buf.ready().rows.len(), 2);
    }

    #[test]
    fn scrolled_offset_pulls_from_scrollback_and_hides_cursor() {
        use vterm_core::screen::NullEvents;
        let mut term = Terminal::new(5, 2, 100);
        let mut events = NullEvents;
        for line in 0..4 {
            let text = format!("{line}\r\n");
            term.feed(text.as_bytes(), &mut events);
        }
        let frame = RenderFrame::build_scrolled(term.active(), true, 2);
        let RenderRow::Cells(cells) = &frame.rows[0] else { panic!("expected cells") };
        assert!(!cells[0].cursor_here);
        assert_eq!(cells[0].codepoints, "0");
    }
}
