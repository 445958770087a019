//! Vi motions: cursor-relative moves over the combined buffer, each
//! taking an integer `count`.

use crate::buffer::{BufferView, CellLocation};
use crate::word::{CharClass, WordClassifier};

/// The full set of cursor-relative vi motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    CharLeft,
    CharRight,
    LineUp,
    LineDown,
    LineBegin,
    LineTextBegin,
    LineEnd,
    /// Move to an absolute screen column on the current line (`count`
    /// columns, one-based per the `n|` vi command).
    ScreenColumn,
    FileBegin,
    FileEnd,
    PageTop,
    PageBottom,
    PageCenter,
    PageUp,
    PageDown,
    WordForward,
    WordBackward,
    WordEndForward,
    BigWordForward,
    BigWordBackward,
    BigWordEndForward,
    ParagraphForward,
    ParagraphBackward,
    ParenthesisMatching,
    SearchResultForward,
    SearchResultBackward,
    /// `t`: stop just before `ch`.
    TillBeforeChar(char),
    /// `T`: stop just after `ch`, searching backward.
    TillAfterChar(char),
    /// `f`/`F`: land exactly on `ch`.
    ToChar { ch: char, forward: bool },
    JumpToLastJumpPoint,
    JumpToMarkForward,
    JumpToMarkBackward,
    CenterCursor,
}

impl Motion {
    /// Motions that push the prior location onto the jump list before
    /// moving.
    #[must_use]
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Self::FileBegin
                | Self::FileEnd
                | Self::PageTop
                | Self::PageBottom
                | Self::ParagraphForward
                | Self::ParagraphBackward
                | Self::SearchResultForward
                | Self::SearchResultBackward
                | Self::JumpToMarkForward
                | Self::JumpToMarkBackward
                | Self::JumpToLastJumpPoint
        )
    }
}

/// Per-motion state that must survive across repeats: the last
/// `f`/`F`/`t`/`T` target, for `;`/`,` repeat.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindCharState {
    pub last: Option<Motion>,
}

/// Page geometry needed by page-relative motions (`PageUp`/`PageTop`/...),
/// expressed in viewport rows.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub rows: u16,
    /// Combined-buffer line index of the first visible row (i.e. how many
    /// scrollback lines are currently scrolled past).
    pub top_line: u32,
}

/// Compute the destination of `motion` from `from`, given `count` (already
/// defaulted to 1 by the caller) repetitions.
#[must_use]
pub fn apply(
    buf: &BufferView<'_>,
    words: &WordClassifier,
    viewport: Viewport,
    from: CellLocation,
    motion: Motion,
    count: u32,
) -> CellLocation {
    let count = count.max(1);
    let mut loc = from;
    match motion {
        Motion::CharLeft => loc.col = loc.col.saturating_sub(count as u16),
        Motion::CharRight => {
            let max_col = buf.cols().saturating_sub(1);
            loc.col = (loc.col.saturating_add(count as u16)).min(max_col);
        }
        Motion::LineUp => loc.line = loc.line.saturating_sub(count),
        Motion::LineDown => {
            let max_line = buf.total_lines().saturating_sub(1);
            loc.line = (loc.line + count).min(max_line);
        }
        Motion::LineBegin => loc.col = 0,
        Motion::LineTextBegin => {
            loc.col = first_nonblank(buf, loc.line);
        }
        Motion::LineEnd => {
            loc.col = buf.last_nonblank_col(loc.line).unwrap_or(0);
        }
        Motion::ScreenColumn => {
            loc.col = (count as u16 - 1).min(buf.cols().saturating_sub(1));
        }
        Motion::FileBegin => {
            loc.line = 0;
            loc.col = first_nonblank(buf, 0);
        }
        Motion::FileEnd => {
            loc.line = buf.total_lines().saturating_sub(1);
            loc.col = first_nonblank(buf, loc.line);
        }
        Motion::PageTop => loc.line = viewport.top_line,
        Motion::PageBottom => {
            loc.line = (viewport.top_line + viewport.rows.saturating_sub(1) as u32)
                .min(buf.total_lines().saturating_sub(1));
        }
        Motion::PageCenter => {
            loc.line = (viewport.top_line + (viewport.rows as u32) / 2)
                .min(buf.total_lines().saturating_sub(1));
        }
        Motion::PageUp => {
            let jump = viewport.rows.max(1) as u32 * count;
            loc.line = loc.line.saturating_sub(jump);
        }
        Motion::PageDown => {
            let jump = viewport.rows.max(1) as u32 * count;
            loc.line = (loc.line + jump).min(buf.total_lines().saturating_sub(1));
        }
        Motion::WordForward => {
            for _ in 0..count {
                loc = word_forward(buf, words, loc, false);
            }
        }
        Motion::WordBackward => {
            for _ in 0..count {
                loc = word_backward(buf, words, loc, false);
            }
        }
        Motion::WordEndForward => {
            for _ in 0..count {
                loc = word_end_forward(buf, words, loc, false);
            }
        }
        Motion::BigWordForward => {
            for _ in 0..count {
                loc = word_forward(buf, words, loc, true);
            }
        }
        Motion::BigWordBackward => {
            for _ in 0..count {
                loc = word_backward(buf, words, loc, true);
            }
        }
        Motion::BigWordEndForward => {
            for _ in 0..count {
                loc = word_end_forward(buf, words, loc, true);
            }
        }
        Motion::ParagraphForward => {
            for _ in 0..count {
                loc = paragraph(buf, loc, true);
            }
        }
        Motion::ParagraphBackward => {
            for _ in 0..count {
                loc = paragraph(buf, loc, false);
            }
        }
        Motion::ParenthesisMatching => {
            if let Some(found) = matching_bracket(buf, loc) {
                loc = found;
            }
        }
        Motion::ToChar { ch, forward } => {
            if let Some(found) = find_char(buf, loc, ch, forward, false, count) {
                loc = found;
            }
        }
        Motion::TillBeforeChar(ch) => {
            if let Some(found) = find_char(buf, loc, ch, true, true, count) {
                loc = found;
            }
        }
        Motion::TillAfterChar(ch) => {
            if let Some(found) = find_char(buf, loc, ch, false, true, count) {
                loc = found;
            }
        }
        // Search/jump/center motions are resolved by the caller (they need
        // search state / jump history / viewport-scroll side effects that
        // this pure function doesn't have access to); a no-op default keeps
        // `apply` total over the enum.
        Motion::SearchResultForward
        | Motion::SearchResultBackward
        | Motion::JumpToLastJumpPoint
        | Motion::JumpToMarkForward
        | Motion::JumpToMarkBackward
        | Motion::CenterCursor => {}
    }
    buf.clamp(loc)
}

fn first_nonblank(buf: &BufferView<'_>, line: u32) -> u16 {
    let cols = buf.cols();
    for col in 0..cols {
        let cell = buf.cell(line, col);
        let ch = cell.map(|c| c.content()).unwrap_or(' ');
        if ch != ' ' && ch != '\0' {
            return col;
        }
    }
    0
}

fn class_at(buf: &BufferView<'_>, words: &WordClassifier, loc: CellLocation, big: bool) -> CharClass {
    let ch = buf.char_at(loc);
    if big {
        if ch == ' ' || ch == '\0' {
            CharClass::Whitespace
        } else {
            CharClass::Word
        }
    } else {
        words.classify(ch)
    }
}

fn step_forward(buf: &BufferView<'_>, loc: CellLocation) -> Option<CellLocation> {
    let cols = buf.cols();
    if cols == 0 {
        return None;
    }
    if loc.col + 1 < cols {
        Some(CellLocation::new(loc.line, loc.col + 1))
    } else if loc.line + 1 < buf.total_lines() {
        Some(CellLocation::new(loc.line + 1, 0))
    } else {
        None
    }
}

fn step_backward(buf: &BufferView<'_>, loc: CellLocation) -> Option<CellLocation> {
    if loc.col > 0 {
        Some(CellLocation::new(loc.line, loc.col - 1))
    } else if loc.line > 0 {
        Some(CellLocation::new(loc.line - 1, buf.cols().saturating_sub(1)))
    } else {
        None
    }
}

/// `w`/`W`: next word start.
fn word_forward(
    buf: &BufferView<'_>,
    words: &WordClassifier,
    from: CellLocation,
    big: bool,
) -> CellLocation {
    let mut loc = from;
    let start_class = class_at(buf, words, loc, big);
    // Walk past the current run.
    while let Some(next) = step_forward(buf, loc) {
        loc = next;
        if class_at(buf, words, loc, big) != start_class {
            break;
        }
    }
    // Skip whitespace.
    while class_at(buf, words, loc, big).is_whitespace() {
        match step_forward(buf, loc) {
            Some(next) => loc = next,
            None => break,
        }
    }
    loc
}

/// `b`/`B`: previous word start.
fn word_backward(
    buf: &BufferView<'_>,
    words: &WordClassifier,
    from: CellLocation,
    big: bool,
) -> CellLocation {
    let mut loc = from;
    let Some(mut prev) = step_backward(buf, loc) else { return loc };
    loc = prev;
    while class_at(buf, words, loc, big).is_whitespace() {
        match step_backward(buf, loc) {
            Some(next) => {
                prev = next;
                loc = prev;
            }
            None => return loc,
        }
    }
    let class = class_at(buf, words, loc, big);
    loop {
        let Some(next) = step_backward(buf, loc) else { break };
        if class_at(buf, words, next, big) != class {
            break;
        }
        loc = next;
    }
    loc
}

/// `e`/`E`: end of current/next word.
fn word_end_forward(
    buf: &BufferView<'_>,
    words: &WordClassifier,
    from: CellLocation,
    big: bool,
) -> CellLocation {
    let mut loc = from;
    let Some(first) = step_forward(buf, loc) else { return loc };
    loc = first;
    while class_at(buf, words, loc, big).is_whitespace() {
        match step_forward(buf, loc) {
            Some(next) => loc = next,
            None => return loc,
        }
    }
    let class = class_at(buf, words, loc, big);
    loop {
        let Some(next) = step_forward(buf, loc) else { break };
        if class_at(buf, words, next, big) != class {
            break;
        }
        loc = next;
    }
    loc
}

fn line_is_blank(buf: &BufferView<'_>, line: u32) -> bool {
    buf.last_nonblank_col(line).is_none()
}

fn paragraph(buf: &BufferView<'_>, from: CellLocation, forward: bool) -> CellLocation {
    let total = buf.total_lines();
    let mut line = from.line;
    // Skip the blank run we might already be standing on.
    if forward {
        while line + 1 < total && line_is_blank(buf, line) {
            line += 1;
        }
        while line + 1 < total {
            line += 1;
            if line_is_blank(buf, line) {
                break;
            }
        }
    } else {
        while line > 0 && line_is_blank(buf, line) {
            line -= 1;
        }
        while line > 0 {
            line -= 1;
            if line_is_blank(buf, line) {
                break;
            }
        }
    }
    CellLocation::new(line, 0)
}

const OPEN_BRACKETS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

fn matching_bracket(buf: &BufferView<'_>, from: CellLocation) -> Option<CellLocation> {
    // Scan forward on the current line to find the first bracket at/after
    // the cursor, matching real vi's `%` behavior.
    let cols = buf.cols();
    let mut found = None;
    for col in from.col..cols {
        let probe = CellLocation::new(from.line, col);
        let ch = buf.char_at(probe);
        if OPEN_BRACKETS.iter().any(|(o, c)| *o == ch || *c == ch) {
            found = Some(probe);
            break;
        }
    }
    let mut loc = found?;
    let ch = buf.char_at(loc);
    let (open, close, forward) = OPEN_BRACKETS
        .iter()
        .find_map(|(o, c)| {
            if *o == ch {
                Some((*o, *c, true))
            } else if *c == ch {
                Some((*o, *c, false))
            } else {
                None
            }
        })?;
    let mut depth = 1i32;
    loop {
        let next = if forward { step_forward(buf, loc) } else { step_backward(buf, loc) };
        loc = next?;
        let c = buf.char_at(loc);
        if forward {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
            }
        } else if c == close {
            depth += 1;
        } else if c == open {
            depth -= 1;
        }
        if depth == 0 {
            return Some(loc);
        }
    }
}

fn find_char(
    buf: &BufferView<'_>,
    from: CellLocation,
    target: char,
    forward: bool,
    till: bool,
    count: u32,
) -> Option<CellLocation> {
    let mut loc = from;
    for _ in 0..count {
        loc = find_char_once(buf, loc, target, forward)?;
    }
    if till {
        loc = if forward {
            CellLocation::new(loc.line, loc.col.saturating_sub(1))
        } else {
            CellLocation::new(loc.line, loc.col.saturating_add(1))
        };
    }
    Some(loc)
}

fn find_char_once(
    buf: &BufferView<'_>,
    from: CellLocation,
    target: char,
    forward: bool,
) -> Option<CellLocation> {
    let mut loc = from;
    loop {
        loc = if forward { step_forward(buf, loc)? } else { step_backward(buf, loc)? };
        if loc.line != from.line {
            return None; // f/F/t/T never cross lines.
        }
        if buf.char_at(loc) == target {
            return Some(loc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::test_support::{grid_from_lines, scrollback_from_lines};

    fn view<'a>(grid: &'a vterm_core::Grid, sb: &'a vterm_core::Scrollback) -> BufferView<'a> {
        BufferView::new(grid, sb)
    }

    #[test]
    fn word_forward_skips_to_next_word_across_punctuation() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["foo-bar baz"]);
        let buf = view(&grid, &sb);
        let words = WordClassifier::default();
        let vp = Viewport { rows: 1, top_line: 0 };
        let loc = apply(&buf, &words, vp, CellLocation::new(0, 0), Motion::WordForward, 1);
        assert_eq!(loc, CellLocation::new(0, 3)); // "-" starts a new (Other) run
    }

    #[test]
    fn big_word_forward_only_stops_at_whitespace() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["foo-bar baz"]);
        let buf = view(&grid, &sb);
        let words = WordClassifier::default();
        let vp = Viewport { rows: 1, top_line: 0 };
        let loc = apply(&buf, &words, vp, CellLocation::new(0, 0), Motion::BigWordForward, 1);
        assert_eq!(loc, CellLocation::new(0, 8)); // "baz"
    }

    #[test]
    fn word_end_forward_lands_on_last_char_of_word() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["foo bar"]);
        let buf = view(&grid, &sb);
        let words = WordClassifier::default();
        let vp = Viewport { rows: 1, top_line: 0 };
        let loc = apply(&buf, &words, vp, CellLocation::new(0, 0), Motion::WordEndForward, 1);
        assert_eq!(loc, CellLocation::new(0, 2));
    }

    #[test]
    fn matching_bracket_finds_closing_paren() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["(a(b)c)"]);
        let buf = view(&grid, &sb);
        let words = WordClassifier::default();
        let vp = Viewport { rows: 1, top_line: 0 };
        let loc = apply(&buf, &words, vp, CellLocation::new(0, 0), Motion::ParenthesisMatching, 1);
        assert_eq!(loc, CellLocation::new(0, 6));
    }

    #[test]
    fn find_char_till_before_stops_one_short() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["abcdef"]);
        let buf = view(&grid, &sb);
        let words = WordClassifier::default();
        let vp = Viewport { rows: 1, top_line: 0 };
        let loc = apply(
            &buf,
            &words,
            vp,
            CellLocation::new(0, 0),
            Motion::TillBeforeChar('d'),
            1,
        );
        assert_eq!(loc, CellLocation::new(0, 2));
    }

    #[test]
    fn paragraph_forward_stops_at_blank_line() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(10, &["a", "b", "", "c"]);
        let buf = view(&grid, &sb);
        let words = WordClassifier::default();
        let vp = Viewport { rows: 4, top_line: 0 };
        let loc = apply(&buf, &words, vp, CellLocation::new(0, 0), Motion::ParagraphForward, 1);
        assert_eq!(loc.line, 2);
    }
}
