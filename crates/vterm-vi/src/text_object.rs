//! Text objects: `scope x object` pairs, each resolving to a `[start, end]`
//! span in the combined buffer around the cursor.

use crate::buffer::{BufferView, CellLocation};
use crate::word::{CharClass, WordClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `i`: excludes the delimiters/surrounding whitespace.
    Inner,
    /// `a`: includes them.
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Object {
    Word,
    BigWord,
    Paragraph,
    /// The region bracketed by the nearest marked lines above/below the
    /// cursor.
    LineMark,
    RoundBrackets,
    SquareBrackets,
    CurlyBrackets,
    AngleBrackets,
    SingleQuotes,
    DoubleQuotes,
    BackQuotes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextObjectSpan {
    pub start: CellLocation,
    pub end: CellLocation,
}

/// Resolve `(scope, object)` around `cursor`. `marked_lines` is the sorted
/// set of combined-buffer line indices carrying the `Marked` flag (spec
/// §4.3 "Marks"), consulted only by `LineMark`.
#[must_use]
pub fn resolve(
    buf: &BufferView<'_>,
    words: &WordClassifier,
    cursor: CellLocation,
    scope: Scope,
    object: Object,
    marked_lines: &[u32],
) -> Option<TextObjectSpan> {
    match object {
        Object::Word => word_object(buf, words, cursor, scope, false),
        Object::BigWord => word_object(buf, words, cursor, scope, true),
        Object::Paragraph => paragraph_object(buf, cursor, scope),
        Object::LineMark => line_mark_object(cursor, marked_lines),
        Object::RoundBrackets => pair_object(buf, cursor, scope, '(', ')'),
        Object::SquareBrackets => pair_object(buf, cursor, scope, '[', ']'),
        Object::CurlyBrackets => pair_object(buf, cursor, scope, '{', '}'),
        Object::AngleBrackets => pair_object(buf, cursor, scope, '<', '>'),
        Object::SingleQuotes => quote_object(buf, cursor, scope, '\''),
        Object::DoubleQuotes => quote_object(buf, cursor, scope, '"'),
        Object::BackQuotes => quote_object(buf, cursor, scope, '`'),
    }
}

fn class_at(buf: &BufferView<'_>, words: &WordClassifier, loc: CellLocation, big: bool) -> CharClass {
    let ch = buf.char_at(loc);
    if big {
        if ch == ' ' || ch == '\0' { CharClass::Whitespace } else { CharClass::Word }
    } else {
        words.classify(ch)
    }
}

fn word_object(
    buf: &BufferView<'_>,
    words: &WordClassifier,
    cursor: CellLocation,
    scope: Scope,
    big: bool,
) -> Option<TextObjectSpan> {
    let cols = buf.cols();
    if cols == 0 {
        return None;
    }
    let class = class_at(buf, words, cursor, big);
    let mut start = cursor.col;
    while start > 0 && class_at(buf, words, CellLocation::new(cursor.line, start - 1), big) == class {
        start -= 1;
    }
    let mut end = cursor.col;
    while end + 1 < cols
        && class_at(buf, words, CellLocation::new(cursor.line, end + 1), big) == class
    {
        end += 1;
    }
    if scope == Scope::A {
        // `a` extends over one run of trailing whitespace, or leading
        // whitespace if there is none trailing (matches vim's `aw`).
        let mut trail_end = end;
        let mut grew = false;
        while trail_end + 1 < cols
            && class_at(buf, words, CellLocation::new(cursor.line, trail_end + 1), big)
                .is_whitespace()
        {
            trail_end += 1;
            grew = true;
        }
        if grew {
            end = trail_end;
        } else {
            while start > 0
                && class_at(buf, words, CellLocation::new(cursor.line, start - 1), big)
                    .is_whitespace()
            {
                start -= 1;
            }
        }
    }
    Some(TextObjectSpan {
        start: CellLocation::new(cursor.line, start),
        end: CellLocation::new(cursor.line, end),
    })
}

fn paragraph_object(
    buf: &BufferView<'_>,
    cursor: CellLocation,
    scope: Scope,
) -> Option<TextObjectSpan> {
    let total = buf.total_lines();
    let is_blank = |l: u32| buf.last_nonblank_col(l).is_none();
    let cur_blank = is_blank(cursor.line);
    let mut start = cursor.line;
    while start > 0 && is_blank(start - 1) == cur_blank {
        start -= 1;
    }
    let mut end = cursor.line;
    while end + 1 < total && is_blank(end + 1) == cur_blank {
        end += 1;
    }
    if scope == Scope::A && end + 1 < total && is_blank(end + 1) == !cur_blank {
        end += 1;
    }
    Some(TextObjectSpan {
        start: CellLocation::new(start, 0),
        end: CellLocation::new(end, buf.cols().saturating_sub(1)),
    })
}

fn line_mark_object(cursor: CellLocation, marked_lines: &[u32]) -> Option<TextObjectSpan> {
    let above = marked_lines.iter().rev().find(|&&l| l <= cursor.line).copied();
    let below = marked_lines.iter().find(|&&l| l > cursor.line).copied();
    let start = above.unwrap_or(cursor.line);
    let end = below.map(|b| b.saturating_sub(1)).unwrap_or(cursor.line);
    Some(TextObjectSpan { start: CellLocation::new(start, 0), end: CellLocation::new(end, 0) })
}

fn pair_object(
    buf: &BufferView<'_>,
    cursor: CellLocation,
    scope: Scope,
    open: char,
    close: char,
) -> Option<TextObjectSpan> {
    let start = walk_to_matching(buf, cursor, open, close, false)?;
    let end = walk_to_matching(buf, cursor, open, close, true)?;
    match scope {
        Scope::A => Some(TextObjectSpan { start, end }),
        Scope::Inner => {
            let inner_start = step_forward_loc(buf, start)?;
            let inner_end = step_backward_loc(end)?;
            if (inner_start.line, inner_start.col) > (inner_end.line, inner_end.col) {
                // Empty pair, e.g. `()`: inner span collapses to the cursor.
                Some(TextObjectSpan { start: inner_start, end: start })
            } else {
                Some(TextObjectSpan { start: inner_start, end: inner_end })
            }
        }
    }
}

/// Walk outward from `cursor`, counting depth, to find the enclosing
/// `open` (if `!forward`) or `close` (if `forward`) token.
fn walk_to_matching(
    buf: &BufferView<'_>,
    cursor: CellLocation,
    open: char,
    close: char,
    forward: bool,
) -> Option<CellLocation> {
    let cur_ch = buf.char_at(cursor);
    if !forward && cur_ch == open {
        return Some(cursor);
    }
    if forward && cur_ch == close {
        return Some(cursor);
    }
    let mut loc = cursor;
    let mut depth = 0i32;
    loop {
        loc = if forward { step_forward_loc(buf, loc)? } else { step_backward_loc(loc)?.also_valid(buf)? };
        let ch = buf.char_at(loc);
        if forward {
            if ch == open {
                depth += 1;
            } else if ch == close {
                if depth == 0 {
                    return Some(loc);
                }
                depth -= 1;
            }
        } else if ch == close {
            depth += 1;
        } else if ch == open {
            if depth == 0 {
                return Some(loc);
            }
            depth -= 1;
        }
    }
}

fn step_forward_loc(buf: &BufferView<'_>, loc: CellLocation) -> Option<CellLocation> {
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

fn step_backward_loc(loc: CellLocation) -> Option<CellLocation> {
    if loc.col > 0 {
        Some(CellLocation::new(loc.line, loc.col - 1))
    } else if loc.line > 0 {
        // Column width isn't known without `buf` here; caller re-validates.
        Some(CellLocation::new(loc.line - 1, u16::MAX))
    } else {
        None
    }
}

trait AlsoValid {
    fn also_valid(self, buf: &BufferView<'_>) -> Option<CellLocation>;
}
impl AlsoValid for CellLocation {
    fn also_valid(self, buf: &BufferView<'_>) -> Option<CellLocation> {
        if self.col == u16::MAX {
            Some(CellLocation::new(self.line, buf.cols().saturating_sub(1)))
        } else {
            Some(self)
        }
    }
}

/// Quotes are same-line only (spec's vim-like semantics): scan left/right
/// on the cursor's line for an unescaped pair straddling the cursor.
fn quote_object(
    buf: &BufferView<'_>,
    cursor: CellLocation,
    scope: Scope,
    quote: char,
) -> Option<TextObjectSpan> {
    let cols = buf.cols();
    let mut positions = Vec::new();
    let mut prev = ' ';
    for col in 0..cols {
        let loc = CellLocation::new(cursor.line, col);
        let ch = buf.char_at(loc);
        if ch == quote && prev != '\\' {
            positions.push(col);
        }
        prev = ch;
    }
    // Find the pair (i, i+1) of positions that straddles the cursor column.
    let mut idx = 0;
    while idx + 1 < positions.len() {
        let (a, b) = (positions[idx], positions[idx + 1]);
        if a <= cursor.col && cursor.col <= b {
            return Some(match scope {
                Scope::A => TextObjectSpan {
                    start: CellLocation::new(cursor.line, a),
                    end: CellLocation::new(cursor.line, b),
                },
                Scope::Inner => {
                    if a + 1 > b.saturating_sub(1) {
                        TextObjectSpan {
                            start: CellLocation::new(cursor.line, a + 1),
                            end: CellLocation::new(cursor.line, a),
                        }
                    } else {
                        TextObjectSpan {
                            start: CellLocation::new(cursor.line, a + 1),
                            end: CellLocation::new(cursor.line, b - 1),
                        }
                    }
                }
            });
        }
        idx += 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::test_support::{grid_from_lines, scrollback_from_lines};

    #[test]
    fn inner_word_selects_current_run() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["foo bar baz"]);
        let buf = BufferView::new(&grid, &sb);
        let words = WordClassifier::default();
        let span = resolve(
            &buf,
            &words,
            CellLocation::new(0, 5),
            Scope::Inner,
            Object::Word,
            &[],
        )
        .unwrap();
        assert_eq!(span.start.col, 4);
        assert_eq!(span.end.col, 6);
    }

    #[test]
    fn inner_round_brackets_excludes_parens() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["(hello world)"]);
        let buf = BufferView::new(&grid, &sb);
        let words = WordClassifier::default();
        let span = resolve(
            &buf,
            &words,
            CellLocation::new(0, 3),
            Scope::Inner,
            Object::RoundBrackets,
            &[],
        )
        .unwrap();
        assert_eq!(span.start.col, 1);
        assert_eq!(span.end.col, 11);
    }

    #[test]
    fn a_round_brackets_includes_parens() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &["(hi)"]);
        let buf = BufferView::new(&grid, &sb);
        let words = WordClassifier::default();
        let span = resolve(
            &buf,
            &words,
            CellLocation::new(0, 1),
            Scope::A,
            Object::RoundBrackets,
            &[],
        )
        .unwrap();
        assert_eq!((span.start.col, span.end.col), (0, 3));
    }

    #[test]
    fn inner_double_quotes_selects_contents() {
        let sb = scrollback_from_lines(&[]);
        let grid = grid_from_lines(20, &[r#"say "hi there" now"#]);
        let buf = BufferView::new(&grid, &sb);
        let words = WordClassifier::default();
        let span = resolve(
            &buf,
            &words,
            CellLocation::new(0, 7),
            Scope::Inner,
            Object::DoubleQuotes,
            &[],
        )
        .unwrap();
        assert_eq!((span.start.col, span.end.col), (5, 12));
    }

    #[test]
    fn line_mark_object_spans_between_marks() {
        let span = line_mark_object(CellLocation::new(5, 0), &[2, 8]).unwrap();
        assert_eq!((span.start.line, span.end.line), (2, 7));
    }
}
