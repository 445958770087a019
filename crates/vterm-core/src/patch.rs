//! Minimal diff between two grid snapshots, and dirty-row tracking for
//! building the render-facing patch without rescanning the whole page.

use crate::cell::Cell;
use crate::grid::Grid;

/// A single changed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: u16,
    pub col: u16,
    pub cell: Cell,
}

/// A contiguous run of changed cells on one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRun {
    pub row: u16,
    pub start_col: u16,
    pub cells: Vec<Cell>,
}

/// A half-open `[start_col, end_col)` span marked dirty on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtySpan {
    pub start_col: u16,
    pub end_col: u16,
}

impl DirtySpan {
    fn union(self, other: DirtySpan) -> DirtySpan {
        DirtySpan {
            start_col: self.start_col.min(other.start_col),
            end_col: self.end_col.max(other.end_col),
        }
    }
}

/// Per-row dirty-span accumulator.
///
/// Cheap to mark (amortized O(1) per call); `take_row` clears the row's
/// span so the next frame starts clean.
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    rows: Vec<Option<DirtySpan>>,
}

impl DirtyTracker {
    pub fn new(rows: u16) -> Self {
        Self {
            rows: vec![None; rows as usize],
        }
    }

    pub fn resize(&mut self, rows: u16) {
        self.rows.resize(rows as usize, None);
    }

    pub fn mark(&mut self, row: u16, col: u16) {
        self.mark_range(row, col, col + 1);
    }

    pub fn mark_range(&mut self, row: u16, start_col: u16, end_col: u16) {
        let Some(slot) = self.rows.get_mut(row as usize) else {
            return;
        };
        let span = DirtySpan {
            start_col,
            end_col,
        };
        *slot = Some(match *slot {
            Some(existing) => existing.union(span),
            None => span,
        });
    }

    pub fn mark_all(&mut self, row: u16, cols: u16) {
        self.mark_range(row, 0, cols);
    }

    pub fn is_dirty(&self, row: u16) -> bool {
        self.rows.get(row as usize).is_some_and(Option::is_some)
    }

    pub fn take_row(&mut self, row: u16) -> Option<DirtySpan> {
        self.rows.get_mut(row as usize).and_then(Option::take)
    }

    pub fn clear(&mut self) {
        for slot in &mut self.rows {
            *slot = None;
        }
    }
}

/// The set of changed cells between two grid snapshots, grouped into
/// per-row contiguous runs.
#[derive(Debug, Clone, Default)]
pub struct GridDiff {
    pub runs: Vec<ChangeRun>,
}

impl GridDiff {
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn cell_updates(&self) -> impl Iterator<Item = CellUpdate> + '_ {
        self.runs.iter().flat_map(|run| {
            run.cells.iter().enumerate().map(move |(i, &cell)| CellUpdate {
                row: run.row,
                col: run.start_col + i as u16,
                cell,
            })
        })
    }
}

/// Diffing entry point: compares two same-sized grids cell by cell and
/// groups contiguous differences into runs.
pub struct Patch;

impl Patch {
    pub fn diff(before: &Grid, after: &Grid) -> GridDiff {
        let mut runs = Vec::new();
        if before.cols() != after.cols() || before.rows() != after.rows() {
            // Size mismatch: the caller should have resized before diffing;
            // treat every row in `after` as fully dirty.
            for row in 0..after.rows() {
                if let Some(cells) = after.row_cells(row) {
                    runs.push(ChangeRun {
                        row,
                        start_col: 0,
                        cells: cells.to_vec(),
                    });
                }
            }
            return GridDiff { runs };
        }

        for row in 0..after.rows() {
            let (Some(before_row), Some(after_row)) =
                (before.row_cells(row), after.row_cells(row))
            else {
                continue;
            };
            let mut col = 0u16;
            while (col as usize) < after_row.len() {
                if before_row[col as usize] == after_row[col as usize] {
                    col += 1;
                    continue;
                }
                let start = col;
                let mut cells = Vec::new();
                while (col as usize) < after_row.len()
                    && before_row[col as usize] != after_row[col as usize]
                {
                    cells.push(after_row[col as usize]);
                    col += 1;
                }
                runs.push(ChangeRun {
                    row,
                    start_col: start,
                    cells,
                });
            }
        }
        GridDiff { runs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_of_identical_grids_is_empty() {
        let a = Grid::new(10, 3);
        let b = Grid::new(10, 3);
        assert!(Patch::diff(&a, &b).is_empty());
    }

    #[test]
    fn diff_finds_single_changed_run() {
        let before = Grid::new(10, 3);
        let mut after = Grid::new(10, 3);
        after.write_printable(1, 2, 'X', Default::default());
        after.write_printable(1, 3, 'Y', Default::default());
        let diff = Patch::diff(&before, &after);
        assert_eq!(diff.runs.len(), 1);
        let run = &diff.runs[0];
        assert_eq!(run.row, 1);
        assert_eq!(run.start_col, 2);
        assert_eq!(run.cells.len(), 2);
    }

    #[test]
    fn dirty_tracker_unions_overlapping_marks() {
        let mut tracker = DirtyTracker::new(2);
        tracker.mark(0, 3);
        tracker.mark_range(0, 1, 5);
        let span = tracker.take_row(0).unwrap();
        assert_eq!(span, DirtySpan { start_col: 1, end_col: 5 });
        assert!(tracker.take_row(0).is_none());
    }

    #[test]
    fn dirty_tracker_mark_all_covers_full_row() {
        let mut tracker = DirtyTracker::new(1);
        tracker.mark_all(0, 80);
        assert_eq!(
            tracker.take_row(0).unwrap(),
            DirtySpan { start_col: 0, end_col: 80 }
        );
    }
}
