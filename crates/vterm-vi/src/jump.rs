//! Bounded jump-list stack.

use crate::buffer::CellLocation;

const DEFAULT_CAPACITY: usize = 100;

/// Bounded stack of [`CellLocation`] entries with a cursor into it,
/// supporting vi's "jump back" (`Ctrl-O`) / "jump forward" (`Ctrl-I`).
#[derive(Debug, Clone)]
pub struct JumpHistory {
    entries: Vec<CellLocation>,
    /// Index into `entries` of "where we'd land if we jumped forward next".
    /// Equal to `entries.len()` when at the newest point.
    cursor: usize,
    capacity: usize,
}

impl Default for JumpHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl JumpHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::new(), cursor: 0, capacity: capacity.max(1) }
    }

    /// Record `from` as a jump origin. Truncates any forward (redo) history,
    /// matching vim's jumplist semantics: a fresh jump from a non-tip
    /// position discards the old forward entries.
    pub fn push(&mut self, from: CellLocation) {
        self.entries.truncate(self.cursor);
        if self.entries.last() == Some(&from) {
            return;
        }
        self.entries.push(from);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len();
    }

    /// `Ctrl-O`: jump to the previous location, pushing `current` so a
    /// subsequent `Ctrl-I` can return to it.
    pub fn back(&mut self, current: CellLocation) -> Option<CellLocation> {
        if self.cursor == 0 {
            return None;
        }
        if self.cursor == self.entries.len() {
            self.entries.push(current);
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).copied()
    }

    /// `Ctrl-I`: jump forward again after a `back`.
    pub fn forward(&mut self) -> Option<CellLocation> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).copied()
    }

    /// `` ` ` ``: toggle between the current position and the last jump
    /// point, i.e. top-of-stack.
    pub fn toggle_last(&mut self, current: CellLocation) -> Option<CellLocation> {
        let last = self.entries.last().copied();
        self.push(current);
        last
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_then_forward_round_trips() {
        let mut jh = JumpHistory::default();
        jh.push(CellLocation::new(0, 0));
        jh.push(CellLocation::new(5, 0));
        let back = jh.back(CellLocation::new(10, 0));
        assert_eq!(back, Some(CellLocation::new(5, 0)));
        let back2 = jh.back(CellLocation::new(10, 0));
        assert_eq!(back2, Some(CellLocation::new(0, 0)));
        let fwd = jh.forward();
        assert_eq!(fwd, Some(CellLocation::new(5, 0)));
    }

    #[test]
    fn fresh_jump_truncates_forward_history() {
        let mut jh = JumpHistory::default();
        jh.push(CellLocation::new(0, 0));
        jh.push(CellLocation::new(1, 0));
        jh.back(CellLocation::new(2, 0));
        jh.push(CellLocation::new(3, 0));
        assert_eq!(jh.forward(), None);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut jh = JumpHistory::new(2);
        jh.push(CellLocation::new(0, 0));
        jh.push(CellLocation::new(1, 0));
        jh.push(CellLocation::new(2, 0));
        assert_eq!(jh.entries.len(), 2);
        assert_eq!(jh.entries[0], CellLocation::new(1, 0));
    }
}
