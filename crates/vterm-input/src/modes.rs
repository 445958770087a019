//! `MatchModes`: the tri-state mode filter a binding entry is gated on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One mode flag's required state for a binding to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriState {
    Enabled,
    Disabled,
    #[default]
    Any,
}

impl TriState {
    #[must_use]
    fn matches(self, actual: bool) -> bool {
        match self {
            Self::Enabled => actual,
            Self::Disabled => !actual,
            Self::Any => true,
        }
    }
}

/// The seven mode dimensions a binding can be filtered on, each flag a
/// tri-state `{Enabled, Disabled, Any}` over: AlternateScreen, AppCursor,
/// AppKeypad, Select, Insert, Search, Trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchModes {
    pub alternate_screen: TriState,
    pub app_cursor: TriState,
    pub app_keypad: TriState,
    /// "Select": any selection currently active.
    pub select: TriState,
    /// "Insert": vi mode is in Insert (i.e. vi mode is NOT active), even
    /// though it reads as the inverse of `vterm_vi::Mode::Insert` being
    /// "vi inactive".
    pub insert: TriState,
    /// Pattern-editing (incremental search) is in progress.
    pub search: TriState,
    /// Paused-execution ("trace") mode.
    pub trace: TriState,
}

impl MatchModes {
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }
}

/// The live mode values a binding's [`MatchModes`] is evaluated against,
/// sampled once per dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeSnapshot {
    pub alternate_screen: bool,
    pub app_cursor: bool,
    pub app_keypad: bool,
    pub select: bool,
    pub insert: bool,
    pub search: bool,
    pub trace: bool,
}

impl MatchModes {
    #[must_use]
    pub fn matches(&self, snap: ModeSnapshot) -> bool {
        self.alternate_screen.matches(snap.alternate_screen)
            && self.app_cursor.matches(snap.app_cursor)
            && self.app_keypad.matches(snap.app_keypad)
            && self.select.matches(snap.select)
            && self.insert.matches(snap.insert)
            && self.search.matches(snap.search)
            && self.trace.matches(snap.trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_everything() {
        let m = MatchModes::any();
        assert!(m.matches(ModeSnapshot::default()));
        assert!(m.matches(ModeSnapshot { alternate_screen: true, ..Default::default() }));
    }

    #[test]
    fn enabled_requires_true() {
        let m = MatchModes { alternate_screen: TriState::Enabled, ..Default::default() };
        assert!(!m.matches(ModeSnapshot::default()));
        assert!(m.matches(ModeSnapshot { alternate_screen: true, ..Default::default() }));
    }

    #[test]
    fn disabled_requires_false() {
        let m = MatchModes { search: TriState::Disabled, ..Default::default() };
        assert!(m.matches(ModeSnapshot::default()));
        assert!(!m.matches(ModeSnapshot { search: true, ..Default::default() }));
    }
}
