//! Binding table: three ordered vectors of `(input, modifiers, modes,
//! actions)` entries, dispatched first-match-wins.

use crate::action::Action;
use crate::event::{Key, Modifiers, MouseButton};
use crate::modes::{MatchModes, ModeSnapshot};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One binding-table entry, generic over the kind of input it matches.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Binding<I> {
    pub input: I,
    pub modifiers: Modifiers,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modes: MatchModes,
    pub actions: Vec<Action>,
}

impl<I> Binding<I> {
    #[must_use]
    pub fn new(input: I, modifiers: Modifiers, modes: MatchModes, actions: Vec<Action>) -> Self {
        Self { input, modifiers, modes, actions }
    }
}

/// A mouse binding matches on the button for press/release/drag kinds, or
/// on a dedicated scroll-direction marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MouseInput {
    Button(MouseButton),
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
}

/// Three ordered binding vectors: `keyMappings`, `charMappings`,
/// `mouseMappings`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BindingTable {
    pub key_mappings: Vec<Binding<Key>>,
    pub char_mappings: Vec<Binding<char>>,
    pub mouse_mappings: Vec<Binding<MouseInput>>,
}

impl BindingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `entries` in order for the first whose input, exact modifier
    /// set, and mode mask all match. Spec §4.5: "If any match runs, the
    /// event is consumed." `all_key_maps_disabled` implements the
    /// `ToggleAllKeyMaps` carve-out.
    #[must_use]
    pub fn find_match<'a, I: PartialEq>(
        entries: &'a [Binding<I>],
        input: &I,
        modifiers: Modifiers,
        snap: ModeSnapshot,
        all_key_maps_disabled: bool,
    ) -> Option<&'a [Action]> {
        entries
            .iter()
            .find(|e| {
                e.input == *input
                    && e.modifiers == modifiers
                    && e.modes.matches(snap)
                    && (!all_key_maps_disabled || e.actions.iter().any(Action::is_toggle_all_key_maps))
            })
            .map(|e| e.actions.as_slice())
    }

    #[must_use]
    pub fn match_key(
        &self,
        key: Key,
        modifiers: Modifiers,
        snap: ModeSnapshot,
        all_key_maps_disabled: bool,
    ) -> Option<&[Action]> {
        Self::find_match(&self.key_mappings, &key, modifiers, snap, all_key_maps_disabled)
    }

    #[must_use]
    pub fn match_char(
        &self,
        ch: char,
        modifiers: Modifiers,
        snap: ModeSnapshot,
        all_key_maps_disabled: bool,
    ) -> Option<&[Action]> {
        Self::find_match(&self.char_mappings, &ch, modifiers, snap, all_key_maps_disabled)
    }

    #[must_use]
    pub fn match_mouse(
        &self,
        input: MouseInput,
        modifiers: Modifiers,
        snap: ModeSnapshot,
        all_key_maps_disabled: bool,
    ) -> Option<&[Action]> {
        Self::find_match(&self.mouse_mappings, &input, modifiers, snap, all_key_maps_disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::TriState;

    #[test]
    fn first_match_wins() {
        let mut table = BindingTable::new();
        table.key_mappings.push(Binding::new(
            Key::Up,
            Modifiers::NONE,
            MatchModes::any(),
            vec![Action::ScrollUp(1)],
        ));
        table.key_mappings.push(Binding::new(
            Key::Up,
            Modifiers::NONE,
            MatchModes::any(),
            vec![Action::ScrollToTop],
        ));
        let actions =
            table.match_key(Key::Up, Modifiers::NONE, ModeSnapshot::default(), false).unwrap();
        assert_eq!(actions, &[Action::ScrollUp(1)]);
    }

    #[test]
    fn mode_mismatch_skips_entry() {
        let mut table = BindingTable::new();
        table.key_mappings.push(Binding::new(
            Key::Escape,
            Modifiers::NONE,
            MatchModes { alternate_screen: TriState::Enabled, ..MatchModes::any() },
            vec![Action::ToggleFullscreen],
        ));
        assert!(table
            .match_key(Key::Escape, Modifiers::NONE, ModeSnapshot::default(), false)
            .is_none());
    }

    #[test]
    fn disabled_key_maps_still_run_toggle_all_key_maps() {
        let mut table = BindingTable::new();
        table.key_mappings.push(Binding::new(
            Key::F(1),
            Modifiers::NONE,
            MatchModes::any(),
            vec![Action::ScrollUp(1)],
        ));
        table.key_mappings.push(Binding::new(
            Key::F(2),
            Modifiers::NONE,
            MatchModes::any(),
            vec![Action::ToggleAllKeyMaps],
        ));
        assert!(table.match_key(Key::F(1), Modifiers::NONE, ModeSnapshot::default(), true).is_none());
        assert!(table.match_key(Key::F(2), Modifiers::NONE, ModeSnapshot::default(), true).is_some());
    }
}
