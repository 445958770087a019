//! Incoming input events: key, char, and mouse, each timestamped for
//! sequence/gesture detection downstream.

use std::time::Instant;

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// Modifier keys held during an event. xterm encodes these as
    /// `1 + (Shift | Alt<<1 | Control<<2 | Meta<<3)` on the wire.
    ///
    /// Serializes via `bitflags`'s own `serde` feature impl (enabled
    /// transitively by this crate's `serde` feature) rather than a local
    /// derive, since the generated struct's inner field is private to the
    /// macro expansion.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE  = 0b0000;
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    /// The xterm wire encoding: `1 + bits`, used as the second CSI
    /// parameter on cursor/function keys and as the SGR mouse button
    /// modifier bits.
    #[must_use]
    pub fn xterm_value(self) -> u32 {
        1 + u32::from(self.bits())
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Press,
    Repeat,
    Release,
}

/// Named (non-printable) keys. `Char` events carry printable text
/// separately, as their own kind distinct from key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Key {
    Enter,
    Escape,
    Backspace,
    Tab,
    BackTab,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    F(u8),
    KeypadEnter,
    KeypadPlus,
    KeypadMinus,
    KeypadMultiply,
    KeypadDivide,
    KeypadDigit(u8),
    KeypadDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub kind: EventKind,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharEvent {
    pub ch: char,
    pub modifiers: Modifiers,
    pub kind: EventKind,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Press(MouseButton),
    Move,
    Drag(MouseButton),
    Release(MouseButton),
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub modifiers: Modifiers,
    /// 0-indexed cell position.
    pub cell_row: u16,
    pub cell_col: u16,
    /// 0-indexed pixel position, when the host can supply it.
    pub pixel_x: u16,
    pub pixel_y: u16,
}

/// One input event as seen by the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    Key(KeyEvent),
    Char(CharEvent),
    Mouse(MouseEvent),
}

impl InputEvent {
    #[must_use]
    pub fn is_release(&self) -> bool {
        match self {
            Self::Key(k) => k.kind == EventKind::Release,
            Self::Char(c) => c.kind == EventKind::Release,
            Self::Mouse(m) => matches!(m.kind, MouseEventKind::Release(_)),
        }
    }
}
