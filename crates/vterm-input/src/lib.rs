//! Keyboard and mouse input: a binding table dispatched first-match-wins
//! against incoming events, and wire-byte encoders for whatever a binding
//! doesn't claim.

#![forbid(unsafe_code)]

pub mod action;
pub mod binding;
pub mod encode;
pub mod event;
pub mod modes;
pub mod mouse;

pub use action::{Action, CopyFormat};
pub use binding::{Binding, BindingTable, MouseInput};
pub use encode::{encode_char, encode_key, encode_paste, EncodeModes};
pub use event::{
    CharEvent, EventKind, InputEvent, Key, KeyEvent, Modifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
pub use modes::{MatchModes, ModeSnapshot, TriState};
pub use mouse::{encode_mouse, TrackingEncoding, TrackingMode};
