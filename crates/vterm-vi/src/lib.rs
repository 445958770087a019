#![forbid(unsafe_code)]

//! Vi-like modal cursor layer over a `vterm-core` grid + scrollback.
//!
//! Spec §4.4: vi mode is a property of the terminal; the cursor in
//! non-Insert modes is an independent [`buffer::CellLocation`], not coupled
//! to the PTY cursor. This crate is pure logic over borrowed
//! `vterm-core` state — no I/O, no clipboard, no PTY access. Host-facing
//! effects (yank-to-clipboard, hyperlink open, reverse search, paste) are
//! returned as [`state::ViEffect`] values for the session layer to act on.

pub mod buffer;
pub mod jump;
pub mod motion;
pub mod state;
pub mod text_object;
pub mod word;

pub use buffer::{BufferView, CellLocation};
pub use jump::JumpHistory;
pub use motion::{Motion, Viewport};
pub use state::{Mode, Operator, RealCursorSnapshot, ViEffect, ViState};
pub use text_object::{Object, Scope, TextObjectSpan};
pub use word::{CharClass, WordClassifier};
