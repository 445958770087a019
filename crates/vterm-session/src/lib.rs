//! Session orchestration: the glue crate that wires PTY, parser, screen,
//! input, and render buffer together. It owns a [`vterm_core::Terminal`], a
//! [`vterm_vi::ViState`], a [`vterm_input::BindingTable`], and a
//! [`vterm_pty::Transport`] behind one reentrant lock, plus the I/O thread
//! that pumps guest bytes through `transport.read -> parser.feed ->
//! screen.apply` and the action executor that answers a closed `Action`
//! set.
//!
//! Every other crate in this workspace is pure logic over borrowed state;
//! this is the one place threads, locks, and host callbacks meet.

pub mod config;
pub mod error;
pub mod events;
mod executor;
pub mod render;
pub mod session;

pub use config::{
    BellConfig, ColorPalette, CursorConfig, CursorConfigByMode, CursorShape, InputMapping,
    PageSize, PaletteColor, Permission, Permissions, Profile, ProfileTarget, SessionConfig,
    StatusDisplayKind,
};
pub use error::SessionError;
pub use events::{NullSessionEvents, PermissionKind, SessionEvents};
pub use render::{RenderBuffer, RenderCell, RenderFrame, RenderLine, RenderRow};
pub use session::Session;
