//! Configuration surface consumed from an external config collaborator.
//! These are plain `serde`-derived structs; no file-format parsing lives
//! here — that is the collaborator's job, keeping `vterm-core` free of a
//! format-specific dependency.
//!
//! Types here mirror a handful of `vterm-core`/`vterm-input` enums
//! rather than reusing them directly, since those crates stay
//! config-format-agnostic (no `serde` dependency in `vterm-core`).
//! `From`/`Into` conversions bridge the two at session construction time.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vterm_core::{Color, StatusDisplay};
use vterm_input::{BindingTable, Modifiers, MouseButton};

/// A permission gate: `captureBuffer`, `changeFont`, and
/// `displayHostWritableStatusLine` each resolve to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Allow,
    Deny,
    Ask,
}

impl Permission {
    /// `Ask` degrades to `Deny` here: there is no UI collaborator in
    /// this crate to pose the question to, so a host that wants the
    /// interactive prompt answers it itself and passes `Allow`/`Deny`
    /// through, or overrides [`crate::session::SessionEvents::ask_permission`].
    #[must_use]
    pub fn allows(self, asked: &mut dyn FnMut() -> bool) -> bool {
        match self {
            Self::Allow => true,
            Self::Deny => false,
            Self::Ask => asked(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub capture_buffer: Permission,
    pub change_font: Permission,
    pub display_host_writable_status_line: Permission,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            capture_buffer: Permission::Allow,
            change_font: Permission::Allow,
            display_host_writable_status_line: Permission::Ask,
        }
    }
}

/// Mirrors [`vterm_core::StatusDisplay`] for config purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusDisplayKind {
    #[default]
    None,
    Indicator,
    HostWritable,
}

impl From<StatusDisplayKind> for StatusDisplay {
    fn from(kind: StatusDisplayKind) -> Self {
        match kind {
            StatusDisplayKind::None => Self::None,
            StatusDisplayKind::Indicator => Self::Indicator,
            StatusDisplayKind::HostWritable => Self::HostWritable,
        }
    }
}

/// Mirrors [`vterm_core::Color`]; `vterm-core` has no `serde` feature
/// of its own (kept config-format-agnostic), so the palette lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaletteColor {
    Default,
    Named(u8),
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl From<PaletteColor> for Color {
    fn from(c: PaletteColor) -> Self {
        match c {
            PaletteColor::Default => Self::Default,
            PaletteColor::Named(n) => Self::Named(n),
            PaletteColor::Indexed(n) => Self::Indexed(n),
            PaletteColor::Rgb(r, g, b) => Self::Rgb(r, g, b),
        }
    }
}

/// 16 ANSI named colors plus default foreground/background. `vterm-core`
/// consumes this only indirectly, through `SgrAttrs::default()` colors
/// already being `Color::Default`; the palette's job is resolving
/// `Named`/`Indexed` entries to RGB for the render-buffer collaborator,
/// which is why it lives in config rather than `vterm-core`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub foreground: PaletteColor,
    pub background: PaletteColor,
    pub ansi: [PaletteColor; 16],
}

impl Default for ColorPalette {
    fn default() -> Self {
        let ansi = [
            PaletteColor::Rgb(0x00, 0x00, 0x00),
            PaletteColor::Rgb(0xcd, 0x00, 0x00),
            PaletteColor::Rgb(0x00, 0xcd, 0x00),
            PaletteColor::Rgb(0xcd, 0xcd, 0x00),
            PaletteColor::Rgb(0x00, 0x00, 0xee),
            PaletteColor::Rgb(0xcd, 0x00, 0xcd),
            PaletteColor::Rgb(0x00, 0xcd, 0xcd),
            PaletteColor::Rgb(0xe5, 0xe5, 0xe5),
            PaletteColor::Rgb(0x7f, 0x7f, 0x7f),
            PaletteColor::Rgb(0xff, 0x00, 0x00),
            PaletteColor::Rgb(0x00, 0xff, 0x00),
            PaletteColor::Rgb(0xff, 0xff, 0x00),
            PaletteColor::Rgb(0x5c, 0x5c, 0xff),
            PaletteColor::Rgb(0xff, 0x00, 0xff),
            PaletteColor::Rgb(0x00, 0xff, 0xff),
            PaletteColor::Rgb(0xff, 0xff, 0xff),
        ];
        Self { foreground: PaletteColor::Default, background: PaletteColor::Default, ansi }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorConfig {
    pub shape: CursorShape,
    pub blinking: bool,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self { shape: CursorShape::Block, blinking: true }
    }
}

/// Cursor config per input mode: Insert mode (normal PTY pass-through)
/// typically gets a blinking bar, Normal/Visual a steady block, matching
/// common vi-mode terminal conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorConfigByMode {
    pub insert: CursorConfig,
    pub normal: CursorConfig,
    pub visual: CursorConfig,
}

impl Default for CursorConfigByMode {
    fn default() -> Self {
        Self {
            insert: CursorConfig { shape: CursorShape::Bar, blinking: true },
            normal: CursorConfig { shape: CursorShape::Block, blinking: false },
            visual: CursorConfig { shape: CursorShape::Block, blinking: false },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BellConfig {
    pub audible: bool,
    pub visual: bool,
}

impl Default for BellConfig {
    fn default() -> Self {
        Self { audible: true, visual: false }
    }
}

/// A page size in cells, mirroring [`vterm_pty::PageSize`] (kept
/// distinct so this crate's serde derive doesn't leak into `vterm-pty`,
/// which has no use for it beyond this one conversion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub cols: u16,
    pub rows: u16,
}

impl From<PageSize> for vterm_pty::PageSize {
    fn from(p: PageSize) -> Self {
        Self { cols: p.cols, rows: p.rows }
    }
}

/// Where the child process's bytes come from: a local shell, or an SSH
/// host. Mirrors [`vterm_pty::SshConfig`] minus the fields that aren't
/// meaningfully `serde`-able session config (forward_agent/env are kept;
/// `initial_size` is supplied separately by [`Profile::initial_size`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProfileTarget {
    Shell { program: String, args: Vec<String> },
    Ssh {
        host: String,
        port: u16,
        username: String,
        known_hosts_path: PathBuf,
        private_key_path: Option<PathBuf>,
        public_key_path: Option<PathBuf>,
        forward_agent: bool,
        term: String,
        env: Vec<(String, String)>,
    },
}

/// The default profile: everything the core needs to start one
/// terminal session that isn't a key/char/mouse binding list (those are
/// [`InputMappings`], kept as a separate top-level field since they are
/// typically shared across profiles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub target: ProfileTarget,
    pub initial_size: PageSize,
    /// `None` means unbounded scrollback.
    pub scrollback_capacity: Option<usize>,
    pub reflow_on_resize: bool,
    pub frozen_modes: Vec<u16>,
    pub bell: BellConfig,
    pub mouse_selection_button: MouseButton,
    pub bypass_mouse_protocol_modifier: Modifiers,
    pub word_delimiters: Vec<char>,
    pub cursor: CursorConfigByMode,
    pub highlight_timeout: Duration,
    pub permissions: Permissions,
    pub initial_status_display: StatusDisplayKind,
    pub palette: ColorPalette,
    pub max_image_size: (u32, u32),
    pub max_image_color_registers: u32,
    pub sixel_scrolling_default: bool,
    /// Whether this profile is allowed to spawn further terminals from
    /// actions like `NewTerminal`.
    pub spawn_new_process: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            target: ProfileTarget::Shell { program: default_shell(), args: Vec::new() },
            initial_size: PageSize { cols: 80, rows: 24 },
            scrollback_capacity: Some(10_000),
            reflow_on_resize: true,
            frozen_modes: Vec::new(),
            bell: BellConfig::default(),
            mouse_selection_button: MouseButton::Left,
            bypass_mouse_protocol_modifier: Modifiers::SHIFT,
            word_delimiters: Vec::new(),
            cursor: CursorConfigByMode::default(),
            highlight_timeout: Duration::from_millis(150),
            permissions: Permissions::default(),
            initial_status_display: StatusDisplayKind::None,
            palette: ColorPalette::default(),
            max_image_size: (4096, 4096),
            max_image_color_registers: 1024,
            sixel_scrolling_default: true,
            spawn_new_process: true,
        }
    }
}

#[cfg(unix)]
fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

#[cfg(not(unix))]
fn default_shell() -> String {
    "sh".to_string()
}

/// The three binding vectors (key, char, mouse), a thin named wrapper
/// around [`BindingTable`] so config files can name this field
/// distinctly from the profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputMapping(pub BindingTable);

/// Everything a session needs to start: one profile plus the shared
/// input-binding table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub profile: Profile,
    pub bindings: InputMapping,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { profile: Profile::default(), bindings: InputMapping::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_allow_never_calls_the_ask_closure() {
        let mut called = false;
        assert!(Permission::Allow.allows(&mut || {
            called = true;
            false
        }));
        assert!(!called);
    }

    #[test]
    fn permission_ask_defers_to_closure() {
        assert!(Permission::Ask.allows(&mut || true));
        assert!(!Permission::Ask.allows(&mut || false));
    }

    #[test]
    fn default_profile_has_sane_page_size_and_permissions() {
        let profile = Profile::default();
        assert_eq!(profile.initial_size, PageSize { cols: 80, rows: 24 });
        assert_eq!(profile.permissions.display_host_writable_status_line, Permission::Ask);
        assert!(matches!(profile.target, ProfileTarget::Shell { .. }));
    }
}
