//! Host-facing capability set: bell, alerts, title changes, screen-updated
//! notifications, desktop notifications, clipboard writes, "open document",
//! and permission prompts. Mirrors the no-op default pattern
//! [`vterm_core::screen::ScreenEvents`] already uses, one layer up, for
//! concerns a `Terminal` alone can't express (notifications, permission
//! prompts, "a new render frame is ready").

use vterm_input::action::CopyFormat;

use crate::config::Permission;

/// Which permission gate a caller is asking about, out of the three
/// `{Allow, Deny, Ask}` permissions a profile can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    CaptureBuffer,
    ChangeFont,
    DisplayHostWritableStatusLine,
}

/// Host-implemented callbacks. All methods default to no-ops/deny so a
/// caller only overrides what it acts on.
pub trait SessionEvents: Send + Sync {
    fn on_bell(&self) {}
    /// A visual bell or other non-audible alert, carrying free text.
    fn on_alert(&self, _message: &str) {}
    fn on_title_changed(&self, _title: &str) {}
    fn on_icon_name_changed(&self, _name: &str) {}
    /// A new render frame swapped into the ready buffer.
    fn on_screen_updated(&self) {}
    fn on_notify(&self, _title: &str, _body: &str) {}
    fn copy_to_clipboard(&self, _format: CopyFormat, _text: &str) {}
    /// The host-owned clipboard's current text, for `PasteClipboard`. `None`
    /// means empty or inaccessible.
    fn read_clipboard(&self) -> Option<String> {
        None
    }
    /// `gx`/`OpenSelection`-style "open this in the host's viewer"
    /// (URL in a browser, path in a file manager).
    fn open_document(&self, _target: &str) {}
    /// An in-band SSH auth prompt (passphrase/password) the host should
    /// surface and relay keystrokes for via [`crate::Session::write_raw`].
    fn on_auth_prompt(&self, _text: &str) {}
    /// Called only when the configured [`Permission`] for `kind` is
    /// [`Permission::Ask`].
    fn request_permission(&self, _kind: PermissionKind) -> bool {
        false
    }

    // The following have no meaning inside a single terminal session — a
    // profile registry, a config file, a window, a file manager — so the
    // executor just forwards the request and reports the action as applied;
    // what actually happens is entirely up to the host.
    fn on_change_profile(&self, _name: &str) {}
    fn on_new_terminal(&self) {}
    fn on_reload_config(&self, _path: Option<&str>) {}
    fn on_reset_config(&self) {}
    fn on_open_configuration(&self) {}
    fn on_open_file_manager(&self) {}
    fn on_quit(&self) {}
    /// `Search`/`SearchReverse`: the query text comes from a host-owned
    /// search box, so the executor only signals which direction to open it
    /// in and leaves driving `Terminal::search_forward`/`search_backward`
    /// (via the query the host later supplies) to the host.
    fn on_request_search(&self, _reverse: bool) {}
    /// A textual dump of the current screen contents (`ScreenshotVt`).
    fn on_screenshot(&self, _contents: &str) {}
    /// A textual debug dump (`CreateDebugDump`) — state snapshot for bug
    /// reports, format left to the host.
    fn on_debug_dump(&self, _contents: &str) {}
}

/// A permission gate that consults config first and only calls back into
/// the host when the profile says `Ask`.
pub(crate) fn resolve_permission(
    permission: Permission,
    kind: PermissionKind,
    events: &dyn SessionEvents,
) -> bool {
    permission.allows(&mut || events.request_permission(kind))
}

/// A no-op implementation, useful for headless use and tests.
#[derive(Debug, Default)]
pub struct NullSessionEvents;
impl SessionEvents for NullSessionEvents {}
