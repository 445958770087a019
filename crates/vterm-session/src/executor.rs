//! The action executor: handlers are pure methods on the session; each
//! returns a bool indicating whether the action applied.
//!
//! Kept as a free function rather than inherent `Session` methods so the
//! one `match` over [`Action`]'s closed set lives in a single place,
//! mirroring how [`vterm_core::commands`] keeps its function-dispatch
//! table in one module rather than scattered across handler impls.

use vterm_core::screen::NullEvents;
use vterm_core::selection::{BufferPos, Selection, SelectionShape};
use vterm_core::Scrollback;
use vterm_input::{Action, CopyFormat};

use crate::events::{self, PermissionKind};
use crate::session::Session;

/// `ToggleAllKeyMaps` is honored specially even when key
/// mappings are globally disabled; every other binding is already
/// filtered out before `dispatch` is reached (see
/// [`crate::session::Session::handle_key`]), so this function only needs
/// to implement the actions themselves.
pub(crate) fn dispatch(session: &Session, action: &Action) -> bool {
    match action {
        Action::CancelSelection => cancel_selection(session),
        Action::ChangeProfile(name) => {
            session.shared_events().on_change_profile(name);
            true
        }
        Action::ClearHistoryAndReset => {
            session.with_state_mut(|state| {
                state.term.clear_scrollback();
                state.term.feed(b"\x1bc", &mut NullEvents);
                state.scroll_offset = 0;
            });
            session.refresh_render();
            true
        }
        Action::CopyPreviousMarkRange => copy_previous_mark_range(session),
        Action::CopySelection(format) => copy_selection(session, *format),
        Action::CreateDebugDump => {
            let dump = session.with_state_mut(|state| debug_dump(state));
            session.shared_events().on_debug_dump(&dump);
            true
        }
        Action::DecreaseFontSize => adjust_font_scale(session, -0.1),
        Action::IncreaseFontSize => adjust_font_scale(session, 0.1),
        Action::ResetFontSize => adjust_font_scale_absolute(session, 1.0),
        Action::DecreaseOpacity => adjust_opacity(session, -0.1),
        Action::IncreaseOpacity => adjust_opacity(session, 0.1),
        Action::FocusNextSearchMatch => focus_search(session, true),
        Action::FocusPreviousSearchMatch => focus_search(session, false),
        Action::FollowHyperlink => follow_hyperlink(session),
        Action::NewTerminal => {
            let allowed = session.with_state_mut(|state| state.profile.spawn_new_process);
            if allowed {
                session.shared_events().on_new_terminal();
            }
            allowed
        }
        Action::NoSearchHighlight => {
            session.with_state_mut(|state| state.term.search = Default::default());
            session.refresh_render();
            true
        }
        Action::OpenConfiguration => {
            session.shared_events().on_open_configuration();
            true
        }
        Action::OpenFileManager => {
            session.shared_events().on_open_file_manager();
            true
        }
        Action::OpenSelection => open_selection(session),
        Action::PasteClipboard { strip } => paste_clipboard(session, *strip),
        Action::PasteSelection => paste_selection(session),
        Action::Quit => {
            session.shared_events().on_quit();
            true
        }
        Action::ReloadConfig(path) => {
            session.shared_events().on_reload_config(path.as_deref());
            true
        }
        Action::ResetConfig => {
            session.shared_events().on_reset_config();
            true
        }
        Action::ScreenshotVt => {
            let text = session.with_state_mut(|state| screen_text(state));
            session.shared_events().on_screenshot(&text);
            true
        }
        Action::ScrollUp(n) => session.scroll_by(i64::from(*n)),
        Action::ScrollDown(n) => session.scroll_by(-i64::from(*n)),
        Action::ScrollPageUp => {
            let rows = session.with_state_mut(|state| i64::from(state.term.active().grid.rows()));
            session.scroll_by(rows)
        }
        Action::ScrollPageDown => {
            let rows = session.with_state_mut(|state| i64::from(state.term.active().grid.rows()));
            session.scroll_by(-rows)
        }
        Action::ScrollMarkUp => scroll_to_mark(session, true),
        Action::ScrollMarkDown => scroll_to_mark(session, false),
        Action::ScrollOneUp => session.scroll_by(1),
        Action::ScrollOneDown => session.scroll_by(-1),
        Action::ScrollToTop => {
            let max = session.with_state_mut(|state| state.scrollback_len());
            session.scroll_to(max)
        }
        Action::ScrollToBottom => session.scroll_to(0),
        Action::Search => {
            session.shared_events().on_request_search(false);
            true
        }
        Action::SearchReverse => {
            session.shared_events().on_request_search(true);
            true
        }
        Action::SendChars(text) => {
            session.write_raw(text.as_bytes()).is_ok()
        }
        Action::ToggleAllKeyMaps => {
            session.with_state_mut(|state| state.all_key_maps_disabled = !state.all_key_maps_disabled);
            true
        }
        Action::ToggleFullscreen => {
            session.with_state_mut(|state| state.fullscreen = !state.fullscreen);
            true
        }
        Action::ToggleInputProtection => {
            session.with_state_mut(|state| state.input_protection = !state.input_protection);
            session.refresh_render();
            true
        }
        Action::ToggleStatusLine => {
            session.with_state_mut(|state| state.status_line_visible = !state.status_line_visible);
            true
        }
        Action::ToggleTitleBar => {
            session.with_state_mut(|state| state.title_bar_visible = !state.title_bar_visible);
            true
        }
        Action::TraceEnter => {
            session.with_state_mut(|state| state.trace.active = true);
            true
        }
        Action::TraceLeave => {
            session.with_state_mut(|state| state.trace.active = false);
            true
        }
        Action::TraceStep | Action::TraceBreakAtEmptyQueue => {
            // Single-stepping/breakpoint scheduling has no meaning without a
            // paused executor loop to step; tracked here only as a mode bit
            // (`MatchModes::trace`) that bindings can gate on.
            session.with_state_mut(|state| state.trace.active)
        }
        Action::ViNormalMode => {
            session.vi_enter_normal();
            true
        }
        Action::WriteScreen(text) => {
            session.apply_bytes(text.as_bytes());
            true
        }
    }
}

fn cancel_selection(session: &Session) -> bool {
    let had_selection = session.with_state_mut(|state| {
        let had = state.term.selection.is_some() || state.vi.selection().is_some();
        state.term.selection = None;
        state.vi.exit_visual();
        had
    });
    if had_selection {
        session.refresh_render();
    }
    had_selection
}

/// Either the vi-layer's visual-mode selection or the plain mouse
/// selection, whichever is active. Vi selection takes priority since it
/// reflects the more deliberate, keyboard-driven choice.
fn active_selection(state: &crate::session::SessionState) -> Option<Selection> {
    state.vi.selection().or(state.term.selection)
}

fn extract_selection_text(state: &crate::session::SessionState, selection: Selection) -> String {
    let screen = state.term.active();
    let empty;
    let scrollback = match screen.scrollback.as_ref() {
        Some(sb) => sb,
        None => {
            empty = Scrollback::new(0);
            &empty
        }
    };
    selection.extract_text(&screen.grid, scrollback)
}

fn copy_selection(session: &Session, format: CopyFormat) -> bool {
    let text = session.with_state_mut(|state| active_selection(state).map(|sel| extract_selection_text(state, sel)));
    match text {
        Some(text) => {
            session.shared_events().copy_to_clipboard(format, &text);
            true
        }
        None => false,
    }
}

/// Extracts the text between the two most recent shell-integration marks
/// (OSC 133 prompt starts), i.e. the previous command's full output
/// block.
fn copy_previous_mark_range(session: &Session) -> bool {
    let text = session.with_state_mut(|state| {
        let marks = &state.marks;
        if marks.len() < 2 {
            return None;
        }
        let start = marks[marks.len() - 2];
        let end = marks[marks.len() - 1];
        let selection = Selection::with_shape(start, end, SelectionShape::Linear).normalized();
        Some(extract_selection_text(state, selection))
    });
    match text {
        Some(text) => {
            session.shared_events().copy_to_clipboard(CopyFormat::PlainText, &text);
            true
        }
        None => false,
    }
}

fn change_font_allowed(session: &Session) -> bool {
    let permission = session.with_state_mut(|state| state.profile.permissions.change_font);
    events::resolve_permission(permission, PermissionKind::ChangeFont, session.shared_events().as_ref())
}

fn adjust_font_scale(session: &Session, delta: f32) -> bool {
    if !change_font_allowed(session) {
        return false;
    }
    session.with_state_mut(|state| state.font_scale = (state.font_scale + delta).clamp(0.25, 4.0));
    true
}

fn adjust_font_scale_absolute(session: &Session, value: f32) -> bool {
    if !change_font_allowed(session) {
        return false;
    }
    session.with_state_mut(|state| state.font_scale = value);
    true
}

fn adjust_opacity(session: &Session, delta: f32) -> bool {
    session.with_state_mut(|state| state.opacity = (state.opacity + delta).clamp(0.1, 1.0));
    true
}

fn focus_search(session: &Session, forward: bool) -> bool {
    let found = session.with_state_mut(|state| {
        let query = state.term.search.query.clone();
        if query.is_empty() {
            return None;
        }
        if forward {
            state.term.search_forward(&query)
        } else {
            state.term.search_backward(&query)
        }
    });
    if found.is_some() {
        session.refresh_render();
    }
    found.is_some()
}

fn follow_hyperlink(session: &Session) -> bool {
    let uri = session.with_state_mut(|state| {
        let screen = state.term.active();
        let cell = screen.grid.cell(screen.cursor.row, screen.cursor.col)?;
        if cell.hyperlink == 0 {
            return None;
        }
        screen.hyperlinks.get(cell.hyperlink).map(str::to_string)
    });
    match uri {
        Some(uri) => {
            session.shared_events().open_document(&uri);
            true
        }
        None => false,
    }
}

fn open_selection(session: &Session) -> bool {
    let text = session.with_state_mut(|state| active_selection(state).map(|sel| extract_selection_text(state, sel)));
    match text {
        Some(text) if !text.trim().is_empty() => {
            session.shared_events().open_document(text.trim());
            true
        }
        _ => false,
    }
}

fn paste_clipboard(session: &Session, strip: bool) -> bool {
    let Some(mut text) = session.shared_events().read_clipboard() else { return false };
    if strip {
        text = text.trim_end_matches(['\n', '\r']).to_string();
    }
    session.paste(&text);
    true
}

/// Paste the currently active selection (the X11 "primary selection"
/// convention: whatever is selected is immediately available to paste,
/// distinct from an explicit copy to the clipboard register).
fn paste_selection(session: &Session) -> bool {
    let text = session.with_state_mut(|state| active_selection(state).map(|sel| extract_selection_text(state, sel)));
    match text {
        Some(text) if !text.is_empty() => {
            session.paste(&text);
            true
        }
        _ => false,
    }
}

fn scroll_to_mark(session: &Session, up: bool) -> bool {
    let target = session.with_state_mut(|state| {
        let sb_len = state.scrollback_len();
        let current = sb_len.saturating_sub(state.scroll_offset);
        let lines: Vec<u32> = state.marks.iter().map(|m| m.line).collect();
        if up {
            lines.into_iter().filter(|&l| l < current).max()
        } else {
            lines.into_iter().filter(|&l| l > current).min()
        }
        .map(|line| sb_len.saturating_sub(line))
    });
    match target {
        Some(offset) => session.scroll_to(offset),
        None => false,
    }
}

fn debug_dump(state: &crate::session::SessionState) -> String {
    let screen = state.term.active();
    format!(
        "cursor=({}, {}) alt_screen={} mode={:?} scroll_offset={}\n{}",
        screen.cursor.row,
        screen.cursor.col,
        state.term.is_alt_screen(),
        state.vi.mode,
        state.scroll_offset,
        screen_text(state)
    )
}

fn screen_text(state: &crate::session::SessionState) -> String {
    let screen = state.term.active();
    let cols = screen.grid.cols();
    (0..screen.grid.rows())
        .map(|row| {
            screen
                .grid
                .row_cells(row)
                .map(|cells| cells.iter().take(cols as usize).map(|c| c.content()).collect::<String>())
                .unwrap_or_else(|| " ".repeat(cols as usize))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::{Profile, ProfileTarget, SessionConfig};
    use crate::events::NullSessionEvents;

    fn test_session() -> Session {
        let mut profile = Profile::default();
        profile.target = ProfileTarget::Shell { program: "true".into(), args: Vec::new() };
        let config = SessionConfig { profile, bindings: Default::default() };
        Session::new(config, Arc::new(NullSessionEvents))
    }

    #[test]
    fn cancel_selection_reports_false_when_nothing_selected() {
        let session = test_session();
        assert!(!dispatch(&session, &Action::CancelSelection));
    }

    #[test]
    fn copy_selection_with_active_selection_copies_text() {
        let session = test_session();
        session.apply_bytes(b"hello");
        session.with_state_mut(|state| {
            state.term.selection = Some(Selection::new(BufferPos::new(0, 0), BufferPos::new(0, 4)));
        });
        assert!(dispatch(&session, &Action::CopySelection(CopyFormat::PlainText)));
    }

    #[test]
    fn reset_font_size_restores_default_scale() {
        let session = test_session();
        session.with_state_mut(|state| state.font_scale = 2.0);
        assert!(dispatch(&session, &Action::ResetFontSize));
        session.with_state_mut(|state| assert_eq!(state.font_scale, 1.0));
    }

    #[test]
    fn toggle_all_key_maps_flips_the_flag() {
        let session = test_session();
        assert!(dispatch(&session, &Action::ToggleAllKeyMaps));
        session.with_state_mut(|state| assert!(state.all_key_maps_disabled));
    }

    #[test]
    fn send_chars_reports_false_before_the_transport_is_started() {
        // `Transport::write` returns `TransportError::Closed` before
        // `Session::start` spawns the child, so the action correctly
        // reports that it did not apply.
        let session = test_session();
        assert!(!dispatch(&session, &Action::SendChars("ls\n".to_string())));
    }

    #[test]
    fn write_screen_feeds_the_local_grid_without_touching_the_transport() {
        let session = test_session();
        assert!(dispatch(&session, &Action::WriteScreen("local".to_string())));
        let frame = session.render_frame();
        assert!(!frame.rows.is_empty());
    }

    #[test]
    fn copy_previous_mark_range_needs_two_marks() {
        let session = test_session();
        assert!(!dispatch(&session, &Action::CopyPreviousMarkRange));
        session.with_state_mut(|state| {
            state.push_mark(BufferPos::new(0, 0));
            state.push_mark(BufferPos::new(1, 0));
        });
        assert!(dispatch(&session, &Action::CopyPreviousMarkRange));
    }
}
