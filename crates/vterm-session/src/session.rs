//! Session orchestration: wires a [`vterm_core::Terminal`], a
//! [`vterm_vi::ViState`], a [`vterm_input::BindingTable`], and a
//! [`vterm_pty::Transport`] behind one reentrant lock, plus the I/O thread
//! that pumps guest bytes through `transport.read → parser.feed →
//! screen.apply` and swaps a fresh [`crate::render::RenderFrame`] in after
//! every batch.
//!
//! The lock is reentrant (`parking_lot::ReentrantMutex`) because a
//! `ScreenEvents` callback fired from inside `Terminal::feed` — itself
//! called while the lock is held — may need to call back into public
//! `Session` methods that also lock (e.g. a permission-prompt callback
//! that inspects session state). A plain mutex would deadlock there.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};

use vterm_core::selection::BufferPos;
use vterm_core::{ScreenEvents, Terminal};
use vterm_input::{
    encode_char, encode_key, encode_mouse, encode_paste, BindingTable, CharEvent, EncodeModes,
    KeyEvent, ModeSnapshot, MouseEvent, MouseEventKind, MouseInput, TrackingEncoding, TrackingMode,
};
use vterm_pty::{LocalPty, PageSize, SshConfig, SshSession, Transport, WriteOutcome};
use vterm_vi::{Mode as ViMode, ViState, WordClassifier};

use crate::config::{Profile, ProfileTarget, SessionConfig};
use crate::error::SessionError;
use crate::events::{self, PermissionKind, SessionEvents as HostEvents};
use crate::render::{RenderBuffer, RenderFrame};

/// Paused-execution ("trace") mode state, toggled by `TraceEnter`/
/// `TraceLeave`/`TraceStep`/`TraceBreakAtEmptyQueue`. Tracked here rather
/// than in `vterm-input`/`vterm-core` since it gates `MatchModes::trace`
/// but has no VT/ANSI meaning of its own.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TraceState {
    pub(crate) active: bool,
}

/// Everything the reentrant lock guards: the terminal, vi layer, binding
/// table, render buffer, and the handful of session-local toggles the
/// action executor flips.
///
/// `pub(crate)` (rather than private to this module) so [`crate::executor`]
/// can take `&mut SessionState` in the closures it passes to
/// [`Session::with_state_mut`].
pub(crate) struct SessionState {
    pub(crate) term: Terminal,
    pub(crate) vi: ViState,
    pub(crate) bindings: BindingTable,
    pub(crate) render: RenderBuffer,
    pub(crate) profile: Profile,
    pub(crate) all_key_maps_disabled: bool,
    pub(crate) fullscreen: bool,
    pub(crate) input_protection: bool,
    pub(crate) status_line_visible: bool,
    pub(crate) title_bar_visible: bool,
    pub(crate) trace: TraceState,
    pub(crate) font_scale: f32,
    pub(crate) opacity: f32,
    /// Shell-integration prompt marks (OSC 133), oldest first, bounded so
    /// a long-running shell doesn't grow this unboundedly.
    pub(crate) marks: Vec<BufferPos>,
    /// Lines scrolled back from the live bottom, for the `Scroll*` action
    /// family. `0` is the live viewport; clamped to the scrollback length
    /// whenever it's read back for rendering.
    pub(crate) scroll_offset: u32,
}

const MAX_MARKS: usize = 256;

impl SessionState {
    pub(crate) fn push_mark(&mut self, pos: BufferPos) {
        self.marks.push(pos);
        if self.marks.len() > MAX_MARKS {
            self.marks.remove(0);
        }
    }

    /// Current scrollback length of the active screen, for clamping
    /// `scroll_offset`.
    pub(crate) fn scrollback_len(&self) -> u32 {
        self.term.active().scrollback.as_ref().map(vterm_core::Scrollback::len).unwrap_or(0) as u32
    }

    pub(crate) fn swap_render(&mut self) {
        let cursor_visible = self.scroll_offset == 0 && self.term.active().cursor.visible && !self.input_protection;
        self.render.swap_scrolled(self.term.active(), cursor_visible, self.scroll_offset);
    }

    pub(crate) fn mode_snapshot(&self) -> ModeSnapshot {
        let screen = self.term.active();
        ModeSnapshot {
            alternate_screen: self.term.is_alt_screen(),
            app_cursor: screen.modes.dec.app_cursor_keys,
            app_keypad: screen.modes.dec.app_keypad,
            select: self.term.selection.is_some() || self.vi.selection().is_some(),
            insert: self.vi.mode == ViMode::Insert,
            search: !self.term.search.query.is_empty(),
            trace: self.trace.active,
        }
    }

    fn encode_modes(&self) -> EncodeModes {
        let dec = &self.term.active().modes.dec;
        EncodeModes {
            app_cursor_keys: dec.app_cursor_keys,
            app_keypad: dec.app_keypad,
            bracketed_paste: dec.bracketed_paste,
        }
    }

    fn tracking(&self) -> (TrackingMode, TrackingEncoding) {
        let dec = &self.term.active().modes.dec;
        let mode = if dec.mouse_any_motion {
            TrackingMode::AnyEvent
        } else if dec.mouse_button_tracking {
            TrackingMode::ButtonEvent
        } else if dec.mouse_normal_tracking {
            TrackingMode::Normal
        } else if dec.mouse_x10 {
            TrackingMode::X10
        } else {
            TrackingMode::Off
        };
        let encoding = if dec.mouse_sgr_1006 {
            TrackingEncoding::Sgr
        } else if dec.mouse_urxvt_1015 {
            TrackingEncoding::Urxvt
        } else if dec.mouse_utf8_1005 {
            TrackingEncoding::Utf8
        } else {
            TrackingEncoding::Legacy
        };
        (mode, encoding)
    }
}

/// Bridges `vterm-core`'s low-level [`ScreenEvents`] to a host's
/// higher-level [`HostEvents`] for the duration of one `feed()` call,
/// collecting guest-bound replies and marks to apply after the lock
/// releases instead of writing the transport while still holding it.
struct ScreenEventBridge<'a> {
    events: &'a dyn HostEvents,
    permissions: crate::config::Permissions,
    replies: Vec<u8>,
    marks: Vec<BufferPos>,
}

impl<'a> ScreenEvents for ScreenEventBridge<'a> {
    fn on_bell(&mut self) {
        self.events.on_bell();
    }

    fn on_title_changed(&mut self, title: &str) {
        self.events.on_title_changed(title);
    }

    fn on_icon_name_changed(&mut self, name: &str) {
        self.events.on_icon_name_changed(name);
    }

    fn on_clipboard_write(&mut self, _selection: &str, payload: &str) {
        use base64::Engine;
        if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(payload) {
            if let Ok(text) = String::from_utf8(bytes) {
                self.events.copy_to_clipboard(vterm_input::CopyFormat::PlainText, &text);
            }
        }
    }

    fn on_reply(&mut self, bytes: &[u8]) {
        self.replies.extend_from_slice(bytes);
    }

    fn on_host_writable_status_line_requested(&mut self) -> bool {
        events::resolve_permission(
            self.permissions.display_host_writable_status_line,
            PermissionKind::DisplayHostWritableStatusLine,
            self.events,
        )
    }

    fn on_mark(&mut self, pos: BufferPos) {
        self.marks.push(pos);
    }
}

struct Shared {
    state: ReentrantMutex<RefCell<SessionState>>,
    transport: Mutex<Transport>,
    events: Arc<dyn HostEvents>,
    terminate: AtomicBool,
    io_thread: Mutex<Option<JoinHandle<()>>>,
}

/// One terminal session: owns the transport, the terminal/vi/binding
/// state, and the I/O thread. Cheap to clone (an `Arc` handle); clones
/// share the same underlying session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

fn build_transport(profile: &Profile) -> Transport {
    match &profile.target {
        ProfileTarget::Shell { program, args } => {
            let mut cmd = portable_pty::CommandBuilder::new(program);
            cmd.args(args);
            Transport::LocalPty(LocalPty::new(cmd, profile.initial_size.into()))
        }
        ProfileTarget::Ssh {
            host,
            port,
            username,
            known_hosts_path,
            private_key_path,
            public_key_path,
            forward_agent,
            term,
            env,
        } => Transport::Ssh(SshSession::new(SshConfig {
            host: host.clone(),
            port: *port,
            username: username.clone(),
            known_hosts_path: known_hosts_path.clone(),
            private_key_path: private_key_path.clone(),
            public_key_path: public_key_path.clone(),
            forward_agent: *forward_agent,
            term: term.clone(),
            env: env.clone(),
            initial_size: profile.initial_size.into(),
        })),
    }
}

impl Session {
    #[must_use]
    pub fn new(config: SessionConfig, events: Arc<dyn HostEvents>) -> Self {
        let profile = config.profile;
        let mut term = match profile.scrollback_capacity {
            Some(cap) => Terminal::new(profile.initial_size.cols, profile.initial_size.rows, cap),
            None => Terminal::with_unbounded_scrollback(profile.initial_size.cols, profile.initial_size.rows),
        };
        for mode in &profile.frozen_modes {
            term.freeze_mode(*mode);
        }
        term.status_display = profile.initial_status_display.into();

        let transport = build_transport(&profile);
        let vi = ViState::new(WordClassifier::new(profile.word_delimiters.iter().copied()));
        let status_line_visible = profile.initial_status_display != crate::config::StatusDisplayKind::None;

        let state = SessionState {
            term,
            vi,
            bindings: config.bindings.0,
            render: RenderBuffer::new(),
            profile,
            all_key_maps_disabled: false,
            fullscreen: false,
            input_protection: false,
            status_line_visible,
            title_bar_visible: true,
            trace: TraceState::default(),
            font_scale: 1.0,
            opacity: 1.0,
            marks: Vec::new(),
            scroll_offset: 0,
        };

        Self {
            shared: Arc::new(Shared {
                state: ReentrantMutex::new(RefCell::new(state)),
                transport: Mutex::new(transport),
                events,
                terminate: AtomicBool::new(false),
                io_thread: Mutex::new(None),
            }),
        }
    }

    /// Lock the guarded state and run `f` against it. Reentrant: safe to
    /// call from within a callback that is itself running under this
    /// lock on the same thread.
    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let guard = self.shared.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Start the transport and spawn the I/O thread. Idempotent only in
    /// the sense that a second call returns [`SessionError::AlreadyStarted`];
    /// it does not restart a terminated session.
    pub fn start(&self) -> Result<(), SessionError> {
        {
            let mut transport = self.shared.transport.lock();
            transport.start()?;
        }
        let mut guard = self.shared.io_thread.lock();
        if guard.is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        let weak = Arc::downgrade(&self.shared);
        *guard = Some(thread::spawn(move || Self::io_loop(weak)));
        #[cfg(feature = "tracing")]
        tracing::info!("session started");
        Ok(())
    }

    /// Pumps the transport until EOF, a read error, [`Self::terminate`],
    /// or every external `Session` handle is gone. Takes a [`Weak`] rather
    /// than holding its own `Arc<Shared>` for the thread's whole lifetime:
    /// holding a strong ref there would mean `Shared`'s refcount never
    /// reaches zero on a dropped-without-`terminate()` session, so `Drop`
    /// never runs and this loop never learns to stop.
    fn io_loop(weak: std::sync::Weak<Shared>) {
        loop {
            let Some(shared) = weak.upgrade() else { break };
            if shared.terminate.load(Ordering::Acquire) {
                break;
            }
            let session = Session { shared };
            let outcome = {
                let mut transport = session.shared.transport.lock();
                transport.read(Some(Duration::from_millis(100)))
            };
            match outcome {
                Ok(read) => {
                    if !read.bytes.is_empty() {
                        session.apply_bytes(&read.bytes);
                    }
                    if let Some(prompt) = session.shared.transport.lock().pending_prompt() {
                        session.shared.events.on_auth_prompt(&prompt.text);
                    }
                    if read.eof {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("transport reached eof, ending io loop");
                        break;
                    }
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %err, "transport read failed, ending io loop");
                    session.shared.events.on_alert(&format!("transport read failed: {err}"));
                    break;
                }
            }
        }
    }

    /// Feed guest bytes through the parser/screen and swap a fresh render
    /// frame in. Exposed beyond the I/O thread so tests and headless
    /// replay can drive a session without a real transport.
    pub fn apply_bytes(&self, bytes: &[u8]) {
        let replies = self.with_state(|state| {
            let permissions = state.profile.permissions;
            let mut bridge =
                ScreenEventBridge { events: self.shared.events.as_ref(), permissions, replies: Vec::new(), marks: Vec::new() };
            state.term.feed(bytes, &mut bridge);
            for mark in bridge.marks.drain(..) {
                state.push_mark(mark);
            }
            state.swap_render();
            bridge.replies
        });
        if !replies.is_empty() {
            let _ = self.write_raw(&replies);
        }
        self.shared.events.on_screen_updated();
    }

    pub(crate) fn refresh_render(&self) {
        self.with_state(SessionState::swap_render);
        self.shared.events.on_screen_updated();
    }

    /// Scroll the view `delta` lines toward history (positive) or toward
    /// the live bottom (negative), clamped to `[0, scrollback_len]`.
    /// Returns `false` if the view was already pinned at that end.
    pub(crate) fn scroll_by(&self, delta: i64) -> bool {
        let changed = self.with_state(|state| {
            let max = state.scrollback_len() as i64;
            let next = (state.scroll_offset as i64 + delta).clamp(0, max) as u32;
            let changed = next != state.scroll_offset;
            state.scroll_offset = next;
            changed
        });
        if changed {
            self.refresh_render();
        }
        changed
    }

    /// Jump directly to an absolute scroll offset, clamped to history.
    pub(crate) fn scroll_to(&self, offset: u32) -> bool {
        let changed = self.with_state(|state| {
            let next = offset.min(state.scrollback_len());
            let changed = next != state.scroll_offset;
            state.scroll_offset = next;
            changed
        });
        if changed {
            self.refresh_render();
        }
        changed
    }

    /// The most recently built render frame.
    #[must_use]
    pub fn render_frame(&self) -> RenderFrame {
        self.with_state(|state| state.render.ready().clone())
    }

    /// Write raw bytes to the transport, retrying on backpressure.
    pub fn write_raw(&self, mut bytes: &[u8]) -> Result<(), SessionError> {
        let mut transport = self.shared.transport.lock();
        while !bytes.is_empty() {
            match transport.write(bytes)? {
                WriteOutcome::Wrote(n) => bytes = &bytes[n..],
                WriteOutcome::Again => std::thread::sleep(Duration::from_millis(2)),
            }
        }
        Ok(())
    }

    /// Resize the terminal and propagate to the transport. Best-effort on
    /// the transport side: a resize racing a not-yet-started transport
    /// just updates the terminal model.
    pub fn resize(&self, cols: u16, rows: u16) {
        self.with_state(|state| state.term.resize(cols, rows));
        let _ = self.shared.transport.lock().resize(PageSize { cols, rows }, None);
        self.refresh_render();
    }

    /// Dispatch one key event: binding table first, wire-byte encoding on
    /// no match.
    pub fn handle_key(&self, ev: KeyEvent) {
        if ev.kind == vterm_input::EventKind::Release {
            return;
        }
        let actions = self.with_state(|state| {
            let snap = state.mode_snapshot();
            state
                .bindings
                .match_key(ev.key, ev.modifiers, snap, state.all_key_maps_disabled)
                .map(<[_]>::to_vec)
        });
        match actions {
            Some(actions) => {
                for action in &actions {
                    self.execute_action(action);
                }
            }
            None => {
                let bytes = self.with_state(|state| encode_key(&ev, state.encode_modes()));
                if !bytes.is_empty() {
                    let _ = self.write_raw(&bytes);
                }
            }
        }
    }

    pub fn handle_char(&self, ev: CharEvent) {
        if ev.kind == vterm_input::EventKind::Release {
            return;
        }
        let actions = self.with_state(|state| {
            let snap = state.mode_snapshot();
            state
                .bindings
                .match_char(ev.ch, ev.modifiers, snap, state.all_key_maps_disabled)
                .map(<[_]>::to_vec)
        });
        match actions {
            Some(actions) => {
                for action in &actions {
                    self.execute_action(action);
                }
            }
            None => {
                let bytes = encode_char(&ev);
                if !bytes.is_empty() {
                    let _ = self.write_raw(&bytes);
                }
            }
        }
    }

    pub fn handle_mouse(&self, ev: MouseEvent) {
        let input = match ev.kind {
            MouseEventKind::Press(b) | MouseEventKind::Drag(b) | MouseEventKind::Release(b) => MouseInput::Button(b),
            MouseEventKind::ScrollUp => MouseInput::ScrollUp,
            MouseEventKind::ScrollDown => MouseInput::ScrollDown,
            MouseEventKind::ScrollLeft => MouseInput::ScrollLeft,
            MouseEventKind::ScrollRight => MouseInput::ScrollRight,
            MouseEventKind::Move => return,
        };
        let actions = self.with_state(|state| {
            let snap = state.mode_snapshot();
            state
                .bindings
                .match_mouse(input, ev.modifiers, snap, state.all_key_maps_disabled)
                .map(<[_]>::to_vec)
        });
        match actions {
            Some(actions) => {
                for action in &actions {
                    self.execute_action(action);
                }
            }
            None => {
                let (mode, encoding) = self.with_state(|state| state.tracking());
                if let Some(bytes) = encode_mouse(&ev, mode, encoding) {
                    let _ = self.write_raw(&bytes);
                }
            }
        }
    }

    /// Paste text in, bracketed per the guest's current mode 2004 setting.
    pub fn paste(&self, text: &str) {
        let bracketed = self.with_state(|state| state.term.active().modes.dec.bracketed_paste);
        let _ = self.write_raw(&encode_paste(text, bracketed));
    }

    // ---- vi wiring -----------------------------------------------------

    pub fn vi_enter_normal(&self) {
        self.with_state(|state| {
            let (row, col) = {
                let screen = state.term.active();
                (screen.cursor.row, screen.cursor.col)
            };
            let top = state.term.viewport_top();
            state.vi.enter_normal(row, col, top);
        });
        self.refresh_render();
    }

    /// Leave vi mode, restoring the real cursor. Returns `false` if vi
    /// mode was already inactive.
    pub fn vi_leave(&self) -> bool {
        let applied = self.with_state(|state| {
            let Some(snap) = state.vi.leave() else { return false };
            state.term.set_cursor_position(snap.row, snap.col);
            true
        });
        if applied {
            self.refresh_render();
        }
        applied
    }

    pub fn vi_enter_visual(&self, mode: ViMode) {
        self.with_state(|state| state.vi.enter_visual(mode));
        self.refresh_render();
    }

    pub fn vi_apply_motion(&self, motion: vterm_vi::Motion, count: u32) {
        self.with_state(|state| {
            let top = state.term.viewport_top();
            let screen = state.term.active();
            let viewport = vterm_vi::Viewport { rows: screen.grid.rows(), top_line: top };
            let empty;
            let scrollback = match screen.scrollback.as_ref() {
                Some(sb) => sb,
                None => {
                    empty = vterm_core::Scrollback::new(0);
                    &empty
                }
            };
            state.vi.apply_motion(&screen.grid, scrollback, viewport, motion, count);
        });
        self.refresh_render();
    }

    pub fn vi_execute(&self, op: vterm_vi::Operator) -> Option<vterm_vi::ViEffect> {
        let effect = self.with_state(|state| {
            let screen = state.term.active();
            let empty;
            let scrollback = match screen.scrollback.as_ref() {
                Some(sb) => sb,
                None => {
                    empty = vterm_core::Scrollback::new(0);
                    &empty
                }
            };
            state.vi.execute(&screen.grid, scrollback, op)
        });
        if let Some(effect) = &effect {
            match effect {
                vterm_vi::ViEffect::Yank(text) => {
                    self.shared.events.copy_to_clipboard(vterm_input::CopyFormat::PlainText, text);
                }
                vterm_vi::ViEffect::Open(target) => self.shared.events.open_document(target),
                vterm_vi::ViEffect::ReverseSearch(query) => {
                    self.with_state(|state| {
                        state.term.search.query = query.clone();
                        state.term.search.last_match = state.term.search_backward(query);
                    });
                }
                vterm_vi::ViEffect::Paste { text, stripped } => {
                    let text = if *stripped { text.trim_end().to_string() } else { text.clone() };
                    self.paste(&text);
                }
            }
        }
        self.refresh_render();
        effect
    }

    // ---- action executor ------------------------------------------------

    /// Handlers are pure methods on the session; each returns a bool
    /// indicating whether the action applied. Implemented in
    /// [`crate::executor`].
    pub fn execute_action(&self, action: &vterm_input::Action) -> bool {
        let applied = crate::executor::dispatch(self, action);
        #[cfg(feature = "tracing")]
        if !applied {
            tracing::debug!(action = ?action, "action did not apply");
        }
        applied
    }

    pub(crate) fn shared_events(&self) -> &Arc<dyn HostEvents> {
        &self.shared.events
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        self.with_state(f)
    }

    /// Stop the I/O thread and close the transport.
    pub fn terminate(&self) {
        #[cfg(feature = "tracing")]
        tracing::info!("session terminated");
        self.shared.terminate.store(true, Ordering::Release);
        self.shared.transport.lock().wakeup_reader();
        self.shared.transport.lock().close();
        if let Some(handle) = self.shared.io_thread.lock().take() {
            let _ = handle.join();
        }
        self.shared.transport.lock().wait_for_closed();
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.terminate.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Profile, ProfileTarget, SessionConfig};
    use crate::events::NullSessionEvents;

    fn test_config() -> SessionConfig {
        let mut profile = Profile::default();
        profile.target = ProfileTarget::Shell { program: "true".into(), args: Vec::new() };
        SessionConfig { profile, bindings: Default::default() }
    }

    #[test]
    fn apply_bytes_updates_render_frame() {
        let session = Session::new(test_config(), Arc::new(NullSessionEvents));
        session.apply_bytes(b"hello");
        let frame = session.render_frame();
        assert_eq!(frame.cols, 80);
    }

    #[test]
    fn resize_rebuilds_frame_dimensions() {
        let session = Session::new(test_config(), Arc::new(NullSessionEvents));
        session.resize(40, 10);
        let frame = session.render_frame();
        assert_eq!(frame.cols, 40);
        assert_eq!(frame.rows.len(), 10);
    }

    #[test]
    fn vi_enter_and_leave_round_trip() {
        let session = Session::new(test_config(), Arc::new(NullSessionEvents));
        session.apply_bytes(b"hi");
        session.vi_enter_normal();
        let left = session.vi_leave();
        assert!(left);
        assert!(!session.vi_leave());
    }
}
