//! The closed set of actions a binding can name.
//!
//! Handlers are pure methods on the session: each returns a bool
//! indicating whether the action applied; this crate only defines the
//! vocabulary. Execution lives in `vterm-session`, the only crate with a
//! session to call methods on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What [`Action::CopySelection`] should format the clipboard payload as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CopyFormat {
    PlainText,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Action {
    CancelSelection,
    ChangeProfile(String),
    ClearHistoryAndReset,
    CopyPreviousMarkRange,
    CopySelection(CopyFormat),
    CreateDebugDump,
    DecreaseFontSize,
    IncreaseFontSize,
    DecreaseOpacity,
    IncreaseOpacity,
    FocusNextSearchMatch,
    FocusPreviousSearchMatch,
    FollowHyperlink,
    NewTerminal,
    NoSearchHighlight,
    OpenConfiguration,
    OpenFileManager,
    OpenSelection,
    PasteClipboard { strip: bool },
    PasteSelection,
    Quit,
    ReloadConfig(Option<String>),
    ResetConfig,
    ResetFontSize,
    ScreenshotVt,
    ScrollUp(u32),
    ScrollDown(u32),
    ScrollPageUp,
    ScrollPageDown,
    ScrollMarkUp,
    ScrollMarkDown,
    ScrollOneUp,
    ScrollOneDown,
    ScrollToTop,
    ScrollToBottom,
    Search,
    SearchReverse,
    SendChars(String),
    ToggleAllKeyMaps,
    ToggleFullscreen,
    ToggleInputProtection,
    ToggleStatusLine,
    ToggleTitleBar,
    TraceEnter,
    TraceLeave,
    TraceStep,
    TraceBreakAtEmptyQueue,
    ViNormalMode,
    WriteScreen(String),
}

impl Action {
    /// Spec §4.5: "`ToggleAllKeyMaps` is honored specially: when key
    /// mappings are globally disabled, only action lists that contain
    /// `ToggleAllKeyMaps` are still executed."
    #[must_use]
    pub fn is_toggle_all_key_maps(&self) -> bool {
        matches!(self, Self::ToggleAllKeyMaps)
    }
}
