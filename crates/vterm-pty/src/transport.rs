//! The uniform byte-channel abstraction both backends implement (spec
//! §4.6): `start/read/write/resize/close/waitForClosed/wakeupReader`.

use std::time::Duration;

use crate::error::TransportError;
use crate::local::LocalPty;
use crate::ssh::{AuthPrompt, SshSession};

/// Terminal size in cells, with an optional pixel size for protocols that
/// report it (sixel/kitty image scaling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize {
    pub cols: u16,
    pub rows: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u16,
    pub height: u16,
}

/// Result of a `read` call. `again` means the deadline elapsed with no
/// data and no EOF; `eof` means the remote end closed cleanly.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub bytes: Vec<u8>,
    pub eof: bool,
    pub again: bool,
}

impl ReadOutcome {
    pub(crate) fn again() -> Self {
        Self { bytes: Vec::new(), eof: false, again: true }
    }

    pub(crate) fn eof() -> Self {
        Self { bytes: Vec::new(), eof: true, again: false }
    }

    pub(crate) fn data(bytes: Vec<u8>) -> Self {
        Self { bytes, eof: false, again: false }
    }
}

/// Result of a `write` call.
#[derive(Debug)]
pub enum WriteOutcome {
    Wrote(usize),
    Again,
}

/// `enum Transport { LocalPty(...), Ssh(...) }` (spec REDESIGN FLAGS:
/// the C++ source's deep inheritance around PTY backends collapses to a
/// tagged variant here).
pub enum Transport {
    LocalPty(LocalPty),
    Ssh(SshSession),
}

impl Transport {
    pub fn start(&mut self) -> Result<(), TransportError> {
        match self {
            Self::LocalPty(pty) => pty.start(),
            Self::Ssh(ssh) => ssh.start(),
        }
    }

    /// Blocks up to `timeout` (or forever if `None`) waiting for bytes,
    /// returning `Again` on timeout. `wakeup_reader` called concurrently
    /// unblocks this early with `Again`, never with `eof`.
    pub fn read(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<ReadOutcome, TransportError> {
        match self {
            Self::LocalPty(pty) => pty.read(timeout),
            Self::Ssh(ssh) => ssh.read(timeout),
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<WriteOutcome, TransportError> {
        match self {
            Self::LocalPty(pty) => pty.write(bytes),
            Self::Ssh(ssh) => ssh.write(bytes),
        }
    }

    pub fn resize(
        &mut self,
        page: PageSize,
        pixel: Option<PixelSize>,
    ) -> Result<(), TransportError> {
        match self {
            Self::LocalPty(pty) => pty.resize(page, pixel),
            Self::Ssh(ssh) => ssh.resize(page),
        }
    }

    pub fn close(&mut self) {
        match self {
            Self::LocalPty(pty) => pty.close(),
            Self::Ssh(ssh) => ssh.close(),
        }
    }

    /// Blocks until the transport has fully released its resources
    /// (child reaped / socket shut down) after `close()`.
    pub fn wait_for_closed(&mut self) {
        match self {
            Self::LocalPty(pty) => pty.wait_for_closed(),
            Self::Ssh(ssh) => ssh.wait_for_closed(),
        }
    }

    /// Thread-safe: may be called from any thread while `read` is
    /// blocked on the I/O thread.
    pub fn wakeup_reader(&self) {
        match self {
            Self::LocalPty(pty) => pty.wakeup_reader(),
            Self::Ssh(ssh) => ssh.wakeup_reader(),
        }
    }

    /// The in-band auth prompt an `Ssh` transport is waiting on, if any.
    /// Always `None` for `LocalPty`.
    #[must_use]
    pub fn pending_prompt(&self) -> Option<AuthPrompt> {
        match self {
            Self::LocalPty(_) => None,
            Self::Ssh(ssh) => ssh.pending_prompt(),
        }
    }
}
