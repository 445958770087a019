//! Session-level error aggregation: the session layer decides whether to
//! retry, surface a banner, or terminate.

use thiserror::Error;
use vterm_pty::TransportError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("session already started")]
    AlreadyStarted,
    #[error("session not started")]
    NotStarted,
    #[error("I/O thread panicked")]
    IoThreadPanicked,
}
