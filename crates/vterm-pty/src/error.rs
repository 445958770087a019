//! Structured transport errors: every `libssh2`-style error code is
//! surfaced as a structured error (numeric code + category + human
//! message).

use std::io;

use thiserror::Error;

/// One SSH-library error, normalized into a stable numeric/category pair
/// so the session layer can render it without depending on `ssh2` types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshErrorCode {
    pub code: i32,
    pub category: &'static str,
    pub message: String,
}

impl std::fmt::Display for SshErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.category, self.code, self.message)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("ssh error: {0}")]
    Ssh(SshErrorCode),

    #[error("host key for {host} not found in known_hosts; key was appended")]
    HostKeyAdded { host: String },

    #[error("host key for {host} does not match known_hosts entry")]
    HostKeyMismatch { host: String },

    #[error("no private key, agent, or password authentication succeeded for {user}@{host}")]
    AuthenticationExhausted { user: String, host: String },

    #[error("dns resolution for {host} returned no addresses")]
    NoAddresses { host: String },

    #[error("transport is closed")]
    Closed,
}

impl From<ssh2::Error> for TransportError {
    fn from(err: ssh2::Error) -> Self {
        let category = match err.code() {
            ssh2::ErrorCode::Session(_) => "session",
            ssh2::ErrorCode::SFTP(_) => "sftp",
        };
        Self::Ssh(SshErrorCode {
            code: raw_code(&err),
            category,
            message: err.message().to_string(),
        })
    }
}

fn raw_code(err: &ssh2::Error) -> i32 {
    match err.code() {
        ssh2::ErrorCode::Session(c) | ssh2::ErrorCode::SFTP(c) => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_error_code_display_includes_category_and_message() {
        let code = SshErrorCode { code: -37, category: "session", message: "would block".into() };
        assert_eq!(code.to_string(), "session (-37): would block");
    }
}
