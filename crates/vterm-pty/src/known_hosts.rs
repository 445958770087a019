//! OpenSSH known-hosts verification: the host key is checked against a
//! known-hosts file (OpenSSH format). On "not found", the key is
//! appended; on mismatch the session fails.

use std::path::Path;

use ssh2::{CheckResult, HostKeyType, KnownHostFileKind, Session};

use crate::error::TransportError;

/// Checks `session`'s negotiated host key against `known_hosts_path`,
/// appending it when absent. Returns `Ok(true)` when the key was newly
/// added (the session layer surfaces this as an informational banner,
/// not an error).
pub fn verify_and_learn(
    session: &Session,
    host: &str,
    port: u16,
    known_hosts_path: &Path,
) -> Result<bool, TransportError> {
    let (key, key_type) = session
        .host_key()
        .ok_or_else(|| TransportError::NoAddresses { host: host.to_string() })?;

    let mut known_hosts = session.known_hosts()?;
    let _ = known_hosts.read_file(known_hosts_path, KnownHostFileKind::OpenSSH);

    let host_spec = if port == 22 { host.to_string() } else { format!("[{host}]:{port}") };

    match known_hosts.check(&host_spec, key) {
        CheckResult::Match => Ok(false),
        CheckResult::NotFound => {
            let comment_free = "";
            known_hosts.add(&host_spec, key, comment_free, kh_type(key_type))?;
            known_hosts.write_file(known_hosts_path, KnownHostFileKind::OpenSSH)?;
            Ok(true)
        }
        CheckResult::Mismatch => {
            Err(TransportError::HostKeyMismatch { host: host_spec })
        }
        CheckResult::Failure => {
            Err(TransportError::HostKeyMismatch { host: host_spec })
        }
    }
}

fn kh_type(key_type: HostKeyType) -> ssh2::KnownHostKeyFormat {
    match key_type {
        HostKeyType::Rsa => ssh2::KnownHostKeyFormat::Rsa,
        HostKeyType::Dss => ssh2::KnownHostKeyFormat::Dss,
        HostKeyType::Ecdsa256 | HostKeyType::Ecdsa384 | HostKeyType::Ecdsa521 => {
            ssh2::KnownHostKeyFormat::Ecdsa256
        }
        HostKeyType::Ed25519 => ssh2::KnownHostKeyFormat::Ed25519,
        _ => ssh2::KnownHostKeyFormat::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_maps_to_its_own_known_host_format() {
        assert!(matches!(kh_type(HostKeyType::Ed25519), ssh2::KnownHostKeyFormat::Ed25519));
    }

    #[test]
    fn every_ecdsa_width_maps_to_the_same_known_host_format() {
        for ty in [HostKeyType::Ecdsa256, HostKeyType::Ecdsa384, HostKeyType::Ecdsa521] {
            assert!(matches!(kh_type(ty), ssh2::KnownHostKeyFormat::Ecdsa256));
        }
    }

    #[test]
    fn unknown_key_type_falls_back_to_unknown_format() {
        assert!(matches!(kh_type(HostKeyType::Unknown), ssh2::KnownHostKeyFormat::Unknown));
    }
}
