//! SSH transport: a state machine driving `ssh2` from TCP connect
//! through authentication to an operational shell channel.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use ssh2::Session;

use crate::error::TransportError;
use crate::known_hosts;
use crate::transport::{PageSize, ReadOutcome, WriteOutcome};

const MAX_PASSWORD_TRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrivateKeyPhase {
    Start,
    Request,
    WaitForInput,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasswordPhase {
    Start,
    WaitForInput,
    Execute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Initial,
    Started,
    Connect,
    Handshake,
    VerifyHostKey,
    AuthenticateAgent,
    AuthenticatePrivateKey(PrivateKeyPhase),
    AuthenticatePassword(PasswordPhase),
    OpenChannel,
    RequestAuthAgent,
    RequestPty,
    SetEnv,
    StartShell,
    Operational,
    ResizeScreen,
    Failure,
    Closed,
}

pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub known_hosts_path: PathBuf,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
    pub forward_agent: bool,
    pub term: String,
    pub env: Vec<(String, String)>,
    pub initial_size: PageSize,
}

/// A UI-facing prompt emitted while parked in a `WaitForInput` phase
/// (spec: "the reader emits a UI-facing prompt text").
#[derive(Debug, Clone)]
pub struct AuthPrompt {
    pub text: String,
}

struct InjectQueue {
    bytes: VecDeque<u8>,
    prompt: Option<AuthPrompt>,
    woken: bool,
}

pub struct SshSession {
    config: SshConfig,
    session: Option<Session>,
    channel: Option<ssh2::Channel>,
    state: State,
    agent_identity_index: usize,
    input_buf: String,
    password_attempts: u32,
    passphrase_attempts: u32,
    inject: Arc<(Mutex<InjectQueue>, Condvar)>,
    failure: Option<TransportError>,
}

impl SshSession {
    #[must_use]
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            session: None,
            channel: None,
            state: State::Initial,
            agent_identity_index: 0,
            input_buf: String::new(),
            password_attempts: 0,
            passphrase_attempts: 0,
            inject: Arc::new((
                Mutex::new(InjectQueue { bytes: VecDeque::new(), prompt: None, woken: false }),
                Condvar::new(),
            )),
            failure: None,
        }
    }

    pub fn start(&mut self) -> Result<(), TransportError> {
        assert!(matches!(self.state, State::Initial));
        self.state = State::Started;
        self.pump(Instant::now() + Duration::from_secs(30))
    }

    /// Drives the state machine until `Operational`/`Failure`/`Closed`
    /// or `deadline` elapses, retrying on `EAGAIN` (non-blocking I/O
    /// throughout).
    fn pump(&mut self, deadline: Instant) -> Result<(), TransportError> {
        loop {
            match self.step() {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    if matches!(self.state, State::Operational) {
                        return Ok(());
                    }
                    if Instant::now() >= deadline {
                        return Ok(());
                    }
                }
                Err(TransportError::Ssh(code)) if is_eagain(&code) => {
                    if Instant::now() >= deadline {
                        return Ok(());
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %err, "ssh session transitioned to Failure");
                    self.state = State::Failure;
                    self.failure = Some(err);
                    return Err(self.failure.take().unwrap_or(TransportError::Closed));
                }
            }
        }
    }

    /// Executes one state transition. Returns `Ok(true)` once
    /// `Operational` is reached, `Ok(false)` to keep pumping.
    fn step(&mut self) -> Result<bool, TransportError> {
        match self.state.clone() {
            State::Initial => Ok(false),
            State::Started => {
                self.state = State::Connect;
                Ok(false)
            }
            State::Connect => {
                let addr = format!("{}:{}", self.config.host, self.config.port);
                let mut addrs = addr
                    .to_socket_addrs()
                    .map_err(TransportError::Io)?
                    .peekable();
                if addrs.peek().is_none() {
                    return Err(TransportError::NoAddresses { host: self.config.host.clone() });
                }
                let tcp = addrs
                    .filter_map(|a| TcpStream::connect(a).ok())
                    .next()
                    .ok_or_else(|| TransportError::NoAddresses { host: self.config.host.clone() })?;
                tcp.set_nonblocking(false).map_err(TransportError::Io)?;

                let mut session = Session::new().map_err(TransportError::from)?;
                session.set_tcp_stream(tcp);
                self.session = Some(session);
                self.state = State::Handshake;
                Ok(false)
            }
            State::Handshake => {
                let session = self.session.as_mut().expect("session set in Connect");
                session.handshake()?;
                self.state = State::VerifyHostKey;
                Ok(false)
            }
            State::VerifyHostKey => {
                let session = self.session.as_ref().expect("session set in Connect");
                match known_hosts::verify_and_learn(
                    session,
                    &self.config.host,
                    self.config.port,
                    &self.config.known_hosts_path,
                ) {
                    Ok(added) => {
                        if added {
                            self.emit_prompt(
                                TransportError::HostKeyAdded { host: self.config.host.clone() }
                                    .to_string(),
                            );
                        }
                        self.state = State::AuthenticateAgent;
                        Ok(false)
                    }
                    Err(err) => {
                        self.state = State::Failure;
                        Err(err)
                    }
                }
            }
            State::AuthenticateAgent => {
                if self.try_agent_auth()? {
                    self.state = State::OpenChannel;
                } else if self.config.private_key_path.is_some() {
                    self.state = State::AuthenticatePrivateKey(PrivateKeyPhase::Start);
                } else {
                    self.state = State::AuthenticatePassword(PasswordPhase::Start);
                }
                Ok(false)
            }
            State::AuthenticatePrivateKey(phase) => self.step_private_key(phase),
            State::AuthenticatePassword(phase) => self.step_password(phase),
            State::OpenChannel => {
                let session = self.session.as_mut().expect("authenticated");
                let channel = session.channel_session()?;
                self.channel = Some(channel);
                self.state = if self.config.forward_agent {
                    State::RequestAuthAgent
                } else {
                    State::RequestPty
                };
                Ok(false)
            }
            State::RequestAuthAgent => {
                if let Some(channel) = self.channel.as_mut() {
                    let _ = channel.request_auth_agent_forwarding();
                }
                self.state = State::RequestPty;
                Ok(false)
            }
            State::RequestPty => {
                let channel = self.channel.as_mut().expect("channel opened");
                let size = self.config.initial_size;
                channel.request_pty(
                    &self.config.term,
                    None,
                    Some((u32::from(size.cols), u32::from(size.rows), 0, 0)),
                )?;
                self.state = State::SetEnv;
                Ok(false)
            }
            State::SetEnv => {
                if let Some(channel) = self.channel.as_mut() {
                    for (key, value) in &self.config.env {
                        let _ = channel.setenv(key, value);
                    }
                }
                self.state = State::StartShell;
                Ok(false)
            }
            State::StartShell => {
                let channel = self.channel.as_mut().expect("channel opened");
                channel.shell()?;
                #[cfg(feature = "tracing")]
                tracing::debug!(host = %self.config.host, "ssh session operational");
                self.state = State::Operational;
                Ok(true)
            }
            State::Operational => Ok(true),
            State::ResizeScreen => {
                self.state = State::Operational;
                Ok(true)
            }
            State::Failure | State::Closed => Ok(true),
        }
    }

    fn try_agent_auth(&mut self) -> Result<bool, TransportError> {
        let session = self.session.as_mut().expect("session set in Connect");
        let mut agent = session.agent()?;
        agent.connect()?;
        agent.list_identities()?;
        let identities = agent.identities()?;
        while self.agent_identity_index < identities.len() {
            let identity = &identities[self.agent_identity_index];
            self.agent_identity_index += 1;
            if agent.userauth(&self.config.username, identity).is_ok() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn step_private_key(&mut self, phase: PrivateKeyPhase) -> Result<bool, TransportError> {
        match phase {
            PrivateKeyPhase::Start => {
                self.state = State::AuthenticatePrivateKey(PrivateKeyPhase::Request);
                Ok(false)
            }
            PrivateKeyPhase::Request => {
                self.emit_prompt(format!(
                    "Enter passphrase for key {}: ",
                    self.config
                        .private_key_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                ));
                self.input_buf.clear();
                self.state = State::AuthenticatePrivateKey(PrivateKeyPhase::WaitForInput);
                Ok(false)
            }
            PrivateKeyPhase::WaitForInput => Ok(false),
            PrivateKeyPhase::Execute => {
                let session = self.session.as_mut().expect("session set in Connect");
                let private_key =
                    self.config.private_key_path.clone().expect("only entered with a key configured");
                let public_key = self.config.public_key_path.clone();
                let passphrase = std::mem::take(&mut self.input_buf);
                let result = session.userauth_pubkey_file(
                    &self.config.username,
                    public_key.as_deref(),
                    &private_key,
                    Some(&passphrase),
                );
                self.passphrase_attempts += 1;
                match result {
                    Ok(()) => {
                        self.state = State::OpenChannel;
                    }
                    Err(_) if self.passphrase_attempts < MAX_PASSWORD_TRIES => {
                        self.state = State::AuthenticatePrivateKey(PrivateKeyPhase::Request);
                    }
                    Err(_) => {
                        self.state = State::AuthenticatePassword(PasswordPhase::Start);
                    }
                }
                Ok(false)
            }
        }
    }

    fn step_password(&mut self, phase: PasswordPhase) -> Result<bool, TransportError> {
        match phase {
            PasswordPhase::Start => {
                self.emit_prompt(format!("{}@{}'s password: ", self.config.username, self.config.host));
                self.input_buf.clear();
                self.state = State::AuthenticatePassword(PasswordPhase::WaitForInput);
                Ok(false)
            }
            PasswordPhase::WaitForInput => Ok(false),
            PasswordPhase::Execute => {
                let session = self.session.as_mut().expect("session set in Connect");
                let password = std::mem::take(&mut self.input_buf);
                let result = session.userauth_password(&self.config.username, &password);
                self.password_attempts += 1;
                match result {
                    Ok(()) => {
                        self.state = State::OpenChannel;
                        Ok(false)
                    }
                    Err(_) if self.password_attempts < MAX_PASSWORD_TRIES => {
                        self.state = State::AuthenticatePassword(PasswordPhase::Start);
                        Ok(false)
                    }
                    Err(_) => {
                        self.state = State::Failure;
                        Err(TransportError::AuthenticationExhausted {
                            user: self.config.username.clone(),
                            host: self.config.host.clone(),
                        })
                    }
                }
            }
        }
    }

    fn emit_prompt(&self, text: String) {
        let (lock, cvar) = &*self.inject;
        let mut queue = lock.lock().unwrap_or_else(|e| e.into_inner());
        queue.prompt = Some(AuthPrompt { text });
        cvar.notify_all();
    }

    /// Handles passphrase/password bytes typed while parked in a
    /// `WaitForInput` phase: Backspace pops a character, Enter submits
    /// (spec: "bytes received via `write()` while in `WaitForInput` are
    /// treated as passphrase characters").
    fn handle_auth_input(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match b {
                0x7f | 0x08 => {
                    self.input_buf.pop();
                }
                b'\r' | b'\n' => {
                    self.state = match &self.state {
                        State::AuthenticatePrivateKey(_) => {
                            State::AuthenticatePrivateKey(PrivateKeyPhase::Execute)
                        }
                        State::AuthenticatePassword(_) => {
                            State::AuthenticatePassword(PasswordPhase::Execute)
                        }
                        other => other.clone(),
                    };
                }
                _ => self.input_buf.push(b as char),
            }
        }
    }

    pub fn read(&mut self, timeout: Option<Duration>) -> Result<ReadOutcome, TransportError> {
        let deadline = timeout.map(|d| Instant::now() + d);

        // Drain anything already injected (prompts render as bytes too,
        // so the UI thread's normal screen.apply path picks them up).
        {
            let (lock, _) = &*self.inject;
            let mut queue = lock.lock().unwrap_or_else(|e| e.into_inner());
            if queue.woken {
                queue.woken = false;
                return Ok(ReadOutcome::again());
            }
            if !queue.bytes.is_empty() {
                return Ok(ReadOutcome::data(queue.bytes.drain(..).collect()));
            }
        }

        if !matches!(self.state, State::Operational) {
            let step_deadline = deadline.unwrap_or_else(|| Instant::now() + Duration::from_millis(50));
            self.pump(step_deadline)?;
            if matches!(self.state, State::Failure) {
                return Err(self.failure.take().unwrap_or(TransportError::Closed));
            }
            return Ok(ReadOutcome::again());
        }

        let channel = self.channel.as_mut().expect("operational implies channel");
        let mut buf = [0u8; 8192];
        loop {
            match channel.read(&mut buf) {
                Ok(0) if channel.eof() => return Ok(ReadOutcome::eof()),
                Ok(0) => return Ok(ReadOutcome::again()),
                Ok(n) => return Ok(ReadOutcome::data(buf[..n].to_vec())),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Ok(ReadOutcome::again());
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<WriteOutcome, TransportError> {
        match &self.state {
            State::AuthenticatePassword(PasswordPhase::WaitForInput)
            | State::AuthenticatePrivateKey(PrivateKeyPhase::WaitForInput) => {
                self.handle_auth_input(bytes);
                self.pump(Instant::now() + Duration::from_secs(30))?;
                Ok(WriteOutcome::Wrote(bytes.len()))
            }
            State::Operational => {
                let channel = self.channel.as_mut().expect("operational implies channel");
                match channel.write(bytes) {
                    Ok(n) => Ok(WriteOutcome::Wrote(n)),
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(WriteOutcome::Again),
                    Err(err) => Err(TransportError::Io(err)),
                }
            }
            _ => Ok(WriteOutcome::Again),
        }
    }

    pub fn resize(&mut self, page: PageSize) -> Result<(), TransportError> {
        if let Some(channel) = self.channel.as_mut() {
            channel.request_pty_size(u32::from(page.cols), u32::from(page.rows), None, None)?;
        }
        self.state = State::ResizeScreen;
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            let _ = channel.close();
        }
        self.state = State::Closed;
    }

    pub fn wait_for_closed(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            let _ = channel.wait_close();
        }
    }

    pub fn wakeup_reader(&self) {
        let (lock, cvar) = &*self.inject;
        let mut queue = lock.lock().unwrap_or_else(|e| e.into_inner());
        queue.woken = true;
        cvar.notify_all();
    }

    /// The in-band prompt text the UI should show while an auth phase is
    /// waiting for input, if any.
    #[must_use]
    pub fn pending_prompt(&self) -> Option<AuthPrompt> {
        let (lock, _) = &*self.inject;
        let mut queue = lock.lock().unwrap_or_else(|e| e.into_inner());
        queue.prompt.take()
    }
}

fn is_eagain(code: &crate::error::SshErrorCode) -> bool {
    code.category == "session" && code.code == -37
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SshConfig {
        SshConfig {
            host: "example.invalid".into(),
            port: 22,
            username: "alice".into(),
            known_hosts_path: PathBuf::from("/dev/null"),
            private_key_path: None,
            public_key_path: None,
            forward_agent: false,
            term: "xterm-256color".into(),
            env: Vec::new(),
            initial_size: PageSize { cols: 80, rows: 24 },
        }
    }

    #[test]
    fn handle_auth_input_collects_characters_until_enter() {
        let mut session = SshSession::new(test_config());
        session.state = State::AuthenticatePassword(PasswordPhase::WaitForInput);
        session.handle_auth_input(b"hunter2");
        assert_eq!(session.input_buf, "hunter2");
        assert_eq!(session.state, State::AuthenticatePassword(PasswordPhase::WaitForInput));
    }

    #[test]
    fn enter_moves_password_phase_to_execute() {
        let mut session = SshSession::new(test_config());
        session.state = State::AuthenticatePassword(PasswordPhase::WaitForInput);
        session.handle_auth_input(b"secret\r");
        assert_eq!(session.input_buf, "secret");
        assert_eq!(session.state, State::AuthenticatePassword(PasswordPhase::Execute));
    }

    #[test]
    fn enter_moves_private_key_phase_to_execute() {
        let mut session = SshSession::new(test_config());
        session.state = State::AuthenticatePrivateKey(PrivateKeyPhase::WaitForInput);
        session.handle_auth_input(b"passphrase\n");
        assert_eq!(session.state, State::AuthenticatePrivateKey(PrivateKeyPhase::Execute));
    }

    #[test]
    fn backspace_pops_the_last_character() {
        let mut session = SshSession::new(test_config());
        session.state = State::AuthenticatePassword(PasswordPhase::WaitForInput);
        session.handle_auth_input(b"abc\x7f");
        assert_eq!(session.input_buf, "ab");
    }

    #[test]
    fn emit_prompt_and_pending_prompt_round_trip() {
        let session = SshSession::new(test_config());
        session.emit_prompt("alice@host's password: ".into());
        let prompt = session.pending_prompt().expect("prompt was just emitted");
        assert_eq!(prompt.text, "alice@host's password: ");
        assert!(session.pending_prompt().is_none(), "prompt is taken, not peeked");
    }

    #[test]
    fn wakeup_reader_sets_the_woken_flag() {
        let session = SshSession::new(test_config());
        session.wakeup_reader();
        let (lock, _) = &*session.inject;
        assert!(lock.lock().unwrap().woken);
    }

    #[test]
    fn is_eagain_matches_only_session_category_code_37() {
        use crate::error::SshErrorCode;
        assert!(is_eagain(&SshErrorCode { code: -37, category: "session", message: String::new() }));
        assert!(!is_eagain(&SshErrorCode { code: -37, category: "sftp", message: String::new() }));
        assert!(!is_eagain(&SshErrorCode { code: -1, category: "session", message: String::new() }));
    }
}
