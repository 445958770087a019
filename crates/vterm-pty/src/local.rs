//! Local PTY transport: owns a master side and a spawned child attached
//! to the slave side.
//!
//! A POSIX `wakeupReader` is traditionally a self-pipe polled alongside
//! the master fd. We get the same semantics - an in-flight `read`
//! unblocks immediately and returns zero bytes - without raw fd
//! polling, by running the reader on its own thread and giving
//! `wakeup_reader` a channel of its own that `read` selects over. This
//! keeps the crate free of `unsafe`.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use portable_pty::{Child, CommandBuilder, MasterPty, PtySize};

use crate::error::TransportError;
use crate::transport::{PageSize, PixelSize, ReadOutcome, WriteOutcome};

enum ReaderMsg {
    Data(Vec<u8>),
    Eof,
    Err(io::Error),
    Woken,
}

pub struct LocalPty {
    command: Option<CommandBuilder>,
    initial_size: PageSize,
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    child: Option<Box<dyn Child + Send + Sync>>,
    rx: Option<Receiver<ReaderMsg>>,
    wake_tx: Option<Sender<ReaderMsg>>,
    reader_thread: Option<JoinHandle<()>>,
    closed: Arc<Mutex<bool>>,
}

impl LocalPty {
    #[must_use]
    pub fn new(command: CommandBuilder, initial_size: PageSize) -> Self {
        Self {
            command: Some(command),
            initial_size,
            master: None,
            writer: None,
            child: None,
            rx: None,
            wake_tx: None,
            reader_thread: None,
            closed: Arc::new(Mutex::new(false)),
        }
    }

    pub fn start(&mut self) -> Result<(), TransportError> {
        let pty_system = portable_pty::native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: self.initial_size.rows,
                cols: self.initial_size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(pty_error)?;

        let command = self.command.take().expect("start called twice");
        let child = pair.slave.spawn_command(command).map_err(pty_error)?;
        let mut reader = pair.master.try_clone_reader().map_err(pty_error)?;
        let writer = pair.master.take_writer().map_err(pty_error)?;

        let (tx, rx) = mpsc::channel::<ReaderMsg>();
        let wake_tx = tx.clone();
        let reader_thread = thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx.send(ReaderMsg::Eof);
                        break;
                    }
                    Ok(n) => {
                        if tx.send(ReaderMsg::Data(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(ReaderMsg::Err(err));
                        break;
                    }
                }
            }
        });

        self.master = Some(pair.master);
        self.writer = Some(writer);
        self.child = Some(child);
        self.rx = Some(rx);
        self.wake_tx = Some(wake_tx);
        self.reader_thread = Some(reader_thread);
        #[cfg(feature = "tracing")]
        tracing::debug!(cols = self.initial_size.cols, rows = self.initial_size.rows, "local pty started");
        Ok(())
    }

    pub fn read(&mut self, timeout: Option<Duration>) -> Result<ReadOutcome, TransportError> {
        let rx = self.rx.as_ref().ok_or(TransportError::Closed)?;
        let first = match timeout {
            Some(d) => rx.recv_timeout(d).ok(),
            None => rx.recv().ok(),
        };
        let Some(mut msg) = first else {
            return Ok(ReadOutcome::again());
        };

        let mut collected = Vec::new();
        loop {
            match msg {
                ReaderMsg::Data(bytes) => collected.extend_from_slice(&bytes),
                ReaderMsg::Eof => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("local pty reader hit eof");
                    return Ok(ReadOutcome::eof());
                }
                ReaderMsg::Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %err, "local pty reader error");
                    return Err(TransportError::Io(err));
                }
                ReaderMsg::Woken => return Ok(ReadOutcome::again()),
            }
            match rx.try_recv() {
                Ok(next) => msg = next,
                Err(_) => break,
            }
        }
        Ok(ReadOutcome::data(collected))
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<WriteOutcome, TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;
        match writer.write(bytes) {
            Ok(n) => Ok(WriteOutcome::Wrote(n)),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(WriteOutcome::Again),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    pub fn resize(
        &mut self,
        page: PageSize,
        pixel: Option<PixelSize>,
    ) -> Result<(), TransportError> {
        let master = self.master.as_ref().ok_or(TransportError::Closed)?;
        let (pixel_width, pixel_height) = pixel.map_or((0, 0), |p| (p.width, p.height));
        master
            .resize(PtySize { rows: page.rows, cols: page.cols, pixel_width, pixel_height })
            .map_err(pty_error)
    }

    pub fn close(&mut self) {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner()) = true;
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
        }
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }

    pub fn wait_for_closed(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.wait();
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }

    pub fn wakeup_reader(&self) {
        if let Some(tx) = &self.wake_tx {
            let _ = tx.send(ReaderMsg::Woken);
        }
    }
}

fn pty_error<E: std::fmt::Display>(err: E) -> TransportError {
    TransportError::Io(io::Error::other(err.to_string()))
}
