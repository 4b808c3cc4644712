use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use rcpad_frame::{command_name, encode_frame, FrameDecoder, MAX_PAYLOAD, OVERHEAD};
use rcpad_poll::{CancellationToken, Waker};
use rcpad_serial::SerialStream;
use tracing::{debug, info, trace, warn};

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::pending::{PendingTable, Ticket};
use crate::router::CommandRouter;
use crate::stats::{StatsSnapshot, TransportStats};

const READ_CHUNK_SIZE: usize = 256;

type BoxedWriter = Box<dyn Write + Send>;

/// Command/response engine over one serial link.
///
/// Construction starts a receive thread that decodes incoming frames,
/// completes matching [`PendingRequest`](crate::PendingRequest)s and passes
/// every frame to the [`CommandRouter`]. Sending happens on the caller's
/// thread. The transport is `Sync`; share it behind an `Arc`.
pub struct Transport {
    shared: Arc<Shared>,
    writer: Mutex<Option<BoxedWriter>>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    token: CancellationToken,
    config: TransportConfig,
}

struct Shared {
    pending: PendingTable,
    stats: TransportStats,
}

impl Transport {
    /// Take ownership of an open serial stream and start receiving.
    ///
    /// The receive thread stops when `shutdown` is cancelled or when
    /// [`stop`](Self::stop) is called. Every decoded frame also wakes anything
    /// sleeping on `shutdown`, so a scheduler blocked on it re-polls promptly.
    pub fn open(
        stream: SerialStream,
        router: CommandRouter,
        config: TransportConfig,
        shutdown: &CancellationToken,
    ) -> Result<Self> {
        let mut reader = stream.try_clone()?;
        reader.set_timeout(config.read_poll_interval)?;
        let mut writer = stream;
        writer.set_timeout(config.write_timeout)?;

        info!(port = %writer.name(), "starting transport");
        Self::spawn(reader, writer, router, config, shutdown)
    }

    /// Start a transport over an arbitrary reader/writer pair.
    ///
    /// `reader` should time out periodically (`WouldBlock` or `TimedOut`) so
    /// the receive thread can observe cancellation.
    pub fn spawn<R, W>(
        reader: R,
        writer: W,
        router: CommandRouter,
        config: TransportConfig,
        shutdown: &CancellationToken,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared {
            pending: PendingTable::new(),
            stats: TransportStats::default(),
        });
        let token = shutdown.child_token();

        let handle = {
            let shared = Arc::clone(&shared);
            let token = token.clone();
            let waker = shutdown.waker();
            std::thread::Builder::new()
                .name("rcpad-rx".to_string())
                .spawn(move || receive_loop(reader, router, &shared, &token, &waker))
                .map_err(TransportError::Spawn)?
        };

        Ok(Self {
            shared,
            writer: Mutex::new(Some(Box::new(writer))),
            receiver: Mutex::new(Some(handle)),
            token,
            config,
        })
    }

    /// Write one frame and register a pending request for `command`.
    ///
    /// A request already pending for `command` is replaced.
    pub fn send(&self, command: u8, payload: &[u8]) -> Result<()> {
        self.send_tracked(command, payload).map(|_| ())
    }

    /// Send and block until the reply arrives or `timeout` expires.
    pub fn send_and_wait(&self, command: u8, payload: &[u8], timeout: Duration) -> Result<Bytes> {
        let ticket = self.send_tracked(command, payload)?;
        self.shared
            .pending
            .wait(&ticket, timeout)
            .ok_or(TransportError::ResponseTimeout { command, timeout })
    }

    /// Send an empty request and return the reply, checking its size when
    /// `expected_size` is given. The pending entry is removed afterwards.
    pub fn send_and_get(&self, command: u8, expected_size: Option<usize>) -> Result<Bytes> {
        let timeout = self.config.response_timeout;
        let ticket = self.send_tracked(command, &[])?;
        let reply = self.shared.pending.wait(&ticket, timeout);
        self.shared.pending.remove(&ticket);

        let reply = reply.ok_or(TransportError::ResponseTimeout { command, timeout })?;
        match expected_size {
            Some(expected) if reply.len() != expected => Err(TransportError::UnexpectedSize {
                command,
                expected,
                actual: reply.len(),
            }),
            _ => Ok(reply),
        }
    }

    fn send_tracked(&self, command: u8, payload: &[u8]) -> Result<Ticket> {
        if payload.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        let mut buf = BytesMut::with_capacity(OVERHEAD + payload.len());
        encode_frame(command, payload, &mut buf)?;

        // The entry must exist before the reply can arrive.
        let (ticket, replaced) = self.shared.pending.register_replacing(command);
        if let Err(err) = self.write_frame(&buf) {
            // A failed write leaves any earlier request for `command` in place.
            self.shared.pending.restore(&ticket, replaced);
            warn!(command, name = command_name(command), error = %err, "serial write failed");
            return Err(TransportError::WriteFailed(err));
        }

        self.shared.stats.record_sent();
        trace!(command, len = payload.len(), "frame sent");
        Ok(ticket)
    }

    fn write_frame(&self, frame: &[u8]) -> std::io::Result<()> {
        let mut writer = lock(&self.writer);
        let writer = writer.as_mut().ok_or_else(|| {
            std::io::Error::new(ErrorKind::NotConnected, "transport stopped")
        })?;
        writer.write_all(frame)?;
        writer.flush()
    }

    /// Stop the receive thread and close the link.
    ///
    /// Safe to call more than once, and after the receive thread has already
    /// exited on its own.
    pub fn stop(&self) {
        self.token.cancel();

        if let Some(handle) = lock(&self.receiver).take() {
            if handle.join().is_err() {
                warn!("receive thread panicked");
            }
        }
        if lock(&self.writer).take().is_some() {
            info!("transport stopped");
        }
    }

    /// Whether the receive thread is still running.
    pub fn is_receiving(&self) -> bool {
        lock(&self.receiver)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Requests currently awaiting replies.
    pub fn pending(&self) -> &PendingTable {
        &self.shared.pending
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn receive_loop<R: Read>(
    mut reader: R,
    mut router: CommandRouter,
    shared: &Shared,
    token: &CancellationToken,
    waker: &Waker,
) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    debug!("receive loop started");

    while !token.is_cancelled() {
        let read = match reader.read(&mut chunk) {
            Ok(0) => {
                info!("serial link closed by peer");
                break;
            }
            Ok(n) => n,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(err) => {
                warn!(error = %err, "serial read failed; receive loop exiting");
                break;
            }
        };

        shared.stats.record_bytes(read);
        let mut dispatched = false;
        for &byte in &chunk[..read] {
            if let Some(frame) = decoder.feed(byte) {
                shared.stats.record_frame();
                trace!(
                    command = frame.command,
                    name = command_name(frame.command),
                    len = frame.payload.len(),
                    "frame received"
                );
                shared.pending.complete(frame.command, frame.payload.clone());
                router.dispatch(frame.command, &frame.payload);
                dispatched = true;
            }
        }
        shared.stats.set_checksum_failures(decoder.checksum_failures());

        if dispatched {
            waker.wake();
        }
    }

    debug!("receive loop finished");
}
