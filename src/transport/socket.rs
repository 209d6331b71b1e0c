// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Unix domain socket transport.
//
// Each call is one frame:
//
//   +----------+----------+----------+------------------+
//   | len u32  | code u32 | flags u32| parcel (len B)   |
//   +----------+----------+----------+------------------+
//
// All header words are little-endian. The service side owns one connection
// per subscriber and writes frames; the subscriber side reads frames and
// hands them to its dispatcher. There is never a reply frame.
//
// A subscriber that stops reading fills its socket buffer. Service-side
// writes are bounded by a send timeout; a frame that cannot be handed off in
// time kills the connection, since a partial frame cannot be resumed.

use std::collections::HashMap;
use std::io::{self, BufReader, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::{Dispatch, DispatchHost, EndpointHandle, Transport, FLAG_ONEWAY};
use crate::error::TransportError;
use crate::parcel::MAX_PARCEL_SIZE;
use crate::platform;
use crate::transaction::TransactionCode;

pub const FRAME_HEADER_SIZE: usize = 12;

/// How long one frame may wait for room in a subscriber's socket buffer.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// One decoded call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: TransactionCode,
    pub flags: u32,
    pub data: Vec<u8>,
}

pub fn write_frame<W: Write>(
    w: &mut W,
    code: TransactionCode,
    flags: u32,
    data: &[u8],
) -> Result<(), TransportError> {
    if data.len() > MAX_PARCEL_SIZE {
        return Err(TransportError::PayloadTooLarge { size: data.len(), max: MAX_PARCEL_SIZE });
    }
    let mut header = [0u8; FRAME_HEADER_SIZE];
    header[0..4].copy_from_slice(&(data.len() as u32).to_le_bytes());
    header[4..8].copy_from_slice(&code.to_le_bytes());
    header[8..12].copy_from_slice(&flags.to_le_bytes());
    w.write_all(&header)?;
    w.write_all(data)?;
    w.flush()?;
    Ok(())
}

/// Read the next frame. `Ok(None)` means the peer closed the stream cleanly
/// on a frame boundary.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Option<Frame>, TransportError> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let mut filled = 0;
    while filled < FRAME_HEADER_SIZE {
        match r.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    let word = |i: usize| u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);
    let len = word(0) as usize;
    if len > MAX_PARCEL_SIZE {
        return Err(TransportError::PayloadTooLarge { size: len, max: MAX_PARCEL_SIZE });
    }
    let mut data = vec![0u8; len];
    r.read_exact(&mut data)?;
    Ok(Some(Frame { code: word(4), flags: word(8), data }))
}

/// Read frames from `stream` and dispatch each one until the peer hangs up.
///
/// Failed dispatches are logged and skipped; a broken frame ends the loop
/// with an error. Returns the number of frames dispatched.
pub fn serve_connection<R: Read>(stream: R, dispatcher: &dyn Dispatch) -> Result<usize, TransportError> {
    let mut reader = BufReader::new(stream);
    let mut count = 0usize;
    while let Some(frame) = read_frame(&mut reader)? {
        if frame.flags & FLAG_ONEWAY == 0 {
            warn!(code = frame.code, flags = frame.flags, "two-way call on a one-way interface");
        }
        let result = dispatcher.on_transact(frame.code, &frame.data);
        trace!(code = frame.code, ?result, "socket frame dispatched");
        count += 1;
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Service side
// ---------------------------------------------------------------------------

struct Connection {
    stream: Mutex<UnixStream>,
    fd: RawFd,
    dead: AtomicBool,
}

impl Connection {
    /// Mark dead and shut the socket down without taking the stream lock, so
    /// a writer blocked in `send` wakes up with an error.
    fn kill(&self) {
        self.dead.store(true, Ordering::Release);
        // SAFETY: `fd` is owned by `self.stream` and stays open while `self` lives.
        unsafe {
            libc::shutdown(self.fd, libc::SHUT_RDWR);
        }
    }
}

/// Service-side transport: one connected stream per subscriber.
///
/// Writes to the same connection are serialized by a per-connection mutex,
/// which keeps per-subscriber FIFO even with several notifying threads.
pub struct SocketTransport {
    conns: Mutex<HashMap<EndpointHandle, Arc<Connection>>>,
    send_timeout: Duration,
}

impl Default for SocketTransport {
    fn default() -> Self {
        Self::with_send_timeout(DEFAULT_SEND_TIMEOUT)
    }
}

impl SocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `timeout` bounds each frame write; it must be non-zero.
    pub fn with_send_timeout(timeout: Duration) -> Self {
        Self { conns: Mutex::new(HashMap::new()), send_timeout: timeout }
    }

    fn conns(&self) -> MutexGuard<'_, HashMap<EndpointHandle, Arc<Connection>>> {
        self.conns.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take ownership of a connected stream and mint a handle for it.
    pub fn adopt(&self, stream: UnixStream) -> EndpointHandle {
        let handle = EndpointHandle::next(platform::peer_pid(&stream));
        if let Err(e) = stream.set_write_timeout(Some(self.send_timeout)) {
            warn!(%handle, %e, "cannot bound subscriber writes");
        }
        let fd = stream.as_raw_fd();
        let conn = Connection { stream: Mutex::new(stream), fd, dead: AtomicBool::new(false) };
        self.conns().insert(handle, Arc::new(conn));
        debug!(%handle, "subscriber connection adopted");
        handle
    }

    /// Accept one subscriber from `listener`.
    pub fn accept(&self, listener: &UnixListener) -> io::Result<EndpointHandle> {
        let (stream, _) = listener.accept()?;
        Ok(self.adopt(stream))
    }

    /// Drop the connection for `handle`, closing the socket.
    pub fn close(&self, handle: &EndpointHandle) -> bool {
        let removed = self.conns().remove(handle);
        if let Some(conn) = &removed {
            conn.kill();
            debug!(%handle, "subscriber connection closed");
        }
        removed.is_some()
    }

    pub fn len(&self) -> usize {
        self.conns().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns().is_empty()
    }
}

impl Transport for SocketTransport {
    fn transact_one_way(
        &self,
        handle: &EndpointHandle,
        descriptor: &str,
        code: TransactionCode,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let conn = self.conns().get(handle).cloned().ok_or(TransportError::DeadObject)?;
        if conn.dead.load(Ordering::Acquire) {
            return Err(TransportError::DeadObject);
        }
        trace!(%handle, descriptor, code, len = data.len(), "socket send");
        let result = {
            let mut stream = conn.stream.lock().unwrap_or_else(|e| e.into_inner());
            if conn.dead.load(Ordering::Acquire) {
                return Err(TransportError::DeadObject);
            }
            write_frame(&mut *stream, code, FLAG_ONEWAY, data)
        };
        match result {
            // Any io failure may leave a partial frame on the wire.
            Err(TransportError::Io(e)) => {
                conn.kill();
                self.conns().remove(handle);
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) {
                    warn!(%handle, timeout = ?self.send_timeout, "subscriber stopped reading; dropping it");
                } else {
                    debug!(%handle, %e, "subscriber connection lost");
                }
                Err(TransportError::DeadObject)
            }
            other => other,
        }
    }

    fn is_alive(&self, handle: &EndpointHandle) -> bool {
        match self.conns().get(handle) {
            Some(c) => !c.dead.load(Ordering::Acquire) && handle.is_process_alive(),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber side
// ---------------------------------------------------------------------------

/// Subscriber end of a service connection.
pub struct SocketEndpoint {
    stream: UnixStream,
}

impl SocketEndpoint {
    pub fn connect(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self { stream: UnixStream::connect(path)? })
    }

    pub fn from_stream(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Serve on the calling thread until the service disconnects.
    pub fn serve(&self, dispatcher: &dyn Dispatch) -> Result<usize, TransportError> {
        serve_connection(&self.stream, dispatcher)
    }

    pub fn shutdown(&self) -> io::Result<()> {
        self.stream.shutdown(std::net::Shutdown::Both)
    }
}

impl DispatchHost for SocketEndpoint {
    /// Serve the connection on a background thread.
    fn register_dispatcher(
        &self,
        descriptor: &str,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Result<EndpointHandle, TransportError> {
        let stream = self.stream.try_clone()?;
        let handle = EndpointHandle::next(Some(platform::current_pid()));
        let descriptor = descriptor.to_owned();
        thread::Builder::new()
            .name(format!("socket-endpoint-{}", handle.id()))
            .spawn(move || match serve_connection(stream, dispatcher.as_ref()) {
                Ok(n) => debug!(%handle, descriptor = %descriptor, frames = n, "service hung up"),
                Err(e) => warn!(%handle, descriptor = %descriptor, %e, "connection ended with error"),
            })?;
        Ok(handle)
    }
}
