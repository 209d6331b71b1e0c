// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The transport seam: what the listener protocol needs from the layer that
// moves opaque parcels between processes.
//
// Two implementations ship with the crate:
// - `loopback` — in-process endpoints, one delivery thread per endpoint
// - `socket`   — framed parcels over unix domain sockets (unix only)

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::TransportError;
use crate::platform;
use crate::stub::DispatchResult;
use crate::transaction::TransactionCode;

pub mod loopback;
#[cfg(unix)]
pub mod socket;

/// Call flag: the caller does not wait for a reply.
pub const FLAG_ONEWAY: u32 = 0x0000_0001;

// ---------------------------------------------------------------------------
// EndpointHandle
// ---------------------------------------------------------------------------

/// Identifies one subscriber connection.
///
/// Ids are unique within the process that minted them. The handle does not
/// keep the remote alive; it may go stale at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointHandle {
    id: u64,
    pid: Option<i32>,
}

impl EndpointHandle {
    pub const fn new(id: u64, pid: Option<i32>) -> Self {
        Self { id, pid }
    }

    /// Mint a fresh, process-unique handle.
    pub fn next(pid: Option<i32>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self::new(NEXT_ID.fetch_add(1, Ordering::Relaxed), pid)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pid of the remote process, when the transport could learn it.
    pub fn pid(&self) -> Option<i32> {
        self.pid
    }

    /// Whether the owning process still exists. Unknown pids count as alive.
    pub fn is_process_alive(&self) -> bool {
        self.pid.map_or(true, platform::is_pid_alive)
    }
}

impl fmt::Display for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "endpoint#{} (pid {pid})", self.id),
            None => write!(f, "endpoint#{}", self.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch / Transport traits
// ---------------------------------------------------------------------------

/// Receiving side of an endpoint: handles one incoming call.
///
/// `data` is only valid for the duration of the call; transports may reuse
/// the buffer afterwards.
pub trait Dispatch: Send + Sync {
    fn on_transact(&self, code: TransactionCode, data: &[u8]) -> DispatchResult;
}

impl<F> Dispatch for F
where
    F: Fn(TransactionCode, &[u8]) -> DispatchResult + Send + Sync,
{
    fn on_transact(&self, code: TransactionCode, data: &[u8]) -> DispatchResult {
        self(code, data)
    }
}

/// Callback run once when an endpoint dies.
pub type DeathRecipient = Box<dyn FnOnce(EndpointHandle) + Send>;

/// Sending side: carries one-way calls to remote endpoints.
pub trait Transport: Send + Sync {
    /// Hand `data` to the transport for delivery to `handle`.
    ///
    /// Returns once the transport has accepted the buffer; it never waits
    /// for the remote handler to run.
    fn transact_one_way(
        &self,
        handle: &EndpointHandle,
        descriptor: &str,
        code: TransactionCode,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Whether calls to `handle` can still be delivered.
    fn is_alive(&self, handle: &EndpointHandle) -> bool {
        handle.is_process_alive()
    }

    /// Run `recipient` once when `handle` dies.
    ///
    /// Transports that cannot observe peer death return `Rejected`; their
    /// dead endpoints are only noticed when a later call fails.
    fn link_to_death(&self, handle: &EndpointHandle, recipient: DeathRecipient) -> Result<(), TransportError> {
        let _ = (handle, recipient);
        Err(TransportError::Rejected("death notification not supported".into()))
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn transact_one_way(
        &self,
        handle: &EndpointHandle,
        descriptor: &str,
        code: TransactionCode,
        data: &[u8],
    ) -> Result<(), TransportError> {
        (**self).transact_one_way(handle, descriptor, code, data)
    }

    fn is_alive(&self, handle: &EndpointHandle) -> bool {
        (**self).is_alive(handle)
    }

    fn link_to_death(&self, handle: &EndpointHandle, recipient: DeathRecipient) -> Result<(), TransportError> {
        (**self).link_to_death(handle, recipient)
    }
}

/// Publishes a local dispatcher so that remote callers can reach it.
pub trait DispatchHost {
    fn register_dispatcher(
        &self,
        descriptor: &str,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Result<EndpointHandle, TransportError>;
}
