// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the listener protocol and the transports beneath it.

use thiserror::Error;

use crate::transport::EndpointHandle;

/// Errors raised by the codec, the stub boundary and the proxy.
///
/// None of these are fatal to the process: identity and codec errors are
/// resolved at the stub, `RemoteUnavailable` is per subscriber, and
/// `HandlerFailure` is reported and then dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller presented a different interface token than the stub owns.
    #[error("interface mismatch: expected {expected:?}, got {actual:?}")]
    InterfaceMismatch { expected: String, actual: String },

    /// The parcel was truncated or otherwise undecodable.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// No event kind is registered for this transaction code.
    #[error("unrecognized transaction code {0}")]
    UnrecognizedTransaction(u32),

    /// The bound endpoint is dead or the transport refused the call.
    #[error("remote endpoint {handle} unavailable")]
    RemoteUnavailable {
        handle: EndpointHandle,
        #[source]
        source: TransportError,
    },

    /// Application handler code failed while an event was being dispatched.
    #[error("listener handler failed: {0}")]
    HandlerFailure(String),
}

impl Error {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload(reason.into())
    }

    pub fn handler(reason: impl Into<String>) -> Self {
        Self::HandlerFailure(reason.into())
    }

    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote endpoint has exited or was killed.
    #[error("dead object")]
    DeadObject,

    /// The transport refused to carry the call.
    #[error("call rejected: {0}")]
    Rejected(String),

    #[error("parcel of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the endpoint should be treated as gone for good.
    pub fn is_dead(&self) -> bool {
        match self {
            Self::DeadObject => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}
