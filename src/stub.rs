// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Listener stub: the receiving end of the one-way listener calls.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, trace, warn};

use crate::error::Error;
use crate::event::EventPayload;
use crate::listener::StorageEventListener;
use crate::parcel::ParcelReader;
use crate::transaction::{self, TransactionCode, DEFAULT_DESCRIPTOR};
use crate::transport::Dispatch;

/// Outcome of dispatching one incoming call.
#[derive(Debug)]
pub enum DispatchResult {
    /// The handler ran and returned normally.
    Handled,
    /// The code is not part of this interface; the transport may apply its
    /// own default.
    NotHandled,
    /// Identity check failed; no handler ran.
    Rejected(Error),
    /// Decoding or the handler failed.
    Failed(Error),
}

impl DispatchResult {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Rejected(e) | Self::Failed(e) => Some(e),
            Self::Handled | Self::NotHandled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error reporting channel
// ---------------------------------------------------------------------------

/// Where handler failures go once they have been caught at the stub.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, code: TransactionCode, err: &Error);
}

/// Default reporter: logs at `error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, code: TransactionCode, err: &Error) {
        let method = transaction::kind_for(code).map_or("?", |k| k.method());
        error!(code, method, %err, "storage listener handler failed");
    }
}

// ---------------------------------------------------------------------------
// ListenerStub
// ---------------------------------------------------------------------------

/// Decodes incoming calls and invokes the wrapped listener.
///
/// Holds no mutable state: the descriptor, the listener and the reporter are
/// fixed at construction.
pub struct ListenerStub<L> {
    descriptor: Arc<str>,
    listener: L,
    reporter: Arc<dyn ErrorReporter>,
}

impl<L: StorageEventListener> ListenerStub<L> {
    pub fn new(listener: L) -> Self {
        Self::with_descriptor(DEFAULT_DESCRIPTOR, listener)
    }

    pub fn with_descriptor(descriptor: impl Into<Arc<str>>, listener: L) -> Self {
        Self {
            descriptor: descriptor.into(),
            listener,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replace the channel handler failures are reported through.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Dispatch one call whose interface token has already been read.
    ///
    /// `payload` holds only the arguments. No handler runs unless the
    /// descriptor matches and the payload decodes completely.
    pub fn dispatch(
        &self,
        code: TransactionCode,
        descriptor: &str,
        payload: &[u8],
    ) -> DispatchResult {
        if descriptor != &*self.descriptor {
            warn!(code, expected = %self.descriptor, actual = descriptor, "rejecting call: interface mismatch");
            return DispatchResult::Rejected(Error::InterfaceMismatch {
                expected: self.descriptor.to_string(),
                actual: descriptor.to_owned(),
            });
        }
        let Some(t) = transaction::lookup(code) else {
            trace!(code, "unrecognized transaction");
            return DispatchResult::NotHandled;
        };
        let event = match t.decode_args(&mut ParcelReader::new(payload)) {
            Ok(ev) => ev,
            Err(e) => {
                warn!(code, method = t.method, %e, "dropping malformed call");
                return DispatchResult::Failed(e);
            }
        };
        self.invoke(code, event)
    }

    /// Transport entry point: `data` is a full call parcel starting with the
    /// interface token.
    pub fn on_transact(&self, code: TransactionCode, data: &[u8]) -> DispatchResult {
        let mut r = ParcelReader::new(data);
        let descriptor = match r.read_interface_token() {
            Ok(d) => d,
            Err(e) => {
                warn!(code, %e, "dropping call without a readable interface token");
                return DispatchResult::Failed(e);
            }
        };
        let args = &data[r.position()..];
        self.dispatch(code, &descriptor, args)
    }

    fn invoke(&self, code: TransactionCode, event: EventPayload) -> DispatchResult {
        let listener: &dyn StorageEventListener = &self.listener;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| event.deliver(listener)));
        let err = match outcome {
            Ok(Ok(())) => return DispatchResult::Handled,
            Ok(Err(e)) => match e {
                Error::HandlerFailure(_) => e,
                other => Error::handler(other.to_string()),
            },
            Err(payload) => Error::handler(panic_message(payload.as_ref())),
        };
        self.reporter.report(code, &err);
        DispatchResult::Failed(err)
    }
}

impl<L: StorageEventListener> Dispatch for ListenerStub<L> {
    fn on_transact(&self, code: TransactionCode, data: &[u8]) -> DispatchResult {
        ListenerStub::on_transact(self, code, data)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl StorageEventListener for Counting {
        fn on_volume_forgotten(&self, _fs_uuid: String) -> crate::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn unknown_code_is_not_handled() {
        let stub = ListenerStub::new(Counting::default());
        assert!(matches!(
            stub.dispatch(0x5f4e_5446, DEFAULT_DESCRIPTOR, &[]),
            DispatchResult::NotHandled
        ));
    }

    #[test]
    fn missing_token_fails_without_invoking() {
        let stub = ListenerStub::new(Counting::default());
        let r = stub.on_transact(5, &[1, 2]);
        assert!(matches!(r, DispatchResult::Failed(Error::MalformedPayload(_))));
        assert_eq!(stub.listener().0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panic_message_extracts_str() {
        let p: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(p.as_ref()), "panicked: boom");
    }
}
