// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// In-process transport.
//
// Every registered endpoint gets its own delivery thread fed by an mpsc
// queue, so calls to one endpoint are delivered in FIFO order while the
// caller never waits for the handler. Killing an endpoint emulates the
// remote process exiting: queued calls are discarded, later calls fail with
// `DeadObject`, and death recipients fire once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::{debug, trace};

use super::{DeathRecipient, Dispatch, DispatchHost, EndpointHandle, Transport};
use crate::error::TransportError;
use crate::parcel::MAX_PARCEL_SIZE;
use crate::platform;
use crate::transaction::TransactionCode;

enum Call {
    Transact { code: TransactionCode, data: Vec<u8> },
    Flush(mpsc::SyncSender<()>),
}

struct Endpoint {
    tx: mpsc::Sender<Call>,
    alive: Arc<AtomicBool>,
    death_recipients: Vec<DeathRecipient>,
}

/// In-process stand-in for the RPC kernel.
#[derive(Default)]
pub struct LoopbackTransport {
    endpoints: Mutex<HashMap<EndpointHandle, Endpoint>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn endpoints(&self) -> MutexGuard<'_, HashMap<EndpointHandle, Endpoint>> {
        self.endpoints.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Emulate the remote process exiting.
    ///
    /// Returns `false` if the endpoint was unknown or already dead.
    pub fn kill(&self, handle: &EndpointHandle) -> bool {
        let Some(ep) = self.endpoints().remove(handle) else {
            return false;
        };
        ep.alive.store(false, Ordering::Release);
        drop(ep.tx);
        debug!(%handle, "loopback endpoint killed");
        for recipient in ep.death_recipients {
            recipient(*handle);
        }
        true
    }

    /// Block until every call queued for `handle` before this point has been
    /// dispatched. Returns immediately for dead endpoints.
    pub fn flush(&self, handle: &EndpointHandle) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        let sent = match self.endpoints().get(handle) {
            Some(ep) => ep.tx.send(Call::Flush(ack_tx)).is_ok(),
            None => false,
        };
        if sent {
            let _ = ack_rx.recv();
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints().is_empty()
    }
}

impl DispatchHost for LoopbackTransport {
    fn register_dispatcher(
        &self,
        descriptor: &str,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Result<EndpointHandle, TransportError> {
        let handle = EndpointHandle::next(Some(platform::current_pid()));
        let (tx, rx) = mpsc::channel::<Call>();
        let alive = Arc::new(AtomicBool::new(true));

        let worker_alive = Arc::clone(&alive);
        thread::Builder::new()
            .name(format!("loopback-{}", handle.id()))
            .spawn(move || deliver_loop(handle, rx, dispatcher, worker_alive))?;

        self.endpoints().insert(
            handle,
            Endpoint {
                tx,
                alive,
                death_recipients: Vec::new(),
            },
        );
        debug!(%handle, descriptor, "loopback endpoint registered");
        Ok(handle)
    }
}

impl Transport for LoopbackTransport {
    fn transact_one_way(
        &self,
        handle: &EndpointHandle,
        descriptor: &str,
        code: TransactionCode,
        data: &[u8],
    ) -> Result<(), TransportError> {
        if data.len() > MAX_PARCEL_SIZE {
            return Err(TransportError::PayloadTooLarge { size: data.len(), max: MAX_PARCEL_SIZE });
        }
        let eps = self.endpoints();
        let ep = eps.get(handle).ok_or(TransportError::DeadObject)?;
        trace!(%handle, descriptor, code, len = data.len(), "loopback enqueue");
        ep.tx
            .send(Call::Transact { code, data: data.to_vec() })
            .map_err(|_| TransportError::DeadObject)
    }

    fn is_alive(&self, handle: &EndpointHandle) -> bool {
        self.endpoints().contains_key(handle)
    }

    fn link_to_death(&self, handle: &EndpointHandle, recipient: DeathRecipient) -> Result<(), TransportError> {
        let mut eps = self.endpoints();
        let ep = eps.get_mut(handle).ok_or(TransportError::DeadObject)?;
        ep.death_recipients.push(recipient);
        Ok(())
    }
}

fn deliver_loop(
    handle: EndpointHandle,
    rx: mpsc::Receiver<Call>,
    dispatcher: Arc<dyn Dispatch>,
    alive: Arc<AtomicBool>,
) {
    for call in rx {
        match call {
            Call::Transact { code, data } => {
                if !alive.load(Ordering::Acquire) {
                    continue;
                }
                let result = dispatcher.on_transact(code, &data);
                trace!(%handle, code, ?result, "loopback delivered");
            }
            Call::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(%handle, "loopback delivery thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::DispatchResult;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn delivers_in_fifo_order() {
        let t = LoopbackTransport::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let h = t
            .register_dispatcher("d", Arc::new(move |code: TransactionCode, _: &[u8]| {
                s.lock().unwrap().push(code);
                DispatchResult::Handled
            }))
            .unwrap();
        for code in 1..=50 {
            t.transact_one_way(&h, "d", code, &[]).unwrap();
        }
        t.flush(&h);
        assert_eq!(*seen.lock().unwrap(), (1..=50).collect::<Vec<_>>());
    }

    #[test]
    fn killed_endpoint_is_dead_and_notifies_once() {
        let t = LoopbackTransport::new();
        let h = t
            .register_dispatcher("d", Arc::new(|_: TransactionCode, _: &[u8]| DispatchResult::Handled))
            .unwrap();
        let deaths = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&deaths);
        t.link_to_death(
            &h,
            Box::new(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        assert!(t.kill(&h));
        assert!(!t.kill(&h));
        assert_eq!(deaths.load(Ordering::SeqCst), 1);
        assert!(!t.is_alive(&h));
        assert!(matches!(
            t.transact_one_way(&h, "d", 1, &[]),
            Err(TransportError::DeadObject)
        ));
        assert!(t.link_to_death(&h, Box::new(|_| {})).is_err());
    }

    #[test]
    fn oversized_parcel_is_rejected() {
        let t = LoopbackTransport::new();
        let h = t
            .register_dispatcher("d", Arc::new(|_: TransactionCode, _: &[u8]| DispatchResult::Handled))
            .unwrap();
        let big = vec![0u8; MAX_PARCEL_SIZE + 1];
        assert!(matches!(
            t.transact_one_way(&h, "d", 1, &big),
            Err(TransportError::PayloadTooLarge { .. })
        ));
    }
}
