// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Service-side list of registered listeners.
//
// Entries live in a slab; `order` keeps registration order across slot
// reuse. Every operation takes the lock briefly; broadcasts copy a snapshot
// under the lock and make all calls after releasing it, so a listener may
// unregister (or a new one register) while a broadcast is in flight.

use std::sync::{Arc, Mutex, MutexGuard};

use slab::Slab;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::listener::StorageEventListener;
use crate::transport::EndpointHandle;

struct Entry {
    handle: EndpointHandle,
    listener: Arc<dyn StorageEventListener>,
}

#[derive(Default)]
struct Inner {
    entries: Slab<Entry>,
    order: Vec<usize>,
}

impl Inner {
    fn position(&self, handle: &EndpointHandle) -> Option<usize> {
        self.order.iter().position(|&k| self.entries[k].handle == *handle)
    }

    fn remove_at(&mut self, pos: usize) -> Entry {
        let key = self.order.remove(pos);
        self.entries.remove(key)
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Listeners whose call was accepted.
    pub delivered: usize,
    /// Listeners whose call failed, in delivery order.
    pub failed: Vec<EndpointHandle>,
    /// Subset of `failed` dropped from the registry as dead.
    pub pruned: usize,
}

/// Mutex-guarded, insertion-ordered set of `(handle, listener)` pairs.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<Inner>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `listener` under `handle`. Returns `false` if the handle is
    /// already registered.
    pub fn register(&self, handle: EndpointHandle, listener: Arc<dyn StorageEventListener>) -> bool {
        let mut inner = self.lock();
        if inner.position(&handle).is_some() {
            return false;
        }
        let key = inner.entries.insert(Entry { handle, listener });
        inner.order.push(key);
        debug!(%handle, count = inner.order.len(), "listener registered");
        true
    }

    pub fn unregister(&self, handle: &EndpointHandle) -> bool {
        let mut inner = self.lock();
        match inner.position(handle) {
            Some(pos) => {
                inner.remove_at(pos);
                debug!(%handle, count = inner.order.len(), "listener unregistered");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: &EndpointHandle) -> bool {
        self.lock().position(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn handles(&self) -> Vec<EndpointHandle> {
        let inner = self.lock();
        inner.order.iter().map(|&k| inner.entries[k].handle).collect()
    }

    /// Stable copy of the current registrations, in registration order.
    pub fn snapshot(&self) -> Vec<(EndpointHandle, Arc<dyn StorageEventListener>)> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .map(|&k| {
                let e = &inner.entries[k];
                (e.handle, Arc::clone(&e.listener))
            })
            .collect()
    }

    /// Call `f` for every listener in a snapshot.
    ///
    /// A failure never stops the loop. Listeners that fail with
    /// `RemoteUnavailable` are dropped from the registry.
    pub fn broadcast<F>(&self, mut f: F) -> BroadcastReport
    where
        F: FnMut(&dyn StorageEventListener) -> Result<()>,
    {
        let mut report = BroadcastReport::default();
        for (handle, listener) in self.snapshot() {
            match f(listener.as_ref()) {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_remote_unavailable() => {
                    info!(%handle, %e, "dropping dead listener");
                    if self.unregister(&handle) {
                        report.pruned += 1;
                    }
                    report.failed.push(handle);
                }
                Err(e) => {
                    warn!(%handle, %e, "listener call failed");
                    report.failed.push(handle);
                }
            }
        }
        report
    }

    /// Drop every registration. Returns how many were removed.
    pub fn kill(&self) -> usize {
        let mut inner = self.lock();
        let n = inner.order.len();
        inner.order.clear();
        inner.entries.clear();
        n
    }

    /// Drop registrations whose owning process has exited.
    pub fn gc(&self) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;
        let mut pos = 0;
        while pos < inner.order.len() {
            let key = inner.order[pos];
            if inner.entries[key].handle.is_process_alive() {
                pos += 1;
                continue;
            }
            let e = inner.remove_at(pos);
            debug!(handle = %e.handle, "collected listener of exited process");
            removed += 1;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TransportError};

    struct Nop;
    impl StorageEventListener for Nop {}

    #[test]
    fn duplicate_registration_is_ignored() {
        let r = ListenerRegistry::new();
        let h = EndpointHandle::next(None);
        assert!(r.register(h, Arc::new(Nop)));
        assert!(!r.register(h, Arc::new(Nop)));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn order_survives_slot_reuse() {
        let r = ListenerRegistry::new();
        let a = EndpointHandle::next(None);
        let b = EndpointHandle::next(None);
        let c = EndpointHandle::next(None);
        r.register(a, Arc::new(Nop));
        r.register(b, Arc::new(Nop));
        r.unregister(&a);
        r.register(c, Arc::new(Nop));
        assert_eq!(r.handles(), vec![b, c]);
    }

    #[test]
    fn gc_drops_exited_pids() {
        let r = ListenerRegistry::new();
        let live = EndpointHandle::next(Some(crate::platform::current_pid()));
        let gone = EndpointHandle::next(Some(0));
        r.register(live, Arc::new(Nop));
        r.register(gone, Arc::new(Nop));
        assert_eq!(r.gc(), 1);
        assert_eq!(r.handles(), vec![live]);
    }

    #[test]
    fn broadcast_prunes_only_remote_failures() {
        let r = ListenerRegistry::new();
        let a = EndpointHandle::next(None);
        let b = EndpointHandle::next(None);
        r.register(a, Arc::new(Nop));
        r.register(b, Arc::new(Nop));

        let mut n = 0;
        let report = r.broadcast(|_| {
            n += 1;
            match n {
                1 => Err(Error::RemoteUnavailable { handle: a, source: TransportError::DeadObject }),
                _ => Err(Error::handler("busy")),
            }
        });
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed, vec![a, b]);
        assert_eq!(report.pruned, 1);
        assert_eq!(r.handles(), vec![b]);
    }
}
