// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Service-side fan-out of storage events to every registered listener.

use std::sync::{Arc, Weak};

use tracing::debug;

use crate::event::EventPayload;
use crate::proxy::ListenerProxy;
use crate::records::{DiskInfo, VolumeInfo, VolumeRecord};
use crate::registry::{BroadcastReport, ListenerRegistry};
use crate::transport::{EndpointHandle, Transport};

/// Notifies all registered listeners of storage events.
///
/// Each `notify_*` call delivers to every listener in the registry snapshot
/// taken at call time; a dead subscriber is dropped and the others still
/// receive the event.
#[derive(Clone, Default)]
pub struct StorageEventCallbacks {
    registry: Arc<ListenerRegistry>,
}

impl StorageEventCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Arc<ListenerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Register a remote subscriber reachable through `transport`.
    ///
    /// When the transport reports peer death the subscriber is unregistered
    /// as soon as it dies; otherwise it is pruned by the first broadcast that
    /// fails to reach it. Returns `false` for a duplicate or already dead
    /// handle.
    pub fn register_remote<T>(&self, transport: &Arc<T>, handle: EndpointHandle) -> bool
    where
        T: Transport + 'static,
    {
        let proxy = ListenerProxy::new(Arc::clone(transport), handle);
        if !self.registry.register(handle, Arc::new(proxy)) {
            return false;
        }
        let registry: Weak<ListenerRegistry> = Arc::downgrade(&self.registry);
        let unlink = Box::new(move |dead: EndpointHandle| {
            if let Some(r) = registry.upgrade() {
                if r.unregister(&dead) {
                    debug!(handle = %dead, "subscriber died");
                }
            }
        });
        match transport.link_to_death(&handle, unlink) {
            Ok(()) => true,
            Err(e) if e.is_dead() => {
                self.registry.unregister(&handle);
                debug!(%handle, "subscriber died before it was linked");
                false
            }
            Err(_) => true,
        }
    }

    pub fn unregister(&self, handle: &EndpointHandle) -> bool {
        self.registry.unregister(handle)
    }

    /// Deliver `event` to every listener.
    pub fn notify(&self, event: &EventPayload) -> BroadcastReport {
        let report = self.registry.broadcast(|l| event.clone().deliver(l));
        debug!(
            method = event.kind().method(),
            delivered = report.delivered,
            failed = report.failed.len(),
            "storage event broadcast"
        );
        report
    }

    pub fn notify_usb_mass_storage_connection_changed(&self, connected: bool) -> BroadcastReport {
        self.notify(&EventPayload::ConnectionChanged { connected })
    }

    pub fn notify_storage_state_changed(
        &self,
        path: &str,
        old_state: &str,
        new_state: &str,
    ) -> BroadcastReport {
        self.notify(&EventPayload::StateChanged {
            path: path.to_owned(),
            old_state: old_state.to_owned(),
            new_state: new_state.to_owned(),
        })
    }

    pub fn notify_volume_state_changed(
        &self,
        volume: Option<&VolumeInfo>,
        old_state: i32,
        new_state: i32,
    ) -> BroadcastReport {
        self.notify(&EventPayload::VolumeStateChanged {
            volume: volume.cloned(),
            old_state,
            new_state,
        })
    }

    pub fn notify_volume_record_changed(&self, record: Option<&VolumeRecord>) -> BroadcastReport {
        self.notify(&EventPayload::VolumeRecordChanged { record: record.cloned() })
    }

    pub fn notify_volume_forgotten(&self, fs_uuid: &str) -> BroadcastReport {
        self.notify(&EventPayload::VolumeForgotten { fs_uuid: fs_uuid.to_owned() })
    }

    pub fn notify_disk_scanned(&self, disk: Option<&DiskInfo>, volume_count: i32) -> BroadcastReport {
        self.notify(&EventPayload::DiskScanned { disk: disk.cloned(), volume_count })
    }
}
