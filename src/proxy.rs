// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Listener proxy: the service-side stand-in for one remote subscriber.

use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::event::EventPayload;
use crate::listener::StorageEventListener;
use crate::records::{DiskInfo, VolumeInfo, VolumeRecord};
use crate::transaction::DEFAULT_DESCRIPTOR;
use crate::transport::{EndpointHandle, Transport};

/// Forwards listener calls to one remote endpoint as one-way transactions.
///
/// Every method returns as soon as the transport accepts the parcel. A dead
/// endpoint surfaces as [`Error::RemoteUnavailable`]; callers decide whether
/// to continue with other subscribers (they should).
///
/// Per-endpoint ordering relies on the transport serializing calls to the
/// same handle; the proxy itself keeps no buffer between calls.
pub struct ListenerProxy<T: ?Sized> {
    descriptor: Arc<str>,
    handle: EndpointHandle,
    transport: Arc<T>,
}

impl<T: Transport + ?Sized> ListenerProxy<T> {
    pub fn new(transport: Arc<T>, handle: EndpointHandle) -> Self {
        Self::with_descriptor(transport, handle, DEFAULT_DESCRIPTOR)
    }

    pub fn with_descriptor(
        transport: Arc<T>,
        handle: EndpointHandle,
        descriptor: impl Into<Arc<str>>,
    ) -> Self {
        Self { descriptor: descriptor.into(), handle, transport }
    }

    pub fn handle(&self) -> EndpointHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn is_alive(&self) -> bool {
        self.transport.is_alive(&self.handle)
    }

    /// Encode `event` and issue it as a one-way call.
    pub fn send(&self, event: &EventPayload) -> Result<()> {
        let parcel = event.encode_call(&self.descriptor);
        let code = event.code();
        trace!(handle = %self.handle, code, len = parcel.len(), "one-way call");
        self.transport
            .transact_one_way(&self.handle, &self.descriptor, code, parcel.data())
            .map_err(|source| Error::RemoteUnavailable { handle: self.handle, source })
    }
}

impl<T: Transport + ?Sized> StorageEventListener for ListenerProxy<T> {
    fn on_usb_mass_storage_connection_changed(&self, connected: bool) -> Result<()> {
        self.send(&EventPayload::ConnectionChanged { connected })
    }

    fn on_storage_state_changed(
        &self,
        path: String,
        old_state: String,
        new_state: String,
    ) -> Result<()> {
        self.send(&EventPayload::StateChanged { path, old_state, new_state })
    }

    fn on_volume_state_changed(
        &self,
        volume: Option<VolumeInfo>,
        old_state: i32,
        new_state: i32,
    ) -> Result<()> {
        self.send(&EventPayload::VolumeStateChanged { volume, old_state, new_state })
    }

    fn on_volume_record_changed(&self, record: Option<VolumeRecord>) -> Result<()> {
        self.send(&EventPayload::VolumeRecordChanged { record })
    }

    fn on_volume_forgotten(&self, fs_uuid: String) -> Result<()> {
        self.send(&EventPayload::VolumeForgotten { fs_uuid })
    }

    fn on_disk_scanned(&self, disk: Option<DiskInfo>, volume_count: i32) -> Result<()> {
        self.send(&EventPayload::DiskScanned { disk, volume_count })
    }
}

impl<T: ?Sized> std::fmt::Debug for ListenerProxy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerProxy")
            .field("descriptor", &self.descriptor)
            .field("handle", &self.handle)
            .finish()
    }
}
