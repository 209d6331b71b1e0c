// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The storage event listener interface.

use crate::error::Result;
use crate::records::{DiskInfo, VolumeInfo, VolumeRecord};

/// Receiver of storage events.
///
/// Subscriber processes implement this and wrap it in a
/// [`ListenerStub`](crate::ListenerStub); the service talks to each
/// subscriber through a [`ListenerProxy`](crate::ListenerProxy), which
/// implements the same trait.
///
/// Methods run synchronously on whatever thread the transport delivers on.
/// A slow handler stalls that thread; do not assume asynchronous invocation.
/// Every method defaults to a no-op so implementors only override what they
/// care about.
pub trait StorageEventListener: Send + Sync {
    fn on_usb_mass_storage_connection_changed(&self, connected: bool) -> Result<()> {
        let _ = connected;
        Ok(())
    }

    fn on_storage_state_changed(
        &self,
        path: String,
        old_state: String,
        new_state: String,
    ) -> Result<()> {
        let _ = (path, old_state, new_state);
        Ok(())
    }

    fn on_volume_state_changed(
        &self,
        volume: Option<VolumeInfo>,
        old_state: i32,
        new_state: i32,
    ) -> Result<()> {
        let _ = (volume, old_state, new_state);
        Ok(())
    }

    fn on_volume_record_changed(&self, record: Option<VolumeRecord>) -> Result<()> {
        let _ = record;
        Ok(())
    }

    fn on_volume_forgotten(&self, fs_uuid: String) -> Result<()> {
        let _ = fs_uuid;
        Ok(())
    }

    fn on_disk_scanned(&self, disk: Option<DiskInfo>, volume_count: i32) -> Result<()> {
        let _ = (disk, volume_count);
        Ok(())
    }
}

impl<L: StorageEventListener + ?Sized> StorageEventListener for std::sync::Arc<L> {
    fn on_usb_mass_storage_connection_changed(&self, connected: bool) -> Result<()> {
        (**self).on_usb_mass_storage_connection_changed(connected)
    }

    fn on_storage_state_changed(
        &self,
        path: String,
        old_state: String,
        new_state: String,
    ) -> Result<()> {
        (**self).on_storage_state_changed(path, old_state, new_state)
    }

    fn on_volume_state_changed(
        &self,
        volume: Option<VolumeInfo>,
        old_state: i32,
        new_state: i32,
    ) -> Result<()> {
        (**self).on_volume_state_changed(volume, old_state, new_state)
    }

    fn on_volume_record_changed(&self, record: Option<VolumeRecord>) -> Result<()> {
        (**self).on_volume_record_changed(record)
    }

    fn on_volume_forgotten(&self, fs_uuid: String) -> Result<()> {
        (**self).on_volume_forgotten(fs_uuid)
    }

    fn on_disk_scanned(&self, disk: Option<DiskInfo>, volume_count: i32) -> Result<()> {
        (**self).on_disk_scanned(disk, volume_count)
    }
}
