// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Event payloads and their parcel encoding.
//
// Argument order per kind is fixed by the wire contract; decoders live next
// to the encoder so the two cannot drift apart.

use crate::error::{Error, Result};
use crate::listener::StorageEventListener;
use crate::parcel::{Parcel, ParcelReader};
use crate::records::{DiskInfo, VolumeInfo, VolumeRecord};
use crate::transaction::{self, EventKind, TransactionCode};

/// One storage event, as carried by a single one-way call.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    ConnectionChanged {
        connected: bool,
    },
    StateChanged {
        path: String,
        old_state: String,
        new_state: String,
    },
    VolumeStateChanged {
        volume: Option<VolumeInfo>,
        old_state: i32,
        new_state: i32,
    },
    VolumeRecordChanged {
        record: Option<VolumeRecord>,
    },
    VolumeForgotten {
        fs_uuid: String,
    },
    DiskScanned {
        disk: Option<DiskInfo>,
        volume_count: i32,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConnectionChanged { .. } => EventKind::ConnectionChanged,
            Self::StateChanged { .. } => EventKind::StateChanged,
            Self::VolumeStateChanged { .. } => EventKind::VolumeStateChanged,
            Self::VolumeRecordChanged { .. } => EventKind::VolumeRecordChanged,
            Self::VolumeForgotten { .. } => EventKind::VolumeForgotten,
            Self::DiskScanned { .. } => EventKind::DiskScanned,
        }
    }

    pub fn code(&self) -> TransactionCode {
        transaction::code_for(self.kind())
    }

    /// Append this event's arguments to `p`.
    pub fn write_to(&self, p: &mut Parcel) {
        match self {
            Self::ConnectionChanged { connected } => p.write_bool(*connected),
            Self::StateChanged { path, old_state, new_state } => {
                p.write_string(path);
                p.write_string(old_state);
                p.write_string(new_state);
            }
            Self::VolumeStateChanged { volume, old_state, new_state } => {
                p.write_record(volume.as_ref());
                p.write_i32(*old_state);
                p.write_i32(*new_state);
            }
            Self::VolumeRecordChanged { record } => p.write_record(record.as_ref()),
            Self::VolumeForgotten { fs_uuid } => p.write_string(fs_uuid),
            Self::DiskScanned { disk, volume_count } => {
                p.write_record(disk.as_ref());
                p.write_i32(*volume_count);
            }
        }
    }

    /// Arguments only, without the interface token.
    pub fn encode(&self) -> Parcel {
        let mut p = Parcel::with_capacity(64);
        self.write_to(&mut p);
        p
    }

    /// A complete call parcel: interface token followed by the arguments.
    pub fn encode_call(&self, descriptor: &str) -> Parcel {
        let mut p = Parcel::with_capacity(64 + descriptor.len() * 2);
        p.write_interface_token(descriptor);
        self.write_to(&mut p);
        p
    }

    /// Inverse of [`encode`](Self::encode) for the kind identified by `code`.
    pub fn decode(code: TransactionCode, bytes: &[u8]) -> Result<Self> {
        let t = transaction::lookup(code).ok_or(Error::UnrecognizedTransaction(code))?;
        t.decode_args(&mut ParcelReader::new(bytes))
    }

    /// Invoke the listener method matching this event, moving the fields in.
    pub fn deliver(self, listener: &dyn StorageEventListener) -> Result<()> {
        match self {
            Self::ConnectionChanged { connected } => {
                listener.on_usb_mass_storage_connection_changed(connected)
            }
            Self::StateChanged { path, old_state, new_state } => {
                listener.on_storage_state_changed(path, old_state, new_state)
            }
            Self::VolumeStateChanged { volume, old_state, new_state } => {
                listener.on_volume_state_changed(volume, old_state, new_state)
            }
            Self::VolumeRecordChanged { record } => listener.on_volume_record_changed(record),
            Self::VolumeForgotten { fs_uuid } => listener.on_volume_forgotten(fs_uuid),
            Self::DiskScanned { disk, volume_count } => {
                listener.on_disk_scanned(disk, volume_count)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-kind decoders (referenced from the transaction table)
// ---------------------------------------------------------------------------

pub(crate) fn decode_connection_changed(r: &mut ParcelReader<'_>) -> Result<EventPayload> {
    Ok(EventPayload::ConnectionChanged { connected: r.read_bool()? })
}

pub(crate) fn decode_state_changed(r: &mut ParcelReader<'_>) -> Result<EventPayload> {
    Ok(EventPayload::StateChanged {
        path: r.read_string()?,
        old_state: r.read_string()?,
        new_state: r.read_string()?,
    })
}

pub(crate) fn decode_volume_state_changed(r: &mut ParcelReader<'_>) -> Result<EventPayload> {
    Ok(EventPayload::VolumeStateChanged {
        volume: r.read_record()?,
        old_state: r.read_i32()?,
        new_state: r.read_i32()?,
    })
}

pub(crate) fn decode_volume_record_changed(r: &mut ParcelReader<'_>) -> Result<EventPayload> {
    Ok(EventPayload::VolumeRecordChanged { record: r.read_record()? })
}

pub(crate) fn decode_volume_forgotten(r: &mut ParcelReader<'_>) -> Result<EventPayload> {
    Ok(EventPayload::VolumeForgotten { fs_uuid: r.read_string()? })
}

pub(crate) fn decode_disk_scanned(r: &mut ParcelReader<'_>) -> Result<EventPayload> {
    Ok(EventPayload::DiskScanned {
        disk: r.read_record()?,
        volume_count: r.read_i32()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_forgotten_round_trips() {
        let ev = EventPayload::VolumeForgotten { fs_uuid: "1234-5678".into() };
        let p = ev.encode();
        assert_eq!(EventPayload::decode(ev.code(), p.data()).unwrap(), ev);
    }

    #[test]
    fn truncated_state_changed_is_malformed() {
        let ev = EventPayload::StateChanged {
            path: "/mnt/media_rw/1234-5678".into(),
            old_state: "checking".into(),
            new_state: "mounted".into(),
        };
        let full = ev.encode();

        // Drop the trailing new_state string entirely.
        let mut head = Parcel::new();
        head.write_string("/mnt/media_rw/1234-5678");
        head.write_string("checking");
        assert!(head.len() < full.len());

        let err = EventPayload::decode(ev.code(), head.data()).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn absent_records_round_trip_to_none() {
        let ev = EventPayload::DiskScanned { disk: None, volume_count: 0 };
        let p = ev.encode();
        assert_eq!(EventPayload::decode(ev.code(), p.data()).unwrap(), ev);
    }

    #[test]
    fn unknown_code_is_unrecognized() {
        assert!(matches!(
            EventPayload::decode(99, &[]),
            Err(Error::UnrecognizedTransaction(99))
        ));
    }

    #[test]
    fn call_parcel_leads_with_token() {
        let ev = EventPayload::ConnectionChanged { connected: true };
        let p = ev.encode_call("test.Iface");
        let mut r = p.reader();
        assert_eq!(r.read_interface_token().unwrap(), "test.Iface");
        assert!(r.read_bool().unwrap());
        assert_eq!(r.remaining(), 0);
    }
}
