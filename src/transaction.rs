// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Transaction table for the storage event listener interface.
//
// Codes are part of the wire contract: once a kind has a code it keeps it.
// New kinds may only be appended.

use crate::error::Result;
use crate::event::{self, EventPayload};
use crate::parcel::ParcelReader;

pub type TransactionCode = u32;

/// First code available to interface methods.
pub const FIRST_CALL_TRANSACTION: TransactionCode = 1;

/// Interface token written at the head of every call.
pub const DEFAULT_DESCRIPTOR: &str = "android.os.storage.IStorageEventListener";

/// The six event kinds, in transaction-code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConnectionChanged,
    StateChanged,
    VolumeStateChanged,
    VolumeRecordChanged,
    VolumeForgotten,
    DiskScanned,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        Self::ConnectionChanged,
        Self::StateChanged,
        Self::VolumeStateChanged,
        Self::VolumeRecordChanged,
        Self::VolumeForgotten,
        Self::DiskScanned,
    ];

    pub fn code(self) -> TransactionCode {
        code_for(self)
    }

    /// Listener method name, for logs.
    pub fn method(self) -> &'static str {
        TRANSACTIONS[self as usize].method
    }
}

/// One row of the transaction table.
pub struct Transaction {
    pub kind: EventKind,
    pub code: TransactionCode,
    pub method: &'static str,
    decode: fn(&mut ParcelReader<'_>) -> Result<EventPayload>,
}

impl Transaction {
    /// Decode this transaction's arguments (the interface token already consumed).
    pub fn decode_args(&self, r: &mut ParcelReader<'_>) -> Result<EventPayload> {
        (self.decode)(r)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("kind", &self.kind)
            .field("code", &self.code)
            .field("method", &self.method)
            .finish()
    }
}

/// Indexed by `EventKind as usize`.
pub static TRANSACTIONS: [Transaction; 6] = [
    Transaction {
        kind: EventKind::ConnectionChanged,
        code: FIRST_CALL_TRANSACTION,
        method: "onUsbMassStorageConnectionChanged",
        decode: event::decode_connection_changed,
    },
    Transaction {
        kind: EventKind::StateChanged,
        code: FIRST_CALL_TRANSACTION + 1,
        method: "onStorageStateChanged",
        decode: event::decode_state_changed,
    },
    Transaction {
        kind: EventKind::VolumeStateChanged,
        code: FIRST_CALL_TRANSACTION + 2,
        method: "onVolumeStateChanged",
        decode: event::decode_volume_state_changed,
    },
    Transaction {
        kind: EventKind::VolumeRecordChanged,
        code: FIRST_CALL_TRANSACTION + 3,
        method: "onVolumeRecordChanged",
        decode: event::decode_volume_record_changed,
    },
    Transaction {
        kind: EventKind::VolumeForgotten,
        code: FIRST_CALL_TRANSACTION + 4,
        method: "onVolumeForgotten",
        decode: event::decode_volume_forgotten,
    },
    Transaction {
        kind: EventKind::DiskScanned,
        code: FIRST_CALL_TRANSACTION + 5,
        method: "onDiskScanned",
        decode: event::decode_disk_scanned,
    },
];

pub fn code_for(kind: EventKind) -> TransactionCode {
    TRANSACTIONS[kind as usize].code
}

pub fn kind_for(code: TransactionCode) -> Option<EventKind> {
    lookup(code).map(|t| t.kind)
}

pub fn lookup(code: TransactionCode) -> Option<&'static Transaction> {
    TRANSACTIONS.iter().find(|t| t.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_kind() {
        for (i, t) in TRANSACTIONS.iter().enumerate() {
            assert_eq!(t.kind as usize, i);
            assert_eq!(t.code, FIRST_CALL_TRANSACTION + i as u32);
        }
    }

    #[test]
    fn codes_are_pinned() {
        assert_eq!(code_for(EventKind::ConnectionChanged), 1);
        assert_eq!(code_for(EventKind::StateChanged), 2);
        assert_eq!(code_for(EventKind::VolumeStateChanged), 3);
        assert_eq!(code_for(EventKind::VolumeRecordChanged), 4);
        assert_eq!(code_for(EventKind::VolumeForgotten), 5);
        assert_eq!(code_for(EventKind::DiskScanned), 6);
    }

    #[test]
    fn unknown_codes_are_unrecognized() {
        assert_eq!(kind_for(0), None);
        assert_eq!(kind_for(7), None);
        assert_eq!(kind_for(u32::MAX), None);
    }
}
