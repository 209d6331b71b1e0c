// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// One-way storage event listener protocol.
//
// A service process fires storage events (volume/disk state changes,
// mass-storage connection changes) to remote subscribers. Each event is a
// one-way call: the service encodes it into a parcel and hands it to a
// transport; the subscriber's stub checks the interface token, decodes and
// invokes its listener.

pub mod error;
pub use error::{Error, Result, TransportError};

pub mod parcel;
pub use parcel::{Parcel, ParcelReader, MAX_PARCEL_SIZE};

pub mod records;
pub use records::{DiskInfo, VolumeInfo, VolumeRecord, VolumeState, VolumeType};

pub mod transaction;
pub use transaction::{
    code_for, kind_for, EventKind, TransactionCode, DEFAULT_DESCRIPTOR, FIRST_CALL_TRANSACTION,
};

mod event;
pub use event::EventPayload;

mod listener;
pub use listener::StorageEventListener;

mod stub;
pub use stub::{DispatchResult, ErrorReporter, ListenerStub, TracingReporter};

mod proxy;
pub use proxy::ListenerProxy;

mod registry;
pub use registry::{BroadcastReport, ListenerRegistry};

mod callbacks;
pub use callbacks::StorageEventCallbacks;

pub mod transport;
pub use transport::{DeathRecipient, Dispatch, DispatchHost, EndpointHandle, Transport};

pub mod socket_name;

mod platform;
