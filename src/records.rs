// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Structured records carried by volume and disk events.
//
// Each record owns its serialization (protobuf via prost). The parcel codec
// nests that encoding as an opaque byte array, so the records can evolve
// their fields without touching the listener wire contract.

/// A physical disk that can hold volumes.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DiskInfo {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(uint32, tag = "2")]
    pub flags: u32,
    #[prost(int64, tag = "3")]
    pub size: i64,
    #[prost(string, tag = "4")]
    pub label: String,
    #[prost(string, tag = "5")]
    pub sys_path: String,
    #[prost(int32, tag = "6")]
    pub volume_count: i32,
}

impl DiskInfo {
    pub const FLAG_ADOPTABLE: u32 = 1 << 0;
    pub const FLAG_DEFAULT_PRIMARY: u32 = 1 << 1;
    pub const FLAG_SD: u32 = 1 << 2;
    pub const FLAG_USB: u32 = 1 << 3;

    pub fn is_adoptable(&self) -> bool {
        self.flags & Self::FLAG_ADOPTABLE != 0
    }

    pub fn is_default_primary(&self) -> bool {
        self.flags & Self::FLAG_DEFAULT_PRIMARY != 0
    }

    pub fn is_sd(&self) -> bool {
        self.flags & Self::FLAG_SD != 0
    }

    pub fn is_usb(&self) -> bool {
        self.flags & Self::FLAG_USB != 0
    }
}

/// A mountable volume, usually a partition of a [`DiskInfo`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct VolumeInfo {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(int32, tag = "2")]
    pub r#type: i32,
    /// Id of the parent disk, empty for virtual volumes.
    #[prost(string, tag = "3")]
    pub disk_id: String,
    #[prost(string, tag = "4")]
    pub part_guid: String,
    #[prost(uint32, tag = "5")]
    pub mount_flags: u32,
    #[prost(int32, tag = "6")]
    pub mount_user_id: i32,
    #[prost(int32, tag = "7")]
    pub state: i32,
    #[prost(string, tag = "8")]
    pub fs_type: String,
    #[prost(string, tag = "9")]
    pub fs_uuid: String,
    #[prost(string, tag = "10")]
    pub fs_label: String,
    #[prost(string, tag = "11")]
    pub path: String,
    #[prost(string, tag = "12")]
    pub internal_path: String,
}

impl VolumeInfo {
    pub fn volume_type(&self) -> Option<VolumeType> {
        VolumeType::from_i32(self.r#type)
    }

    pub fn volume_state(&self) -> Option<VolumeState> {
        VolumeState::from_i32(self.state)
    }

    pub fn is_mounted(&self) -> bool {
        matches!(
            self.volume_state(),
            Some(VolumeState::Mounted | VolumeState::MountedReadOnly)
        )
    }
}

/// Persisted metadata about a volume the system has seen before.
#[derive(Clone, PartialEq, prost::Message)]
pub struct VolumeRecord {
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub fs_uuid: String,
    #[prost(string, tag = "3")]
    pub part_guid: String,
    #[prost(string, tag = "4")]
    pub nickname: String,
    #[prost(uint32, tag = "5")]
    pub user_flags: u32,
    #[prost(int64, tag = "6")]
    pub created_millis: i64,
    #[prost(int64, tag = "7")]
    pub last_seen_millis: i64,
}

// ---------------------------------------------------------------------------
// Volume state / type codes
// ---------------------------------------------------------------------------

/// Volume lifecycle state, as carried in the `old_state`/`new_state` words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VolumeState {
    Unmounted = 0,
    Checking = 1,
    Mounted = 2,
    MountedReadOnly = 3,
    Formatting = 4,
    Ejecting = 5,
    Unmountable = 6,
    Removed = 7,
    BadRemoval = 8,
}

impl VolumeState {
    pub const ALL: [VolumeState; 9] = [
        Self::Unmounted,
        Self::Checking,
        Self::Mounted,
        Self::MountedReadOnly,
        Self::Formatting,
        Self::Ejecting,
        Self::Unmountable,
        Self::Removed,
        Self::BadRemoval,
    ];

    pub fn from_i32(v: i32) -> Option<Self> {
        Self::ALL.get(usize::try_from(v).ok()?).copied()
    }

    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Media state string reported by path-based state-change events.
    pub const fn environment_state(self) -> &'static str {
        match self {
            Self::Unmounted => "unmounted",
            Self::Checking => "checking",
            Self::Mounted => "mounted",
            Self::MountedReadOnly => "mounted_ro",
            Self::Formatting => "unknown",
            Self::Ejecting => "ejecting",
            Self::Unmountable => "unmountable",
            Self::Removed => "removed",
            Self::BadRemoval => "bad_removal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VolumeType {
    Public = 0,
    Private = 1,
    Emulated = 2,
    Asec = 3,
    Obb = 4,
    Stub = 5,
}

impl VolumeType {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Public),
            1 => Some(Self::Private),
            2 => Some(Self::Emulated),
            3 => Some(Self::Asec),
            4 => Some(Self::Obb),
            5 => Some(Self::Stub),
            _ => None,
        }
    }
}
