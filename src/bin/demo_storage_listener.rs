// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Storage event subscriber demo.
//
// Usage:
//   demo_storage_listener [name]
//
// Connects to the service socket and logs every event it receives until the
// service goes away.

use storage_listener::socket_name::default_socket_path;
#[cfg(unix)]
use storage_listener::transport::socket::SocketEndpoint;
use storage_listener::{
    DiskInfo, ListenerStub, Result, StorageEventListener, VolumeInfo, VolumeRecord, VolumeState,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct LoggingListener {
    name: String,
}

fn state_name(v: i32) -> String {
    VolumeState::from_i32(v).map_or_else(|| v.to_string(), |s| format!("{s:?}"))
}

impl StorageEventListener for LoggingListener {
    fn on_usb_mass_storage_connection_changed(&self, connected: bool) -> Result<()> {
        info!(listener = %self.name, connected, "usb mass storage connection changed");
        Ok(())
    }

    fn on_storage_state_changed(&self, path: String, old_state: String, new_state: String) -> Result<()> {
        info!(listener = %self.name, %path, %old_state, %new_state, "storage state changed");
        Ok(())
    }

    fn on_volume_state_changed(&self, volume: Option<VolumeInfo>, old_state: i32, new_state: i32) -> Result<()> {
        let id = volume.as_ref().map_or("<none>", |v| v.id.as_str());
        info!(
            listener = %self.name,
            volume = id,
            old = %state_name(old_state),
            new = %state_name(new_state),
            "volume state changed"
        );
        Ok(())
    }

    fn on_volume_record_changed(&self, record: Option<VolumeRecord>) -> Result<()> {
        let uuid = record.as_ref().map_or("<none>", |r| r.fs_uuid.as_str());
        info!(listener = %self.name, fs_uuid = uuid, "volume record changed");
        Ok(())
    }

    fn on_volume_forgotten(&self, fs_uuid: String) -> Result<()> {
        info!(listener = %self.name, %fs_uuid, "volume forgotten");
        Ok(())
    }

    fn on_disk_scanned(&self, disk: Option<DiskInfo>, volume_count: i32) -> Result<()> {
        let label = disk.as_ref().map_or("<none>", |d| d.label.as_str());
        info!(listener = %self.name, disk = label, volume_count, "disk scanned");
        Ok(())
    }
}

#[cfg(not(unix))]
fn main() {
    eprintln!("demo_storage_listener needs unix domain sockets");
    std::process::exit(1);
}

#[cfg(unix)]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("listener-{}", std::process::id()));
    let path = default_socket_path();

    let endpoint = match SocketEndpoint::connect(&path) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("connect {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    info!(listener = %name, path = %path.display(), "connected");

    let stub = ListenerStub::new(LoggingListener { name: name.clone() });
    match endpoint.serve(&stub) {
        Ok(n) => info!(listener = %name, events = n, "service closed the connection"),
        Err(e) => {
            eprintln!("connection error: {e}");
            std::process::exit(1);
        }
    }
}
