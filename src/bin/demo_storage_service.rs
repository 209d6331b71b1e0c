// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Storage event service demo.
//
// Usage:
//   demo_storage_service [interval_ms]
//
// Binds the service socket ($STORAGE_LISTENER_SOCKET or a temp-dir default),
// accepts subscribers in the background and replays a scripted SD card
// insert / mount / eject cycle every <interval_ms> milliseconds. Run one or
// more `demo_storage_listener` processes against it and kill them at will:
// dead subscribers are dropped and the rest keep receiving events.

#[cfg(unix)]
use std::os::unix::net::UnixListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use storage_listener::socket_name::default_socket_path;
#[cfg(unix)]
use storage_listener::transport::socket::SocketTransport;
use storage_listener::{DiskInfo, StorageEventCallbacks, VolumeInfo, VolumeState, VolumeType};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
fn accept_loop(listener: UnixListener, transport: Arc<SocketTransport>, callbacks: StorageEventCallbacks) {
    for stream in listener.incoming() {
        match stream {
            Ok(s) => {
                let handle = transport.adopt(s);
                callbacks.register_remote(&transport, handle);
                info!(%handle, subscribers = callbacks.registry().len(), "subscriber connected");
            }
            Err(e) => warn!(%e, "accept failed"),
        }
    }
}

fn fire_cycle(cb: &StorageEventCallbacks, round: u64) {
    let disk = DiskInfo {
        id: "disk:179,64".into(),
        flags: DiskInfo::FLAG_SD | DiskInfo::FLAG_ADOPTABLE,
        size: 64 << 30,
        label: "Demo SD".into(),
        sys_path: "/sys/block/mmcblk1".into(),
        volume_count: 1,
    };
    let fs_uuid = format!("{:04X}-{:04X}", round & 0xffff, (round * 7919) & 0xffff);
    let mut vol = VolumeInfo {
        id: "public:179,65".into(),
        r#type: VolumeType::Public as i32,
        disk_id: disk.id.clone(),
        fs_type: "vfat".into(),
        fs_uuid: fs_uuid.clone(),
        path: format!("/storage/{fs_uuid}"),
        ..Default::default()
    };

    cb.notify_usb_mass_storage_connection_changed(true);
    cb.notify_disk_scanned(Some(&disk), disk.volume_count);

    let steps = [
        (VolumeState::Unmounted, VolumeState::Checking),
        (VolumeState::Checking, VolumeState::Mounted),
        (VolumeState::Mounted, VolumeState::Ejecting),
        (VolumeState::Ejecting, VolumeState::Unmounted),
        (VolumeState::Unmounted, VolumeState::Removed),
    ];
    for (old, new) in steps {
        vol.state = new.as_i32();
        cb.notify_volume_state_changed(Some(&vol), old.as_i32(), new.as_i32());
        cb.notify_storage_state_changed(&vol.path, old.environment_state(), new.environment_state());
    }

    cb.notify_volume_forgotten(&fs_uuid);
    let report = cb.notify_usb_mass_storage_connection_changed(false);
    info!(round, delivered = report.delivered, failed = report.failed.len(), "cycle done");
}

#[cfg(not(unix))]
fn main() {
    eprintln!("demo_storage_service needs unix domain sockets");
    std::process::exit(1);
}

#[cfg(unix)]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let interval_ms: u64 = match std::env::args().nth(1) {
        Some(a) => a.parse().unwrap_or_else(|_| {
            eprintln!("usage: demo_storage_service [interval_ms]");
            std::process::exit(1);
        }),
        None => 1000,
    };

    let quit = Arc::new(AtomicBool::new(false));
    {
        let q = Arc::clone(&quit);
        ctrlc_or_sigterm(move || q.store(true, Ordering::Release));
    }

    let path = default_socket_path();
    let _ = std::fs::remove_file(&path);
    let listener = match UnixListener::bind(&path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("bind {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    info!(path = %path.display(), "storage event service listening");

    let transport = Arc::new(SocketTransport::new());
    let callbacks = StorageEventCallbacks::new();
    {
        let t = Arc::clone(&transport);
        let cb = callbacks.clone();
        thread::spawn(move || accept_loop(listener, t, cb));
    }

    let mut round = 0u64;
    while !quit.load(Ordering::Acquire) {
        if !callbacks.registry().is_empty() {
            round += 1;
            fire_cycle(&callbacks, round);
        }
        thread::sleep(Duration::from_millis(interval_ms));
    }

    info!("shutting down");
    callbacks.registry().kill();
    let _ = std::fs::remove_file(&path);
}

// Sets the flag on SIGINT / SIGTERM / SIGHUP.
#[cfg(unix)]
fn ctrlc_or_sigterm(f: impl Fn() + Send + 'static) {
    use std::sync::Mutex;
    static CB: std::sync::OnceLock<Mutex<Box<dyn Fn() + Send>>> = std::sync::OnceLock::new();
    CB.get_or_init(|| Mutex::new(Box::new(f)));
    extern "C" fn handler(_: libc::c_int) {
        if let Some(cb) = CB.get() {
            if let Ok(g) = cb.lock() {
                g();
            }
        }
    }
    unsafe {
        libc::signal(libc::SIGINT, handler as *const () as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as *const () as libc::sighandler_t);
        libc::signal(libc::SIGHUP, handler as *const () as libc::sighandler_t);
    }
}
