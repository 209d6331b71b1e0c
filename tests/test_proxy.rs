// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Proxy -> loopback transport -> stub, and service-side fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use storage_listener::transport::loopback::LoopbackTransport;
use storage_listener::{
    DiskInfo, DispatchHost, Error, ListenerProxy, ListenerStub, Result, StorageEventCallbacks,
    StorageEventListener, VolumeInfo, VolumeState, DEFAULT_DESCRIPTOR,
};

#[derive(Default)]
struct Log {
    lines: Mutex<Vec<String>>,
}

impl Log {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl StorageEventListener for Log {
    fn on_usb_mass_storage_connection_changed(&self, connected: bool) -> Result<()> {
        self.lines.lock().unwrap().push(format!("usb {connected}"));
        Ok(())
    }

    fn on_volume_state_changed(&self, volume: Option<VolumeInfo>, old_state: i32, new_state: i32) -> Result<()> {
        let id = volume.map(|v| v.id).unwrap_or_default();
        self.lines.lock().unwrap().push(format!("vol {id} {old_state}->{new_state}"));
        Ok(())
    }

    fn on_volume_forgotten(&self, fs_uuid: String) -> Result<()> {
        self.lines.lock().unwrap().push(format!("forgot {fs_uuid}"));
        Ok(())
    }

    fn on_disk_scanned(&self, disk: Option<DiskInfo>, volume_count: i32) -> Result<()> {
        let id = disk.map(|d| d.id).unwrap_or_default();
        self.lines.lock().unwrap().push(format!("disk {id} {volume_count}"));
        Ok(())
    }
}

/// Publish a fresh logging listener on `t` and return its handle and log.
fn subscriber(t: &LoopbackTransport) -> (storage_listener::EndpointHandle, Arc<Log>) {
    let log = Arc::new(Log::default());
    let stub = ListenerStub::new(Arc::clone(&log));
    let handle = t.register_dispatcher(DEFAULT_DESCRIPTOR, Arc::new(stub)).unwrap();
    (handle, log)
}

#[test]
fn proxy_call_reaches_remote_listener() {
    let t = Arc::new(LoopbackTransport::new());
    let (h, log) = subscriber(&t);
    let proxy = ListenerProxy::new(Arc::clone(&t), h);

    proxy.on_volume_forgotten("1234-5678".into()).unwrap();
    proxy
        .on_disk_scanned(Some(DiskInfo { id: "disk:8,0".into(), ..Default::default() }), 3)
        .unwrap();
    t.flush(&h);

    assert_eq!(log.lines(), vec!["forgot 1234-5678", "disk disk:8,0 3"]);
}

#[test]
fn dead_subscriber_does_not_block_the_next() {
    let t = Arc::new(LoopbackTransport::new());
    let (a, log_a) = subscriber(&t);
    let (b, log_b) = subscriber(&t);
    let proxy_a = ListenerProxy::new(Arc::clone(&t), a);
    let proxy_b = ListenerProxy::new(Arc::clone(&t), b);

    t.kill(&a);

    let err = proxy_a.on_usb_mass_storage_connection_changed(true).unwrap_err();
    assert!(matches!(err, Error::RemoteUnavailable { handle, .. } if handle == a));
    assert!(!proxy_a.is_alive());

    proxy_b.on_usb_mass_storage_connection_changed(true).unwrap();
    t.flush(&b);
    assert!(log_a.lines().is_empty());
    assert_eq!(log_b.lines(), vec!["usb true"]);
}

#[test]
fn per_subscriber_order_is_fifo() {
    let t = Arc::new(LoopbackTransport::new());
    let (h, log) = subscriber(&t);
    let proxy = ListenerProxy::new(Arc::clone(&t), h);

    let vol = VolumeInfo { id: "public:179,1".into(), ..Default::default() };
    let states = VolumeState::ALL;
    for w in states.windows(2) {
        proxy
            .on_volume_state_changed(Some(vol.clone()), w[0].as_i32(), w[1].as_i32())
            .unwrap();
    }
    t.flush(&h);

    let expected: Vec<String> = states
        .windows(2)
        .map(|w| format!("vol public:179,1 {}->{}", w[0].as_i32(), w[1].as_i32()))
        .collect();
    assert_eq!(log.lines(), expected);
}

#[test]
fn mismatched_proxy_descriptor_is_dropped_by_stub() {
    let t = Arc::new(LoopbackTransport::new());
    let (h, log) = subscriber(&t);
    let proxy = ListenerProxy::with_descriptor(Arc::clone(&t), h, "some.other.Interface");

    // The transport accepts the call; the stub rejects it.
    proxy.on_volume_forgotten("X".into()).unwrap();
    t.flush(&h);
    assert!(log.lines().is_empty());
}

#[test]
fn callbacks_fan_out_and_prune_unlinked_dead_subscribers() {
    let t = Arc::new(LoopbackTransport::new());
    let cb = StorageEventCallbacks::new();
    let subs: Vec<_> = (0..3).map(|_| subscriber(&t)).collect();
    for (h, _) in &subs {
        // No death link: a dead subscriber is only noticed on delivery.
        let proxy = ListenerProxy::new(Arc::clone(&t), *h);
        assert!(cb.registry().register(*h, Arc::new(proxy)));
    }

    t.kill(&subs[1].0);
    let report = cb.notify_volume_forgotten("CAFE-F00D");
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, vec![subs[1].0]);
    assert_eq!(report.pruned, 1);
    assert_eq!(cb.registry().len(), 2);

    let report = cb.notify_usb_mass_storage_connection_changed(false);
    assert_eq!(report.delivered, 2);
    assert!(report.failed.is_empty());

    for (h, _) in &subs {
        t.flush(h);
    }
    assert_eq!(subs[0].1.lines(), vec!["forgot CAFE-F00D", "usb false"]);
    assert!(subs[1].1.lines().is_empty());
    assert_eq!(subs[2].1.lines(), vec!["forgot CAFE-F00D", "usb false"]);
}

#[test]
fn register_remote_unregisters_on_death() {
    let t = Arc::new(LoopbackTransport::new());
    let cb = StorageEventCallbacks::new();
    let (h, _log) = subscriber(&t);
    let (other, other_log) = subscriber(&t);
    assert!(cb.register_remote(&t, h));
    assert!(cb.register_remote(&t, other));

    t.kill(&h);
    assert_eq!(cb.registry().handles(), vec![other]);

    // A handle that is already dead is refused.
    assert!(!cb.register_remote(&t, h));
    assert_eq!(cb.registry().handles(), vec![other]);

    let report = cb.notify_volume_forgotten("after-death");
    assert_eq!(report.delivered, 1);
    assert!(report.failed.is_empty());
    t.flush(&other);
    assert_eq!(other_log.lines(), vec!["forgot after-death"]);
}

/// Local listener that unregisters another subscriber while being notified.
struct Unregisterer {
    cb: StorageEventCallbacks,
    victim: Mutex<Option<storage_listener::EndpointHandle>>,
    hits: AtomicUsize,
}

impl StorageEventListener for Unregisterer {
    fn on_volume_forgotten(&self, _fs_uuid: String) -> Result<()> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        if let Some(v) = self.victim.lock().unwrap().take() {
            self.cb.unregister(&v);
        }
        Ok(())
    }
}

#[test]
fn unregister_during_broadcast_is_safe() {
    let t = Arc::new(LoopbackTransport::new());
    let cb = StorageEventCallbacks::new();
    let (victim, victim_log) = subscriber(&t);

    let first = Arc::new(Unregisterer {
        cb: cb.clone(),
        victim: Mutex::new(Some(victim)),
        hits: AtomicUsize::new(0),
    });
    cb.registry().register(storage_listener::EndpointHandle::next(None), first.clone());
    cb.register_remote(&t, victim);

    // The in-flight broadcast still reaches the victim from its snapshot.
    let report = cb.notify_volume_forgotten("1");
    assert_eq!(report.delivered, 2);
    assert_eq!(cb.registry().len(), 1);

    let report = cb.notify_volume_forgotten("2");
    assert_eq!(report.delivered, 1);
    t.flush(&victim);
    assert_eq!(victim_log.lines(), vec!["forgot 1"]);
    assert_eq!(first.hits.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_notify_and_register() {
    let t = Arc::new(LoopbackTransport::new());
    let cb = StorageEventCallbacks::new();
    let barrier = Arc::new(Barrier::new(3));

    let notifier = {
        let cb = cb.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..200 {
                cb.notify_volume_forgotten(&i.to_string());
            }
        })
    };
    let churn = {
        let cb = cb.clone();
        let t = Arc::clone(&t);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                let (h, _) = subscriber(&t);
                cb.register_remote(&t, h);
                t.kill(&h);
                cb.unregister(&h);
            }
        })
    };

    let (stable, log) = subscriber(&t);
    cb.register_remote(&t, stable);
    barrier.wait();
    notifier.join().unwrap();
    churn.join().unwrap();
    t.flush(&stable);

    // The stable subscriber sees a gap-free suffix of the sequence.
    let lines = log.lines();
    assert!(!lines.is_empty());
    let first: usize = lines[0].trim_start_matches("forgot ").parse().unwrap();
    let expected: Vec<String> = (first..200).map(|i| format!("forgot {i}")).collect();
    assert_eq!(lines, expected);
}
