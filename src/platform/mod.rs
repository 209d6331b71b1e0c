// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Process liveness helpers used to detect dead subscribers.

#[cfg(unix)]
mod posix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use posix::{current_pid, is_pid_alive, peer_pid};

#[cfg(windows)]
pub use windows::{current_pid, is_pid_alive};

#[cfg(not(any(unix, windows)))]
pub fn is_pid_alive(_pid: i32) -> bool {
    true
}

#[cfg(not(any(unix, windows)))]
pub fn current_pid() -> i32 {
    1
}
