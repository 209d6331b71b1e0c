// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX process liveness and socket peer credentials.

use std::io;
use std::os::unix::net::UnixStream;

/// `kill(pid, 0)` probe. `EPERM` still means the process exists.
pub fn is_pid_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    if unsafe { libc::kill(pid as libc::pid_t, 0) } == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

pub fn current_pid() -> i32 {
    unsafe { libc::getpid() as i32 }
}

/// Pid of the process on the other end of a connected unix socket.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn peer_pid(stream: &UnixStream) -> Option<i32> {
    use std::os::unix::io::AsRawFd;

    let mut cred = libc::ucred { pid: 0, uid: 0, gid: 0 };
    let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_PEERCRED,
            &mut cred as *mut libc::ucred as *mut libc::c_void,
            &mut len,
        )
    };
    (rc == 0 && cred.pid > 0).then_some(cred.pid as i32)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn peer_pid(_stream: &UnixStream) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_is_alive() {
        assert!(is_pid_alive(current_pid()));
        assert!(!is_pid_alive(0));
        assert!(!is_pid_alive(-5));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn socketpair_peer_is_self() {
        let (a, _b) = UnixStream::pair().expect("pair");
        assert_eq!(peer_pid(&a), Some(current_pid()));
    }
}
