// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Socket path selection for the unix socket transport.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the service socket path.
pub const SOCKET_ENV: &str = "STORAGE_LISTENER_SOCKET";

/// Default service name used when no override is set.
pub const DEFAULT_SERVICE_NAME: &str = "storage_events";

/// Usable bytes in `sockaddr_un::sun_path`, excluding the NUL terminator.
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
pub const SUN_PATH_MAX: usize = 103;

#[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
pub const SUN_PATH_MAX: usize = 107;

/// FNV-1a 64-bit hash.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in data {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Socket path for service `name` inside `dir`.
///
/// When `<dir>/<name>.sock` would not fit in `sun_path`, the file name is
/// shortened to `<prefix>_<16-hex-hash>.sock` where the hash covers the full
/// original path, so distinct long names stay distinct.
pub fn make_socket_path(dir: &Path, name: &str) -> PathBuf {
    let full = dir.join(format!("{name}.sock"));
    let full_len = full.as_os_str().len();
    if full_len <= SUN_PATH_MAX {
        return full;
    }

    let hash = format!("{:016x}", fnv1a_64(full.as_os_str().as_encoded_bytes()));
    // dir + '/' + '_' + hash + ".sock"
    let fixed = dir.as_os_str().len() + 1 + 1 + hash.len() + ".sock".len();
    let room = SUN_PATH_MAX.saturating_sub(fixed);
    let prefix: String = name.chars().take_while(|c| c.is_ascii()).take(room).collect();
    dir.join(format!("{prefix}_{hash}.sock"))
}

/// Socket path from [`SOCKET_ENV`], else the default service socket in the
/// system temp directory.
pub fn default_socket_path() -> PathBuf {
    match std::env::var_os(SOCKET_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => make_socket_path(&std::env::temp_dir(), DEFAULT_SERVICE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_value() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
    }

    #[test]
    fn short_names_are_kept() {
        let p = make_socket_path(Path::new("/tmp"), "svc");
        assert_eq!(p, PathBuf::from("/tmp/svc.sock"));
    }

    #[test]
    fn long_names_are_shortened_and_distinct() {
        let long_a = "a".repeat(200);
        let long_b = format!("{}b", "a".repeat(199));
        let pa = make_socket_path(Path::new("/tmp"), &long_a);
        let pb = make_socket_path(Path::new("/tmp"), &long_b);
        assert!(pa.as_os_str().len() <= SUN_PATH_MAX);
        assert!(pa.to_string_lossy().ends_with(".sock"));
        assert_ne!(pa, pb);
    }
}
