#![allow(dead_code)]

use std::io;
use std::os::fd::{AsRawFd, OwnedFd};

/// Writes straight to descriptor 1, the way foreign code under test would.
pub fn write_fd1(bytes: &[u8]) {
    let mut off = 0;
    while off < bytes.len() {
        let rest = &bytes[off..];
        // SAFETY: `rest` is a valid buffer of `rest.len()` bytes.
        let n = unsafe { libc::write(libc::STDOUT_FILENO, rest.as_ptr().cast(), rest.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            panic!("write(1) failed: {err}");
        }
        off += n as usize;
    }
}

/// (device, inode) of whatever descriptor 1 currently refers to.
pub fn stdout_identity() -> (u64, u64) {
    // SAFETY: `st` is written by fstat before being read.
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::fstat(libc::STDOUT_FILENO, &mut st) };
    assert_eq!(rc, 0, "fstat(1): {}", io::Error::last_os_error());
    (st.st_dev as u64, st.st_ino as u64)
}

/// Points descriptor 1 at `fd` without going through the harness.
pub fn point_stdout_at(fd: &impl AsRawFd) {
    // SAFETY: both descriptors are open for the duration of the call.
    let rc = unsafe { libc::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO) };
    assert!(rc >= 0, "dup2: {}", io::Error::last_os_error());
}

pub fn dup_stdout() -> OwnedFd {
    use std::os::fd::AsFd;
    io::stdout()
        .as_fd()
        .try_clone_to_owned()
        .expect("dup stdout")
}
