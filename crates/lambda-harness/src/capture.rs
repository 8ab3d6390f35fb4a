//! Process-level stdout redirection.
//!
//! Handlers under test may be foreign code that writes straight to descriptor 1,
//! below any buffering layer Rust controls, so capture happens at the descriptor
//! level: descriptor 1 is pointed at the write end of a pipe for the duration of
//! a [`StdoutCapture`], and put back when the guard drops.
//!
//! Descriptor 1 is process-wide state. Only one capture may be active at a time;
//! a second [`StdoutCapture::acquire`] fails with [`CaptureError::Busy`].

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use lambda_contracts::DEFAULT_MAX_OUTPUT_BYTES;

const STDOUT_FD: RawFd = libc::STDOUT_FILENO;

static ACTIVE: AtomicBool = AtomicBool::new(false);
/// Set once a release failed to put descriptor 1 back; never cleared.
static POISONED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("stdout capture already active in this process")]
    Busy,
    #[error("stdout was not restored after an earlier capture")]
    Poisoned,
    #[error("create capture pipe")]
    Pipe(#[source] io::Error),
    #[error("configure capture pipe")]
    PipeFlags(#[source] io::Error),
    #[error("duplicate stdout descriptor")]
    Dup(#[source] io::Error),
    #[error("redirect stdout descriptor")]
    Redirect(#[source] io::Error),
    #[error("spawn capture reader thread")]
    Spawn(#[source] io::Error),
    #[error("drain capture pipe")]
    Drain(#[source] io::Error),
}

/// How captured bytes get from the pipe into memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrainMode {
    /// Read end is non-blocking and is drained after the guard is released.
    /// A handler that writes more than the pipe buffer holds will block.
    #[default]
    AfterRelease,
    /// A reader thread accumulates bytes while the window is open; draining
    /// joins it. No limit from the pipe buffer.
    Background,
}

impl DrainMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DrainMode::AfterRelease => "after-release",
            DrainMode::Background => "background",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub drain_mode: DrainMode,
    pub max_output_bytes: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            drain_mode: DrainMode::default(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Bytes drained from a capture window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    /// Output went past `max_output_bytes`; the excess was read and dropped.
    pub truncated: bool,
}

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

struct ActiveFlag;

impl ActiveFlag {
    fn claim() -> Result<Self, CaptureError> {
        if is_poisoned() {
            return Err(CaptureError::Poisoned);
        }
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ActiveFlag)
            .map_err(|_| CaptureError::Busy)
    }
}

impl Drop for ActiveFlag {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::Release);
    }
}

/// True while some [`StdoutCapture`] holds descriptor 1.
pub fn is_active() -> bool {
    ACTIVE.load(Ordering::Acquire)
}

/// True once a capture failed to restore descriptor 1. Every later
/// acquisition fails with [`CaptureError::Poisoned`].
pub fn is_poisoned() -> bool {
    POISONED.load(Ordering::Acquire)
}

/// Guard for an installed stdout redirect.
///
/// Dropping it flushes buffered output into the pipe, restores descriptor 1,
/// then closes the write end and the saved original. This runs on every exit
/// path, unwinding included.
pub struct StdoutCapture {
    // Field order is drop order: write end, then saved original, then the flag.
    write: OwnedFd,
    saved: OwnedFd,
    _active: ActiveFlag,
}

impl StdoutCapture {
    pub fn acquire() -> Result<(StdoutCapture, CaptureReader), CaptureError> {
        Self::acquire_with(CaptureOptions::default())
    }

    pub fn acquire_with(
        options: CaptureOptions,
    ) -> Result<(StdoutCapture, CaptureReader), CaptureError> {
        let active = ActiveFlag::claim()?;

        let (read, write) = pipe().map_err(CaptureError::Pipe)?;
        if options.drain_mode == DrainMode::AfterRelease {
            set_nonblocking(&read).map_err(CaptureError::PipeFlags)?;
        }

        let saved = io::stdout()
            .as_fd()
            .try_clone_to_owned()
            .map_err(CaptureError::Dup)?;
        // Logged before the swap: a subscriber writing to stdout must not
        // land in the window.
        tracing::debug!(
            drain_mode = options.drain_mode.as_str(),
            pipe_read_fd = read.as_raw_fd(),
            "installing stdout capture"
        );
        flush_buffered_stdout();
        redirect(&write, STDOUT_FD).map_err(CaptureError::Redirect)?;

        let capture = StdoutCapture {
            write,
            saved,
            _active: active,
        };

        // On spawn failure `capture` drops here and the redirect is undone.
        let reader = CaptureReader::start(read, options)?;
        Ok((capture, reader))
    }

    /// Ends the capture window. Same as dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StdoutCapture {
    fn drop(&mut self) {
        flush_buffered_stdout();
        if let Err(err) = redirect(&self.saved, STDOUT_FD) {
            POISONED.store(true, Ordering::Release);
            tracing::error!(error = %err, "failed to restore stdout descriptor");
            return;
        }
        tracing::debug!(write_fd = self.write.as_raw_fd(), "stdout capture released");
    }
}

/// Read side of a capture. The caller owns it and must [`drain`](Self::drain)
/// it after the [`StdoutCapture`] is released; dropping it undrained discards
/// the captured bytes.
pub struct CaptureReader {
    inner: ReaderInner,
}

enum ReaderInner {
    Direct { file: File, cap: usize },
    Background(JoinHandle<io::Result<Captured>>),
}

impl CaptureReader {
    fn start(read: OwnedFd, options: CaptureOptions) -> Result<Self, CaptureError> {
        let file = File::from(read);
        let cap = options.max_output_bytes;
        let inner = match options.drain_mode {
            DrainMode::AfterRelease => ReaderInner::Direct { file, cap },
            DrainMode::Background => {
                let handle = std::thread::Builder::new()
                    .name("stdout-capture".to_string())
                    .spawn(move || read_to_end_capped(file, cap))
                    .map_err(CaptureError::Spawn)?;
                ReaderInner::Background(handle)
            }
        };
        Ok(Self { inner })
    }

    /// Reads until end-of-stream (or, for a non-blocking read end, until no
    /// more data is available) and closes the read end.
    pub fn drain(self) -> Result<Captured, CaptureError> {
        match self.inner {
            ReaderInner::Direct { file, cap } => {
                read_to_end_capped(file, cap).map_err(CaptureError::Drain)
            }
            ReaderInner::Background(handle) => handle
                .join()
                .map_err(|_| {
                    CaptureError::Drain(io::Error::other("capture reader thread panicked"))
                })?
                .map_err(CaptureError::Drain),
        }
    }
}

/// Runs `f` with stdout captured, then drains the pipe.
pub fn with_captured_stdout<R>(
    options: CaptureOptions,
    f: impl FnOnce() -> R,
) -> Result<(R, Captured), CaptureError> {
    let (capture, reader) = StdoutCapture::acquire_with(options)?;
    // The guard drops before `reader`, also when `f` unwinds, so the final
    // flush never hits a pipe with no read end.
    let out = {
        let _window = capture;
        f()
    };
    let captured = reader.drain()?;
    Ok((out, captured))
}

pub(crate) fn read_to_end_capped<R: Read>(mut reader: R, cap: usize) -> io::Result<Captured> {
    let mut bytes = Vec::new();
    let mut tmp = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = match reader.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
            Err(err) => return Err(err),
        };

        if truncated {
            continue;
        }

        let remaining = cap.saturating_sub(bytes.len());
        if n <= remaining {
            bytes.extend_from_slice(&tmp[..n]);
        } else {
            bytes.extend_from_slice(&tmp[..remaining]);
            truncated = true;
        }
    }

    Ok(Captured { bytes, truncated })
}

/// Flushes Rust's stdout buffer and every C stdio output stream.
fn flush_buffered_stdout() {
    let _ = io::stdout().flush();
    // SAFETY: fflush(NULL) flushes all open output streams and touches no Rust data.
    unsafe {
        libc::fflush(std::ptr::null_mut());
    }
}

fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    // SAFETY: `fds` is a valid two-element buffer for pipe(2) to fill.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe(2) succeeded, so both descriptors are open and nothing else owns them.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(&read)?;
    set_cloexec(&write)?;
    Ok((read, write))
}

fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: F_GETFD/F_SETFD on a descriptor we own.
    unsafe {
        let flags = libc::fcntl(fd.as_raw_fd(), libc::F_GETFD);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, flags | libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn set_nonblocking(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: F_GETFL/F_SETFL on a descriptor we own.
    unsafe {
        let flags = libc::fcntl(fd.as_raw_fd(), libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Points `target` at whatever `src` refers to.
fn redirect(src: &OwnedFd, target: RawFd) -> io::Result<()> {
    loop {
        // SAFETY: `src` is an open descriptor we own; dup2 atomically replaces `target`.
        if unsafe { libc::dup2(src.as_raw_fd(), target) } >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
