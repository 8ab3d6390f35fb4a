//! Fixture handlers for exercising the harness.
//!
//! They stand in for foreign handler units: `echo` logs through a raw `write(2)`
//! on descriptor 1, below any Rust buffering, the way native code would.

pub mod cases;
pub mod echo;
pub mod log_line;
pub mod regions;

use std::io;

use lambda_harness::{HandlerError, HandlerResult, HandlerTable, InvocationContext};

pub use cases::default_cases;
pub use echo::echo;
pub use log_line::EchoLogLine;
pub use regions::{list_regions, REGIONS};

pub const ECHO: &str = "echo";
pub const LIST_REGIONS: &str = "list-regions";
pub const FAIL: &str = "fail";

/// Writes partial output, then fails.
pub fn fail(event: &str, _: &InvocationContext) -> HandlerResult {
    write_stdout_raw(format!("starting {event}\n").as_bytes())?;
    Err(HandlerError::message(format!("{event}: deliberate failure")))
}

pub fn default_table() -> HandlerTable {
    HandlerTable::new()
        .with(ECHO, echo)
        .with(LIST_REGIONS, list_regions)
        .with(FAIL, fail)
}

/// Unbuffered write to descriptor 1.
pub fn write_stdout_raw(bytes: &[u8]) -> io::Result<()> {
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
            return Err(err);
        }
        off += n.unsigned_abs();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_exports_every_fixture() {
        let table = default_table();
        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec![ECHO, FAIL, LIST_REGIONS]
        );
    }
}
