use std::time::Instant;

use serde_json::Value;

use crate::capture::{with_captured_stdout, CaptureError, CaptureOptions, DrainMode};
use crate::context::InvocationContext;
use crate::handler::{Handler, HandlerError, HandlerTable};
use lambda_contracts::DEFAULT_MAX_OUTPUT_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeOptions {
    pub drain_mode: DrainMode,
    pub max_output_bytes: usize,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            drain_mode: DrainMode::AfterRelease,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl From<InvokeOptions> for CaptureOptions {
    fn from(o: InvokeOptions) -> Self {
        CaptureOptions {
            drain_mode: o.drain_mode,
            max_output_bytes: o.max_output_bytes,
        }
    }
}

/// Outcome of one successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub result: Value,
    pub stdout: Vec<u8>,
    pub stdout_truncated: bool,
    /// Wall time from capture acquisition to release.
    pub elapsed_ms: i64,
    /// Context remaining time sampled right after the capture window closed.
    pub remaining_ms_after: i64,
}

impl Invocation {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("no handler registered under {0:?}")]
    UnknownHandler(String),
    /// The handler failed. `stdout` holds whatever it wrote before failing.
    #[error("handler failed: {error}")]
    Handler {
        #[source]
        error: HandlerError,
        stdout: Vec<u8>,
    },
}

pub fn invoke<H: Handler + ?Sized>(
    handler: &H,
    event: &str,
    ctx: &InvocationContext,
) -> Result<Invocation, InvokeError> {
    invoke_with(InvokeOptions::default(), handler, event, ctx)
}

/// Calls `handler` with stdout captured and returns its result together with
/// the captured bytes. Stdout is restored before this returns, whether the
/// handler succeeds, fails or panics.
pub fn invoke_with<H: Handler + ?Sized>(
    options: InvokeOptions,
    handler: &H,
    event: &str,
    ctx: &InvocationContext,
) -> Result<Invocation, InvokeError> {
    tracing::debug!(
        event,
        function = ctx.function_name(),
        timeout_ms = ctx.timeout_ms(),
        remaining_ms = ctx.remaining_time_ms(),
        "invoking handler"
    );

    let start = Instant::now();
    let (result, captured) =
        with_captured_stdout(options.into(), || handler.handle(event, ctx))?;
    let elapsed_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
    let remaining_ms_after = ctx.remaining_time_ms();

    match result {
        Ok(result) => {
            tracing::debug!(
                elapsed_ms,
                remaining_ms_after,
                stdout_bytes = captured.bytes.len(),
                stdout_truncated = captured.truncated,
                "handler returned"
            );
            Ok(Invocation {
                result,
                stdout: captured.bytes,
                stdout_truncated: captured.truncated,
                elapsed_ms,
                remaining_ms_after,
            })
        }
        Err(error) => {
            tracing::warn!(%error, elapsed_ms, "handler failed");
            Err(InvokeError::Handler {
                error,
                stdout: captured.bytes,
            })
        }
    }
}

impl HandlerTable {
    /// Looks up `name` and invokes it. Nothing is captured for an unknown name.
    pub fn invoke_named(
        &self,
        options: InvokeOptions,
        name: &str,
        event: &str,
        ctx: &InvocationContext,
    ) -> Result<Invocation, InvokeError> {
        let handler = self
            .get(name)
            .ok_or_else(|| InvokeError::UnknownHandler(name.to_string()))?;
        invoke_with(options, handler, event, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture;

    #[test]
    fn unknown_name_fails_before_capturing() {
        let table = HandlerTable::new();
        let ctx = InvocationContext::new();
        let err = table
            .invoke_named(InvokeOptions::default(), "missing", "ev", &ctx)
            .expect_err("empty table");
        assert!(matches!(&err, InvokeError::UnknownHandler(name) if name == "missing"));
        assert_eq!(err.to_string(), "no handler registered under \"missing\"");
        assert!(!capture::is_active());
    }

    #[test]
    fn options_carry_over_to_capture() {
        let opts = InvokeOptions {
            drain_mode: DrainMode::Background,
            max_output_bytes: 16,
        };
        let capture: CaptureOptions = opts.into();
        assert_eq!(capture.drain_mode, DrainMode::Background);
        assert_eq!(capture.max_output_bytes, 16);
    }
}
