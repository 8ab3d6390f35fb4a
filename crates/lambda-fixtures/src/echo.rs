use lambda_harness::{HandlerResult, InvocationContext};
use serde_json::Value;

use crate::write_stdout_raw;

/// Logs the context's identity and remaining time, then returns the event.
pub fn echo(event: &str, ctx: &InvocationContext) -> HandlerResult {
    let line = format!(
        "hello cloudwatch logs from {} version {}, {} ms...\n",
        ctx.function_name(),
        ctx.function_version(),
        ctx.remaining_time_ms()
    );
    write_stdout_raw(line.as_bytes())?;
    Ok(Value::String(event.to_string()))
}
