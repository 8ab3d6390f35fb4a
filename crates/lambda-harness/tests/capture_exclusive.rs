//! Only one capture may hold descriptor 1 at a time.

use lambda_harness::capture::{self, CaptureError, StdoutCapture};
use lambda_harness::{invoke, HandlerResult, InvocationContext, InvokeError};
use serde_json::json;

mod common;

fn quiet(_: &str, _: &InvocationContext) -> HandlerResult {
    Ok(json!(null))
}

fn nested(_: &str, ctx: &InvocationContext) -> HandlerResult {
    common::write_fd1(b"outer\n");
    let inner = invoke(&quiet, "inner", ctx);
    Ok(json!(matches!(
        inner,
        Err(InvokeError::Capture(CaptureError::Busy))
    )))
}

#[test]
fn second_capture_is_rejected_while_one_is_active() {
    assert!(!capture::is_active());

    let (first, reader) = StdoutCapture::acquire().expect("first capture");
    assert!(capture::is_active());
    common::write_fd1(b"first\n");

    assert!(matches!(StdoutCapture::acquire(), Err(CaptureError::Busy)));
    assert!(capture::is_active(), "rejected acquire must not end the active one");

    common::write_fd1(b"second\n");
    first.release();
    assert!(!capture::is_active());
    let captured = reader.drain().expect("drain");
    assert_eq!(captured.text(), "first\nsecond\n");

    let ctx = InvocationContext::new();
    let inv = invoke(&nested, "outer", &ctx).expect("outer invocation");
    assert_eq!(inv.result, json!(true));
    assert_eq!(inv.stdout, b"outer\n");

    let (again, reader) = StdoutCapture::acquire().expect("capture after release");
    again.release();
    assert!(reader.drain().expect("drain").bytes.is_empty());
}
