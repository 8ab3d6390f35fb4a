use std::time::Duration;

use lambda_fixtures::cases::{SHORT_ECHO_WINDOW, SHORT_TIMEOUT_MS};
use lambda_fixtures::{echo, EchoLogLine};
use lambda_harness::{invoke, InvocationContext};
use serde_json::json;

#[test]
fn echo_reports_remaining_time_under_a_short_deadline() {
    let ctx = InvocationContext::with_timeout(SHORT_TIMEOUT_MS);
    std::thread::sleep(Duration::from_millis(10));

    let inv = invoke(&echo, "echo", &ctx).expect("invoke echo");
    assert_eq!(inv.result, json!("echo"));

    let output = inv.stdout_text();
    let line = EchoLogLine::parse(&output)
        .unwrap_or_else(|| panic!("unexpected echo output: {output:?}"));
    assert_eq!(line.name, "fake_function");
    assert_eq!(line.version, "$LATEST");
    assert!(
        SHORT_ECHO_WINDOW.contains(&line.remaining_ms),
        "{} not in {:?}",
        line.remaining_ms,
        SHORT_ECHO_WINDOW
    );
    assert!(inv.remaining_ms_after <= line.remaining_ms);
}
