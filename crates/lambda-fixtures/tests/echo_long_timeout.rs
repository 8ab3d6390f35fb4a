use std::time::Duration;

use lambda_fixtures::cases::LONG_ECHO_WINDOW;
use lambda_fixtures::{echo, EchoLogLine};
use lambda_harness::{invoke, InvocationContext};
use serde_json::json;

#[test]
fn echo_reports_remaining_time_under_the_default_deadline() {
    let ctx = InvocationContext::new();
    std::thread::sleep(Duration::from_millis(1));

    let inv = invoke(&echo, "echo", &ctx).expect("invoke echo");
    assert_eq!(inv.result, json!("echo"));

    let output = inv.stdout_text();
    let line = EchoLogLine::parse(&output)
        .unwrap_or_else(|| panic!("unexpected echo output: {output:?}"));
    assert!(
        LONG_ECHO_WINDOW.contains(&line.remaining_ms),
        "{} not in {:?}",
        line.remaining_ms,
        LONG_ECHO_WINDOW
    );
}
