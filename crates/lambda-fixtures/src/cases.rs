use std::ops::RangeInclusive;

use lambda_harness::suite::{Case, Expect, StdoutExpect};
use lambda_scenarios::Scenario;
use serde_json::Value;

use crate::log_line::ECHO_LOG_PATTERN;
use crate::regions::regions_value;
use crate::{ECHO, LIST_REGIONS};

pub const SHORT_TIMEOUT_MS: i64 = 100;
pub const LONG_TIMEOUT_MS: i64 = 3000;

/// Accepted remaining time for a 100ms budget after a 10ms head start.
/// Upper bound is exact; the lower bound absorbs scheduler jitter.
pub const SHORT_ECHO_WINDOW: RangeInclusive<i64> = 70..=90;
/// Accepted remaining time for a 3000ms budget after a 1ms head start.
pub const LONG_ECHO_WINDOW: RangeInclusive<i64> = 2970..=2999;

fn echo_case(id: &str, timeout_ms: i64, sleep_ms: u64, window: RangeInclusive<i64>) -> Case {
    Case {
        id: id.to_string(),
        scenario: Scenario::Echo,
        handler: ECHO.to_string(),
        event: ECHO.to_string(),
        timeout_ms,
        pre_invoke_sleep_ms: sleep_ms,
        expect: Expect {
            result: Value::String(ECHO.to_string()),
            stdout: StdoutExpect::Matches {
                pattern: ECHO_LOG_PATTERN.clone(),
                group: "ms".to_string(),
                window,
            },
        },
    }
}

fn regions_case(id: &str, timeout_ms: i64, sleep_ms: u64) -> Case {
    Case {
        id: id.to_string(),
        scenario: Scenario::ListRegions,
        handler: LIST_REGIONS.to_string(),
        event: LIST_REGIONS.to_string(),
        timeout_ms,
        pre_invoke_sleep_ms: sleep_ms,
        expect: Expect {
            result: regions_value(),
            stdout: StdoutExpect::Empty,
        },
    }
}

/// The stock suite: each scenario under a short and a long deadline.
pub fn default_cases() -> Vec<Case> {
    vec![
        echo_case("echo/short_timeout", SHORT_TIMEOUT_MS, 10, SHORT_ECHO_WINDOW),
        regions_case("list-regions/short_timeout", SHORT_TIMEOUT_MS, 0),
        echo_case("echo/long_timeout", LONG_TIMEOUT_MS, 1, LONG_ECHO_WINDOW),
        regions_case("list-regions/long_timeout", LONG_TIMEOUT_MS, 1),
    ]
}
