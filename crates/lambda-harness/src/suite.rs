//! Cases: one invocation plus the assertions made over its result and output.
//!
//! Assertion failures are case outcomes, not errors. Only harness faults (a
//! capture that could not be installed, a handler that failed) surface as
//! [`InvokeError`]; [`run_suite`] records those as `error`.

use std::ops::RangeInclusive;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use lambda_contracts::LAMBDA_SUITE_REPORT_SCHEMA_VERSION;
use lambda_scenarios::{Decision, Scenario, ScenarioSelection};

use crate::context::InvocationContext;
use crate::handler::{Handler, HandlerTable};
use crate::runner::{invoke_with, Invocation, InvokeError, InvokeOptions};

#[derive(Debug, Clone)]
pub enum StdoutExpect {
    Empty,
    Exact(Vec<u8>),
    /// Output must match `pattern`, and the named `group` must parse as an
    /// integer inside `window`.
    Matches {
        pattern: Regex,
        group: String,
        window: RangeInclusive<i64>,
    },
}

#[derive(Debug, Clone)]
pub struct Expect {
    pub result: Value,
    pub stdout: StdoutExpect,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub id: String,
    pub scenario: Scenario,
    pub handler: String,
    pub event: String,
    pub timeout_ms: i64,
    /// Sleep between building the context and invoking; charged to the deadline.
    pub pre_invoke_sleep_ms: u64,
    pub expect: Expect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Pass,
    Fail { reason: String },
    Skip { reason: String },
    Error { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub id: String,
    pub scenario: &'static str,
    #[serde(flatten)]
    pub outcome: CaseOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub schema_version: &'static str,
    pub selection: Option<String>,
    pub summary: SuiteSummary,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.summary.errors == 0
    }
}

/// Checks an invocation against its expectation.
pub fn evaluate(expect: &Expect, inv: &Invocation) -> CaseOutcome {
    if inv.result != expect.result {
        return CaseOutcome::Fail {
            reason: format!("result mismatch: expected {} got {}", expect.result, inv.result),
        };
    }
    if inv.stdout_truncated {
        return CaseOutcome::Fail {
            reason: "stdout exceeded cap".to_string(),
        };
    }

    match &expect.stdout {
        StdoutExpect::Empty => {
            if inv.stdout.is_empty() {
                CaseOutcome::Pass
            } else {
                CaseOutcome::Fail {
                    reason: format!("unexpected stdout output: {:?}", inv.stdout_text()),
                }
            }
        }
        StdoutExpect::Exact(want) => {
            if &inv.stdout == want {
                CaseOutcome::Pass
            } else {
                CaseOutcome::Fail {
                    reason: format!(
                        "stdout mismatch: expected {:?} got {:?}",
                        String::from_utf8_lossy(want),
                        inv.stdout_text()
                    ),
                }
            }
        }
        StdoutExpect::Matches {
            pattern,
            group,
            window,
        } => {
            let text = inv.stdout_text();
            let Some(caps) = pattern.captures(&text) else {
                return CaseOutcome::Fail {
                    reason: format!("stdout {text:?} does not match {}", pattern.as_str()),
                };
            };
            let Some(raw) = caps.name(group) else {
                return CaseOutcome::Fail {
                    reason: format!("group {group:?} did not participate in the match"),
                };
            };
            let value: i64 = match raw.as_str().parse() {
                Ok(v) => v,
                Err(err) => {
                    return CaseOutcome::Fail {
                        reason: format!(
                            "group {group:?}={:?} is not an integer: {err}",
                            raw.as_str()
                        ),
                    }
                }
            };
            if window.contains(&value) {
                CaseOutcome::Pass
            } else {
                CaseOutcome::Fail {
                    reason: format!(
                        "{value} not in [{}, {}]",
                        window.start(),
                        window.end()
                    ),
                }
            }
        }
    }
}

/// Runs one case if `selection` enables its scenario.
pub fn run_case(
    case: &Case,
    handler: &dyn Handler,
    selection: &ScenarioSelection,
    options: InvokeOptions,
) -> Result<CaseReport, InvokeError> {
    if let Decision::Skip(reason) = selection.decide(case.scenario) {
        tracing::debug!(case = %case.id, %reason, "skipping case");
        return Ok(skipped(case, reason.to_string()));
    }

    let ctx = InvocationContext::with_timeout(case.timeout_ms);
    if case.pre_invoke_sleep_ms > 0 {
        std::thread::sleep(Duration::from_millis(case.pre_invoke_sleep_ms));
    }
    let inv = invoke_with(options, handler, &case.event, &ctx)?;
    let outcome = evaluate(&case.expect, &inv);

    Ok(CaseReport {
        id: case.id.clone(),
        scenario: case.scenario.as_str(),
        outcome,
        elapsed_ms: Some(inv.elapsed_ms),
        stdout: Some(inv.stdout_text()),
    })
}

/// Runs every case in order, resolving handlers by name from `table`.
pub fn run_suite(
    cases: &[Case],
    table: &HandlerTable,
    selection: &ScenarioSelection,
    options: InvokeOptions,
) -> SuiteReport {
    let mut summary = SuiteSummary::default();
    let mut reports = Vec::with_capacity(cases.len());

    for case in cases {
        let report = match (selection.decide(case.scenario), table.get(&case.handler)) {
            (Decision::Skip(reason), _) => skipped(case, reason.to_string()),
            (Decision::Run, None) => errored(
                case,
                format!("no handler registered under {:?}", case.handler),
            ),
            (Decision::Run, Some(handler)) => match run_case(case, handler, selection, options) {
                Ok(report) => report,
                Err(err) => invoke_failed(case, err),
            },
        };

        match report.outcome {
            CaseOutcome::Pass => summary.passed += 1,
            CaseOutcome::Fail { .. } => summary.failed += 1,
            CaseOutcome::Skip { .. } => summary.skipped += 1,
            CaseOutcome::Error { .. } => summary.errors += 1,
        }
        reports.push(report);
    }

    SuiteReport {
        schema_version: LAMBDA_SUITE_REPORT_SCHEMA_VERSION,
        selection: selection.selector().map(str::to_string),
        summary,
        cases: reports,
    }
}

fn skipped(case: &Case, reason: String) -> CaseReport {
    CaseReport {
        id: case.id.clone(),
        scenario: case.scenario.as_str(),
        outcome: CaseOutcome::Skip { reason },
        elapsed_ms: None,
        stdout: None,
    }
}

/// Partial output of a failed handler stays in the report.
fn invoke_failed(case: &Case, err: InvokeError) -> CaseReport {
    let stdout = match &err {
        InvokeError::Handler { stdout, .. } => Some(String::from_utf8_lossy(stdout).into_owned()),
        InvokeError::Capture(_) | InvokeError::UnknownHandler(_) => None,
    };
    CaseReport {
        stdout,
        ..errored(case, format!("{:#}", anyhow::Error::new(err)))
    }
}

fn errored(case: &Case, reason: String) -> CaseReport {
    CaseReport {
        id: case.id.clone(),
        scenario: case.scenario.as_str(),
        outcome: CaseOutcome::Error { reason },
        elapsed_ms: None,
        stdout: None,
    }
}
