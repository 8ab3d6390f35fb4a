//! Shared, version-pinned identifiers and defaults.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable reports, and for the defaults every crate agrees on.

pub const LAMBDA_INVOKE_REPORT_SCHEMA_VERSION: &str = "lambda-runner.invoke.report@0.1.0";
pub const LAMBDA_SUITE_REPORT_SCHEMA_VERSION: &str = "lambda-runner.suite.report@0.1.0";
pub const LAMBDA_CONTEXT_SCHEMA_VERSION: &str = "lambda-runner.context@0.1.0";

/// Invocation budget handed to a synthetic context when none is configured.
pub const DEFAULT_TIMEOUT_MS: i64 = 3000;

/// Bytes kept from a single capture window; anything beyond is dropped.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 4 * 1024 * 1024;

/// Names the enabled scenario. Read by the runner binary only.
pub const ENV_SCENARIO: &str = "LAMBDA_SCENARIO";
