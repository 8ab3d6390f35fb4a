use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lambda_contracts::{
    DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_MS, ENV_SCENARIO, LAMBDA_CONTEXT_SCHEMA_VERSION,
    LAMBDA_INVOKE_REPORT_SCHEMA_VERSION,
};
use lambda_harness::suite::run_suite;
use lambda_harness::{DrainMode, InvocationContext, InvokeError, InvokeOptions};
use lambda_scenarios::{Scenario, ScenarioSelection};

#[derive(Parser)]
#[command(name = "lambda-runner")]
#[command(about = "Runs fixture handlers under a synthetic invocation context.", long_about = None)]
struct Cli {
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Invoke one handler with stdout captured and print a JSON report.
    Invoke(InvokeArgs),
    /// Run the stock cases for the selected scenario.
    Suite(SuiteArgs),
    /// Print the synthetic context a handler would receive.
    Context {
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, allow_negative_numbers = true)]
        timeout_ms: i64,
    },
}

#[derive(clap::Args)]
struct InvokeArgs {
    #[arg(long)]
    handler: String,

    /// Event identifier passed to the handler (defaults to the handler name).
    #[arg(long)]
    event: Option<String>,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, allow_negative_numbers = true)]
    timeout_ms: i64,

    #[arg(long, default_value_t = 0)]
    pre_invoke_sleep_ms: u64,

    #[arg(long, value_enum, default_value_t = DrainArg::AfterRelease)]
    drain: DrainArg,

    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    max_output_bytes: usize,
}

#[derive(clap::Args)]
struct SuiteArgs {
    /// Scenario to run. Falls back to the LAMBDA_SCENARIO environment variable.
    #[arg(long, value_enum)]
    scenario: Option<Scenario>,

    /// Treat a missing or unknown selector as an error instead of skipping everything.
    #[arg(long)]
    require_selection: bool,

    #[arg(long, value_enum, default_value_t = DrainArg::AfterRelease)]
    drain: DrainArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab_case")]
enum DrainArg {
    AfterRelease,
    Background,
}

impl From<DrainArg> for DrainMode {
    fn from(d: DrainArg) -> Self {
        match d {
            DrainArg::AfterRelease => DrainMode::AfterRelease,
            DrainArg::Background => DrainMode::Background,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab_case")]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();

    // Diagnostics must never land in a capture window.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_target(false)
        .init();

    match cli.command {
        Command::Invoke(args) => cmd_invoke(args),
        Command::Suite(args) => cmd_suite(args),
        Command::Context { timeout_ms } => {
            let ctx = InvocationContext::with_timeout(timeout_ms);
            let json = serde_json::json!({
                "schema_version": LAMBDA_CONTEXT_SCHEMA_VERSION,
                "context": ctx.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(std::process::ExitCode::SUCCESS)
        }
    }
}

fn cmd_invoke(args: InvokeArgs) -> Result<std::process::ExitCode> {
    let table = lambda_fixtures::default_table();
    let event = args.event.as_deref().unwrap_or(&args.handler);
    let options = InvokeOptions {
        drain_mode: args.drain.into(),
        max_output_bytes: args.max_output_bytes,
    };

    let ctx = InvocationContext::with_timeout(args.timeout_ms);
    if args.pre_invoke_sleep_ms > 0 {
        std::thread::sleep(Duration::from_millis(args.pre_invoke_sleep_ms));
    }
    let outcome = table.invoke_named(options, &args.handler, event, &ctx);

    let (ok, result, error, stdout, truncated, elapsed_ms, remaining_ms_after) = match outcome {
        Ok(inv) => (
            true,
            inv.result.clone(),
            None,
            inv.stdout_text(),
            inv.stdout_truncated,
            Some(inv.elapsed_ms),
            inv.remaining_ms_after,
        ),
        Err(InvokeError::Handler { error, stdout }) => (
            false,
            serde_json::Value::Null,
            Some(error.to_string()),
            String::from_utf8_lossy(&stdout).into_owned(),
            false,
            None,
            ctx.remaining_time_ms(),
        ),
        Err(err @ InvokeError::UnknownHandler(_)) => {
            let known: Vec<&str> = table.names().collect();
            return Err(err).with_context(|| format!("known handlers: {}", known.join(", ")));
        }
        Err(err @ InvokeError::Capture(_)) => {
            return Err(err).context("capture stdout");
        }
    };

    let json = serde_json::json!({
        "schema_version": LAMBDA_INVOKE_REPORT_SCHEMA_VERSION,
        "handler": args.handler,
        "event": event,
        "ok": ok,
        "result": result,
        "error": error,
        "stdout": stdout,
        "stdout_truncated": truncated,
        "drain": options.drain_mode.as_str(),
        "elapsed_ms": elapsed_ms,
        "remaining_ms_after": remaining_ms_after,
        "context": ctx.snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(std::process::ExitCode::from(if ok { 0 } else { 1 }))
}

fn cmd_suite(args: SuiteArgs) -> Result<std::process::ExitCode> {
    let selection = match args.scenario {
        Some(s) => ScenarioSelection::only(s),
        None => ScenarioSelection::from_selector(std::env::var(ENV_SCENARIO).ok().as_deref()),
    };
    if args.require_selection {
        let scenario = selection
            .require()
            .with_context(|| format!("set --scenario or {ENV_SCENARIO}"))?;
        tracing::info!(scenario = scenario.as_str(), "scenario selected");
    }

    let options = InvokeOptions {
        drain_mode: args.drain.into(),
        ..InvokeOptions::default()
    };
    let report = run_suite(
        &lambda_fixtures::default_cases(),
        &lambda_fixtures::default_table(),
        &selection,
        options,
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(std::process::ExitCode::from(if report.is_success() {
        0
    } else {
        1
    }))
}
