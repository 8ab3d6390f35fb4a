use once_cell::sync::Lazy;
use regex::Regex;

pub const ECHO_LOG_REGEX: &str = concat!(
    r"^hello cloudwatch logs from (?P<name>\w+) ",
    r"version (?P<version>\$?\w+),.(?P<ms>-?\d+) ms.*",
);

pub static ECHO_LOG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(ECHO_LOG_REGEX).unwrap_or_else(|err| panic!("invalid echo log regex: {err}"))
});

/// One parsed line of `echo` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoLogLine {
    pub name: String,
    pub version: String,
    /// Remaining time the handler saw on entry.
    pub remaining_ms: i64,
}

impl EchoLogLine {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = ECHO_LOG_PATTERN.captures(text)?;
        Some(Self {
            name: caps.name("name")?.as_str().to_string(),
            version: caps.name("version")?.as_str().to_string(),
            remaining_ms: caps.name("ms")?.as_str().parse().ok()?,
        })
    }
}
