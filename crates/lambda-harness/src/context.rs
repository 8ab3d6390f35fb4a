use serde::Serialize;

use lambda_contracts::DEFAULT_TIMEOUT_MS;

use crate::deadline::Deadline;

pub const FAKE_FUNCTION_NAME: &str = "fake_function";
pub const FAKE_FUNCTION_VERSION: &str = "$LATEST";
pub const FAKE_INVOKED_FUNCTION_ARN: &str =
    "arn:aws:lambda:XX-TEST-1:999999999999:function:fake_function";
pub const FAKE_MEMORY_LIMIT_IN_MB: &str = "128";
pub const FAKE_AWS_REQUEST_ID: &str = "1f8958d8-b20b-4a3c-b8fb-78896d10a9e5";
pub const FAKE_LOG_GROUP_NAME: &str = "/aws/lambda/fake_function";
// Date and coordinates of the Battle of Hastings.
pub const FAKE_LOG_STREAM_NAME: &str = "1066/10/14/[$LATEST]00000000000000000000505443002915";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Identity {
    function_name: String,
    function_version: String,
    invoked_function_arn: String,
    memory_limit_in_mb: String,
    aws_request_id: String,
    log_group_name: String,
    log_stream_name: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            function_name: FAKE_FUNCTION_NAME.to_string(),
            function_version: FAKE_FUNCTION_VERSION.to_string(),
            invoked_function_arn: FAKE_INVOKED_FUNCTION_ARN.to_string(),
            memory_limit_in_mb: FAKE_MEMORY_LIMIT_IN_MB.to_string(),
            aws_request_id: FAKE_AWS_REQUEST_ID.to_string(),
            log_group_name: FAKE_LOG_GROUP_NAME.to_string(),
            log_stream_name: FAKE_LOG_STREAM_NAME.to_string(),
        }
    }
}

/// Stand-in for the context object a serverless platform hands to a handler.
///
/// The deadline starts when the context is built, so construct it immediately
/// before invoking the handler: anything done in between is charged to the
/// handler's budget.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    identity: Identity,
    deadline: Deadline,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT_MS)
    }

    pub fn with_timeout(timeout_ms: i64) -> Self {
        Self::builder().timeout_ms(timeout_ms).build()
    }

    pub fn builder() -> InvocationContextBuilder {
        InvocationContextBuilder::default()
    }

    pub fn function_name(&self) -> &str {
        &self.identity.function_name
    }

    /// Version executing; with an alias this is the version the alias points to.
    pub fn function_version(&self) -> &str {
        &self.identity.function_version
    }

    pub fn invoked_function_arn(&self) -> &str {
        &self.identity.invoked_function_arn
    }

    pub fn memory_limit_in_mb(&self) -> &str {
        &self.identity.memory_limit_in_mb
    }

    pub fn aws_request_id(&self) -> &str {
        &self.identity.aws_request_id
    }

    pub fn log_group_name(&self) -> &str {
        &self.identity.log_group_name
    }

    pub fn log_stream_name(&self) -> &str {
        &self.identity.log_stream_name
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    pub fn timeout_ms(&self) -> i64 {
        self.deadline.timeout_ms()
    }

    /// Milliseconds left before the platform would terminate the invocation.
    /// Negative once the deadline has passed.
    pub fn remaining_time_ms(&self) -> i64 {
        self.deadline.remaining_time_ms()
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            identity: self.identity.clone(),
            timeout_ms: self.deadline.timeout_ms(),
            remaining_time_ms: self.deadline.remaining_time_ms(),
        }
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time, serializable view of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    #[serde(flatten)]
    identity: Identity,
    pub timeout_ms: i64,
    pub remaining_time_ms: i64,
}

#[derive(Debug, Clone)]
pub struct InvocationContextBuilder {
    identity: Identity,
    timeout_ms: i64,
}

impl Default for InvocationContextBuilder {
    fn default() -> Self {
        Self {
            identity: Identity::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl InvocationContextBuilder {
    pub fn timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn function_name(mut self, v: impl Into<String>) -> Self {
        self.identity.function_name = v.into();
        self
    }

    pub fn function_version(mut self, v: impl Into<String>) -> Self {
        self.identity.function_version = v.into();
        self
    }

    pub fn invoked_function_arn(mut self, v: impl Into<String>) -> Self {
        self.identity.invoked_function_arn = v.into();
        self
    }

    pub fn memory_limit_in_mb(mut self, v: impl Into<String>) -> Self {
        self.identity.memory_limit_in_mb = v.into();
        self
    }

    pub fn aws_request_id(mut self, v: impl Into<String>) -> Self {
        self.identity.aws_request_id = v.into();
        self
    }

    pub fn log_group_name(mut self, v: impl Into<String>) -> Self {
        self.identity.log_group_name = v.into();
        self
    }

    pub fn log_stream_name(mut self, v: impl Into<String>) -> Self {
        self.identity.log_stream_name = v.into();
        self
    }

    /// Starts the deadline.
    pub fn build(self) -> InvocationContext {
        InvocationContext {
            identity: self.identity,
            deadline: Deadline::start(self.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_placeholders() {
        let ctx = InvocationContext::new();
        assert_eq!(ctx.function_name(), "fake_function");
        assert_eq!(ctx.function_version(), "$LATEST");
        assert_eq!(
            ctx.invoked_function_arn(),
            "arn:aws:lambda:XX-TEST-1:999999999999:function:fake_function"
        );
        assert_eq!(ctx.memory_limit_in_mb(), "128");
        assert_eq!(ctx.aws_request_id(), "1f8958d8-b20b-4a3c-b8fb-78896d10a9e5");
        assert_eq!(ctx.log_group_name(), "/aws/lambda/fake_function");
        assert_eq!(
            ctx.log_stream_name(),
            "1066/10/14/[$LATEST]00000000000000000000505443002915"
        );
        assert_eq!(ctx.timeout_ms(), 3000);
    }

    #[test]
    fn remaining_time_delegates_to_deadline() {
        let ctx = InvocationContext::with_timeout(100);
        std::thread::sleep(std::time::Duration::from_millis(10));
        let remaining = ctx.remaining_time_ms();
        assert!(remaining <= 90, "remaining={remaining}");
        assert!(ctx.deadline().remaining_time_ms() <= remaining);
    }

    #[test]
    fn builder_overrides_identity_only_where_asked() {
        let ctx = InvocationContext::builder()
            .function_name("orders")
            .function_version("7")
            .timeout_ms(250)
            .build();
        assert_eq!(ctx.function_name(), "orders");
        assert_eq!(ctx.function_version(), "7");
        assert_eq!(ctx.log_group_name(), FAKE_LOG_GROUP_NAME);
        assert_eq!(ctx.timeout_ms(), 250);
    }

    #[test]
    fn snapshot_serializes_flat() {
        let ctx = InvocationContext::with_timeout(1000);
        let v = serde_json::to_value(ctx.snapshot()).expect("serialize snapshot");
        assert_eq!(v["function_name"], "fake_function");
        assert_eq!(v["aws_request_id"], FAKE_AWS_REQUEST_ID);
        assert_eq!(v["timeout_ms"], 1000);
        let remaining = v["remaining_time_ms"].as_i64().expect("remaining_time_ms");
        assert!(remaining <= 1000);
    }
}
