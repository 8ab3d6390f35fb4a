use std::collections::BTreeMap;

use serde_json::Value;

use crate::context::InvocationContext;

/// Error returned by a handler. The runner reports it with its `Display` form.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),
    #[error("handler i/o failed")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn message(msg: impl Into<String>) -> Self {
        HandlerError::Message(msg.into())
    }
}

pub type HandlerResult = Result<Value, HandlerError>;

/// The function under test: an event identifier plus a context in, an opaque
/// JSON value out. Implementations may write anything to descriptor 1.
pub trait Handler {
    fn handle(&self, event: &str, ctx: &InvocationContext) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&str, &InvocationContext) -> HandlerResult,
{
    fn handle(&self, event: &str, ctx: &InvocationContext) -> HandlerResult {
        self(event, ctx)
    }
}

/// Named handlers exported from one unit, looked up by name at invocation time.
#[derive(Default)]
pub struct HandlerTable {
    handlers: BTreeMap<String, Box<dyn Handler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn with(mut self, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.register(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo(event: &str, _: &InvocationContext) -> HandlerResult {
        Ok(json!(event))
    }

    #[test]
    fn closures_and_fns_are_handlers() {
        let ctx = InvocationContext::new();
        assert_eq!(echo.handle("ping", &ctx).expect("ok"), json!("ping"));

        let remaining = |_: &str, ctx: &InvocationContext| -> HandlerResult {
            Ok(json!(ctx.remaining_time_ms() > 0))
        };
        assert_eq!(remaining.handle("", &ctx).expect("ok"), json!(true));
    }

    #[test]
    fn table_lookup_by_name() {
        let table = HandlerTable::new()
            .with("echo", echo)
            .with("fail", |_: &str, _: &InvocationContext| -> HandlerResult {
                Err(HandlerError::message("boom"))
            });

        assert_eq!(table.len(), 2);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["echo", "fail"]);
        assert!(table.get("missing").is_none());

        let ctx = InvocationContext::new();
        let handler = table.get("echo").expect("echo registered");
        assert_eq!(handler.handle("hi", &ctx).expect("ok"), json!("hi"));

        let err = table
            .get("fail")
            .expect("fail registered")
            .handle("hi", &ctx)
            .expect_err("fail handler errors");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn anyhow_errors_convert() {
        let err: HandlerError = anyhow::anyhow!("region lookup failed").into();
        assert_eq!(err.to_string(), "region lookup failed");
    }
}
