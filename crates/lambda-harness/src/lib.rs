//! Deterministic invocation harness for deadline-bound handlers.
//!
//! - [`context`]: synthetic invocation context with platform placeholder identity.
//! - [`deadline`]: wall-clock remaining-time model.
//! - [`capture`]: descriptor-level stdout capture with guaranteed restoration.
//! - [`runner`]: one invocation, returning `(result, captured stdout)`.
//! - [`suite`]: cases, assertions and scenario-gated suite runs.
//!
//! Unix only: capture works on raw file descriptors.

pub mod capture;
pub mod context;
pub mod deadline;
pub mod handler;
pub mod runner;
pub mod suite;

pub use capture::{CaptureError, CaptureOptions, CaptureReader, Captured, DrainMode, StdoutCapture};
pub use context::{ContextSnapshot, InvocationContext, InvocationContextBuilder};
pub use deadline::Deadline;
pub use handler::{Handler, HandlerError, HandlerResult, HandlerTable};
pub use runner::{invoke, invoke_with, Invocation, InvokeError, InvokeOptions};
