//! Natural-language product search: an external interpreter raced against a
//! deadline, a deterministic rule-based fallback, and the orchestrator that
//! picks between them and reports each invocation to an activity sink.

pub mod activity;
pub mod fallback;
pub mod gateway;
pub mod orchestrator;
pub mod summary;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use activity::ActivitySink;
pub use fallback::FallbackParser;
pub use gateway::{InterpretError, Interpreter, InterpreterGateway, DEFAULT_TIMEOUT};
pub use orchestrator::{activity_record, SearchService};
