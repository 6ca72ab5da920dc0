//! Logging engine for devlog
//!
//! Provides the logging façade, the in-memory history store with live subscribers,
//! argument rendering, console sinks, and a consumer-side mirror for log panels.

mod console;
mod diagnostics;
mod facade;
mod mirror;
mod render;
mod store;
mod value;

pub use console::{ConsoleKind, ConsoleSink, SilentConsole, StdConsole, TracingConsole};
pub use diagnostics::{diagnostics_filter, init_diagnostics};
pub use facade::Logger;
pub use mirror::{LogMirror, SyncSummary};
pub use render::{render, render_value, CIRCULAR_MARKER, MAX_DEPTH, TRUNCATED_MARKER};
pub use store::{
    ConsoleStream, LogEntry, LogRecord, LogStore, Severity, StoreEvent, Subscription,
};
pub use value::{ObjectKind, ObjectRef, Structure, Value};
