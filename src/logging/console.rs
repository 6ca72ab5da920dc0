//! Console sinks
//!
//! The console is where log calls go besides the in-memory store. Writes are fire
//! and forget: a sink must never panic or report errors back to the caller.

use std::io::{self, IsTerminal, Write};

use serde::{Deserialize, Serialize};

use super::store::{ConsoleStream, Severity};
use super::value::Value;

/// Destination for console-routed log calls
pub trait ConsoleSink: Send + Sync {
    /// Write one rendered call
    ///
    /// `args` are the raw arguments, for sinks that can show richer output.
    fn write(&self, severity: Severity, message: &str, args: &[Value]);

    /// Clear the console, if the sink supports it
    fn clear(&self) {}
}

/// Which console sink to build from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    /// Standard output, with warnings and errors on standard error
    #[default]
    Stdout,
    /// Forward to `tracing` events
    Tracing,
    /// Drop console output
    Silent,
}

impl ConsoleKind {
    pub fn build(&self) -> Box<dyn ConsoleSink> {
        match self {
            ConsoleKind::Stdout => Box::new(StdConsole),
            ConsoleKind::Tracing => Box::new(TracingConsole),
            ConsoleKind::Silent => Box::new(SilentConsole),
        }
    }
}

/// Writes to stdout, or stderr for warnings and errors
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl ConsoleSink for StdConsole {
    fn write(&self, severity: Severity, message: &str, _args: &[Value]) {
        // Write errors (closed pipes and the like) are dropped
        let _ = match severity.stream() {
            ConsoleStream::Log => writeln!(io::stdout().lock(), "{}", message),
            ConsoleStream::Warn | ConsoleStream::Error => {
                writeln!(io::stderr().lock(), "{}", message)
            }
        };
    }

    fn clear(&self) {
        let mut out = io::stdout().lock();
        if out.is_terminal() {
            let _ = write!(out, "\x1b[2J\x1b[H");
            let _ = out.flush();
        }
    }
}

/// Emits each call as a `tracing` event under the `devlog::console` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn write(&self, severity: Severity, message: &str, _args: &[Value]) {
        let name = severity.as_str();
        match severity.stream() {
            ConsoleStream::Log => {
                tracing::info!(target: "devlog::console", severity = name, "{}", message)
            }
            ConsoleStream::Warn => {
                tracing::warn!(target: "devlog::console", severity = name, "{}", message)
            }
            ConsoleStream::Error => {
                tracing::error!(target: "devlog::console", severity = name, "{}", message)
            }
        }
    }

    fn clear(&self) {
        tracing::debug!(target: "devlog::console", "console cleared");
    }
}

/// Drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentConsole;

impl ConsoleSink for SilentConsole {
    fn write(&self, _severity: Severity, _message: &str, _args: &[Value]) {}
}
