//! Logging entry point
//!
//! [`Logger`] exposes one method per severity. Every call is routed by the
//! environment at call time:
//!
//! | environment | severity   | console | store |
//! |-------------|------------|---------|-------|
//! | development | any        | yes     | yes   |
//! | production  | forced     | yes     | no    |
//! | production  | any other  | no      | no    |

use std::sync::Arc;

use crate::config::Config;
use crate::environment::{Environment, EnvironmentOracle};

use super::console::ConsoleSink;
use super::render::render;
use super::store::{LogRecord, LogStore, Severity};
use super::value::Value;

/// Cheaply cloneable logging handle
#[derive(Clone)]
pub struct Logger {
    store: LogStore,
    environment: Arc<dyn EnvironmentOracle>,
    console: Arc<dyn ConsoleSink>,
}

impl Logger {
    pub fn new(
        store: LogStore,
        environment: Arc<dyn EnvironmentOracle>,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        Self {
            store,
            environment,
            console,
        }
    }

    /// Build a logger from configuration around an existing store
    pub fn from_config(config: &Config, store: LogStore) -> Self {
        Self::new(
            store,
            Arc::new(config.environment.oracle()),
            Arc::from(config.console.build()),
        )
    }

    /// Untagged log call
    pub fn log(&self, args: impl IntoIterator<Item = Value>) {
        self.add_log(Severity::Default, args);
    }

    pub fn info(&self, args: impl IntoIterator<Item = Value>) {
        self.add_log(Severity::Info, args);
    }

    pub fn success(&self, args: impl IntoIterator<Item = Value>) {
        self.add_log(Severity::Success, args);
    }

    pub fn warn(&self, args: impl IntoIterator<Item = Value>) {
        self.add_log(Severity::Warning, args);
    }

    pub fn error(&self, args: impl IntoIterator<Item = Value>) {
        self.add_log(Severity::Error, args);
    }

    /// Log to the console even in production
    ///
    /// Forced calls are kept out of the store in production.
    pub fn force(&self, args: impl IntoIterator<Item = Value>) {
        self.add_log(Severity::Forced, args);
    }

    /// Clear the console and the store
    pub fn clear(&self) {
        self.console.clear();
        self.store.clear();
    }

    /// Route one call according to the current environment
    pub fn add_log(&self, severity: Severity, args: impl IntoIterator<Item = Value>) {
        let production = self.environment.is_production();
        if production && severity != Severity::Forced {
            return;
        }

        let args: Vec<Value> = args.into_iter().collect();
        let message = severity.tagged(&render(&args));
        self.console.write(severity, &message, &args);

        if !production {
            self.store.append(LogRecord::new(severity, message, args));
        }
    }

    /// Current environment, detected fresh on every call
    pub fn env(&self) -> Environment {
        self.environment.detect()
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("env", &self.env())
            .field("entries", &self.store.len())
            .finish()
    }
}
