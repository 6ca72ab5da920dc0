//! devlog - development-time logging façade
//!
//! Log calls are routed by environment: in development they reach the console and
//! an in-memory history that panels can follow live; in production only forced
//! calls reach the console.

pub mod config;
pub mod environment;
pub mod logging;

pub use environment::{Environment, EnvironmentOracle};
pub use logging::{LogMirror, LogStore, Logger, ObjectRef, Severity, Value};
