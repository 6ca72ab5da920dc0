//! In-memory log history with live subscribers
//!
//! The store keeps every entry appended since the last clear and fans each change
//! out to registered callbacks, synchronously and in registration order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::{DateTime, Utc};

use super::value::Value;

/// Severity of a log call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Plain `log` call without a tag
    Default,
    Info,
    Success,
    Warning,
    Error,
    /// Bypasses production suppression on the console
    Forced,
}

/// Console stream a severity is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Log,
    Warn,
    Error,
}

impl Severity {
    /// All severities in declaration order
    pub const ALL: [Severity; 6] = [
        Severity::Default,
        Severity::Info,
        Severity::Success,
        Severity::Warning,
        Severity::Error,
        Severity::Forced,
    ];

    /// Get the display name for this severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "default",
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Forced => "forced",
        }
    }

    /// Tag prepended to the rendered message, if any
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Severity::Default => None,
            Severity::Info => Some("[INFO]"),
            Severity::Success => Some("[SUCCESS]"),
            Severity::Warning => Some("[WARN]"),
            Severity::Error => Some("[ERROR]"),
            Severity::Forced => Some("[FORCE]"),
        }
    }

    pub fn stream(&self) -> ConsoleStream {
        match self {
            Severity::Warning => ConsoleStream::Warn,
            Severity::Error => ConsoleStream::Error,
            _ => ConsoleStream::Log,
        }
    }

    /// Prefix `rendered` with this severity's tag
    pub fn tagged(&self, rendered: &str) -> String {
        match (self.tag(), rendered.is_empty()) {
            (None, _) => rendered.to_string(),
            (Some(tag), true) => tag.to_string(),
            (Some(tag), false) => format!("{} {}", tag, rendered),
        }
    }
}

/// Data for an entry that has not been appended yet
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
    pub args: Vec<Value>,
}

impl LogRecord {
    /// Create a new record
    pub fn new(severity: Severity, message: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            severity,
            message: message.into(),
            args,
        }
    }
}

/// A single appended log entry
///
/// Entries are shared as `Arc<LogEntry>` and never change after append.
#[derive(Debug)]
pub struct LogEntry {
    /// Store-wide sequence number, increasing across clears
    pub seq: u64,
    /// Timestamp when the entry was appended
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    /// Rendered text including the severity tag
    pub message: String,
    /// Arguments exactly as passed to the call
    pub args: Vec<Value>,
}

/// Change broadcast to subscribers
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Appended(Arc<LogEntry>),
    /// History was wiped; `through` is the last sequence number assigned before it
    Cleared { through: u64 },
}

type Callback = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
struct History {
    entries: Vec<Arc<LogEntry>>,
    last_seq: u64,
}

#[derive(Default)]
struct Shared {
    history: RwLock<History>,
    subscribers: RwLock<Vec<(u64, Callback)>>,
    next_subscriber: AtomicU64,
}

impl Shared {
    fn history(&self) -> RwLockReadGuard<'_, History> {
        self.history.read().unwrap_or_else(|e| e.into_inner())
    }

    fn history_mut(&self) -> RwLockWriteGuard<'_, History> {
        self.history.write().unwrap_or_else(|e| e.into_inner())
    }

    fn subscribers_mut(&self) -> RwLockWriteGuard<'_, Vec<(u64, Callback)>> {
        self.subscribers.write().unwrap_or_else(|e| e.into_inner())
    }

    fn remove_subscriber(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }
}

/// Thread-safe, append-only log history with subscribers
///
/// Cloning produces another handle to the same store.
#[derive(Clone, Default)]
pub struct LogStore {
    shared: Arc<Shared>,
}

impl LogStore {
    /// Create a new, independent store
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store
    ///
    /// Every call returns a handle to the same instance.
    pub fn shared() -> LogStore {
        static STORE: OnceLock<LogStore> = OnceLock::new();
        STORE.get_or_init(LogStore::new).clone()
    }

    /// Append a record and notify all subscribers
    pub fn append(&self, record: LogRecord) -> Arc<LogEntry> {
        let entry = {
            let mut history = self.shared.history_mut();
            history.last_seq += 1;
            let entry = Arc::new(LogEntry {
                seq: history.last_seq,
                timestamp: Utc::now(),
                severity: record.severity,
                message: record.message,
                args: record.args,
            });
            history.entries.push(Arc::clone(&entry));
            entry
        };

        self.emit(&StoreEvent::Appended(Arc::clone(&entry)));
        entry
    }

    /// Remove all entries and notify subscribers
    ///
    /// Subscribers stay registered.
    pub fn clear(&self) {
        let through = {
            let mut history = self.shared.history_mut();
            history.entries.clear();
            history.last_seq
        };
        self.emit(&StoreEvent::Cleared { through });
    }

    /// Get a snapshot of the current history
    pub fn history(&self) -> Vec<Arc<LogEntry>> {
        self.shared.history().entries.clone()
    }

    /// Get the number of entries in the history
    pub fn len(&self) -> usize {
        self.shared.history().entries.len()
    }

    /// Check if the history is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a callback for appends and clears
    ///
    /// The callback stays registered until [`Subscription::unsubscribe`] is called;
    /// dropping the handle does not remove it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.shared
            .subscribers_mut()
            .push((id, Arc::new(callback)));
        tracing::trace!(subscriber = id, "subscriber registered");

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Get the number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .read()
            .map(|s| s.len())
            .unwrap_or(0)
    }

    fn emit(&self, event: &StoreEvent) {
        // Snapshot the callbacks so none of our locks are held while they run
        let subscribers: Vec<(u64, Callback)> = self
            .shared
            .subscribers
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone());

        for (id, callback) in subscribers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            if let Err(payload) = result {
                tracing::error!(
                    subscriber = id,
                    "log subscriber panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Handle returned by [`LogStore::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove the callback from the store
    ///
    /// Returns true if this call removed it. Calling again is a no-op.
    pub fn unsubscribe(&self) -> bool {
        let removed = self
            .shared
            .upgrade()
            .map(|shared| shared.remove_subscriber(self.id))
            .unwrap_or(false);
        if removed {
            tracing::trace!(subscriber = self.id, "subscriber removed");
        }
        removed
    }

    /// Check if the callback is still registered
    pub fn is_active(&self) -> bool {
        self.shared
            .upgrade()
            .map(|shared| {
                shared
                    .subscribers
                    .read()
                    .map(|s| s.iter().any(|(id, _)| *id == self.id))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }
}
