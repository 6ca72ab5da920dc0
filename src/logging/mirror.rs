//! Consumer-side copy of the log history
//!
//! A [`LogMirror`] is what a log panel holds: its own list of entries, kept in step
//! with a [`LogStore`] through a subscription.
//!
//! Attaching subscribes first and reads the history second, so nothing appended in
//! between is lost. Events for entries already present in that history are dropped
//! by sequence number, and a clear only removes entries up to the sequence number it
//! carries. Entries are kept in sequence order even when a subscriber logs from
//! inside its callback and events arrive out of order. Queued events are applied
//! when the owner calls [`LogMirror::sync`], which lets a UI batch updates into its
//! own refresh cycle.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::store::{LogEntry, LogStore, StoreEvent, Subscription};

#[derive(Default)]
struct Inbox {
    events: Mutex<VecDeque<StoreEvent>>,
    notify: Notify,
}

impl Inbox {
    fn push(&self, event: StoreEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(event);
        self.notify.notify_one();
    }

    fn take(&self) -> VecDeque<StoreEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }
}

/// What a call to [`LogMirror::sync`] changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Entries added to the mirror
    pub appended: usize,
    /// Whether a clear was applied
    pub cleared: bool,
}

impl SyncSummary {
    pub fn is_empty(&self) -> bool {
        self.appended == 0 && !self.cleared
    }
}

/// Live, consumer-owned copy of a store's history
pub struct LogMirror {
    entries: Vec<Arc<LogEntry>>,
    /// Appends at or below this sequence number are already seeded or cleared
    floor: u64,
    inbox: Arc<Inbox>,
    subscription: Subscription,
}

impl LogMirror {
    /// Attach to a store, seeding from its current history
    pub fn attach(store: &LogStore) -> Self {
        let inbox = Arc::new(Inbox::default());
        let sink = Arc::clone(&inbox);
        let subscription = store.subscribe(move |event| sink.push(event.clone()));

        // Read after subscribing: anything appended meanwhile is either here or queued
        let entries = store.history();
        let floor = entries.last().map(|e| e.seq).unwrap_or(0);

        Self {
            entries,
            floor,
            inbox,
            subscription,
        }
    }

    /// Entries as of the last sync
    pub fn entries(&self) -> &[Arc<LogEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of queued events not yet applied
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Apply all queued events
    pub fn sync(&mut self) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for event in self.inbox.take() {
            match event {
                StoreEvent::Appended(entry) => {
                    if entry.seq <= self.floor {
                        continue;
                    }
                    let pos = self.entries.partition_point(|e| e.seq < entry.seq);
                    self.entries.insert(pos, entry);
                    summary.appended += 1;
                }
                StoreEvent::Cleared { through } => {
                    self.entries.retain(|e| e.seq > through);
                    self.floor = self.floor.max(through);
                    summary.cleared = true;
                }
            }
        }

        summary
    }

    /// Wait until at least one event has been queued since the last wakeup
    ///
    /// Returns immediately if an event arrived while nobody was waiting.
    pub async fn changed(&self) {
        self.inbox.notify.notified().await;
    }

    /// Stop receiving events
    ///
    /// Dropping the mirror does the same.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for LogMirror {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl std::fmt::Debug for LogMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogMirror")
            .field("entries", &self.entries.len())
            .field("floor", &self.floor)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::store::{LogRecord, Severity};
    use std::time::Duration;

    fn append(store: &LogStore, message: &str) -> Arc<LogEntry> {
        store.append(LogRecord::new(Severity::Info, message, Vec::new()))
    }

    fn messages(mirror: &LogMirror) -> Vec<String> {
        mirror.entries().iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_attach_replays_existing_history() {
        let store = LogStore::new();
        append(&store, "early 1");
        append(&store, "early 2");

        let mirror = LogMirror::attach(&store);
        assert_eq!(messages(&mirror), vec!["early 1", "early 2"]);
        assert_eq!(mirror.pending(), 0);
    }

    #[test]
    fn test_sync_applies_new_entries() {
        let store = LogStore::new();
        let mut mirror = LogMirror::attach(&store);

        append(&store, "a");
        append(&store, "b");
        assert_eq!(mirror.pending(), 2);
        assert!(mirror.is_empty());

        let summary = mirror.sync();
        assert_eq!(
            summary,
            SyncSummary {
                appended: 2,
                cleared: false
            }
        );
        assert_eq!(messages(&mirror), vec!["a", "b"]);
        assert!(mirror.sync().is_empty());
    }

    #[test]
    fn test_duplicate_delivery_is_skipped() {
        let store = LogStore::new();
        let mut mirror = LogMirror::attach(&store);

        // Simulate an entry that is both in the seeded history and queued
        let entry = append(&store, "raced");
        mirror.entries.push(Arc::clone(&entry));
        mirror.floor = entry.seq;

        let summary = mirror.sync();
        assert_eq!(summary.appended, 0);
        assert_eq!(messages(&mirror), vec!["raced"]);
    }

    #[test]
    fn test_clear_removes_only_older_entries() {
        let store = LogStore::new();
        append(&store, "old");
        let mut mirror = LogMirror::attach(&store);

        store.clear();
        append(&store, "new");

        let summary = mirror.sync();
        assert!(summary.cleared);
        assert_eq!(summary.appended, 1);
        assert_eq!(messages(&mirror), vec!["new"]);
    }

    #[test]
    fn test_stale_clear_keeps_newer_history() {
        let store = LogStore::new();
        append(&store, "old");
        let through = store.history()[0].seq;
        store.clear();
        append(&store, "kept");

        let mut mirror = LogMirror::attach(&store);
        // A clear issued before attach arrives late
        mirror.inbox.push(StoreEvent::Cleared { through });

        let summary = mirror.sync();
        assert!(summary.cleared);
        assert_eq!(messages(&mirror), vec!["kept"]);
    }

    #[test]
    fn test_entry_logged_from_callback_during_attach_is_kept() {
        let store = LogStore::new();
        let writer = store.clone();
        let once = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&once);
        let _sub = store.subscribe(move |event| {
            if matches!(event, StoreEvent::Appended(_))
                && !flag.swap(true, std::sync::atomic::Ordering::SeqCst)
            {
                writer.append(LogRecord::new(Severity::Info, "nested", Vec::new()));
            }
        });

        let mut mirror = LogMirror::attach(&store);
        append(&store, "outer");
        mirror.sync();

        assert_eq!(messages(&mirror), vec!["outer", "nested"]);
    }

    #[test]
    fn test_append_racing_a_clear_is_dropped() {
        let store = LogStore::new();
        let mut mirror = LogMirror::attach(&store);

        // A subscriber that clears while an append is being delivered
        let entry = append(&store, "gone");
        mirror.inbox.take();
        mirror.inbox.push(StoreEvent::Cleared { through: entry.seq });
        mirror.inbox.push(StoreEvent::Appended(entry));

        mirror.sync();
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_detach_stops_updates() {
        let store = LogStore::new();
        let mirror = LogMirror::attach(&store);
        assert_eq!(store.subscriber_count(), 1);
        mirror.detach();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_detaches() {
        let store = LogStore::new();
        let mirror = LogMirror::attach(&store);
        let inbox = Arc::clone(&mirror.inbox);
        assert_eq!(store.subscriber_count(), 1);

        drop(mirror);
        assert_eq!(store.subscriber_count(), 0);

        for i in 0..100 {
            append(&store, &format!("after drop {}", i));
        }
        assert_eq!(inbox.len(), 0);
    }

    #[tokio::test]
    async fn test_changed_wakes_on_append() {
        let store = LogStore::new();
        let mut mirror = LogMirror::attach(&store);

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.append(LogRecord::new(Severity::Success, "ready", Vec::new()));
        });

        tokio::time::timeout(Duration::from_secs(5), mirror.changed())
            .await
            .expect("mirror was not notified");
        mirror.sync();
        assert_eq!(messages(&mirror), vec!["ready"]);
    }

    #[tokio::test]
    async fn test_changed_returns_for_event_before_wait() {
        let store = LogStore::new();
        let mirror = LogMirror::attach(&store);
        append(&store, "early");

        tokio::time::timeout(Duration::from_secs(5), mirror.changed())
            .await
            .expect("stored permit was lost");
    }
}
