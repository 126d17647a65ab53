//! Capped in-memory log store

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::event::{EventId, LoggedEvent, RequestMeta};
use crate::filter::LogFilter;

/// Maximum number of events held at any time
pub const CAPACITY: usize = 300;

/// Aggregate counts over one consistent snapshot of the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    pub total: usize,
    pub email: usize,
    pub scraper: usize,
    pub capacity: usize,
}

/// Bounded, newest-first collection of logged events
///
/// Writers (`append`, `clear`) take an exclusive lock, so insertion and
/// eviction happen as one step and readers never see more than [`CAPACITY`]
/// events. Readers share the lock and clone what they return.
#[derive(Debug)]
pub struct LogStore {
    /// Front is the newest event
    events: RwLock<VecDeque<LoggedEvent>>,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(CAPACITY + 1)),
        }
    }

    /// Capture a submission
    ///
    /// Never fails: a missing or undecodable payload is stored as `None` and
    /// matches neither shape. Returns a copy of the stored event.
    pub fn append(&self, raw_body: Option<Value>, meta: RequestMeta) -> LoggedEvent {
        let mut events = self.events.write();

        // Stamped under the lock so position order and timestamp order agree.
        let received_at = Utc::now();
        let event = LoggedEvent::capture(EventId::generate(received_at), received_at, raw_body, meta);
        trace!(
            id = %event.id,
            method = %event.method,
            is_email = event.is_email,
            is_scraper = event.is_scraper,
            "Captured event"
        );

        events.push_front(event.clone());
        if events.len() > CAPACITY {
            let evicted = events.len() - CAPACITY;
            events.truncate(CAPACITY);
            debug!(evicted, "Evicted oldest events over capacity");
        }

        event
    }

    /// Return every event matching `filter`, newest first
    pub fn query(&self, filter: &LogFilter) -> Vec<LoggedEvent> {
        let compiled = filter.compile();
        let events = self.events.read();
        events
            .iter()
            .filter(|e| compiled.matches(e))
            .cloned()
            .collect()
    }

    /// Remove every event, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut events = self.events.write();
        let cleared = events.len();
        events.clear();
        debug!(cleared, "Cleared log store");
        cleared
    }

    /// Look up one event by id
    pub fn get(&self, id: &EventId) -> Option<LoggedEvent> {
        self.events.read().iter().find(|e| &e.id == id).cloned()
    }

    /// Copy of all events, newest first
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.events.read().iter().cloned().collect()
    }

    /// Counts by shape
    pub fn stats(&self) -> LogStats {
        let events = self.events.read();
        LogStats {
            total: events.len(),
            email: events.iter().filter(|e| e.is_email).count(),
            scraper: events.iter().filter(|e| e.is_scraper).count(),
            capacity: CAPACITY,
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(store: &LogStore, body: Value) -> LoggedEvent {
        store.append(Some(body), RequestMeta::new("POST"))
    }

    #[test]
    fn test_append_and_get() {
        let store = LogStore::new();
        let event = post(&store, json!({ "subject": "Hello" }));

        let stored = store.get(&event.id).unwrap();
        assert_eq!(stored, event);
        assert!(stored.is_email);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_never_rejects() {
        let store = LogStore::new();
        let event = store.append(None, RequestMeta::new("PATCH"));

        assert!(event.raw_body.is_none());
        assert!(!event.is_email);
        assert!(!event.is_scraper);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_newest_first_ordering() {
        let store = LogStore::new();
        let a = post(&store, json!({ "n": "A" }));
        let b = post(&store, json!({ "n": "B" }));
        let c = post(&store, json!({ "n": "C" }));

        let ids: Vec<_> = store.query(&LogFilter::new()).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn test_capacity_enforcement() {
        let store = LogStore::new();
        for i in 0..(CAPACITY + 50) {
            post(&store, json!({ "n": i }));
        }

        assert_eq!(store.len(), CAPACITY);

        // Should have kept the latest events, newest first
        let all = store.snapshot();
        assert_eq!(all[0].raw_body, Some(json!({ "n": CAPACITY + 49 })));
        assert_eq!(all[CAPACITY - 1].raw_body, Some(json!({ "n": 50 })));
    }

    #[test]
    fn test_query_filters_without_reordering() {
        let store = LogStore::new();
        let first = post(&store, json!({ "source": "X", "subject": "one" }));
        post(&store, json!({ "source": "X" }));
        let third = post(&store, json!({ "source": "X", "subject": "three" }));
        post(&store, json!({ "subject": "four" }));

        let results = store.query(&LogFilter::new().source("X").is_email(true));
        let ids: Vec<_> = results.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);
    }

    #[test]
    fn test_query_no_match_is_empty() {
        let store = LogStore::new();
        post(&store, json!({ "source": "X" }));
        assert!(store.query(&LogFilter::new().source("Y")).is_empty());
    }

    #[test]
    fn test_search_query() {
        let store = LogStore::new();
        let digest = post(&store, json!({ "subject": "Weekly Digest" }));
        post(&store, json!({ "subject": "Invoice" }));

        let results = store.query(&LogFilter::new().search("digest"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, digest.id);
    }

    #[test]
    fn test_clear() {
        let store = LogStore::new();
        post(&store, json!({}));
        post(&store, json!({}));

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.clear(), 0);
        assert_eq!(store.clear(), 0);
        assert!(store.query(&LogFilter::new()).is_empty());
    }

    #[test]
    fn test_stats() {
        let store = LogStore::new();
        post(&store, json!({ "subject": "a" }));
        post(&store, json!({ "source": "b" }));
        post(&store, json!({ "subject": "c", "source": "c" }));
        post(&store, json!({}));

        let stats = store.stats();
        assert_eq!(
            stats,
            LogStats {
                total: 4,
                email: 2,
                scraper: 2,
                capacity: CAPACITY,
            }
        );
    }
}
