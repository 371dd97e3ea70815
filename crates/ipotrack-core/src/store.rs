use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use crate::ingest::parse_feed;
use crate::models::RecordCollection;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing ingested yet
    Empty,
    /// Holds a snapshot from the most recent successful ingest
    Populated,
}

/// Holds the current snapshot of the feed
///
/// Readers get an `Arc` to a finished collection. An ingest builds the new
/// collection off to the side and swaps the reference in one step, so
/// nobody ever sees half of one feed and half of another. A failed ingest
/// leaves the previous snapshot where it was.
#[derive(Debug, Default)]
pub struct RecordStore {
    snapshot: RwLock<Option<Arc<RecordCollection>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StoreState {
        if self.snapshot.read().is_some() {
            StoreState::Populated
        } else {
            StoreState::Empty
        }
    }

    /// Parse `raw` and make it the current snapshot
    pub fn ingest(&self, raw: &str) -> Result<Arc<RecordCollection>> {
        let collection = Arc::new(parse_feed(raw)?);

        let mut slot = self.snapshot.write();
        let previous = slot.replace(Arc::clone(&collection));
        drop(slot);

        debug!(
            "Snapshot replaced: {} records (previously {})",
            collection.len(),
            previous.map(|p| p.len().to_string()).unwrap_or_else(|| "empty".into())
        );

        Ok(collection)
    }

    /// Current snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<RecordCollection>> {
        self.snapshot.read().clone()
    }

    /// Current snapshot, or an empty collection before the first ingest
    pub fn current(&self) -> Arc<RecordCollection> {
        self.snapshot().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_starts_empty() {
        let store = RecordStore::new();
        assert_eq!(store.state(), StoreState::Empty);
        assert!(store.snapshot().is_none());
        assert!(store.current().is_empty());
    }

    #[test]
    fn test_ingest_populates() {
        let store = RecordStore::new();
        let snap = store.ingest("Name,Status\nAlpha,Open\n").unwrap();

        assert_eq!(store.state(), StoreState::Populated);
        assert_eq!(snap.names(), vec!["Alpha"]);
        assert!(Arc::ptr_eq(&snap, &store.snapshot().unwrap()));
    }

    #[test]
    fn test_reingest_replaces_whole_snapshot() {
        let store = RecordStore::new();
        let first = store.ingest("Name,Status\nAlpha,Open\nBeta,Listed\n").unwrap();
        let second = store.ingest("Name,Status\nGamma,Upcoming\n").unwrap();

        assert_eq!(store.current().names(), vec!["Gamma"]);
        // Old readers keep the old view intact
        assert_eq!(first.names(), vec!["Alpha", "Beta"]);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_ingest_keeps_previous_snapshot() {
        let store = RecordStore::new();
        store.ingest("Name,Status\nAlpha,Open\n").unwrap();

        let err = store.ingest("").unwrap_err();
        assert!(matches!(err, Error::FeedParse { .. }));
        assert_eq!(store.current().names(), vec!["Alpha"]);
    }

    #[test]
    fn test_failed_first_ingest_stays_empty() {
        let store = RecordStore::new();
        assert!(store.ingest(",,\n").is_err());
        assert_eq!(store.state(), StoreState::Empty);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(RecordStore::new());
        store.ingest("Name,Status\nA,Open\nB,Open\n").unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let len = store.current().len();
                        assert!(len == 2 || len == 3, "saw {len} records");
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            store.ingest("Name,Status\nA,Open\nB,Open\nC,Open\n").unwrap();
            store.ingest("Name,Status\nA,Open\nB,Open\n").unwrap();
        }

        for r in readers {
            r.join().unwrap();
        }
    }
}
