// Refresh logic: source first, on-disk copy when the source is down
use chrono::{DateTime, Utc};
use ipotrack_cache::{CachedFeed, FeedCache};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::models::RecordCollection;
use crate::source::FeedSource;
use crate::store::RecordStore;
use crate::{Error, Result};

/// Where the snapshot installed by a refresh came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrigin {
    Live,
    Cache { fetched_at: DateTime<Utc> },
}

/// Keeps a [`RecordStore`] in step with one feed source
pub struct FeedService {
    source: Box<dyn FeedSource>,
    store: RecordStore,
    cache: Option<Mutex<FeedCache>>,
    policy: CacheConfig,
}

impl FeedService {
    pub fn new(source: Box<dyn FeedSource>) -> Self {
        Self {
            source,
            store: RecordStore::new(),
            cache: None,
            policy: CacheConfig::default(),
        }
    }

    pub fn with_cache(source: Box<dyn FeedSource>, cache: FeedCache, policy: CacheConfig) -> Self {
        Self {
            source,
            store: RecordStore::new(),
            cache: Some(Mutex::new(cache)),
            policy,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn snapshot(&self) -> Arc<RecordCollection> {
        self.store.current()
    }

    pub fn locator(&self) -> String {
        self.source.locator()
    }

    /// Fetch the feed and swap in the new snapshot
    ///
    /// When the fetch fails and nothing has been loaded yet, a cached copy is
    /// used if it is young enough (or offline mode is on). Once the store is
    /// populated a failed fetch is reported and the old snapshot stays put.
    pub async fn refresh(&self) -> Result<FeedOrigin> {
        let locator = self.source.locator();
        info!("Refreshing feed from {}", locator);

        let fetched = self.source.fetch().await;

        let body = match fetched {
            Ok(body) => body,
            Err(e) => return self.recover(&locator, e),
        };

        let collection = self.store.ingest(&body)?;
        info!("Loaded {} records", collection.len());

        self.remember(&locator, &body);
        Ok(FeedOrigin::Live)
    }

    /// Load the last cached copy without touching the source
    pub fn load_cached(&self) -> Result<FeedOrigin> {
        let locator = self.source.locator();
        match self.cached(&locator)? {
            Some(cached) => {
                self.store.ingest(&cached.body)?;
                info!("Loaded cached feed for {} from {}", locator, cached.fetched_at);
                Ok(FeedOrigin::Cache {
                    fetched_at: cached.fetched_at,
                })
            }
            None => Err(Error::FeedUnavailable(format!(
                "no cached copy of {}",
                locator
            ))),
        }
    }

    fn recover(&self, locator: &str, err: Error) -> Result<FeedOrigin> {
        if self.store.snapshot().is_some() {
            warn!("Refresh failed, keeping current snapshot: {}", err);
            return Err(err);
        }

        let cached = match self.cached(locator) {
            Ok(Some(cached)) => cached,
            Ok(None) => return Err(err),
            Err(cache_err) => {
                warn!("Feed cache unreadable for {}: {}", locator, cache_err);
                return Err(err);
            }
        };

        if !self.policy.offline_mode && cached.is_stale(self.policy.ttl_hours, Utc::now()) {
            debug!("Cached feed from {} is too old to stand in", cached.fetched_at);
            return Err(err);
        }

        warn!(
            "Feed unavailable ({}); using cached copy from {}",
            err, cached.fetched_at
        );
        self.store.ingest(&cached.body)?;
        Ok(FeedOrigin::Cache {
            fetched_at: cached.fetched_at,
        })
    }

    fn cached(&self, locator: &str) -> Result<Option<CachedFeed>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        if !self.policy.enabled {
            return Ok(None);
        }

        Ok(cache.lock().get(locator)?)
    }

    fn remember(&self, locator: &str, body: &str) {
        if !self.policy.enabled {
            return;
        }
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.lock().set(locator, body) {
                debug!("Failed to cache feed {}: {}", locator, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockFeedSource;
    use chrono::Duration;

    const FEED: &str = "Name,Status,Price\nAlpha,Open,100\nBeta,Listed,50\n";
    const LOCATOR: &str = "https://sheet.test/feed.csv";

    fn source_returning(result: fn() -> Result<String>) -> Box<MockFeedSource> {
        let mut source = MockFeedSource::new();
        source.expect_locator().return_const(LOCATOR.to_string());
        source.expect_fetch().returning(move || result());
        Box::new(source)
    }

    fn down() -> Result<String> {
        Err(Error::FeedUnavailable("connection refused".into()))
    }

    #[tokio::test]
    async fn test_refresh_ingests_and_caches() {
        let cache = FeedCache::in_memory().unwrap();
        let service = FeedService::with_cache(
            source_returning(|| Ok(FEED.to_string())),
            cache,
            CacheConfig::default(),
        );

        assert_eq!(service.refresh().await.unwrap(), FeedOrigin::Live);
        assert_eq!(service.snapshot().names(), vec!["Alpha", "Beta"]);

        let cached = service.cache.as_ref().unwrap().lock().get(LOCATOR).unwrap();
        assert_eq!(cached.unwrap().body, FEED);
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_unavailable() {
        let service = FeedService::new(source_returning(down));

        let err = service.refresh().await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(service.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_fresh_cache() {
        let cache = FeedCache::in_memory().unwrap();
        cache.set(LOCATOR, FEED).unwrap();
        let service = FeedService::with_cache(source_returning(down), cache, CacheConfig::default());

        let origin = service.refresh().await.unwrap();
        assert!(matches!(origin, FeedOrigin::Cache { .. }));
        assert_eq!(service.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_cache_is_ignored_unless_offline() {
        let old = Utc::now() - Duration::hours(48);

        let cache = FeedCache::in_memory().unwrap();
        cache.set_at(LOCATOR, FEED, old).unwrap();
        let service = FeedService::with_cache(source_returning(down), cache, CacheConfig::default());
        assert!(service.refresh().await.unwrap_err().is_unavailable());

        let cache = FeedCache::in_memory().unwrap();
        cache.set_at(LOCATOR, FEED, old).unwrap();
        let policy = CacheConfig {
            offline_mode: true,
            ..CacheConfig::default()
        };
        let service = FeedService::with_cache(source_returning(down), cache, policy);
        assert!(matches!(
            service.refresh().await.unwrap(),
            FeedOrigin::Cache { .. }
        ));
    }

    #[tokio::test]
    async fn test_broken_cache_reports_the_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.db");
        let cache = FeedCache::new(&path).unwrap();
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("DROP TABLE feed_snapshots", [])
            .unwrap();

        let service = FeedService::with_cache(source_returning(down), cache, CacheConfig::default());

        let err = service.refresh().await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(service.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failure_after_success_keeps_snapshot() {
        let mut source = MockFeedSource::new();
        source.expect_locator().return_const(LOCATOR.to_string());
        let mut calls = 0;
        source.expect_fetch().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(FEED.to_string())
            } else {
                down()
            }
        });

        let service = FeedService::new(Box::new(source));
        service.refresh().await.unwrap();

        assert!(service.refresh().await.is_err());
        assert_eq!(service.snapshot().names(), vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_not_cached() {
        let cache = FeedCache::in_memory().unwrap();
        let service = FeedService::with_cache(
            source_returning(|| Ok("<html><body>Sign in</body></html>".to_string())),
            cache,
            CacheConfig::default(),
        );

        let err = service.refresh().await.unwrap_err();
        assert!(matches!(err, Error::FeedParse { .. }));

        let cached = service.cache.as_ref().unwrap().lock().get(LOCATOR).unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_is_neither_read_nor_written() {
        let cache = FeedCache::in_memory().unwrap();
        cache.set(LOCATOR, FEED).unwrap();
        let policy = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let service = FeedService::with_cache(source_returning(down), cache, policy);

        assert!(service.refresh().await.is_err());
    }

    #[test]
    fn test_load_cached_skips_the_source() {
        let mut source = MockFeedSource::new();
        source.expect_locator().return_const(LOCATOR.to_string());
        source.expect_fetch().never();

        let cache = FeedCache::in_memory().unwrap();
        cache.set(LOCATOR, FEED).unwrap();
        let service = FeedService::with_cache(Box::new(source), cache, CacheConfig::default());

        assert!(matches!(
            service.load_cached().unwrap(),
            FeedOrigin::Cache { .. }
        ));
        assert_eq!(service.snapshot().len(), 2);
    }

    #[test]
    fn test_load_cached_without_entry() {
        let mut source = MockFeedSource::new();
        source.expect_locator().return_const(LOCATOR.to_string());
        let service = FeedService::with_cache(
            Box::new(source),
            FeedCache::in_memory().unwrap(),
            CacheConfig::default(),
        );

        assert!(service.load_cached().unwrap_err().is_unavailable());
    }
}
