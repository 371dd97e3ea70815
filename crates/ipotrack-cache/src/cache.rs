use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid timestamp in cache: {0}")]
    InvalidTimestamp(i64),
}

pub type Result<T> = std::result::Result<T, CacheError>;

const MAX_TTL_HOURS: u64 = 24 * 365 * 100;

/// A raw feed body as it was last fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFeed {
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl CachedFeed {
    /// Older than `ttl_hours` relative to `now`
    pub fn is_stale(&self, ttl_hours: u64, now: DateTime<Utc>) -> bool {
        // A century is "never stale" for our purposes and keeps chrono in range
        let ttl = Duration::hours(ttl_hours.min(MAX_TTL_HOURS) as i64);
        now - self.fetched_at > ttl
    }
}

/// Feed snapshot cache using SQLite
///
/// One row per feed locator (URL or file path). Only bodies that parsed
/// successfully should end up here.
pub struct FeedCache {
    conn: Connection,
}

impl FeedCache {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Throwaway cache, handy for tests and `--no-cache` style runs
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS feed_snapshots (
                locator TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                fetched_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Store (or replace) the body for a locator, stamped with the current time
    pub fn set(&self, locator: &str, body: &str) -> Result<()> {
        self.set_at(locator, body, Utc::now())
    }

    pub fn set_at(&self, locator: &str, body: &str, fetched_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO feed_snapshots (locator, body, fetched_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(locator) DO UPDATE SET body = excluded.body, fetched_at = excluded.fetched_at",
            params![locator, body, fetched_at.timestamp()],
        )?;
        debug!("Cached {} bytes for {}", body.len(), locator);
        Ok(())
    }

    pub fn get(&self, locator: &str) -> Result<Option<CachedFeed>> {
        let row = self
            .conn
            .query_row(
                "SELECT body, fetched_at FROM feed_snapshots WHERE locator = ?1",
                params![locator],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((body, ts)) => {
                let fetched_at = Utc
                    .timestamp_opt(ts, 0)
                    .single()
                    .ok_or(CacheError::InvalidTimestamp(ts))?;
                Ok(Some(CachedFeed { body, fetched_at }))
            }
            None => Ok(None),
        }
    }

    /// Returns true if something was actually removed
    pub fn remove(&self, locator: &str) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM feed_snapshots WHERE locator = ?1",
            params![locator],
        )?;
        Ok(n > 0)
    }

    pub fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM feed_snapshots", [])?)
    }
}
