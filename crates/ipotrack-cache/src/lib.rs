// SQLite-based caching layer
// Keeps the last good feed body around so a flaky network doesn't mean an empty board

pub mod cache;

pub use cache::{CacheError, CachedFeed, FeedCache};
