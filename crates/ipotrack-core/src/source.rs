use crate::Result;

/// Something that can hand over the raw feed text
///
/// The sheet over HTTP is the real one; a local file works for offline use
/// and tests. Keeping this a trait lets the refresh logic be tested without
/// a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the whole feed body
    async fn fetch(&self) -> Result<String>;

    /// Where the feed comes from; also the cache key
    fn locator(&self) -> String;
}
