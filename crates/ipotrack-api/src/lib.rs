// HTTP side of the feed: fetch the published sheet as raw CSV text
pub mod retry;
pub mod sheet;

pub use retry::RetryConfig;
pub use sheet::{FeedError, SheetClient, DEFAULT_SHEET_URL};
