// Core business logic lives here - feed in, queryable records out
pub mod buckets;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod models;
pub mod providers;
pub mod query;
pub mod service;
pub mod source;
pub mod store;
pub mod values;

pub use buckets::{Bucket, BucketRules, Buckets};
pub use config::Config;
pub use error::Error;
pub use export::{ExportFormat, Exporter};
pub use ingest::parse_feed;
pub use models::{GmpTrend, Record, RecordCollection, Schema};
pub use query::{SortDirection, SortState, StatusFilter, DEFAULT_SEARCH_FIELDS};
pub use service::{FeedOrigin, FeedService};
pub use source::FeedSource;
pub use store::{RecordStore, StoreState};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
