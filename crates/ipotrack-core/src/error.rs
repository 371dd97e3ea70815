use thiserror::Error;

/// All the ways things can go wrong in IPO Track
#[derive(Error, Debug)]
pub enum Error {
    /// The raw feed text could not be obtained at all
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    /// The feed arrived but is structurally unusable
    #[error("Feed could not be parsed{}: {reason}", line_suffix(.line))]
    FeedParse { line: Option<u64>, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cache operation failed: {0}")]
    CacheError(String),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn line_suffix(line: &Option<u64>) -> String {
    match line {
        Some(l) => format!(" (line {})", l),
        None => String::new(),
    }
}

impl Error {
    pub fn parse(reason: impl Into<String>) -> Self {
        Error::FeedParse {
            line: None,
            reason: reason.into(),
        }
    }

    /// Fetch-side failure, as opposed to a bad payload
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::FeedUnavailable(_))
    }
}

impl From<ipotrack_api::FeedError> for Error {
    fn from(err: ipotrack_api::FeedError) -> Self {
        Error::FeedUnavailable(err.to_string())
    }
}

impl From<ipotrack_cache::CacheError> for Error {
    fn from(err: ipotrack_cache::CacheError) -> Self {
        Error::CacheError(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line());
        Error::FeedParse {
            line,
            reason: err.to_string(),
        }
    }
}
