use std::path::{Path, PathBuf};

use crate::{source::FeedSource, Error, Result};

/// A CSV export sitting on disk
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl FeedSource for FileSource {
    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::FeedUnavailable(format!("{}: {}", self.path.display(), e)))
    }

    fn locator(&self) -> String {
        format!("file://{}", self.path.display())
    }
}
