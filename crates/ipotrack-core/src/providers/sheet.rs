use ipotrack_api::SheetClient;
use tracing::debug;

use crate::{source::FeedSource, Result};

/// The published Google sheet, fetched over HTTP
pub struct SheetSource {
    client: SheetClient,
}

impl SheetSource {
    pub fn new(client: SheetClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl FeedSource for SheetSource {
    async fn fetch(&self) -> Result<String> {
        debug!("Fetching sheet: {}", self.client.url());
        Ok(self.client.fetch().await?)
    }

    fn locator(&self) -> String {
        self.client.url().to_string()
    }
}
