pub mod dune;

use crate::error::Result;
use async_trait::async_trait;

/// Analytics platform that runs saved queries
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch up to `limit` result rows of a saved query as delimited text.
    ///
    /// `Ok(None)` means the query produced nothing usable; the failure has
    /// already been logged.
    async fn fetch(&self, query_id: u64, limit: u32) -> Result<Option<String>>;
}
