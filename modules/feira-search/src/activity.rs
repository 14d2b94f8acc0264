use anyhow::Result;
use async_trait::async_trait;

use feira_common::SearchActivityRecord;

/// Destination for search activity records.
///
/// Appends are dispatched from detached tasks; an error is logged by the
/// dispatcher and never reaches the search caller.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn append(&self, record: SearchActivityRecord) -> Result<()>;
}
