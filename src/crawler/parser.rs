//! Document parser capability

use crate::crawler::fetcher::Page;
use crate::crawler::spider::SpiderHandle;
use crate::SpiderError;
use async_trait::async_trait;

/// Turns a fetched page into records and follow-up URLs
///
/// A parser is invoked exactly once per dequeued URL it is routed to. When
/// every fetch attempt failed, `page` is `None`; parsers must still do any
/// completion bookkeeping they rely on in that case.
///
/// Records are stored with [`SpiderHandle::add_doc`] and further URLs are
/// enqueued with [`SpiderHandle::queue`]. An error returned from `parse` is
/// logged by the spider and does not stop the crawl.
#[async_trait]
pub trait DocParser: Send + Sync {
    async fn parse(
        &self,
        url: &str,
        page: Option<Page>,
        spider: &SpiderHandle,
    ) -> Result<(), SpiderError>;
}
