//! Document parser for discover-API pages

use crate::crawler::{DocParser, Page, SpiderHandle};
use crate::kickstarter::json::ProjectsPage;
use crate::kickstarter::project::ProjectRow;
use crate::kickstarter::tracker::CompletionTracker;
use crate::SpiderError;
use async_trait::async_trait;
use url::Url;

/// Stores finished projects and follows `has_more` pagination
#[derive(Debug, Default)]
pub struct JsonParser {
    tracker: CompletionTracker,
}

impl JsonParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker of the seed chains this parser follows
    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    /// Handles one page; `Ok(true)` when the chain continues
    fn handle_page(
        &self,
        url: &str,
        page: &Page,
        spider: &SpiderHandle,
    ) -> Result<bool, SpiderError> {
        let payload: ProjectsPage = page.json()?;

        let mut stored = 0usize;
        for project in payload.projects.iter().filter(|p| !p.is_live()) {
            let row = match ProjectRow::try_from(project) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("Skipping project {}: {}", project.id, e);
                    continue;
                }
            };

            tracing::trace!("Adding project {}/{} ...", row.id, row.name);
            match spider.add_doc(&row.url, &row) {
                Ok(()) => stored += 1,
                Err(e) => tracing::warn!("Failed to add '{}': {}", row.url, e),
            }
        }
        tracing::debug!(
            "Stored {} of {} projects from '{}'",
            stored,
            payload.projects.len(),
            url
        );

        if !payload.has_more {
            return Ok(false);
        }

        spider.queue(next_page_url(url)?)?;
        Ok(true)
    }
}

#[async_trait]
impl DocParser for JsonParser {
    async fn parse(
        &self,
        url: &str,
        page: Option<Page>,
        spider: &SpiderHandle,
    ) -> Result<(), SpiderError> {
        let Some(page) = page.filter(Page::is_ok) else {
            tracing::debug!("No usable page for '{}', chain finished", url);
            self.tracker.done();
            return Ok(());
        };

        match self.handle_page(url, &page, spider) {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.tracker.done();
                Ok(())
            }
            Err(e) => {
                self.tracker.done();
                Err(e)
            }
        }
    }
}

/// Returns `url` with its `page` query parameter incremented
///
/// A missing `page` becomes `2`; an unparsable one is reset to `2`. Other
/// query parameters keep their order.
pub fn next_page_url(url: &str) -> Result<String, SpiderError> {
    let mut parsed = Url::parse(url)?;

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    match pairs.iter_mut().find(|(key, _)| key == "page") {
        Some((_, value)) => {
            let next = match value.parse::<u64>() {
                Ok(page) => page + 1,
                Err(e) => {
                    tracing::warn!("Failed to parse page parameter '{}': {}", value, e);
                    2
                }
            };
            *value = next.to_string();
        }
        None => pairs.push(("page".to_string(), "2".to_string())),
    }

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(parsed.into())
}
