//! Generic offset-paged traversal.
//!
//! [`PaginatedCollector`] walks a Bitbucket-style paged endpoint
//! (`values` / `isLastPage` / `nextPageStart`) from offset 0 until the last
//! page, an item trips the bail predicate, or a page turns out to be
//! malformed.
//!
//! Error policy:
//! - a [`FetchError`] (transport, status, invalid JSON) aborts the traversal
//!   and is returned to the caller;
//! - a [`MalformedPage`] (valid JSON with the wrong shape) ends the traversal
//!   early and the items collected so far are returned, marked truncated.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::bitbucket::Page;
use crate::error::{FetchError, MalformedPage};
use crate::predicate::{BailPredicate, SkipPredicate};
use crate::progress::{CensusProgress, ProgressCallback, emit};

/// Fetches one page of a paged endpoint.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` with `start` as the paging offset and return the parsed JSON body.
    async fn fetch_page(&self, url: &str, start: u64) -> Result<serde_json::Value, FetchError>;
}

/// How a traversal ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The last page was reached.
    Exhausted,
    /// The bail predicate stopped the traversal.
    Bailed,
    /// A malformed page ended the traversal early.
    Truncated(MalformedPage),
}

/// Items kept by a traversal and how it ended.
#[derive(Debug, Clone)]
pub struct Collected<T> {
    /// Items kept, in server order.
    pub items: Vec<T>,
    /// Items examined, including skipped ones but not a bail trigger.
    pub seen: usize,
    pub outcome: Outcome,
}

impl<T> Collected<T> {
    /// Whether the items are partial because of a malformed page.
    pub fn is_truncated(&self) -> bool {
        matches!(self.outcome, Outcome::Truncated(_))
    }

    pub fn bailed(&self) -> bool {
        self.outcome == Outcome::Bailed
    }

    pub fn malformed(&self) -> Option<&MalformedPage> {
        match &self.outcome {
            Outcome::Truncated(page) => Some(page),
            _ => None,
        }
    }
}

/// Drives a [`PageFetcher`] through every page of an endpoint.
pub struct PaginatedCollector<'a, F: ?Sized> {
    fetcher: &'a F,
    page_delay: Duration,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a, F: PageFetcher + ?Sized> PaginatedCollector<'a, F> {
    /// Create a collector that pauses `page_delay` between page fetches.
    pub fn new(fetcher: &'a F, page_delay: Duration) -> Self {
        Self {
            fetcher,
            page_delay,
            on_progress: None,
        }
    }

    /// Report page-level progress to `on_progress`.
    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Collect every item of the paged endpoint at `url`.
    ///
    /// `bail` is checked before `skip`: an item that trips `bail` ends the
    /// traversal and is not kept; an item that trips `skip` is dropped and
    /// the traversal carries on.
    pub async fn collect<T: DeserializeOwned>(
        &self,
        url: &str,
        bail: Option<&dyn BailPredicate<T>>,
        skip: Option<&dyn SkipPredicate<T>>,
    ) -> Result<Collected<T>, FetchError> {
        emit(
            self.on_progress,
            CensusProgress::FetchingPages {
                url: url.to_string(),
            },
        );

        let mut items: Vec<T> = Vec::new();
        let mut seen = 0usize;
        let mut start = 0u64;

        loop {
            let raw = self.fetcher.fetch_page(url, start).await?;

            let page = match Page::<serde_json::Value>::deserialize(&raw) {
                Ok(page) => page,
                Err(e) => {
                    return Ok(self.truncated(url, start, e.to_string(), &raw, items, seen));
                }
            };

            let next = page.next_start(start);
            let count = page.values.len();

            for (index, value) in page.values.into_iter().enumerate() {
                let item = match T::deserialize(value) {
                    Ok(item) => item,
                    Err(e) => {
                        let reason = format!("item {index}: {e}");
                        return Ok(self.truncated(url, start, reason, &raw, items, seen));
                    }
                };
                if bail.is_some_and(|b| b.should_stop(&item)) {
                    tracing::debug!(url, start, kept = items.len(), "Bail predicate hit");
                    emit(
                        self.on_progress,
                        CensusProgress::Bailed {
                            url: url.to_string(),
                            total: items.len(),
                        },
                    );
                    return Ok(Collected {
                        items,
                        seen,
                        outcome: Outcome::Bailed,
                    });
                }
                seen += 1;
                if skip.is_some_and(|s| s.should_skip(&item)) {
                    continue;
                }
                items.push(item);
            }

            tracing::debug!(url, start, count, total_so_far = items.len(), "Fetched page");
            emit(
                self.on_progress,
                CensusProgress::FetchedPage {
                    url: url.to_string(),
                    start,
                    count,
                    total_so_far: items.len(),
                },
            );

            match next {
                Ok(None) => break,
                Ok(Some(next_start)) => {
                    start = next_start;
                    if !self.page_delay.is_zero() {
                        tokio::time::sleep(self.page_delay).await;
                    }
                }
                Err(reason) => return Ok(self.truncated(url, start, reason, &raw, items, seen)),
            }
        }

        emit(
            self.on_progress,
            CensusProgress::FetchComplete {
                url: url.to_string(),
                total: items.len(),
            },
        );

        Ok(Collected {
            items,
            seen,
            outcome: Outcome::Exhausted,
        })
    }

    fn truncated<T>(
        &self,
        url: &str,
        start: u64,
        reason: String,
        raw: &serde_json::Value,
        items: Vec<T>,
        seen: usize,
    ) -> Collected<T> {
        let raw = raw.to_string();
        tracing::warn!(
            url,
            start,
            reason = %reason,
            raw = %raw,
            "Malformed page, keeping {} items collected so far",
            items.len()
        );
        emit(
            self.on_progress,
            CensusProgress::MalformedPage {
                url: url.to_string(),
                start,
                reason: reason.clone(),
                raw: raw.clone(),
            },
        );

        Collected {
            items,
            seen,
            outcome: Outcome::Truncated(MalformedPage {
                url: url.to_string(),
                start,
                reason,
                raw,
            }),
        }
    }
}
