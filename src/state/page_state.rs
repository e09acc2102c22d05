//! Catalog pagination state
//!
//! Each catalog page index moves through
//! `Pending -> Dispatched -> {Parsed | Failed}`, and the crawl as a whole
//! reaches `Done` once no page is pending.

use crate::HarvestError;
use std::collections::BTreeMap;
use std::fmt;

/// Represents the current state of one catalog page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Page index has been scheduled but not fetched yet
    Pending,

    /// Request for the page has been issued
    Dispatched,

    /// Page was fetched and its project links extracted
    Parsed { link_count: usize },

    /// Page fetch failed after all retries
    Failed { error: String },
}

impl PageState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Parsed { .. } | Self::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Parsed { .. } => "parsed",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed { link_count } => write!(f, "parsed ({} links)", link_count),
            Self::Failed { error } => write!(f, "failed ({})", error),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A catalog page yielded no project links
    EmptyPage,

    /// The configured page limit was reached
    MaxPages,

    /// A catalog page could not be fetched
    FetchFailed,

    /// The crawl was cancelled from outside
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EmptyPage => "catalog page had no project links",
            Self::MaxPages => "page limit reached",
            Self::FetchFailed => "catalog page fetch failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Owned pagination state of one crawl
///
/// Only the transition methods mutate it. Page indices are never revisited:
/// a page can be dispatched once, and the next index is created only from
/// the parsed result of the previous one.
#[derive(Debug, Clone)]
pub struct CrawlState {
    last_page: u32,
    pages: BTreeMap<u32, PageState>,
    stopped: Option<StopReason>,
}

impl CrawlState {
    /// Creates the state with `first_page` pending
    ///
    /// `max_pages` counts pages, so the last page index allowed is
    /// `first_page + max_pages - 1`.
    pub fn new(first_page: u32, max_pages: u32) -> Self {
        let mut pages = BTreeMap::new();
        let stopped = if max_pages == 0 {
            Some(StopReason::MaxPages)
        } else {
            pages.insert(first_page, PageState::Pending);
            None
        };

        Self {
            last_page: first_page.saturating_add(max_pages.saturating_sub(1)),
            pages,
            stopped,
        }
    }

    /// Returns the pending page index, if pagination is still running
    pub fn next_pending(&self) -> Option<u32> {
        if self.stopped.is_some() {
            return None;
        }
        self.pages
            .iter()
            .find(|(_, state)| **state == PageState::Pending)
            .map(|(page, _)| *page)
    }

    /// Marks a pending page as dispatched
    pub fn dispatch(&mut self, page: u32) -> Result<(), HarvestError> {
        match self.pages.get(&page) {
            Some(PageState::Pending) if self.stopped.is_none() => {
                self.pages.insert(page, PageState::Dispatched);
                Ok(())
            }
            other => Err(HarvestError::InvalidTransition {
                page,
                from: other.cloned(),
                to: "dispatched",
            }),
        }
    }

    /// Records a parsed page and decides whether pagination continues
    ///
    /// Returns the next page index when one was created.
    pub fn record_parsed(&mut self, page: u32, link_count: usize) -> Result<Option<u32>, HarvestError> {
        self.expect_dispatched(page, "parsed")?;
        self.pages.insert(page, PageState::Parsed { link_count });

        if self.stopped.is_some() {
            return Ok(None);
        }

        if link_count == 0 {
            self.stopped = Some(StopReason::EmptyPage);
            return Ok(None);
        }

        if page >= self.last_page {
            self.stopped = Some(StopReason::MaxPages);
            return Ok(None);
        }

        let next = page + 1;
        self.pages.insert(next, PageState::Pending);
        Ok(Some(next))
    }

    /// Records a failed page; pagination terminates
    pub fn record_failed(&mut self, page: u32, error: impl Into<String>) -> Result<(), HarvestError> {
        self.expect_dispatched(page, "failed")?;
        self.pages.insert(page, PageState::Failed { error: error.into() });
        self.stopped.get_or_insert(StopReason::FetchFailed);
        Ok(())
    }

    /// Stops pagination; pending pages are never dispatched afterwards
    pub fn cancel(&mut self) {
        self.stopped.get_or_insert(StopReason::Cancelled);
        self.pages.retain(|_, state| *state != PageState::Pending);
    }

    /// Returns true once no further catalog page will be dispatched
    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.stopped.is_some()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    #[cfg(test)]
    pub fn page_state(&self, page: u32) -> Option<&PageState> {
        self.pages.get(&page)
    }

    /// Number of pages that were dispatched at some point
    pub fn dispatched_count(&self) -> usize {
        self.pages
            .values()
            .filter(|state| **state != PageState::Pending)
            .count()
    }

    fn expect_dispatched(&self, page: u32, to: &'static str) -> Result<(), HarvestError> {
        match self.pages.get(&page) {
            Some(PageState::Dispatched) => Ok(()),
            other => Err(HarvestError::InvalidTransition {
                page,
                from: other.cloned(),
                to,
            }),
        }
    }
}
