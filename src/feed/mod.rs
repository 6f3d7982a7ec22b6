pub mod accumulator;
pub mod filter;
pub mod grouping;

pub use accumulator::{FeedStatus, MatchFeed};
pub use filter::{FilterKey, OrderBy};
pub use grouping::{DateGroup, group_by_date_label};

use async_trait::async_trait;

use crate::models::MatchSummary;

/// One fetched batch plus the total reported for the active filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub matches: Vec<MatchSummary>,
    pub total_count: u32,
    pub origin: PageOrigin,
}

/// Whether a page carries backend data or is the empty stand-in served when
/// a fetch failed. List rendering treats both the same; tests and logging
/// can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrigin {
    Backend,
    FetchError,
}

impl Page {
    pub fn fetch_error() -> Self {
        Self {
            matches: Vec::new(),
            total_count: 0,
            origin: PageOrigin::FetchError,
        }
    }
}

#[async_trait]
pub trait PageSource {
    /// Fetch one page for the filter. Implementations never fail: transport
    /// and decode problems come back as `Page::fetch_error()`.
    async fn fetch_page(&self, filter: &FilterKey, page_index: u32) -> Page;
}
