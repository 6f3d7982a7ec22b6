use std::collections::HashMap;

use tracing::debug;

use crate::models::MatchSummary;

use super::{FilterKey, Page, PageSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedStatus {
    #[default]
    Empty,
    Loading,
    HasPages,
    Exhausted,
}

#[derive(Debug, Default)]
struct FeedEntry {
    pages: Vec<Page>,
    status: FeedStatus,
}

/// Grows a list of match pages under the active [`FilterKey`]. Pages live in
/// a cache keyed by the serialized filter; changing any filter component
/// discards the accumulated pages wholesale, which also drops interest in
/// whatever fetch was running for the previous key.
pub struct MatchFeed<S> {
    source: S,
    filter: FilterKey,
    entries: HashMap<String, FeedEntry>,
}

impl<S: PageSource> MatchFeed<S> {
    pub fn new(source: S, filter: FilterKey) -> Self {
        Self {
            source,
            filter,
            entries: HashMap::new(),
        }
    }

    pub fn filter(&self) -> &FilterKey {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterKey) {
        if filter == self.filter {
            return;
        }

        let discarded = self.entries.remove(&self.filter.cache_key());
        debug!(
            old_key = %self.filter.cache_key(),
            new_key = %filter.cache_key(),
            discarded_pages = discarded.map(|e| e.pages.len()).unwrap_or(0),
            "Filter changed, feed reset"
        );
        self.filter = filter;
    }

    pub fn status(&self) -> FeedStatus {
        self.entry().map(|entry| entry.status).unwrap_or_default()
    }

    pub fn pages_fetched(&self) -> usize {
        self.entry().map(|entry| entry.pages.len()).unwrap_or(0)
    }

    /// Total reported by the backend for the active filter, from the most
    /// recently fetched page.
    pub fn total_count(&self) -> u32 {
        self.entry()
            .and_then(|entry| entry.pages.last())
            .map(|page| page.total_count)
            .unwrap_or(0)
    }

    /// The accumulated pages flattened into one ordered list.
    pub fn matches(&self) -> Vec<MatchSummary> {
        self.entry()
            .map(|entry| {
                entry
                    .pages
                    .iter()
                    .flat_map(|page| page.matches.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Estimates remaining pages as `ceil(total_count / page_0_length)`
    /// against pages fetched so far. Assumes every page is as long as the
    /// first one; a short first page for any reason other than exhaustion
    /// skews the estimate.
    pub fn has_next_page(&self) -> bool {
        match self.entry() {
            None => true,
            Some(entry) => entry_has_next(entry),
        }
    }

    /// Fetch and append the next page. A no-op returning the current status
    /// once the feed is exhausted.
    pub async fn fetch_next_page(&mut self) -> FeedStatus {
        if !self.has_next_page() {
            return self.status();
        }

        let key = self.filter.cache_key();
        let page_index = self.pages_fetched() as u32;

        self.entries.entry(key.clone()).or_default().status = FeedStatus::Loading;
        let page = self.source.fetch_page(&self.filter, page_index).await;

        debug!(
            key = %key,
            page_index,
            returned = page.matches.len(),
            total_count = page.total_count,
            "Page appended"
        );

        let entry = self.entries.entry(key).or_default();
        entry.pages.push(page);
        entry.status = if entry_has_next(entry) {
            FeedStatus::HasPages
        } else {
            FeedStatus::Exhausted
        };
        entry.status
    }

    fn entry(&self) -> Option<&FeedEntry> {
        self.entries.get(&self.filter.cache_key())
    }
}

fn entry_has_next(entry: &FeedEntry) -> bool {
    let Some(first_page) = entry.pages.first() else {
        return true;
    };

    let page_len = first_page.matches.len() as u32;
    if page_len == 0 {
        return false;
    }

    let total_pages = entry
        .pages
        .last()
        .map(|page| page.total_count.div_ceil(page_len))
        .unwrap_or(0);

    u64::from(total_pages) > entry.pages.len() as u64
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::feed::PageOrigin;

    #[derive(Clone)]
    struct ScriptedSource {
        total_count: u32,
        page_len: u32,
        fail: bool,
        requests: Arc<Mutex<Vec<(String, u32)>>>,
    }

    impl ScriptedSource {
        fn new(total_count: u32, page_len: u32) -> Self {
            Self {
                total_count,
                page_len,
                fail: false,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0, 0)
            }
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, filter: &FilterKey, page_index: u32) -> Page {
            self.requests
                .lock()
                .unwrap()
                .push((filter.cache_key(), page_index));

            if self.fail {
                return Page::fetch_error();
            }

            let skip = page_index * self.page_len;
            let returned = self.page_len.min(self.total_count.saturating_sub(skip));
            let matches = (0..returned)
                .map(|offset| sample_match(&format!("m{}", skip + offset)))
                .collect();

            Page {
                matches,
                total_count: self.total_count,
                origin: PageOrigin::Backend,
            }
        }
    }

    fn sample_match(id: &str) -> MatchSummary {
        MatchSummary {
            match_id: id.to_string(),
            kickoff: Utc.with_ymd_and_hms(2026, 8, 5, 16, 0, 0).unwrap(),
            home_team: "Flamengo".to_string(),
            home_score: 1,
            away_team: "Vasco".to_string(),
            away_score: 0,
            league: "BSA".to_string(),
            avg_rating: 4.0,
            ratings_num: 2,
            rating_proportions: Default::default(),
            status: "finished".to_string(),
        }
    }

    #[tokio::test]
    async fn has_next_page_follows_total_count_arithmetic() {
        let source = ScriptedSource::new(32, 15);
        let mut feed = MatchFeed::new(source.clone(), FilterKey::new("BSA"));

        assert_eq!(feed.fetch_next_page().await, FeedStatus::HasPages);
        assert!(feed.has_next_page());

        assert_eq!(feed.fetch_next_page().await, FeedStatus::HasPages);
        assert!(feed.has_next_page());

        assert_eq!(feed.fetch_next_page().await, FeedStatus::Exhausted);
        assert!(!feed.has_next_page());

        assert_eq!(feed.matches().len(), 32);
        assert_eq!(feed.total_count(), 32);
        assert_eq!(feed.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn exhausted_feed_does_not_fetch_again() {
        let source = ScriptedSource::new(10, 15);
        let mut feed = MatchFeed::new(source.clone(), FilterKey::new("BSA"));

        assert_eq!(feed.fetch_next_page().await, FeedStatus::Exhausted);
        assert_eq!(feed.fetch_next_page().await, FeedStatus::Exhausted);

        assert_eq!(source.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn filter_change_discards_accumulated_pages() {
        let source = ScriptedSource::new(32, 15);
        let mut feed = MatchFeed::new(source.clone(), FilterKey::new("BSA"));

        feed.fetch_next_page().await;
        feed.fetch_next_page().await;
        assert_eq!(feed.pages_fetched(), 2);

        feed.set_filter(FilterKey::new("PL"));
        assert_eq!(feed.status(), FeedStatus::Empty);
        assert_eq!(feed.pages_fetched(), 0);
        assert!(feed.matches().is_empty());
        assert!(feed.has_next_page());

        // The next fetch starts over at page 0 under the new key.
        feed.fetch_next_page().await;
        let requests = source.requests.lock().unwrap();
        assert_eq!(
            requests.last().unwrap(),
            &(FilterKey::new("PL").cache_key(), 0)
        );
    }

    #[tokio::test]
    async fn setting_the_same_filter_keeps_pages() {
        let source = ScriptedSource::new(32, 15);
        let mut feed = MatchFeed::new(source.clone(), FilterKey::new("BSA"));

        feed.fetch_next_page().await;
        feed.set_filter(FilterKey::new("BSA"));

        assert_eq!(feed.pages_fetched(), 1);
        assert_eq!(feed.status(), FeedStatus::HasPages);
    }

    #[tokio::test]
    async fn failed_fetch_exhausts_the_feed() {
        let source = ScriptedSource::failing();
        let mut feed = MatchFeed::new(source.clone(), FilterKey::new("BSA"));

        assert_eq!(feed.fetch_next_page().await, FeedStatus::Exhausted);
        assert!(feed.matches().is_empty());
        assert_eq!(feed.total_count(), 0);
        assert!(!feed.has_next_page());
    }
}
