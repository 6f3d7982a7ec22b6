use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::clients::HttpClient;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::feed::{FilterKey, Page, PageOrigin, PageSource};
use crate::models::{
    MatchListResponse, MatchSummary, RatingDraft, RatingEntry, RemoteMatch, RemoteRating,
};

pub const PAGE_SIZE: u32 = 15;

#[derive(Clone)]
pub struct ApiService {
    client: Arc<HttpClient>,
    base_url: String,
    kickoff_offset_hours: i64,
}

impl ApiService {
    pub fn new(client: Arc<HttpClient>, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.api.base_url.trim_end_matches('/').to_string(),
            kickoff_offset_hours: settings.display.kickoff_offset_hours,
        }
    }

    /// One page of the match listing. Transport, decode, and not-found
    /// failures all collapse into an empty page with total 0 so the listing
    /// never surfaces an error state; `Page::origin` records that it
    /// happened.
    pub async fn fetch_matches_page(&self, filter: &FilterKey, page_index: u32) -> Page {
        match self.try_fetch_matches_page(filter, page_index).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    error = %e,
                    league = %filter.league,
                    page_index,
                    "Match page fetch failed, serving empty page"
                );
                Page::fetch_error()
            }
        }
    }

    async fn try_fetch_matches_page(&self, filter: &FilterKey, page_index: u32) -> Result<Page> {
        let url = self.matches_url(filter, page_index);

        let request = self.client.get(&url);
        let response = self.client.send(request).await?;
        let body = response.bytes().await?;

        let list: MatchListResponse = serde_json::from_slice(&body).map_err(|e| {
            let body_str = String::from_utf8_lossy(&body);
            error!(
                error = %e,
                body = %body_str,
                "Failed to parse match page response"
            );
            Error::from(e)
        })?;

        debug!(
            total_count = list.total_count,
            returned = list.matches.len(),
            page_index,
            "Match page received"
        );

        Ok(Page {
            matches: list
                .matches
                .into_iter()
                .map(|remote| MatchSummary::from_remote(remote, self.kickoff_offset_hours))
                .collect(),
            total_count: list.total_count,
            origin: PageOrigin::Backend,
        })
    }

    fn matches_url(&self, filter: &FilterKey, page_index: u32) -> String {
        let mut url = format!(
            "{}/matches?league={}&skip={}&limit={}&order_by={}",
            self.base_url,
            filter.league,
            page_index * PAGE_SIZE,
            PAGE_SIZE,
            filter.order.as_query_value()
        );

        // A single-day filter sends the day as a closed interval.
        if let Some(date) = filter.date {
            url.push_str(&format!(
                "&since={date}T00:00:00Z&until={date}T23:59:59Z"
            ));
        }

        url
    }

    /// Detail lookup. Any failure yields the fallback record instead of an
    /// error so the detail view always has something to render.
    pub async fn fetch_match(&self, match_id: &str) -> MatchSummary {
        match self.try_fetch_match(match_id).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    error = %e,
                    match_id,
                    "Match detail fetch failed, serving fallback record"
                );
                MatchSummary::fallback(match_id)
            }
        }
    }

    async fn try_fetch_match(&self, match_id: &str) -> Result<MatchSummary> {
        let url = format!("{}/matches/{}", self.base_url, match_id);

        let request = self.client.get(&url);
        let response = self.client.send(request).await?;
        let body = response.bytes().await?;

        let remote: RemoteMatch = serde_json::from_slice(&body).map_err(|e| {
            let body_str = String::from_utf8_lossy(&body);
            error!(
                error = %e,
                body = %body_str,
                "Failed to parse match detail response"
            );
            Error::from(e)
        })?;

        Ok(MatchSummary::from_remote(remote, self.kickoff_offset_hours))
    }

    /// Ratings for a match, newest window first; `first_rating_id` pages
    /// the window back. Failures read as no ratings.
    pub async fn fetch_ratings(
        &self,
        match_id: &str,
        first_rating_id: Option<&str>,
    ) -> Vec<RatingEntry> {
        match self.try_fetch_ratings(match_id, first_rating_id).await {
            Ok(ratings) => ratings,
            Err(e) => {
                warn!(
                    error = %e,
                    match_id,
                    "Ratings fetch failed, serving empty list"
                );
                Vec::new()
            }
        }
    }

    async fn try_fetch_ratings(
        &self,
        match_id: &str,
        first_rating_id: Option<&str>,
    ) -> Result<Vec<RatingEntry>> {
        let mut url = format!("{}/ratings/{}", self.base_url, match_id);
        if let Some(first_rating_id) = first_rating_id {
            url.push_str(&format!("?first_rating_id={first_rating_id}"));
        }

        let request = self.client.get(&url);
        let response = self.client.send(request).await?;
        let body = response.bytes().await?;

        let ratings: Vec<RemoteRating> = serde_json::from_slice(&body).map_err(|e| {
            let body_str = String::from_utf8_lossy(&body);
            error!(
                error = %e,
                body = %body_str,
                "Failed to parse ratings response"
            );
            Error::from(e)
        })?;

        Ok(ratings.into_iter().map(RatingEntry::from_remote).collect())
    }

    /// The one operation that propagates failure: the caller owns user
    /// notification for a rejected submission.
    pub async fn post_rating(&self, draft: &RatingDraft) -> Result<()> {
        let url = format!("{}/ratings", self.base_url);

        let request = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(serde_json::to_vec(draft)?);
        let response = self.client.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Submission(status.as_u16()));
        }

        debug!(
            match_id = %draft.match_id,
            rating = draft.rating,
            "Rating submitted"
        );

        Ok(())
    }
}

#[async_trait]
impl PageSource for ApiService {
    async fn fetch_page(&self, filter: &FilterKey, page_index: u32) -> Page {
        self.fetch_matches_page(filter, page_index).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::{ApiConfig, DisplayConfig, LeagueConfig, StorageConfig};
    use crate::feed::OrderBy;

    fn service(base_url: &str) -> ApiService {
        let settings = Settings {
            leagues: vec![LeagueConfig {
                code: "BSA".to_string(),
                label: "Brasileirão - Série A".to_string(),
            }],
            api: ApiConfig {
                base_url: base_url.to_string(),
                headers: Default::default(),
            },
            display: DisplayConfig {
                kickoff_offset_hours: -3,
            },
            storage: StorageConfig {
                preferences_path: "data/preferences.json".to_string(),
            },
        };
        let client = Arc::new(HttpClient::new(&settings.api).unwrap());
        ApiService::new(client, &settings)
    }

    #[test]
    fn matches_url_carries_paging_and_ordering() {
        let api = service("https://api.sportboxd.com/");
        let filter = FilterKey::new("BSA").with_order(OrderBy::AvgRatingDesc);

        assert_eq!(
            api.matches_url(&filter, 1),
            "https://api.sportboxd.com/matches?league=BSA&skip=15&limit=15&order_by=-avg_rating"
        );
    }

    #[test]
    fn matches_url_sends_single_day_as_closed_interval() {
        let api = service("https://api.sportboxd.com");
        let filter = FilterKey::new("PL").with_date(NaiveDate::from_ymd_opt(2026, 8, 6));

        let url = api.matches_url(&filter, 0);
        assert!(url.contains("league=PL&skip=0&limit=15&order_by=-date"));
        assert!(url.contains("since=2026-08-06T00:00:00Z"));
        assert!(url.contains("until=2026-08-06T23:59:59Z"));
    }

    #[tokio::test]
    async fn transport_failure_collapses_to_empty_page() {
        // Nothing listens on the discard port; the fetch must degrade, not
        // error.
        let api = service("http://127.0.0.1:9");
        let page = api.fetch_matches_page(&FilterKey::new("BSA"), 0).await;

        assert!(page.matches.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.origin, PageOrigin::FetchError);
    }

    #[tokio::test]
    async fn detail_failure_serves_fallback_record() {
        let api = service("http://127.0.0.1:9");
        let summary = api.fetch_match("abc123").await;

        assert_eq!(summary.match_id, "abc123");
        assert_eq!(summary.ratings_num, 0);
    }
}
