use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::Error;

/// Ordering values accepted by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OrderBy {
    #[default]
    DateDesc,
    DateAsc,
    RatingsNumDesc,
    AvgRatingDesc,
    AvgRatingAsc,
}

impl OrderBy {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            OrderBy::DateDesc => "-date",
            OrderBy::DateAsc => "date",
            OrderBy::RatingsNumDesc => "-ratings_num",
            OrderBy::AvgRatingDesc => "-avg_rating",
            OrderBy::AvgRatingAsc => "avg_rating",
        }
    }

    /// Date grouping only makes sense when the list is in kickoff order.
    pub fn is_chronological(&self) -> bool {
        matches!(self, OrderBy::DateDesc | OrderBy::DateAsc)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

impl FromStr for OrderBy {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "-date" => Ok(OrderBy::DateDesc),
            "date" => Ok(OrderBy::DateAsc),
            "-ratings_num" => Ok(OrderBy::RatingsNumDesc),
            "-avg_rating" => Ok(OrderBy::AvgRatingDesc),
            "avg_rating" => Ok(OrderBy::AvgRatingAsc),
            other => Err(Error::UnknownOrdering(other.to_string())),
        }
    }
}

/// League + optional single day + ordering. Equality on the tuple is the
/// unit of cache invalidation: accumulated pages survive exactly as long as
/// the key they were fetched under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterKey {
    pub league: String,
    pub date: Option<NaiveDate>,
    pub order: OrderBy,
}

impl FilterKey {
    pub fn new(league: impl Into<String>) -> Self {
        Self {
            league: league.into(),
            date: None,
            order: OrderBy::default(),
        }
    }

    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    /// Serialized form used to key the accumulator's cache.
    pub fn cache_key(&self) -> String {
        match self.date {
            Some(date) => format!("matches:{}:{}:{}", self.league, date, self.order),
            None => format!("matches:{}:all:{}", self.league, self.order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_values_round_trip() {
        for raw in ["-date", "date", "-ratings_num", "-avg_rating", "avg_rating"] {
            let order: OrderBy = raw.parse().unwrap();
            assert_eq!(order.as_query_value(), raw);
        }

        assert!("ratings_num".parse::<OrderBy>().is_err());
    }

    #[test]
    fn only_date_orders_are_chronological() {
        assert!(OrderBy::DateDesc.is_chronological());
        assert!(OrderBy::DateAsc.is_chronological());
        assert!(!OrderBy::AvgRatingDesc.is_chronological());
        assert!(!OrderBy::RatingsNumDesc.is_chronological());
    }

    #[test]
    fn cache_key_tracks_every_component() {
        let base = FilterKey::new("BSA");
        let dated = base
            .clone()
            .with_date(NaiveDate::from_ymd_opt(2026, 8, 6));
        let reordered = base.clone().with_order(OrderBy::AvgRatingDesc);

        assert_eq!(base.cache_key(), "matches:BSA:all:-date");
        assert_eq!(dated.cache_key(), "matches:BSA:2026-08-06:-date");
        assert_ne!(base.cache_key(), reordered.cache_key());
        assert_ne!(base.cache_key(), FilterKey::new("PL").cache_key());
    }
}
