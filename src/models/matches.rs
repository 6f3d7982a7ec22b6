use chrono::{DateTime, Duration, Utc};

use super::response::{CountByRating, RemoteMatch};

/// One match as displayed: identity is `match_id`, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    pub match_id: String,
    pub kickoff: DateTime<Utc>,
    pub home_team: String,
    pub home_score: u32,
    pub away_team: String,
    pub away_score: u32,
    pub league: String,
    pub avg_rating: f64,
    pub ratings_num: u32,
    pub rating_proportions: RatingProportions,
    pub status: String,
}

/// Fraction of ratings at each star value 1..=5, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingProportions([f64; 5]);

impl RatingProportions {
    // The guard is on the count: a populated count map with ratings_num = 0
    // still yields all-zero proportions, never a division by zero.
    pub fn from_counts(counts: &CountByRating, ratings_num: u32) -> Self {
        if ratings_num == 0 {
            return Self::default();
        }

        let total = f64::from(ratings_num);
        Self([
            f64::from(counts.star(1)) / total,
            f64::from(counts.star(2)) / total,
            f64::from(counts.star(3)) / total,
            f64::from(counts.star(4)) / total,
            f64::from(counts.star(5)) / total,
        ])
    }

    /// Proportion for a star value 1..=5; out-of-range stars read as 0.
    pub fn of_star(&self, star: u8) -> f64 {
        match star {
            1..=5 => self.0[usize::from(star) - 1],
            _ => 0.0,
        }
    }
}

impl MatchSummary {
    pub fn from_remote(remote: RemoteMatch, kickoff_offset_hours: i64) -> Self {
        let avg_rating = match remote.avg_rating {
            Some(value) if remote.ratings_num > 0 => round_to_one_decimal(value),
            _ => 0.0,
        };

        Self {
            match_id: remote.id,
            kickoff: remote.date + Duration::hours(kickoff_offset_hours),
            home_team: remote.home_team,
            home_score: remote.home_score,
            away_team: remote.away_team,
            away_score: remote.away_score,
            league: remote.league,
            avg_rating,
            ratings_num: remote.ratings_num,
            rating_proportions: RatingProportions::from_counts(
                &remote.count_by_rating,
                remote.ratings_num,
            ),
            status: remote.status,
        }
    }

    /// Well-known placeholder served when a detail lookup fails, so callers
    /// always have a record to render.
    pub fn fallback(match_id: &str) -> Self {
        Self {
            match_id: match_id.to_string(),
            kickoff: Utc::now(),
            home_team: "Time da casa".to_string(),
            home_score: 0,
            away_team: "Time visitante".to_string(),
            away_score: 0,
            league: String::new(),
            avg_rating: 0.0,
            ratings_num: 0,
            rating_proportions: RatingProportions::default(),
            status: String::new(),
        }
    }

    /// Average rating as shown on cards: at most one decimal.
    pub fn display_rating(&self) -> String {
        format!("{:.1}", self.avg_rating)
    }
}

fn round_to_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn remote(ratings_num: u32, avg_rating: Option<f64>, counts: CountByRating) -> RemoteMatch {
        RemoteMatch {
            id: "m1".to_string(),
            date: Utc.with_ymd_and_hms(2026, 8, 6, 1, 30, 0).unwrap(),
            home_team: "Flamengo".to_string(),
            home_score: 2,
            away_team: "Vasco".to_string(),
            away_score: 1,
            ratings_num,
            avg_rating,
            league: "BSA".to_string(),
            count_by_rating: counts,
            status: "finished".to_string(),
        }
    }

    #[test]
    fn proportions_are_zero_without_ratings() {
        let counts = CountByRating {
            one: 3,
            ..CountByRating::default()
        };
        let proportions = RatingProportions::from_counts(&counts, 0);

        for star in 1..=5 {
            assert_eq!(proportions.of_star(star), 0.0);
        }
    }

    #[test]
    fn proportions_sum_to_one() {
        let counts = CountByRating {
            one: 1,
            two: 0,
            three: 2,
            four: 3,
            five: 4,
        };
        let proportions = RatingProportions::from_counts(&counts, 10);

        let sum: f64 = (1..=5).map(|star| proportions.of_star(star)).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(proportions.of_star(4), 0.3);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        let summary = MatchSummary::from_remote(remote(4, Some(4.25), CountByRating::default()), 0);

        assert_eq!(summary.avg_rating, 4.3);
        assert_eq!(summary.display_rating(), "4.3");
    }

    #[test]
    fn average_is_zero_without_ratings() {
        let summary = MatchSummary::from_remote(remote(0, Some(4.25), CountByRating::default()), 0);
        assert_eq!(summary.avg_rating, 0.0);

        let summary = MatchSummary::from_remote(remote(4, None, CountByRating::default()), 0);
        assert_eq!(summary.avg_rating, 0.0);
    }

    #[test]
    fn kickoff_is_shifted_by_deployment_offset() {
        let summary = MatchSummary::from_remote(remote(0, None, CountByRating::default()), -3);

        // 2026-08-06T01:30Z renders as the previous evening at UTC-3.
        assert_eq!(
            summary.kickoff,
            Utc.with_ymd_and_hms(2026, 8, 5, 22, 30, 0).unwrap()
        );
    }

    #[test]
    fn fallback_record_is_inert() {
        let fallback = MatchSummary::fallback("missing");

        assert_eq!(fallback.match_id, "missing");
        assert_eq!(fallback.home_score, 0);
        assert_eq!(fallback.away_score, 0);
        assert_eq!(fallback.ratings_num, 0);
        assert_eq!(fallback.display_rating(), "0.0");
    }
}
