use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct MatchListResponse {
    pub matches: Vec<RemoteMatch>,
    pub total_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMatch {
    #[serde(rename = "_id")]
    pub id: String,
    pub date: DateTime<Utc>,
    pub home_team: String,
    pub home_score: u32,
    pub away_team: String,
    pub away_score: u32,
    pub ratings_num: u32,
    #[serde(default)]
    pub avg_rating: Option<f64>,
    pub league: String,
    #[serde(default)]
    pub count_by_rating: CountByRating,
    #[serde(default)]
    pub status: String,
}

// Star keys default to 0 so a sparse or missing map never fails decoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountByRating {
    #[serde(rename = "1", default)]
    pub one: u32,
    #[serde(rename = "2", default)]
    pub two: u32,
    #[serde(rename = "3", default)]
    pub three: u32,
    #[serde(rename = "4", default)]
    pub four: u32,
    #[serde(rename = "5", default)]
    pub five: u32,
}

impl CountByRating {
    pub fn star(&self, star: u8) -> u32 {
        match star {
            1 => self.one,
            2 => self.two,
            3 => self.three,
            4 => self.four,
            5 => self.five,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRating {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub match_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub content: String,
    pub rating: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingDraft {
    pub title: String,
    pub rating: u8,
    pub comment: String,
    pub match_id: String,
    pub author: String,
}
