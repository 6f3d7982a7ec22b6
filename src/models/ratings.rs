use chrono::{DateTime, Utc};

use super::response::RemoteRating;

#[derive(Debug, Clone, PartialEq)]
pub struct RatingEntry {
    pub rating_id: String,
    pub match_id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub author: String,
    pub comment: String,
    pub rating: u8,
}

impl RatingEntry {
    pub fn from_remote(remote: RemoteRating) -> Self {
        Self {
            rating_id: remote.id,
            match_id: remote.match_id,
            created_at: remote.created_at,
            title: remote.title,
            author: remote.author,
            comment: remote.content,
            rating: remote.rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn maps_remote_fields() {
        let remote = RemoteRating {
            id: "r1".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap(),
            match_id: "m1".to_string(),
            title: "Épico".to_string(),
            author: "senaarth".to_string(),
            content: "Que jogo.".to_string(),
            rating: 5,
        };

        let entry = RatingEntry::from_remote(remote);
        assert_eq!(entry.rating_id, "r1");
        assert_eq!(entry.match_id, "m1");
        assert_eq!(entry.comment, "Que jogo.");
        assert_eq!(entry.rating, 5);
    }
}
