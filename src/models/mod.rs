mod matches;
mod ratings;
mod response;

pub use matches::{MatchSummary, RatingProportions};
pub use ratings::RatingEntry;
pub use response::{CountByRating, MatchListResponse, RatingDraft, RemoteMatch, RemoteRating};
