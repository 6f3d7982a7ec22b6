pub mod clients;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use clients::HttpClient;
pub use error::{Error, Result};
pub use feed::{
    DateGroup, FeedStatus, FilterKey, MatchFeed, OrderBy, Page, PageOrigin, PageSource,
    group_by_date_label,
};
pub use models::{MatchSummary, RatingDraft, RatingEntry};
pub use services::{ApiService, PAGE_SIZE};
pub use storage::PreferenceStore;
pub use utils::format_date_label;
