pub mod api;

pub use api::{ApiService, PAGE_SIZE};
