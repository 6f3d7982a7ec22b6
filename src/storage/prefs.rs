use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;
use crate::feed::OrderBy;

pub const SELECTED_LEAGUE_KEY: &str = "sportboxd:selected_league";
pub const SELECTED_DATE_KEY: &str = "sportboxd:selected_date";
pub const SELECTED_ORDER_KEY: &str = "sportboxd:selected_order";

/// Last-selected filters, read once on startup and written through on every
/// change. Stored values that no longer parse are ignored.
pub struct PreferenceStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl PreferenceStore {
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let values = match fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "Discarding unreadable preference file"
                );
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        debug!(path = %path.display(), entries = values.len(), "Preferences loaded");

        Self { path, values }
    }

    pub fn selected_league(&self) -> Option<&str> {
        self.values.get(SELECTED_LEAGUE_KEY).map(String::as_str)
    }

    pub async fn set_selected_league(&mut self, code: &str) -> Result<()> {
        self.values
            .insert(SELECTED_LEAGUE_KEY.to_string(), code.to_string());
        self.persist().await
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.values
            .get(SELECTED_DATE_KEY)
            .and_then(|raw| raw.parse().ok())
    }

    /// `None` clears the stored day, mirroring a cleared date picker.
    pub async fn set_selected_date(&mut self, date: Option<NaiveDate>) -> Result<()> {
        match date {
            Some(date) => {
                self.values
                    .insert(SELECTED_DATE_KEY.to_string(), date.to_string());
            }
            None => {
                self.values.remove(SELECTED_DATE_KEY);
            }
        }
        self.persist().await
    }

    pub fn selected_order(&self) -> Option<OrderBy> {
        self.values
            .get(SELECTED_ORDER_KEY)
            .and_then(|raw| raw.parse().ok())
    }

    pub async fn set_selected_order(&mut self, order: OrderBy) -> Result<()> {
        self.values
            .insert(SELECTED_ORDER_KEY.to_string(), order.to_string());
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let json = serde_json::to_vec_pretty(&self.values)?;
        fs::write(&self.path, json).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn selections_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let mut store = PreferenceStore::load(&path).await;
        assert_eq!(store.selected_league(), None);

        store.set_selected_league("PL").await.unwrap();
        store
            .set_selected_date(NaiveDate::from_ymd_opt(2026, 8, 6))
            .await
            .unwrap();
        store
            .set_selected_order(OrderBy::AvgRatingDesc)
            .await
            .unwrap();

        let reloaded = PreferenceStore::load(&path).await;
        assert_eq!(reloaded.selected_league(), Some("PL"));
        assert_eq!(
            reloaded.selected_date(),
            NaiveDate::from_ymd_opt(2026, 8, 6)
        );
        assert_eq!(reloaded.selected_order(), Some(OrderBy::AvgRatingDesc));
    }

    #[tokio::test]
    async fn clearing_the_date_removes_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let mut store = PreferenceStore::load(&path).await;
        store
            .set_selected_date(NaiveDate::from_ymd_opt(2026, 8, 6))
            .await
            .unwrap();
        store.set_selected_date(None).await.unwrap();

        let reloaded = PreferenceStore::load(&path).await;
        assert_eq!(reloaded.selected_date(), None);
    }

    #[tokio::test]
    async fn unparseable_values_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        fs::write(
            &path,
            format!(
                r#"{{"{SELECTED_DATE_KEY}": "not-a-date", "{SELECTED_ORDER_KEY}": "sideways"}}"#
            ),
        )
        .await
        .unwrap();

        let store = PreferenceStore::load(&path).await;
        assert_eq!(store.selected_date(), None);
        assert_eq!(store.selected_order(), None);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        fs::write(&path, "not json").await.unwrap();

        let store = PreferenceStore::load(&path).await;
        assert_eq!(store.selected_league(), None);
    }
}
