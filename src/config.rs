use config::{Config, ConfigError};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub leagues: Vec<LeagueConfig>,
    pub api: ApiConfig,
    pub display: DisplayConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LeagueConfig {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Hours added to backend kickoff timestamps before display. The backend
    /// reports UTC; the production hosting region renders at UTC-3.
    #[serde(default = "default_kickoff_offset")]
    pub kickoff_offset_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
}

fn default_kickoff_offset() -> i64 {
    -3
}

fn default_preferences_path() -> String {
    "data/preferences.json".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("APP"));

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            base_url = %settings.api.base_url,
            leagues = settings.leagues.len(),
            kickoff_offset_hours = settings.display.kickoff_offset_hours,
            "Loaded settings"
        );

        Ok(settings)
    }
}
