use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Blob store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory backing the dataset bucket.
    pub bucket: PathBuf,
}

/// Identifiers of the downstream warehouse objects the COPY statement names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    pub stage: String,
    pub file_format: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            database: "cities_weather_database".to_string(),
            schema: "cities_weather_schema".to_string(),
            warehouse: "cities_weather_warehouse".to_string(),
            stage: "cities_weather_stage_area".to_string(),
            file_format: "csv_format".to_string(),
        }
    }
}

/// Operator notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "#all-dummy-weather-team".to_string()
}

/// Whole-pipeline retry policy for one city run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub retries: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { retries: 1, delay_secs: 3 }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Top-level configuration, constructed once at process start and passed by
/// parameter into each component.
///
/// Example TOML:
/// ```toml
/// cities = ["Portland", "Seattle", "London", "Mumbai", "Beijing"]
/// api_key = "..."
///
/// [store]
/// bucket = "/var/lib/cities-weather/bucket"
///
/// [slack]
/// webhook_url = "https://hooks.slack.com/services/..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cities to process, in run order.
    pub cities: Vec<String>,

    /// OpenWeather API key.
    pub api_key: String,

    pub store: StoreConfig,

    #[serde(default)]
    pub warehouse: WarehouseConfig,

    pub slack: SlackConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Reject configurations a pipeline run cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.cities.is_empty() {
            bail!("Configuration has no cities to process.");
        }
        if self.api_key.trim().is_empty() {
            bail!(
                "No OpenWeather API key configured.\n\
                 Hint: run `cities-weather configure` first."
            );
        }
        if self.slack.webhook_url.trim().is_empty() {
            bail!(
                "No Slack webhook URL configured.\n\
                 Hint: run `cities-weather configure` first."
            );
        }
        Ok(())
    }

    /// Load config from the platform config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!(
                "No configuration found at {}.\n\
                 Hint: run `cities-weather configure` first.",
                path.display()
            ));
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config path, creating parent directories
    /// as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "cities-weather", "cities-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        cities = ["Seattle", "London"]
        api_key = "KEY"

        [store]
        bucket = "/tmp/bucket"

        [slack]
        webhook_url = "https://hooks.slack.com/services/T/B/X"
    "#;

    #[test]
    fn minimal_config_fills_in_defaults() {
        let cfg: Config = toml::from_str(MINIMAL).expect("parse");

        assert_eq!(cfg.cities, vec!["Seattle", "London"]);
        assert_eq!(cfg.retry.retries, 1);
        assert_eq!(cfg.retry.delay(), Duration::from_secs(3));
        assert_eq!(cfg.http_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.warehouse.database, "cities_weather_database");
        assert_eq!(cfg.warehouse.file_format, "csv_format");
        assert_eq!(cfg.slack.channel, "#all-dummy-weather-team");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_an_empty_city_list() {
        let mut cfg: Config = toml::from_str(MINIMAL).expect("parse");
        cfg.cities.clear();

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("no cities"));
    }

    #[test]
    fn validate_rejects_a_blank_api_key() {
        let mut cfg: Config = toml::from_str(MINIMAL).expect("parse");
        cfg.api_key = "  ".to_string();

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("No OpenWeather API key configured"));
    }

    #[test]
    fn config_survives_a_toml_round_trip() {
        let cfg: Config = toml::from_str(MINIMAL).expect("parse");
        let rendered = toml::to_string_pretty(&cfg).expect("render");
        let reparsed: Config = toml::from_str(&rendered).expect("reparse");

        assert_eq!(reparsed.cities, cfg.cities);
        assert_eq!(reparsed.retry.retries, cfg.retry.retries);
        assert_eq!(reparsed.warehouse.stage, cfg.warehouse.stage);
    }
}
