use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BrewpadError;
use crate::store::default_recipes_dir;

pub const DEFAULT_CONFIG_FILE: &str = "brewpad.json";
pub const DEFAULT_SERVER_BASE_URL: &str = "https://bprs.mirreravencd.com/recipes/";
pub const DEFAULT_HEALTH_URL: &str = "https://bprs.mirreravencd.com";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server_base_url: Option<String>,
    #[serde(default)]
    pub health_url: Option<String>,
    #[serde(default)]
    pub recipes_dir: Option<String>,
    #[serde(default)]
    pub use_metric_units: Option<bool>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub min_splash_secs: Option<u64>,
    #[serde(default)]
    pub birthday_splash_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Settings handed explicitly to the engine.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server_base_url: String,
    pub health_url: String,
    pub recipes_dir: Utf8PathBuf,
    pub use_metric_units: bool,
    pub username: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub min_splash: Duration,
    pub birthday_splash: Duration,
    pub request_timeout: Duration,
}

impl ResolvedConfig {
    /// Recipe text is shown in imperial units unless the user opted into
    /// metric.
    pub fn to_imperial(&self) -> bool {
        !self.use_metric_units
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `brewpad.json` in the working directory. Only an
    /// explicitly named file is required to exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BrewpadError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BrewpadError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BrewpadError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BrewpadError> {
        let recipes_dir = match config.recipes_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_recipes_dir()?,
        };

        let birthday = config
            .birthday
            .as_deref()
            .map(|value| {
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .map_err(|_| BrewpadError::InvalidBirthday(value.to_string()))
            })
            .transpose()?;

        let username = config
            .username
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Ok(ResolvedConfig {
            server_base_url: config
                .server_base_url
                .unwrap_or_else(|| DEFAULT_SERVER_BASE_URL.to_string()),
            health_url: config
                .health_url
                .unwrap_or_else(|| DEFAULT_HEALTH_URL.to_string()),
            recipes_dir,
            use_metric_units: config.use_metric_units.unwrap_or(false),
            username,
            birthday,
            min_splash: Duration::from_secs(config.min_splash_secs.unwrap_or(2)),
            birthday_splash: Duration::from_secs(config.birthday_splash_secs.unwrap_or(3)),
            request_timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(30)),
        })
    }
}
