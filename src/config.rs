use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "okr-tracker";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PROJECT_NAME: &str = "My Project";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Port the HTTP surface listens on.
    pub port: u16,
    /// Project name stored on first start when the database has none.
    pub project_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            port: DEFAULT_PORT,
            project_name: DEFAULT_PROJECT_NAME.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the user's config directory, then apply
    /// `OKR_TRACKER_DB` and `OKR_TRACKER_PROJECT` overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&config_path)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply environment overrides read through `var`.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = var("OKR_TRACKER_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(name) = var("OKR_TRACKER_PROJECT") {
            self.project_name = name;
        }
        self
    }

    /// Save the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
