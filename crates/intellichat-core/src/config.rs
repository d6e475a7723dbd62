use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

/// Where the backend listens unless told otherwise
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Environment variable that overrides the configured server URL
pub const SERVER_URL_ENV: &str = "INTELLICHAT_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub server_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_server_url(url: &str) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path).unwrap_or_else(|_| Self::new());
        config.server_url = Some(url.to_string());
        config.save_to(&path)?;
        Ok(path)
    }

    /// Server URL by precedence: command line, environment, config file, default
    pub fn resolve_server_url(&self, cli_url: Option<&str>) -> String {
        let env_url = std::env::var(SERVER_URL_ENV).ok();
        pick_server_url(cli_url, env_url.as_deref(), self.server_url.as_deref())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("intellichat"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

fn pick_server_url(cli: Option<&str>, env: Option<&str>, file: Option<&str>) -> String {
    [cli, env, file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_SERVER_URL)
        .to_string()
}
