//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Boardsync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    /// SQLite file; `None` uses the platform data directory
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Base URL of the search cluster
    pub url: String,
    pub job_index: String,
    pub default_page_size: u32,
    pub max_to: u32,
    /// Optional HTTP timeout. Unset means the caller owns the timeout policy.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub batch_size: u32,
    /// Failed events at or above this retry count are never requeued
    pub max_retries: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            job_index: "boardsync-job".to_string(),
            default_page_size: 30,
            max_to: 1000,
            timeout_secs: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            batch_size: 100,
            max_retries: 5,
        }
    }
}

impl SearchConfig {
    /// Search URL with the `BOARDSYNC_SEARCH_URL` override applied
    pub fn resolved_url(&self) -> String {
        env::var("BOARDSYNC_SEARCH_URL").unwrap_or_else(|_| self.url.clone())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("BOARDSYNC_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("boardsync")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or return defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.search.default_page_size == 0 {
            return Err(anyhow!("search.default_page_size must be at least 1"));
        }
        if self.search.max_to < 2 {
            return Err(anyhow!("search.max_to must be at least 2"));
        }
        if self.sync.batch_size == 0 {
            return Err(anyhow!("sync.batch_size must be at least 1"));
        }
        if self.sync.interval_secs == 0 {
            return Err(anyhow!("sync.interval_secs must be at least 1"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(self
                .database
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".to_string())),
            "database.max_connections" => Ok(self.database.max_connections.to_string()),

            "search.url" => Ok(self.search.url.clone()),
            "search.job_index" => Ok(self.search.job_index.clone()),
            "search.default_page_size" => Ok(self.search.default_page_size.to_string()),
            "search.max_to" => Ok(self.search.max_to.to_string()),
            "search.timeout_secs" => Ok(self
                .search
                .timeout_secs
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(none)".to_string())),

            "sync.interval_secs" => Ok(self.sync.interval_secs.to_string()),
            "sync.batch_size" => Ok(self.sync.batch_size.to_string()),
            "sync.max_retries" => Ok(self.sync.max_retries.to_string()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `boardsync config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                self.database.path = Some(PathBuf::from(value));
            }
            "database.max_connections" => {
                self.database.max_connections = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
            }

            "search.url" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(anyhow!("search.url must start with http:// or https://"));
                }
                self.search.url = value.trim_end_matches('/').to_string();
            }
            "search.job_index" => {
                if value.is_empty() {
                    return Err(anyhow!("search.job_index cannot be empty"));
                }
                self.search.job_index = value.to_string();
            }
            "search.default_page_size" => {
                self.search.default_page_size = value
                    .parse()
                    .with_context(|| format!("Invalid default_page_size value: {}", value))?;
            }
            "search.max_to" => {
                self.search.max_to = value
                    .parse()
                    .with_context(|| format!("Invalid max_to value: {}", value))?;
            }
            "search.timeout_secs" => {
                self.search.timeout_secs = if value.is_empty() || value == "none" {
                    None
                } else {
                    Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid timeout_secs value: {}", value))?,
                    )
                };
            }

            "sync.interval_secs" => {
                self.sync.interval_secs = value
                    .parse()
                    .with_context(|| format!("Invalid interval_secs value: {}", value))?;
            }
            "sync.batch_size" => {
                self.sync.batch_size = value
                    .parse()
                    .with_context(|| format!("Invalid batch_size value: {}", value))?;
            }
            "sync.max_retries" => {
                self.sync.max_retries = value
                    .parse()
                    .with_context(|| format!("Invalid max_retries value: {}", value))?;
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `boardsync config list` to see available keys.",
                    key
                ));
            }
        }
        self.validate()
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "database.path",
            "database.max_connections",
            "search.url",
            "search.job_index",
            "search.default_page_size",
            "search.max_to",
            "search.timeout_secs",
            "sync.interval_secs",
            "sync.batch_size",
            "sync.max_retries",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.default_page_size, 30);
        assert_eq!(config.search.max_to, 1000);
        assert_eq!(config.sync.batch_size, 100);
        assert_eq!(config.sync.interval_secs, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut config = Config::default();
        config.set("sync.batch_size", "25").unwrap();
        assert_eq!(config.get("sync.batch_size").unwrap(), "25");

        config.set("search.url", "https://search.internal:9200/").unwrap();
        assert_eq!(config.search.url, "https://search.internal:9200");

        config.set("search.timeout_secs", "10").unwrap();
        assert_eq!(config.search.timeout_secs, Some(10));
        config.set("search.timeout_secs", "none").unwrap();
        assert_eq!(config.search.timeout_secs, None);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("sync.batch_size", "0").is_err());
        assert!(config.set("sync.batch_size", "lots").is_err());
        assert!(config.set("search.url", "localhost:9200").is_err());
        assert!(config.set("no.such.key", "1").is_err());
    }

    #[test]
    fn test_list_covers_every_key() {
        let config = Config::default();
        let entries = config.list().unwrap();
        assert_eq!(entries.len(), 10);
        assert!(entries.iter().any(|(k, _)| k == "search.job_index"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("search.job_index", "jobs-test").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync]\ninterval_secs = 10\nbatch_size = 5\nmax_retries = 1\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.sync.interval_secs, 10);
        assert_eq!(loaded.search, SearchConfig::default());
    }

    #[test]
    fn test_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }
}
