use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::api::DEFAULT_ENDPOINT;
use crate::error::{HarvestError, Result};
use crate::schedule::PauseLimits;

pub const DEFAULT_COLUMN: &str = "検証対象URL";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Run settings. Every field has a default; a TOML file and `TWEET_HARVEST_*`
/// environment variables can override them.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HarvestConfig {
    pub endpoint: String,
    pub batch_size: usize,
    pub constrained_pause_secs: u64,
    pub elevated_pause_secs: u64,
    pub elevated_threshold: usize,
    pub media_timeout_secs: u64,
    pub user_agent: String,
    pub column: String,
    pub output_dir: PathBuf,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: 100,
            constrained_pause_secs: 900,
            elevated_pause_secs: 60,
            elevated_threshold: 15,
            media_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            column: DEFAULT_COLUMN.to_string(),
            output_dir: PathBuf::from("data"),
        }
    }
}

impl HarvestConfig {
    /// Defaults, then the optional TOML file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| HarvestError::File { path: path.to_path_buf(), source })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| HarvestError::Config(e.to_string()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("TWEET_HARVEST_ENDPOINT").filter(|s| !s.trim().is_empty()) {
            self.endpoint = v;
        }
        if let Some(v) = lookup("TWEET_HARVEST_BATCH_SIZE").and_then(|s| s.parse().ok()) {
            self.batch_size = v;
        }
        if let Some(v) = lookup("TWEET_HARVEST_MEDIA_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.media_timeout_secs = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(HarvestError::Config("batch_size must be greater than 0".into()));
        }
        if self.column.is_empty() {
            return Err(HarvestError::Config("column must not be empty".into()));
        }
        Ok(())
    }

    pub fn pause_limits(&self) -> PauseLimits {
        PauseLimits {
            constrained: Duration::from_secs(self.constrained_pause_secs),
            elevated: Duration::from_secs(self.elevated_pause_secs),
            elevated_threshold: self.elevated_threshold,
        }
    }

    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = HarvestConfig::from_toml("batch_size = 50\noutput_dir = \"out\"\n").unwrap();
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.column, DEFAULT_COLUMN);
        assert_eq!(cfg.pause_limits(), PauseLimits::default());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = HarvestConfig::from_toml("batch_size = 50").unwrap();
        cfg.apply_env(|k| match k {
            "TWEET_HARVEST_BATCH_SIZE" => Some("10".into()),
            "TWEET_HARVEST_MEDIA_TIMEOUT_SECS" => Some("not a number".into()),
            _ => None,
        });
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.media_timeout_secs, 30);
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let cfg = HarvestConfig { batch_size: 0, ..HarvestConfig::default() };
        assert!(matches!(cfg.validate(), Err(HarvestError::Config(_))));
    }

    #[test]
    fn unknown_types_are_config_errors() {
        assert!(matches!(HarvestConfig::from_toml("batch_size = \"lots\""), Err(HarvestError::Config(_))));
    }

    #[test]
    fn missing_config_file_is_file_error() {
        let err = HarvestConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, HarvestError::File { .. }));
    }
}
