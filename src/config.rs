use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::Cid;
use crate::error::KiraError;
use crate::pubchem::DEFAULT_BASE_URL;

pub const DEFAULT_CONFIG_FILE: &str = "kira-pc.json";
pub const DEFAULT_BATCH_SIZE: u64 = 10_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub batch_size: Option<u64>,
    #[serde(default)]
    pub start_cid: Option<u64>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub batch_size: Option<u64>,
    pub start_cid: Option<Cid>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub batch_size: u64,
    /// When set, used instead of the progress marker.
    pub start_cid: Option<Cid>,
    pub output_dir: Utf8PathBuf,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `kira-pc.json` from the current directory when no
    /// path is given. Only an explicit path has to exist.
    pub fn resolve(path: Option<&str>, overrides: Overrides) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(KiraError::MissingConfig(config_path));
            }
            return Self::resolve_config(Config::default(), overrides);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: Overrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let batch_size = overrides
            .batch_size
            .or(config.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(KiraError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let start_cid = match overrides.start_cid {
            Some(cid) => Some(cid),
            None => config.start_cid.map(Cid::new).transpose()?,
        };

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(KiraError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        let output_dir = overrides
            .output_dir
            .or(config.output_dir)
            .unwrap_or_else(|| ".".to_string());

        Ok(ResolvedConfig {
            schema_version,
            batch_size,
            start_cid,
            output_dir: Utf8PathBuf::from(output_dir),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_config() {
        let resolved = ConfigLoader::resolve_config(Config::default(), Overrides::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(resolved.start_cid, None);
        assert_eq!(resolved.output_dir, Utf8PathBuf::from("."));
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.timeout, Duration::from_secs(30));
    }
}
