//! Engine configuration: a YAML document with every field defaulted, plus a
//! few environment overrides for deployment tuning.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use worldhub_author::ConflictPolicy;
use worldhub_materialize::{HubSettings, Variant};
use worldhub_persist::RecordKeys;
use worldhub_stream::LoaderConfig;

pub const ENV_STALENESS_SECS: &str = "WORLDHUB_STALENESS_SECS";
pub const ENV_FETCH_CONCURRENCY: &str = "WORLDHUB_FETCH_CONCURRENCY";
pub const ENV_FETCH_TIMEOUT_MS: &str = "WORLDHUB_FETCH_TIMEOUT_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Keys of the persisted collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreKeys {
    pub projects: String,
    pub projects_backup: String,
    pub worlds: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        let records = RecordKeys::default();
        Self {
            projects: records.primary,
            projects_backup: records.backup,
            worlds: "worlds".into(),
        }
    }
}

impl StoreKeys {
    pub fn record_keys(&self) -> RecordKeys {
        RecordKeys {
            primary: self.projects.clone(),
            backup: self.projects_backup.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Definition slugs to load, in catalog order.
    pub catalog: Vec<String>,
    pub fetch_concurrency: usize,
    pub fetch_timeout_ms: u64,
    /// Minimum age of the last reconciliation before re-entry reconciles again.
    pub staleness_secs: u64,
    pub conflict_policy: ConflictPolicy,
    pub variant: Variant,
    pub hub: HubSettings,
    pub keys: StoreKeys,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let loader = LoaderConfig::default();
        Self {
            catalog: Vec::new(),
            fetch_concurrency: loader.concurrency,
            fetch_timeout_ms: loader.timeout.as_millis() as u64,
            staleness_secs: 30,
            conflict_policy: ConflictPolicy::default(),
            variant: Variant::default(),
            hub: HubSettings::default(),
            keys: StoreKeys::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file. Environment overrides are not applied.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply `WORLDHUB_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparsable values are ignored.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        self.staleness_secs = env_parse(&lookup, ENV_STALENESS_SECS, self.staleness_secs);
        self.fetch_concurrency = env_parse(&lookup, ENV_FETCH_CONCURRENCY, self.fetch_concurrency);
        self.fetch_timeout_ms = env_parse(&lookup, ENV_FETCH_TIMEOUT_MS, self.fetch_timeout_ms);
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid("fetch_concurrency must be at least 1".into()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_ms must be positive".into()));
        }
        if self.hub.columns == 0 {
            return Err(ConfigError::Invalid("hub.columns must be at least 1".into()));
        }
        let keys = [&self.keys.projects, &self.keys.projects_backup, &self.keys.worlds];
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(ConfigError::Invalid(format!("store key {key:?} is used twice")));
            }
        }
        Ok(())
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            concurrency: self.fetch_concurrency,
            timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
