use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use patchfox_sieve_core::{SieveError, SieveResult};

const DEFAULT_CONFIG_NAME: &str = "sieve.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub anchor_batch_size: Option<u64>,
    pub max_anchor_rows: Option<usize>,
    pub max_in_list: Option<usize>,
}

impl LimitsConfig {
    pub fn with_defaults() -> Self {
        Self {
            anchor_batch_size: Some(200),
            max_anchor_rows: Some(50_000),
            max_in_list: Some(10_000),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SieveConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
    pub limits: Option<LimitsConfig>,
}

impl SieveConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
            limits: Some(LimitsConfig::with_defaults()),
        }
    }

    pub fn postgres(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Postgres { url: url.into() },
            pool: None,
            limits: Some(LimitsConfig::with_defaults()),
        }
    }

    pub fn load_or_init(base_dir: &Path, default_sqlite_path: &Path) -> SieveResult<Self> {
        fs::create_dir_all(base_dir)
            .map_err(|err| SieveError::storage(format!("create config dir: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|err| SieveError::storage(format!("read config: {err}")))?;
            let config: SieveConfig =
                serde_json::from_str(&raw).map_err(|err| SieveError::invalid(err.to_string()))?;
            return Ok(config);
        }
        let default = SieveConfig::default_sqlite(default_sqlite_path.to_string_lossy());
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| SieveError::storage(format!("serialize config: {err}")))?;
        fs::write(&config_path, payload)
            .map_err(|err| SieveError::storage(format!("write config: {err}")))?;
        Ok(default)
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> SieveResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path.clone().unwrap_or_else(|| "sieve.sqlite".to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            DatabaseConfig::Postgres { .. } => {
                Err(SieveError::invalid("config is not sqlite backend"))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
        }
    }

    pub fn connection_url(&self) -> Option<&str> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => None,
            DatabaseConfig::Postgres { url } => Some(url.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SieveLimits {
    pub anchor_batch_size: u64,
    pub max_anchor_rows: usize,
    pub max_in_list: usize,
}

impl Default for SieveLimits {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::with_defaults())
    }
}

impl SieveLimits {
    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self {
            anchor_batch_size: limits.anchor_batch_size.unwrap_or(200).max(1),
            max_anchor_rows: limits.max_anchor_rows.unwrap_or(50_000),
            max_in_list: limits.max_in_list.unwrap_or(10_000).max(1),
        }
    }
}
