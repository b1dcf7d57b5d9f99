//! Runner configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! `rechain.toml` in the working directory, and `RECHAIN_`-prefixed
//! environment variables where `__` separates nested keys, e.g.
//! `RECHAIN_RATE_LIMIT__ENABLED=false`.

use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{Backend, MySql, Postgres, Sqlite};
use crate::throttle::{Permissive, RateLimiter, RealCount, DEFAULT_MAX_TRACKED_KEYS};

pub const CONFIG_FILE: &str = "rechain.toml";
pub const ENV_PREFIX: &str = "RECHAIN_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Postgres,
    Mysql,
}

impl BackendKind {
    pub fn backend(&self) -> &'static dyn Backend {
        match self {
            BackendKind::Sqlite => &Sqlite,
            BackendKind::Postgres => &Postgres,
            BackendKind::Mysql => &MySql,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
    /// Idle client keys are evicted once more than this many are tracked.
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60,
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// The limiter these settings describe. Disabled limiting yields
    /// [`Permissive`].
    pub fn limiter(&self) -> Result<Box<dyn RateLimiter>, ConfigError> {
        if !self.enabled {
            return Ok(Box::new(Permissive));
        }
        let limiter = RealCount::new(self.max_requests, self.window())?
            .with_key_limit(self.max_tracked_keys);
        Ok(Box::new(limiter))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    pub backend: BackendKind,
    /// Table holding the applied revision.
    pub version_table: String,
    pub rate_limit: RateLimitConfig,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            version_table: "schema_revision".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl MigratorConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(MigratorConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let table_ok = !self.version_table.is_empty()
            && self
                .version_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !table_ok {
            return Err(ConfigError::Invalid(format!(
                "version_table {:?} is not a plain identifier",
                self.version_table
            )));
        }

        let limit = &self.rate_limit;
        if limit.enabled && (limit.max_requests == 0 || limit.window_secs == 0) {
            return Err(ConfigError::Invalid(
                "rate_limit needs positive max_requests and window_secs".to_string(),
            ));
        }

        Ok(())
    }
}
