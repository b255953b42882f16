//! Connection settings.
//!
//! Resolution order (lowest to highest priority):
//! 1. the `database:` section of a YAML file
//! 2. `.env` file (loaded into process environment)
//! 3. `DATABASE_*` environment variables

use serde::Deserialize;
use slate_data::SqlProfile;
use sqlx::any::AnyPoolOptions;
use std::path::Path;
use std::time::Duration;

/// Errors raised while assembling a [`DatabaseConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key has no value after every source was applied.
    NotFound(String),
    /// An I/O or YAML parsing error occurred while loading the file.
    Load(String),
    /// A value is present but unusable.
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid config value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Pool and dialect settings for one database.
///
/// ```yaml
/// database:
///   url: postgres://app@localhost/app
///   max-connections: 20
///   driver: postgres   # optional, otherwise taken from the url scheme
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Backend name used for dialect detection; overrides the url scheme.
    pub driver: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            driver: None,
        }
    }
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    database: Option<DatabaseConfig>,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse the `database:` section of a YAML document (no env overlay).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` if it exists, then `.env`, then `DATABASE_*` variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
            Self::parse(&content)?
        } else {
            tracing::debug!(path = %path.display(), "no database config file, using environment");
            Self::default()
        };

        // Does NOT overwrite existing env vars
        let _ = dotenvy::dotenv();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_MIN_CONNECTIONS`, `DATABASE_ACQUIRE_TIMEOUT_SECS` and
    /// `DATABASE_DRIVER` when set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.url = url;
        }
        if let Some(n) = env_number("DATABASE_MAX_CONNECTIONS")? {
            self.max_connections = n;
        }
        if let Some(n) = env_number("DATABASE_MIN_CONNECTIONS")? {
            self.min_connections = n;
        }
        if let Some(n) = env_number("DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            self.acquire_timeout_secs = n;
        }
        if let Ok(driver) = std::env::var("DATABASE_DRIVER") {
            self.driver = Some(driver);
        }
        Ok(())
    }

    /// Dialects to render for: `driver` when set, the url scheme otherwise.
    pub fn profile(&self) -> SqlProfile {
        match &self.driver {
            Some(driver) => SqlProfile::detect(driver),
            None => SqlProfile::from_url(&self.url),
        }
    }

    pub fn pool_options(&self) -> AnyPoolOptions {
        AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }

    fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let doc: Document =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load(e.to_string()))?;
        Ok(doc.database.unwrap_or_default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::NotFound("database.url".into()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "database.max-connections".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                key: "database.min-connections".into(),
                message: format!("exceeds max-connections ({})", self.max_connections),
            });
        }
        Ok(())
    }
}

fn env_number<N: std::str::FromStr>(key: &str) -> Result<Option<N>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                message: format!("expected a number, got '{raw}'"),
            }),
        Err(_) => Ok(None),
    }
}
