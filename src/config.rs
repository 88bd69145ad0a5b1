//! Service configuration
//!
//! Loaded from a JSON file, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `OPTICA_DATA_SERVICE_URL` | `data_service.url` |
//! | `OPTICA_DATA_SERVICE_KEY` | `data_service.api_key` |
//! | `OPTICA_PORT` | `http.port` |
//!
//! A missing file is not an error as long as the environment supplies the
//! data service settings.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;
use crate::observability::Severity;

pub const ENV_DATA_SERVICE_URL: &str = "OPTICA_DATA_SERVICE_URL";
pub const ENV_DATA_SERVICE_KEY: &str = "OPTICA_DATA_SERVICE_KEY";
pub const ENV_PORT: &str = "OPTICA_PORT";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings of the hosted database
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataServiceConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: String,

    /// Service API key, sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for DataServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataServiceConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalDetailsConfig {
    /// Read-modify-write attempts before reporting a conflict
    #[serde(default = "default_max_append_attempts")]
    pub max_append_attempts: u32,

    /// Column of `additional_details` rewritten on every append and compared
    /// by the conditional update
    #[serde(default = "default_version_column")]
    pub version_column: String,
}

fn default_max_append_attempts() -> u32 {
    3
}

fn default_version_column() -> String {
    "updated_at".to_string()
}

impl Default for MedicalDetailsConfig {
    fn default() -> Self {
        Self {
            max_append_attempts: default_max_append_attempts(),
            version_column: default_version_column(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub data_service: DataServiceConfig,

    #[serde(default)]
    pub medical_details: MedicalDetailsConfig,

    /// Minimum log severity: trace, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http: HttpServerConfig::default(),
            data_service: DataServiceConfig::default(),
            medical_details: MedicalDetailsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl ServiceConfig {
    /// Load from `path` (if it exists), apply environment overrides, validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// [`load`](Self::load))
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATA_SERVICE_URL) {
            self.data_service.url = url;
        }
        if let Some(key) = lookup(ENV_DATA_SERVICE_KEY) {
            self.data_service.api_key = key;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.http.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{} is not a port: '{}'", ENV_PORT, port)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.data_service.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "data_service.url is required (or set {})",
                ENV_DATA_SERVICE_URL
            )));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "data_service.url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.data_service.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "data_service.api_key is required (or set {})",
                ENV_DATA_SERVICE_KEY
            )));
        }
        if self.http.port == 0 {
            return Err(ConfigError::Invalid("http.port must be > 0".to_string()));
        }
        if self.medical_details.max_append_attempts == 0 {
            return Err(ConfigError::Invalid(
                "medical_details.max_append_attempts must be >= 1".to_string(),
            ));
        }
        if self.medical_details.version_column.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "medical_details.version_column is required".to_string(),
            ));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> Result<Severity, ConfigError> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    fn valid_json() -> &'static str {
        r#"{
            "http": { "port": 8080 },
            "data_service": { "url": "https://rx.example.co", "api_key": "secret" }
        }"#
    }

    #[test]
    fn test_defaults_filled_in() {
        let config = ServiceConfig::from_json(valid_json()).unwrap();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.medical_details.max_append_attempts, 3);
        assert_eq!(config.medical_details.version_column, "updated_at");
        assert_eq!(config.severity().unwrap(), Severity::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(valid_json().as_bytes()).unwrap();

        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.medical_details.max_append_attempts, 3);
    }

    #[test]
    fn test_invalid_json_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = ServiceConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_DATA_SERVICE_URL, "http://localhost:54321"),
            (ENV_DATA_SERVICE_KEY, "from-env"),
            (ENV_PORT, "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.data_service.url, "http://localhost:54321");
        assert_eq!(config.data_service.api_key, "from-env");
        assert_eq!(config.http.port, 9000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_PORT).then(|| "http".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ServiceConfig::from_json(valid_json()).unwrap();
        config.data_service.url = "rx.example.co".into();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::from_json(valid_json()).unwrap();
        config.data_service.api_key = " ".into();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::from_json(valid_json()).unwrap();
        config.medical_details.max_append_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::from_json(valid_json()).unwrap();
        config.medical_details.version_column = "".into();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::from_json(valid_json()).unwrap();
        config.log_level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let config = ServiceConfig::from_json(valid_json()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
