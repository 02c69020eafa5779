//! Settings file handling.
//!
//! Settings live in a TOML file with two tables:
//!
//! ```toml
//! [cache]
//! root_path = "/var/tmp/r2pd"
//! max_size_gb = 20.0
//!
//! [repository]
//! base_url = "https://dr-power.egrid.org/repository"
//! timeout_secs = 30
//! max_retries = 2
//! ```
//!
//! Every field is optional; omitted fields take the defaults below. The
//! cache root defaults to the platform cache directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

const CACHE_DIR_NAME: &str = "r2pd";
const DEFAULT_BASE_URL: &str = "https://dr-power.egrid.org/repository";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("settings file '{path}' is not valid TOML: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("could not determine a cache directory; set [cache] root_path")]
    NoCacheDir,
}

/// Root settings structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub repository: RepositorySettings,
}

/// Local cache location and size budget.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache directory. Defaults to the platform cache dir + `r2pd`.
    pub root_path: Option<PathBuf>,
    /// Maximum total size of cached data files in GB. Unlimited when unset.
    pub max_size_gb: Option<f64>,
}

/// External repository endpoint and network behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositorySettings {
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// How many times a transient fetch failure is retried before surfacing.
    pub max_retries: u32,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl Settings {
    /// Loads and validates settings from a TOML file.
    pub async fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| SettingsError::Read(path.to_path_buf(), e))?;
        let settings: Settings = toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads from `path` when given, otherwise returns validated defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path).await,
            None => {
                let settings = Settings::default();
                settings.validate()?;
                Ok(settings)
            }
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut issues: Vec<String> = Vec::new();

        if let Some(size) = self.cache.max_size_gb {
            if !size.is_finite() || size <= 0.0 {
                issues.push(format!("cache.max_size_gb must be > 0, got {size}"));
            }
        }
        if self.repository.base_url.trim().is_empty() {
            issues.push("repository.base_url must not be empty".to_string());
        }
        if self.repository.timeout_secs == 0 {
            issues.push("repository.timeout_secs must be > 0".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Invalid(issues.join("; ")))
        }
    }

    /// Resolved cache root directory.
    pub fn cache_root(&self) -> Result<PathBuf, SettingsError> {
        match &self.cache.root_path {
            Some(path) => Ok(path.clone()),
            None => dirs::cache_dir()
                .map(|p| p.join(CACHE_DIR_NAME))
                .ok_or(SettingsError::NoCacheDir),
        }
    }

    /// Cache budget in bytes, if one is configured.
    pub fn max_cache_bytes(&self) -> Option<u64> {
        self.cache
            .max_size_gb
            .map(|gb| (gb * 1_000_000_000.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn loads_full_settings_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "[cache]\nroot_path = \"{}\"\nmax_size_gb = 2.5\n\n\
             [repository]\nbase_url = \"http://localhost:9000\"\ntimeout_secs = 5\nmax_retries = 1\n",
            dir.path().join("cache").display()
        )
        .unwrap();

        let settings = Settings::load(&path).await.unwrap();
        assert_eq!(settings.cache.max_size_gb, Some(2.5));
        assert_eq!(settings.repository.base_url, "http://localhost:9000");
        assert_eq!(settings.repository.timeout_secs, 5);
        assert_eq!(settings.max_cache_bytes(), Some(2_500_000_000));
    }

    #[tokio::test]
    async fn missing_sections_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nmax_size_gb = 1.0\n").unwrap();

        let settings = Settings::load(&path).await.unwrap();
        assert_eq!(settings.repository.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.repository.max_retries, 2);
    }

    #[tokio::test]
    async fn rejects_non_positive_budget() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nmax_size_gb = -1.0\n").unwrap();

        let err = Settings::load(&path).await.unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn explicit_root_path_wins() {
        let settings = Settings {
            cache: CacheSettings {
                root_path: Some(PathBuf::from("/tmp/elsewhere")),
                max_size_gb: None,
            },
            ..Settings::default()
        };
        assert_eq!(settings.cache_root().unwrap(), PathBuf::from("/tmp/elsewhere"));
    }
}
