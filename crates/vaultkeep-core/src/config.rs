//! Configuration module for VaultKeep.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults. The engine consumes this
//! configuration; it never produces or persists it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for VaultKeep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vault: VaultConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

/// Local vault settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root directory of the local vault.
    pub root: PathBuf,
}

/// Remote object store settings. Opaque to the engine; the adapter
/// interprets them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Endpoint of the remote store. For the bundled directory adapter this
    /// is a filesystem path; other adapters may interpret it as a URL.
    pub endpoint: String,
    /// Credential for the remote store. `None` for adapters that need none.
    pub credential: Option<String>,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between dirty-set flushes (auto-sync cadence).
    pub flush_interval_secs: u64,
    /// Bounded timeout for each individual store operation, in seconds.
    pub operation_timeout_secs: u64,
    /// Whether a remote-absent, previously-synced file is deleted locally
    /// during a full pass. When `false` (the default) such files are
    /// re-uploaded instead; deletion then only follows explicit delete
    /// events.
    pub propagate_remote_deletes: bool,
}

/// Version retention (GC) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Number of versions to keep per alias.
    pub keep_versions: usize,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and defaults
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/vaultkeep/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultkeep")
            .join("config.yaml")
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Vault"),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 5,
            operation_timeout_secs: 30,
            propagate_remote_deletes: false,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { keep_versions: 3 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `store.endpoint`.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration, returning every problem found.
    ///
    /// Configuration problems abort a sync pass before it starts, so this
    /// is checked once up front rather than per operation.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.vault.root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "vault.root".to_string(),
                message: "vault root must not be empty".to_string(),
            });
        }

        if self.store.endpoint.trim().is_empty() {
            errors.push(ValidationError {
                field: "store.endpoint".to_string(),
                message: "remote store endpoint must not be empty".to_string(),
            });
        }

        if self.sync.flush_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.flush_interval_secs".to_string(),
                message: "flush interval must be at least 1 second".to_string(),
            });
        }

        if self.sync.operation_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "sync.operation_timeout_secs".to_string(),
                message: "operation timeout must be at least 1 second".to_string(),
            });
        }

        if self.retention.keep_versions == 0 {
            errors.push(ValidationError {
                field: "retention.keep_versions".to_string(),
                message: "at least one version must be retained".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".to_string(),
                message: format!(
                    "unknown level '{}', expected one of {valid_levels:?}",
                    self.logging.level
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.store.endpoint = "/srv/vaultkeep-remote".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sync.flush_interval_secs, 5);
        assert_eq!(config.sync.operation_timeout_secs, 30);
        assert!(!config.sync.propagate_remote_deletes);
        assert_eq!(config.retention.keep_versions, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_endpoint_is_invalid() {
        // A fresh config has no endpoint configured; validation must flag it
        // so the engine can fail fast before any pass.
        let errors = Config::default().validate();
        assert!(errors.iter().any(|e| e.field == "store.endpoint"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_empty());
    }

    #[test]
    fn test_zero_retention_rejected() {
        let mut config = valid_config();
        config.retention.keep_versions = 0;
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "retention.keep_versions"));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = valid_config();
        config.sync.flush_interval_secs = 0;
        config.sync.operation_timeout_secs = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = valid_config();
        config.logging.level = "loud".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn test_load_partial_yaml_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "store:\n  endpoint: /mnt/remote\nretention:\n  keep_versions: 5\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.endpoint, "/mnt/remote");
        assert_eq!(config.retention.keep_versions, 5);
        // Untouched sections keep their defaults
        assert_eq!(config.sync.flush_interval_secs, 5);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.retention.keep_versions, 3);
    }
}
