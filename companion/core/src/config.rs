//! Client Configuration
//!
//! Configuration for the conversation client runtime, loaded with the
//! following priority (highest first):
//!
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file lives at `$XDG_CONFIG_HOME/companion/client.toml`
//! (typically `~/.config/companion/client.toml`).
//!
//! # Example Configuration
//!
//! ```toml
//! backend_url = "http://localhost:5000"
//! model = "gpt-4o"
//! probe_retries = 30
//! probe_delay_ms = 1000
//! history_limit = 20
//!
//! [features]
//! email = true
//! music_player = false
//! ```
//!
//! # Environment Variables
//!
//! - `COMPANION_BACKEND_URL`: backend base URL
//! - `COMPANION_MODEL`: default model identifier
//! - `COMPANION_PROBE_RETRIES` / `COMPANION_PROBE_DELAY_MS`: readiness probe
//! - `COMPANION_HISTORY_LIMIT`: recent-conversations page size
//! - `COMPANION_DISABLED_MODULES`: comma-separated module names to turn off

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::ProbeConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Feature flags gating optional modules.
///
/// A module that is not explicitly listed inherits `default_enabled`.
#[derive(Clone, Debug)]
pub struct FeatureFlags {
    /// Per-module overrides.
    overrides: HashMap<String, bool>,
    /// Whether unlisted modules are considered enabled.
    default_enabled: bool,
}

impl FeatureFlags {
    /// All modules enabled unless individually disabled.
    #[must_use]
    pub fn all_enabled() -> Self {
        Self {
            overrides: HashMap::new(),
            default_enabled: true,
        }
    }

    /// All modules disabled unless individually enabled.
    #[must_use]
    pub fn all_disabled() -> Self {
        Self {
            overrides: HashMap::new(),
            default_enabled: false,
        }
    }

    /// Set one module's flag.
    pub fn set(&mut self, name: impl Into<String>, enabled: bool) {
        self.overrides.insert(name.into(), enabled);
    }

    /// Whether the named module is enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        *self.overrides.get(name).unwrap_or(&self.default_enabled)
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::all_enabled()
    }
}

/// Runtime configuration for the conversation client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the assistant backend.
    pub backend_url: String,
    /// Default model identifier used for sends.
    pub model: String,
    /// Readiness probe settings.
    pub probe: ProbeConfig,
    /// Page size for the recent-conversations list.
    pub history_limit: usize,
    /// Feature flags for optional modules.
    pub features: FeatureFlags,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            model: "gpt-4o".to_string(),
            probe: ProbeConfig::default(),
            history_limit: 20,
            features: FeatureFlags::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables over defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply environment variable overrides in place.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("COMPANION_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Ok(model) = std::env::var("COMPANION_MODEL") {
            self.model = model;
        }
        if let Some(retries) = env_parse::<u32>("COMPANION_PROBE_RETRIES") {
            self.probe.max_retries = retries;
        }
        if let Some(delay_ms) = env_parse::<u64>("COMPANION_PROBE_DELAY_MS") {
            self.probe.delay = Duration::from_millis(delay_ms);
        }
        if let Some(limit) = env_parse::<usize>("COMPANION_HISTORY_LIMIT") {
            self.history_limit = limit;
        }
        if let Ok(disabled) = std::env::var("COMPANION_DISABLED_MODULES") {
            for name in disabled.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                self.features.set(name, false);
            }
        }
    }
}

/// Parse an environment variable, ignoring unset or unparsable values.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// TOML file representation of [`ClientConfig`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Backend base URL.
    pub backend_url: Option<String>,
    /// Default model identifier.
    pub model: Option<String>,
    /// Readiness probe retry count.
    pub probe_retries: Option<u32>,
    /// Readiness probe fixed delay in milliseconds.
    pub probe_delay_ms: Option<u64>,
    /// Recent-conversations page size.
    pub history_limit: Option<usize>,
    /// Per-module feature flags.
    pub features: HashMap<String, bool>,
}

impl ClientToml {
    /// Fold the file values into a config (file loses to env, wins over
    /// defaults).
    fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(ref url) = self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(retries) = self.probe_retries {
            config.probe.max_retries = retries;
        }
        if let Some(delay_ms) = self.probe_delay_ms {
            config.probe.delay = Duration::from_millis(delay_ms);
        }
        if let Some(limit) = self.history_limit {
            config.history_limit = limit;
        }
        for (name, enabled) in &self.features {
            config.features.set(name.clone(), *enabled);
        }
    }
}

/// Default configuration file path
/// (`$XDG_CONFIG_HOME/companion/client.toml`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("companion").join("client.toml"))
}

/// Load configuration: defaults, then the default config file (if present),
/// then environment overrides.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    if let Some(path) = default_config_path() {
        if path.exists() {
            let file = read_toml(&path)?;
            file.apply_to(&mut config);
            tracing::info!(path = ?path, "Loaded configuration file");
        }
    }

    config.apply_env();
    Ok(config)
}

/// Load configuration from a specific file path, then environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();
    let file = read_toml(path)?;
    file.apply_to(&mut config);
    config.apply_env();
    Ok(config)
}

/// Read and parse a TOML config file.
fn read_toml(path: &Path) -> Result<ClientToml, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.backend_url, "http://localhost:5000");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.history_limit, 20);
        assert!(config.features.is_enabled("email"));
    }

    #[test]
    fn test_feature_flags_overrides() {
        let mut flags = FeatureFlags::all_enabled();
        flags.set("music_player", false);
        assert!(!flags.is_enabled("music_player"));
        assert!(flags.is_enabled("email"));

        let mut flags = FeatureFlags::all_disabled();
        flags.set("email", true);
        assert!(flags.is_enabled("email"));
        assert!(!flags.is_enabled("music_player"));
    }

    #[test]
    fn test_load_config_from_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend_url = "http://127.0.0.1:9000"
model = "local-llm"
probe_retries = 5
probe_delay_ms = 50

[features]
music_player = false
"#
        )
        .unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.backend_url, "http://127.0.0.1:9000");
        assert_eq!(config.model, "local-llm");
        assert_eq!(config.probe.max_retries, 5);
        assert_eq!(config.probe.delay, Duration::from_millis(50));
        assert!(!config.features.is_enabled("music_player"));
        assert!(config.features.is_enabled("email"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config_from_path(Path::new("/nonexistent/client.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_parse_error_surfaces() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "backend_url = [not toml").unwrap();
        let result = load_config_from_path(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
