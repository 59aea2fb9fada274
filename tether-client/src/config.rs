//! Integration tuning parameters
//!
//! Timeouts and the retry cooldown are product tuning constants, not
//! wire-contract values. Defaults are compiled in; the `[ide]` section
//! of the shared config file can override them. Any problem loading the
//! file falls back to defaults with a log line, never an error.

use std::time::Duration;

use tether_utils::paths;

/// Tuning parameters for the companion connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationConfig {
    /// Bound on TCP connect and handshake
    pub connect_timeout: Duration,
    /// Bound on waiting for a request's response
    pub response_timeout: Duration,
    /// How long a failed connection stays ineligible for retry
    pub retry_cooldown: Duration,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            response_timeout: Duration::from_secs(10),
            retry_cooldown: Duration::from_secs(5),
        }
    }
}

/// Raw config file shape (subset relevant to the integration)
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    ide: IdeSection,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct IdeSection {
    connect_timeout_ms: Option<u64>,
    response_timeout_ms: Option<u64>,
    retry_cooldown_ms: Option<u64>,
}

impl IntegrationConfig {
    /// Load from the shared config file, with defaults on any failure
    pub fn load() -> Self {
        let path = paths::config_file();

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) => {
                tracing::warn!("Failed to read config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse overrides from TOML content
    fn from_toml(content: &str) -> Self {
        let file: ConfigFile = match toml::from_str(content) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}, using defaults", e);
                return Self::default();
            }
        };

        let defaults = Self::default();
        let ide = file.ide;
        Self {
            connect_timeout: ide
                .connect_timeout_ms
                .map_or(defaults.connect_timeout, Duration::from_millis),
            response_timeout: ide
                .response_timeout_ms
                .map_or(defaults.response_timeout, Duration::from_millis),
            retry_cooldown: ide
                .retry_cooldown_ms
                .map_or(defaults.retry_cooldown, Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Default Tests ====================

    #[test]
    fn test_defaults() {
        let config = IntegrationConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.response_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_cooldown, Duration::from_secs(5));
    }

    // ==================== TOML Override Tests ====================

    #[test]
    fn test_from_toml_full_overrides() {
        let config = IntegrationConfig::from_toml(
            r#"
            [ide]
            connect_timeout_ms = 500
            response_timeout_ms = 3000
            retry_cooldown_ms = 1000
            "#,
        );
        assert_eq!(config.connect_timeout, Duration::from_millis(500));
        assert_eq!(config.response_timeout, Duration::from_millis(3000));
        assert_eq!(config.retry_cooldown, Duration::from_millis(1000));
    }

    #[test]
    fn test_from_toml_partial_overrides_keep_defaults() {
        let config = IntegrationConfig::from_toml(
            r#"
            [ide]
            connect_timeout_ms = 750
            "#,
        );
        assert_eq!(config.connect_timeout, Duration::from_millis(750));
        assert_eq!(config.response_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_cooldown, Duration::from_secs(5));
    }

    #[test]
    fn test_from_toml_unrelated_sections_ignored() {
        let config = IntegrationConfig::from_toml(
            r#"
            [keybindings]
            next_window_quick = "Ctrl-PageDown"
            "#,
        );
        assert_eq!(config, IntegrationConfig::default());
    }

    #[test]
    fn test_from_toml_invalid_falls_back_to_defaults() {
        let config = IntegrationConfig::from_toml("this is [not toml");
        assert_eq!(config, IntegrationConfig::default());
    }
}
