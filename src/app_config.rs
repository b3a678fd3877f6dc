//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with BOOKCLUB_)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the database URL and the identity-provider shared secret
//! belong in environment variables, not in the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Bookclub".to_string(),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory review attachments and profile images are written to.
    pub directory: String,
    /// Public URL prefix the media directory is served under.
    pub url_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            directory: "media".to_string(),
            url_prefix: "/media".to_string(),
        }
    }
}

/// Identity-provider hand-off configuration.
///
/// Authentication itself happens in an external provider; it hands the
/// authenticated user over by calling our session endpoint with this secret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Shared secret expected in the X-Identity-Secret header
    /// (should be in env var BOOKCLUB_IDENTITY__SHARED_SECRET).
    pub shared_secret: String,
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub identity: IdentityConfig,
}

impl AppConfig {
    /// Load configuration from config.toml and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file path and the environment.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("BOOKCLUB").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

/// Convenience accessor returning a clone of the current configuration.
pub fn get_app_config() -> AppConfig {
    APP_CONFIG.read().expect("App config lock poisoned").clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.media.directory, "media");
        assert_eq!(config.media.url_prefix, "/media");
        assert!(config.identity.shared_secret.is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("does_not_exist.toml").expect("load should not fail");
        assert_eq!(config.site.name, "Bookclub");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        writeln!(
            file,
            "[server]\nbind_address = \"127.0.0.1:9090\"\n\n[media]\ndirectory = \"/srv/media\"\n"
        )
        .expect("write config");

        let config =
            AppConfig::load_from(path.to_str().expect("utf-8 path")).expect("load config");
        assert_eq!(config.server.bind_address, "127.0.0.1:9090");
        assert_eq!(config.media.directory, "/srv/media");
        // Untouched sections keep defaults.
        assert_eq!(config.site.name, "Bookclub");
    }
}
