//! Configuration loading and management.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Credential for the advice provider. Absent means the advice endpoint
    /// reports a configuration error; record CRUD is unaffected.
    pub anthropic_api_key: Option<String>,
    /// Model used for advice requests.
    pub advice_model: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("listen_addr", &self.listen_addr)
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("advice_model", &self.advice_model)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("somno.db"),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            anthropic_api_key: None,
            advice_model: "claude-3-5-sonnet-latest".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Layering: defaults, then `config.toml` in the platform config dir,
    /// then the explicit file, then `SOMNO_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("SOMNO_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for somno.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("somno"))
}

/// Returns the platform-specific data directory for somno.
///
/// On Linux: `~/.local/share/somno`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("somno"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("somno.db"));
    }

    #[test]
    fn default_config_has_no_credential() {
        let config = Config::default();
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = Config {
            anthropic_api_key: Some("secret-key".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn explicit_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "database_path = \"/tmp/elsewhere.db\"\nlisten_addr = \"0.0.0.0:8080\"\n",
        )
        .expect("write config file");

        let config = Config::load_from(Some(&path)).expect("load config");
        assert_eq!(config.database_path, PathBuf::from("/tmp/elsewhere.db"));
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
    }
}
