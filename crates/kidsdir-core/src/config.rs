//! Application configuration management.
//!
//! Holds the API base URL, the hosted-UI OAuth settings, the default API
//! mode, cache freshness and where session tokens are kept.
//!
//! Configuration is stored at `~/.config/kidsdir/config.json`; every field
//! can be overridden by a `KIDSDIR_*` environment variable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiMode;
use crate::auth::{FileTokenStore, KeyringTokenStore, OAuthConfig, TokenStore};
use crate::cache::CachePolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "kidsdir";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_CACHE_MAX_AGE_MINUTES: i64 = 15;

pub const ENV_API_BASE_URL: &str = "KIDSDIR_API_BASE_URL";
pub const ENV_COGNITO_DOMAIN: &str = "KIDSDIR_COGNITO_DOMAIN";
pub const ENV_CLIENT_ID: &str = "KIDSDIR_CLIENT_ID";
pub const ENV_REDIRECT_URI: &str = "KIDSDIR_REDIRECT_URI";
pub const ENV_LOGOUT_URI: &str = "KIDSDIR_LOGOUT_URI";
pub const ENV_MODE: &str = "KIDSDIR_MODE";

/// Where session tokens are persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    /// `session.json` in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_cache_max_age() -> i64 {
    DEFAULT_CACHE_MAX_AGE_MINUTES
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub cognito: Option<OAuthConfig>,
    #[serde(default)]
    pub default_mode: Option<ApiMode>,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_minutes: i64,
    #[serde(default = "default_true")]
    pub stale_while_revalidate: bool,
    #[serde(default)]
    pub token_storage: TokenStorage,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            cognito: None,
            default_mode: None,
            cache_max_age_minutes: DEFAULT_CACHE_MAX_AGE_MINUTES,
            stale_while_revalidate: true,
            token_storage: TokenStorage::File,
        }
    }
}

impl Config {
    /// Config file (if any) with environment overrides applied
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Overlay values from `lookup` (the process environment in practice).
    ///
    /// A Cognito block is created as soon as the domain, client id and
    /// redirect URI are all known, from the file or the environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(mode) = get(ENV_MODE) {
            let mode: ApiMode = mode
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .with_context(|| format!("Invalid {}", ENV_MODE))?;
            self.default_mode = Some(mode);
        }

        let domain = get(ENV_COGNITO_DOMAIN);
        let client_id = get(ENV_CLIENT_ID);
        let redirect_uri = get(ENV_REDIRECT_URI);
        let logout_uri = get(ENV_LOGOUT_URI);

        match self.cognito.as_mut() {
            Some(cognito) => {
                if let Some(domain) = domain {
                    cognito.domain = domain;
                }
                if let Some(client_id) = client_id {
                    cognito.client_id = client_id;
                }
                if let Some(redirect_uri) = redirect_uri {
                    cognito.redirect_uri = redirect_uri;
                }
                if logout_uri.is_some() {
                    cognito.logout_uri = logout_uri;
                }
            }
            None => {
                if let (Some(domain), Some(client_id), Some(redirect_uri)) =
                    (domain, client_id, redirect_uri)
                {
                    let mut cognito = OAuthConfig::new(&domain, &client_id, &redirect_uri);
                    cognito.logout_uri = logout_uri;
                    self.cognito = Some(cognito);
                }
            }
        }
        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::new(
            chrono::Duration::minutes(self.cache_max_age_minutes.max(0)),
            self.stale_while_revalidate,
        )
    }

    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_storage {
            TokenStorage::File => Arc::new(FileTokenStore::new(self.cache_dir()?)),
            TokenStorage::Keyring => Arc::new(KeyringTokenStore::new()),
        })
    }

    pub fn oauth(&self) -> Result<&OAuthConfig> {
        self.cognito.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "Sign-in is not configured; set {}, {} and {} or add a cognito block to {}",
                ENV_COGNITO_DOMAIN,
                ENV_CLIENT_ID,
                ENV_REDIRECT_URI,
                CONFIG_FILE
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.cache_policy(), CachePolicy::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                (ENV_API_BASE_URL, "https://api.example.com"),
                (ENV_MODE, "manager"),
                (ENV_COGNITO_DOMAIN, "https://auth.example.com"),
                (ENV_CLIENT_ID, "abc"),
                (ENV_REDIRECT_URI, "http://localhost:3000/callback"),
            ]))
            .expect("apply");

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.default_mode, Some(ApiMode::Manager));
        let cognito = config.oauth().expect("cognito");
        assert_eq!(cognito.client_id, "abc");
        assert_eq!(cognito.logout_uri, None);
    }

    #[test]
    fn test_partial_cognito_env_needs_file_block() {
        let mut config = Config::default();
        config
            .apply_env(env(&[(ENV_CLIENT_ID, "abc")]))
            .expect("apply");
        assert!(config.cognito.is_none());
        assert!(config.oauth().is_err());

        config.cognito = Some(OAuthConfig::new("https://auth", "old", "http://cb"));
        config
            .apply_env(env(&[(ENV_CLIENT_ID, "new"), (ENV_LOGOUT_URI, "http://bye")]))
            .expect("apply");
        let cognito = config.cognito.as_ref().expect("cognito");
        assert_eq!(cognito.client_id, "new");
        assert_eq!(cognito.logout_uri.as_deref(), Some("http://bye"));
    }

    #[test]
    fn test_invalid_mode_is_an_error() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[(ENV_MODE, "superuser")])).is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            token_storage: TokenStorage::Keyring,
            cache_max_age_minutes: 5,
            stale_while_revalidate: false,
            ..Config::default()
        };
        config.save_to(&path).expect("save");

        let loaded = Config::load_file(&path).expect("load");
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.cache_policy(),
            CachePolicy::new(chrono::Duration::minutes(5), false)
        );
    }
}
