//! Everything a command needs: configuration, the API client, the auth
//! manager (when sign-in is configured) and the cached repository.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use kidsdir_core::auth::{AuthManager, OAuthClient};
use kidsdir_core::cache::{CacheManager, MemoryCache};
use kidsdir_core::{ActivityRepository, ApiClient, ApiMode, Config, Role};

pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub auth: Option<Arc<AuthManager>>,
    pub repository: ActivityRepository,
    pub cache_dir: PathBuf,
    requested_mode: Option<ApiMode>,
}

impl AppContext {
    pub fn open(config: Config, requested_mode: Option<ApiMode>) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        let base = ApiClient::new(&config.api_base_url)
            .with_context(|| format!("Invalid API base URL {}", config.api_base_url))?;

        let auth = match config.cognito {
            Some(ref cognito) => {
                let oauth = OAuthClient::new(cognito.clone())?;
                Some(Arc::new(AuthManager::new(oauth, config.token_store()?)))
            }
            None => {
                debug!("Sign-in not configured, requests are anonymous");
                None
            }
        };
        let api = match auth {
            Some(ref auth) => base.with_auth(Arc::clone(auth)),
            None => base,
        };

        let cache = match CacheManager::new(cache_dir.join("responses")) {
            Ok(disk) => MemoryCache::with_disk(disk),
            Err(e) => {
                warn!(error = %e, "Disk cache unavailable, caching in memory only");
                MemoryCache::new()
            }
        };
        let repository = ActivityRepository::new(api.clone(), cache, config.cache_policy());

        Ok(Self {
            config,
            api,
            auth,
            repository,
            cache_dir,
            requested_mode,
        })
    }

    pub fn auth(&self) -> Result<&Arc<AuthManager>> {
        self.auth.as_ref().ok_or_else(|| match self.config.oauth() {
            Ok(_) => anyhow::anyhow!("Sign-in is not configured"),
            Err(e) => e,
        })
    }

    /// `--mode`, then the configured default, then the signed-in role
    pub async fn mode(&self) -> ApiMode {
        let mut role = None;
        if let Some(ref auth) = self.auth {
            match auth.claims().await {
                Ok(Some(claims)) => role = Some(claims.role()),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Could not read id token claims"),
            }
        }
        resolve_mode(self.requested_mode.or(self.config.default_mode), role)
    }

    pub fn pending_login_path(&self) -> PathBuf {
        self.cache_dir.join("pending_login.json")
    }
}

/// An explicit mode wins even when the role looks too weak for it; the
/// server has the final say, so this only warns.
fn resolve_mode(explicit: Option<ApiMode>, role: Option<Role>) -> ApiMode {
    match (explicit, role) {
        (Some(mode), Some(role)) => {
            if !role.can_use(mode) {
                warn!(%mode, %role, "Signed-in role cannot normally use this mode");
            }
            mode
        }
        (Some(mode), None) => mode,
        (None, Some(role)) => role.default_mode(),
        (None, None) => ApiMode::User,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mode_precedence() {
        assert_eq!(resolve_mode(None, None), ApiMode::User);
        assert_eq!(resolve_mode(None, Some(Role::Manager)), ApiMode::Manager);
        assert_eq!(resolve_mode(Some(ApiMode::User), Some(Role::Admin)), ApiMode::User);
        // Kept as asked, with a warning
        assert_eq!(resolve_mode(Some(ApiMode::Admin), Some(Role::User)), ApiMode::Admin);
        assert_eq!(resolve_mode(Some(ApiMode::Owner), None), ApiMode::Owner);
    }
}
