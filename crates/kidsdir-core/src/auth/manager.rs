use std::sync::Arc;

use chrono::Duration;
use reqwest::Url;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::claims::{decode_claims, IdTokenClaims};
use super::oauth::OAuthClient;
use super::pkce::PkceChallenge;
use super::session::{TokenSet, TOKEN_REFRESH_WINDOW_SECS};
use super::store::TokenStore;
use super::AuthError;

/// Owns the signed-in user's tokens and keeps the access token fresh.
///
/// The token slot is a `tokio::sync::Mutex` held across the refresh call,
/// so concurrent requests that all find the token expiring trigger exactly
/// one refresh; the rest wait and reuse its result.
pub struct AuthManager {
    oauth: OAuthClient,
    store: Arc<dyn TokenStore>,
    tokens: Mutex<Option<TokenSet>>,
    refresh_window: Duration,
}

impl AuthManager {
    /// Create a manager, picking up any tokens left in `store` by a previous run.
    pub fn new(oauth: OAuthClient, store: Arc<dyn TokenStore>) -> Self {
        let tokens = match store.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Failed to load stored tokens, starting signed out");
                None
            }
        };
        debug!(signed_in = tokens.is_some(), "Auth manager created");
        Self {
            oauth,
            store,
            tokens: Mutex::new(tokens),
            refresh_window: Duration::seconds(TOKEN_REFRESH_WINDOW_SECS),
        }
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Start a login: a fresh PKCE challenge and the URL to send the user to
    pub fn begin_login(&self) -> Result<(Url, PkceChallenge), AuthError> {
        let pkce = PkceChallenge::generate();
        let url = self.oauth.config().authorize_url(&pkce)?;
        Ok((url, pkce))
    }

    /// Finish a login with the code the redirect handed back.
    ///
    /// `returned_state` is the `state` query parameter from the redirect;
    /// it must match the challenge that started this login.
    pub async fn login_with_code(
        &self,
        code: &str,
        pkce: &PkceChallenge,
        returned_state: &str,
    ) -> Result<TokenSet, AuthError> {
        if returned_state.is_empty() || returned_state != pkce.state {
            warn!("OAuth state mismatch on login");
            return Err(AuthError::StateMismatch);
        }

        let tokens = self.oauth.exchange_code(code, &pkce.verifier).await?;
        self.persist(&tokens);
        *self.tokens.lock().await = Some(tokens.clone());
        info!("Signed in");
        Ok(tokens)
    }

    /// Current access token, refreshed first if it expires within the window.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut guard = self.tokens.lock().await;
        let current = guard.as_ref().ok_or(AuthError::NotLoggedIn)?;

        if !current.expires_within(self.refresh_window) {
            return Ok(current.access_token.clone());
        }

        debug!(expires_at = %current.expires_at, "Access token expiring, refreshing");
        let refreshed = self.refresh_locked(current).await;
        match refreshed {
            Ok(tokens) => {
                let token = tokens.access_token.clone();
                *guard = Some(tokens);
                Ok(token)
            }
            Err(e) if e.is_irrecoverable() => {
                warn!(error = %e, "Refresh failed, signing out");
                *guard = None;
                self.forget();
                Err(AuthError::ReauthenticationRequired)
            }
            Err(e) => {
                // Transient failure: keep the tokens, and use the current
                // access token while it still works.
                if current.is_expired() {
                    Err(e)
                } else {
                    warn!(error = %e, "Refresh failed, using current token until expiry");
                    Ok(current.access_token.clone())
                }
            }
        }
    }

    async fn refresh_locked(&self, current: &TokenSet) -> Result<TokenSet, AuthError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(AuthError::ReauthenticationRequired)?;
        let fresh = self.oauth.refresh(refresh_token).await?.inherit_from(current);
        self.persist(&fresh);
        Ok(fresh)
    }

    /// Drop the session after the API rejected our token outright.
    pub async fn invalidate(&self) {
        let mut guard = self.tokens.lock().await;
        if guard.take().is_some() {
            info!("Session invalidated");
        }
        self.forget();
    }

    /// Sign out locally and return the hosted logout URL to end the
    /// browser session too.
    pub async fn logout(&self) -> Result<Url, AuthError> {
        self.invalidate().await;
        self.oauth.config().logout_url()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.lock().await.is_some()
    }

    pub async fn tokens(&self) -> Option<TokenSet> {
        self.tokens.lock().await.clone()
    }

    /// Claims from the id token, if signed in with one
    pub async fn claims(&self) -> Result<Option<IdTokenClaims>, AuthError> {
        let guard = self.tokens.lock().await;
        match guard.as_ref().and_then(|t| t.id_token.as_deref()) {
            Some(id_token) => decode_claims(id_token).map(Some),
            None => Ok(None),
        }
    }

    fn persist(&self, tokens: &TokenSet) {
        if let Err(e) = self.store.save(tokens) {
            warn!(error = %e, "Failed to persist tokens");
        }
    }

    fn forget(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }
}
