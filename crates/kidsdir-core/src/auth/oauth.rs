//! Hosted-UI OAuth2 endpoints: authorize, token and logout.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::pkce::{PkceChallenge, CHALLENGE_METHOD};
use super::session::TokenSet;
use super::AuthError;

/// HTTP request timeout for the token endpoint
const REQUEST_TIMEOUT_SECS: u64 = 30;

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "email".to_string(), "profile".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Hosted UI base, e.g. `https://kidsdir.auth.ap-southeast-1.amazoncognito.com`
    pub domain: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub logout_uri: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    pub fn new(domain: &str, client_id: &str, redirect_uri: &str) -> Self {
        Self {
            domain: domain.to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            logout_uri: None,
            scopes: default_scopes(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        if self.domain.trim().is_empty() {
            return Err(AuthError::Config("OAuth domain is not set".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Config("OAuth client id is not set".to_string()));
        }
        let raw = format!("{}/{}", self.domain.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| AuthError::Config(format!("invalid OAuth domain: {}", e)))
    }

    /// URL to open in a browser to start the Authorization Code + PKCE flow
    pub fn authorize_url(&self, pkce: &PkceChallenge) -> Result<Url, AuthError> {
        let mut url = self.endpoint("oauth2/authorize")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &pkce.state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", CHALLENGE_METHOD);
        Ok(url)
    }

    pub fn logout_url(&self) -> Result<Url, AuthError> {
        let mut url = self.endpoint("logout")?;
        let logout_uri = self.logout_uri.as_deref().unwrap_or(&self.redirect_uri);
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("logout_uri", logout_uri);
        Ok(url)
    }

    pub fn token_url(&self) -> Result<Url, AuthError> {
        self.endpoint("oauth2/token")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Talks to the token endpoint. Clone is cheap - reqwest::Client is Arc-backed.
#[derive(Clone)]
pub struct OAuthClient {
    client: Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Trade an authorization code and its PKCE verifier for tokens
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet, AuthError> {
        debug!("Exchanging authorization code");
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ])
        .await
    }

    /// Use a refresh token to obtain a new access token.
    /// The returned set has no refresh token of its own unless the server
    /// rotated it; see [`TokenSet::inherit_from`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        debug!("Refreshing access token");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, AuthError> {
        let url = self.config.token_url()?;
        let response = self.client.post(url).form(form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => crate::utils::truncate(&body, 200),
            };
            warn!(status = status.as_u16(), %message, "Token endpoint returned an error");
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(TokenSet::new(
            parsed.access_token,
            parsed.id_token,
            parsed.refresh_token,
            parsed.expires_in,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        let mut config = OAuthConfig::new(
            "https://auth.example.com/",
            "client-123",
            "http://localhost:8400/callback",
        );
        config.logout_uri = Some("http://localhost:8400/".to_string());
        config
    }

    #[test]
    fn test_authorize_url_carries_pkce() {
        let pkce = PkceChallenge {
            verifier: "v".to_string(),
            challenge: "chal".to_string(),
            state: "st".to_string(),
        };
        let url = config().authorize_url(&pkce).expect("url");
        assert_eq!(url.path(), "/oauth2/authorize");

        let pairs: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8400/callback");
        assert_eq!(pairs["scope"], "openid email profile");
        assert_eq!(pairs["state"], "st");
        assert_eq!(pairs["code_challenge"], "chal");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert!(!pairs.contains_key("code_verifier"));
    }

    #[test]
    fn test_logout_url() {
        let url = config().logout_url().expect("url");
        assert_eq!(url.path(), "/logout");
        let pairs: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(pairs["logout_uri"], "http://localhost:8400/");
    }

    #[test]
    fn test_missing_domain_is_config_error() {
        let config = OAuthConfig::new("", "client", "http://localhost/cb");
        assert!(matches!(config.token_url(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_config_defaults_scopes() {
        let config: OAuthConfig = serde_json::from_str(
            r#"{"domain": "https://a", "client_id": "c", "redirect_uri": "r"}"#,
        )
        .expect("parse");
        assert_eq!(config.scopes, vec!["openid", "email", "profile"]);
    }
}
