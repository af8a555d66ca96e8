//! Identity-token claims.
//!
//! The id token is only read for display and routing (which API mode to
//! default to). It is not verified here; the backend verifies every access
//! token it receives.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiMode;

use super::AuthError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "cognito:username", default)]
    pub username: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    pub fn role(&self) -> Role {
        Role::from_groups(&self.groups)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// What the signed-in user may do, highest group wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn from_groups(groups: &[String]) -> Self {
        groups
            .iter()
            .map(|g| match g.to_ascii_lowercase().as_str() {
                "admin" => Role::Admin,
                // "owner" is the older name for the manager group
                "manager" | "owner" => Role::Manager,
                _ => Role::User,
            })
            .max()
            .unwrap_or(Role::User)
    }

    pub fn default_mode(&self) -> ApiMode {
        match self {
            Role::Admin => ApiMode::Admin,
            Role::Manager => ApiMode::Manager,
            Role::User => ApiMode::User,
        }
    }

    /// Whether this role may call endpoints under `mode`.
    pub fn can_use(&self, mode: ApiMode) -> bool {
        match mode {
            ApiMode::Admin => *self == Role::Admin,
            ApiMode::Manager | ApiMode::Owner => *self >= Role::Manager,
            ApiMode::User => true,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Manager => write!(f, "manager"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Decode the payload segment of a JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<IdTokenClaims, AuthError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(AuthError::MalformedToken(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not valid claims JSON: {}", e)))
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}
