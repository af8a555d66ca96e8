use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Refresh this long before the access token actually expires.
pub const TOKEN_REFRESH_WINDOW_SECS: i64 = 60;

/// Tokens issued by the user pool for one signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub obtained_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn new(
        access_token: String,
        id_token: Option<String>,
        refresh_token: Option<String>,
        expires_in_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token,
            id_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in_secs),
            obtained_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// True when the token expires within `window` from now (or already has).
    pub fn expires_within(&self, window: Duration) -> bool {
        Utc::now() + window >= self.expires_at
    }

    /// Check if the access token will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        self.expires_within(Duration::seconds(TOKEN_REFRESH_WINDOW_SECS))
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    /// Carry over what a refresh response leaves out. The token endpoint
    /// does not rotate refresh tokens, and may omit the id token.
    pub fn inherit_from(mut self, previous: &TokenSet) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.refresh_token.clone();
        }
        if self.id_token.is_none() {
            self.id_token = previous.id_token.clone();
        }
        self
    }
}
