use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Session expired - please log in again")]
    ReauthenticationRequired,

    #[error("Token endpoint rejected the request ({status}): {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Malformed identity token: {0}")]
    MalformedToken(String),

    #[error("OAuth state mismatch - the login response does not belong to this login attempt")]
    StateMismatch,

    #[error("Invalid OAuth configuration: {0}")]
    Config(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Whether retrying with the same refresh token can never succeed.
    /// Network failures are not in this set; the stored tokens survive them.
    pub fn is_irrecoverable(&self) -> bool {
        match self {
            AuthError::TokenEndpoint { status, .. } => matches!(status, 400 | 401 | 403),
            AuthError::InvalidResponse(_) | AuthError::ReauthenticationRequired => true,
            _ => false,
        }
    }
}
