//! Authentication: OAuth2 Authorization Code with PKCE against the hosted
//! user-pool UI, plus the token lifecycle that follows it.
//!
//! This module provides:
//! - `PkceChallenge`: verifier/challenge/state for one login attempt
//! - `OAuthConfig`, `OAuthClient`: authorize/logout URLs and the token endpoint
//! - `TokenSet`: access/id/refresh tokens with expiry helpers
//! - `TokenStore`: file, keychain and in-memory persistence
//! - `AuthManager`: proactive refresh (60s before expiry) and sign-out on
//!   irrecoverable refresh failure
//! - `IdTokenClaims`, `Role`: group claims mapped to an API mode

pub mod claims;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod oauth;
pub mod pkce;
pub mod session;
pub mod store;

pub use claims::{decode_claims, IdTokenClaims, Role};
pub use credentials::KeyringTokenStore;
pub use error::AuthError;
pub use manager::AuthManager;
pub use oauth::{OAuthClient, OAuthConfig};
pub use pkce::PkceChallenge;
pub use session::TokenSet;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
