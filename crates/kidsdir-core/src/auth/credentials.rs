use anyhow::{Context, Result};
use keyring::Entry;

use super::session::TokenSet;
use super::store::TokenStore;

const SERVICE_NAME: &str = "kidsdir";

/// Keychain entry name for the token document
const DEFAULT_ACCOUNT: &str = "session";

/// Stores the token set in the OS keychain.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::for_account(DEFAULT_ACCOUNT)
    }

    /// Separate entries per environment, e.g. "staging"
    pub fn for_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<TokenSet>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let tokens = serde_json::from_str(&secret)
                    .context("Failed to parse token set from keychain")?;
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve tokens from keychain"),
        }
    }

    fn save(&self, tokens: &TokenSet) -> Result<()> {
        let secret = serde_json::to_string(tokens)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store tokens in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete tokens from keychain"),
        }
    }
}
