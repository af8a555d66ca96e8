//! Proof Key for Code Exchange (RFC 7636), S256 method only.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Verifier length. RFC 7636 allows 43..=128.
const VERIFIER_LEN: usize = 64;

/// Random bytes behind the `state` parameter
const STATE_BYTES: usize = 16;

/// RFC 7636 unreserved characters
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

pub const CHALLENGE_METHOD: &str = "S256";

/// One login attempt's secrets. The verifier never leaves the client until
/// the code exchange; the challenge goes on the authorize URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        let verifier: String = (0..VERIFIER_LEN)
            .map(|_| UNRESERVED[rng.gen_range(0..UNRESERVED.len())] as char)
            .collect();

        let mut state_bytes = [0u8; STATE_BYTES];
        rng.fill(&mut state_bytes);

        Self {
            challenge: challenge_for(&verifier),
            state: URL_SAFE_NO_PAD.encode(state_bytes),
            verifier,
        }
    }
}

/// BASE64URL-NOPAD(SHA-256(verifier))
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_generated_verifier_shape() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.verifier.len(), VERIFIER_LEN);
        assert!(pkce.verifier.bytes().all(|b| UNRESERVED.contains(&b)));
        assert_eq!(pkce.challenge, challenge_for(&pkce.verifier));
        assert!(!pkce.challenge.contains('='));
        assert!(!pkce.state.is_empty());
    }

    #[test]
    fn test_generated_values_differ() {
        let a = PkceChallenge::generate();
        let b = PkceChallenge::generate();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }
}
