//! Bearer session tokens.
//!
//! A token is 32 random bytes, base64url-encoded without padding. Only its
//! HMAC-SHA256 digest (keyed with the session secret) is persisted.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
#[error("invalid token signing key")]
pub struct TokenKeyError;

/// Generate a fresh bearer token.
#[must_use]
pub fn generate_token() -> SecretString {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    SecretString::from(URL_SAFE_NO_PAD.encode(bytes))
}

/// Computes the stored digest of a token.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Key the signer with the session secret.
    ///
    /// # Errors
    ///
    /// Returns `TokenKeyError` if the key is rejected by the MAC.
    pub fn new(secret: &SecretString) -> Result<Self, TokenKeyError> {
        let mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| TokenKeyError)?;
        Ok(Self { mac })
    }

    /// Hex digest of `token`.
    #[must_use]
    pub fn digest(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer(key: &str) -> TokenSigner {
        TokenSigner::new(&SecretString::from(key)).unwrap()
    }

    #[test]
    fn test_generated_tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        let a = a.expose_secret();
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(a, b.expose_secret());
        assert_eq!(URL_SAFE_NO_PAD.decode(a).unwrap().len(), TOKEN_BYTES);
    }

    #[test]
    fn test_digest_is_stable_and_keyed() {
        let one = signer("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        let two = signer("zZ9#qW8@eR7!tY6$uI5%oP4^aS3&dF2*");

        let digest = one.digest("token-value");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, one.digest("token-value"));
        assert_ne!(digest, one.digest("token-value2"));
        assert_ne!(digest, two.digest("token-value"));
    }

    #[test]
    fn test_digest_matches_known_vector() {
        // RFC 4231 test case 2
        let signer = signer("Jefe");
        assert_eq!(
            signer.digest("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
