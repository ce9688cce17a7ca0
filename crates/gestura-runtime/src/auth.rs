//! Session credentials.
//!
//! Token format: `<user_id>.<expiry_unix>.<hex hmac-sha256(secret, user_id "." expiry)>`.

use chrono::{Duration, Utc};
use gestura_core::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Resolves a credential to the user it identifies.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<String>;
}

pub struct SignedTokenVerifier {
    secret: String,
}

impl SignedTokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token for `user_id` that expires after `ttl`.
    pub fn issue(&self, user_id: &str, ttl: Duration) -> Result<String> {
        self.issue_until(user_id, (Utc::now() + ttl).timestamp())
    }

    /// Issue a token with an explicit unix-seconds expiry.
    pub fn issue_until(&self, user_id: &str, expiry: i64) -> Result<String> {
        let signature = hex::encode(self.mac(user_id, expiry)?.finalize().into_bytes());
        Ok(format!("{}.{}.{}", user_id, expiry, signature))
    }

    fn mac(&self, user_id: &str, expiry: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Config(format!("token secret: {}", e)))?;
        mac.update(user_id.as_bytes());
        mac.update(b".");
        mac.update(expiry.to_string().as_bytes());
        Ok(mac)
    }
}

impl CredentialVerifier for SignedTokenVerifier {
    fn verify(&self, token: &str) -> Result<String> {
        // User ids may contain dots; the last two fields never do.
        let mut parts = token.trim().rsplitn(3, '.');
        let (Some(signature), Some(expiry), Some(user_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidCredential("malformed token".into()));
        };
        if user_id.is_empty() {
            return Err(Error::InvalidCredential("missing user id".into()));
        }
        let expiry: i64 = expiry
            .parse()
            .map_err(|_| Error::InvalidCredential("malformed expiry".into()))?;

        let signature =
            hex::decode(signature).map_err(|_| Error::InvalidCredential("malformed signature".into()))?;
        self.mac(user_id, expiry)?
            .verify_slice(&signature)
            .map_err(|_| Error::InvalidCredential("bad signature".into()))?;
        if expiry <= Utc::now().timestamp() {
            return Err(Error::InvalidCredential("token expired".into()));
        }
        Ok(user_id.to_string())
    }
}
