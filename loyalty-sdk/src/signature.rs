//! Session token signing.
//!
//! A session token binds a user id to the time it was issued:
//!
//! ```text
//! user_id={uuid}.{unix_timestamp}.{base64_signature}
//! ```
//!
//! where the signature is `HMAC-SHA256("{uuid}.{unix_timestamp}", key)`.
//! The key is owned by a [`SessionSigner`]; there is no global secret.

use uuid::Uuid;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "user_id";

/// Maximum allowed age of a session token (in seconds).
pub const MAX_SESSION_AGE: i64 = 7 * 24 * 60 * 60;

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] uuid::Error),
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Issues and verifies session tokens with a configured HMAC key.
pub struct SessionSigner {
    key: ring::hmac::Key,
}

impl SessionSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret),
        }
    }

    /// Sign a token for `user_id` issued now.
    pub fn issue(&self, user_id: Uuid) -> String {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        self.issue_at(user_id, now)
    }

    fn issue_at(&self, user_id: Uuid, timestamp: i64) -> String {
        let data = format!("{user_id}.{timestamp}");
        let signature = ring::hmac::sign(&self.key, data.as_bytes());
        format!(
            "{data}.{}",
            fast32::base64::RFC4648_NOPAD.encode(signature.as_ref())
        )
    }

    /// Verify a token and return the user id it was issued for.
    pub fn verify(&self, token: &str) -> Result<Uuid, SignatureError> {
        let (data, signature) = token
            .rsplit_once('.')
            .ok_or(SignatureError::InvalidFormat)?;
        let (user_id, timestamp) = data.split_once('.').ok_or(SignatureError::InvalidFormat)?;
        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::InvalidFormat)?;
        let signature = fast32::base64::RFC4648_NOPAD
            .decode_str(signature)
            .map_err(|_| SignatureError::InvalidBase64)?;

        ring::hmac::verify(&self.key, data.as_bytes(), &signature)?;
        check_timestamp(timestamp)?;
        Ok(Uuid::parse_str(user_id)?)
    }
}

/// Check that a token timestamp is within [`MAX_SESSION_AGE`].
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now - timestamp > MAX_SESSION_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_verify() {
        let signer = SessionSigner::new(b"cookie-secret");
        let user_id = Uuid::new_v4();
        let token = signer.issue(user_id);
        assert!(token.starts_with(&user_id.to_string()));
        assert_eq!(signer.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_rejects_foreign_key() {
        let token = SessionSigner::new(b"one").issue(Uuid::new_v4());
        let err = SessionSigner::new(b"two").verify(&token).unwrap_err();
        assert!(matches!(err, SignatureError::SignatureMismatch));
    }

    #[test]
    fn test_rejects_swapped_user_id() {
        let signer = SessionSigner::new(b"cookie-secret");
        let token = signer.issue(Uuid::new_v4());
        let (_, rest) = token.split_once('.').unwrap();
        let forged = format!("{}.{rest}", Uuid::new_v4());
        assert!(matches!(
            signer.verify(&forged),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_rejects_expired_token() {
        let signer = SessionSigner::new(b"cookie-secret");
        let issued = time::OffsetDateTime::now_utc().unix_timestamp() - MAX_SESSION_AGE - 10;
        let token = signer.issue_at(Uuid::new_v4(), issued);
        assert!(matches!(signer.verify(&token), Err(SignatureError::Expired)));
    }

    #[test]
    fn test_rejects_garbage() {
        let signer = SessionSigner::new(b"cookie-secret");
        assert!(matches!(
            signer.verify("not-a-token"),
            Err(SignatureError::InvalidFormat)
        ));
        assert!(signer.verify("a.b.c").is_err());
    }
}
