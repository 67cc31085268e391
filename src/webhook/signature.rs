//! HMAC-SHA256 message signatures.
//!
//! The signed content is the message id, the timestamp header and the raw
//! body concatenated in that order. The header value is `sha256=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the signature header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature")]
    Missing,
    #[error("malformed signature")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
    #[error("invalid key")]
    InvalidKey,
}

fn mac(secret: &str, message_id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    Ok(mac)
}

/// Compute the signature header value for a message
pub fn sign_message(secret: &str, message_id: &str, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mac = mac(secret, message_id, timestamp, body)?;
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes())))
}

/// Check a signature header value in constant time
pub fn verify_message(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = signature.ok_or(SignatureError::Missing)?;
    let encoded = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::Malformed)?;
    let expected = hex::decode(encoded).map_err(|_| SignatureError::Malformed)?;

    mac(secret, message_id, timestamp, body)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef";
    const TS: &str = "2023-07-19T14:56:51.634234626Z";

    #[test]
    fn test_sign_and_verify() {
        let body = br#"{"challenge":"abc"}"#;
        let signature = sign_message(SECRET, "id-1", TS, body).unwrap();

        assert!(signature.starts_with(SIGNATURE_PREFIX));
        assert_eq!(verify_message(SECRET, "id-1", TS, body, Some(&signature)), Ok(()));
    }

    #[test]
    fn test_known_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let signature = sign_message("key", "The quick brown ", "fox jumps over ", b"the lazy dog").unwrap();
        assert_eq!(
            signature,
            "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_tampered_body() {
        let signature = sign_message(SECRET, "id-1", TS, b"{}").unwrap();
        assert_eq!(
            verify_message(SECRET, "id-1", TS, b"{\"x\":1}", Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let signature = sign_message("another-secret-value", "id-1", TS, b"{}").unwrap();
        assert_eq!(
            verify_message(SECRET, "id-1", TS, b"{}", Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_missing_and_malformed() {
        assert_eq!(verify_message(SECRET, "id", TS, b"{}", None), Err(SignatureError::Missing));
        assert_eq!(
            verify_message(SECRET, "id", TS, b"{}", Some("md5=abcd")),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_message(SECRET, "id", TS, b"{}", Some("sha256=zz")),
            Err(SignatureError::Malformed)
        );
    }
}
