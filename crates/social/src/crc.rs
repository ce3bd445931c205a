//! Webhook challenge-response check.
//!
//! The platform proves a webhook URL by sending a `crc_token`; the endpoint
//! must answer with the HMAC-SHA256 of that token keyed by the consumer
//! secret, base64-encoded and prefixed with `sha256=`.

use base64::Engine;
use hmac::{Hmac, Mac};
use murmur_core::error::SocialError;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the `response_token` for a CRC challenge.
pub fn crc_response_token(consumer_secret: &str, crc_token: &str) -> Result<String, SocialError> {
    let mut mac = HmacSha256::new_from_slice(consumer_secret.as_bytes())
        .map_err(|e| SocialError::NotConfigured(format!("invalid consumer secret: {e}")))?;
    mac.update(crc_token.as_bytes());
    let digest = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("sha256={digest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let token = crc_response_token("secret", "challenge").unwrap();
        assert_eq!(token, "sha256=oeUF6Wxqoezggrue+wbIDxKRPSF6esKwizR2MHh9HaA=");
    }

    #[test]
    fn different_tokens_differ() {
        let a = crc_response_token("secret", "one").unwrap();
        let b = crc_response_token("secret", "two").unwrap();
        assert_ne!(a, b);
    }
}
