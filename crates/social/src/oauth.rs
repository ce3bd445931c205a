//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! Query parameters and form-encoded body parameters take part in the
//! signature; JSON bodies do not.

use base64::Engine;
use hmac::{Hmac, Mac};
use murmur_core::error::SocialError;
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Signs requests on behalf of one user.
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl OAuth1Signer {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }

    /// Build the `Authorization` header value for a request.
    ///
    /// `url` must not carry a query string; pass query and form parameters
    /// in `params`.
    pub fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> Result<String, SocialError> {
        let nonce: String = rand::rng()
            .sample_iter(rand::distr::Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_with(method, url, params, &nonce, &timestamp)
    }

    fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, SocialError> {
        let mut oauth = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = self.signature(method, url, params, &oauth)?;
        oauth.push(("oauth_signature", signature.as_str()));

        let fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth: &[(&str, &str)],
    ) -> Result<String, SocialError> {
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .chain(oauth.iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        pairs.sort();
        let param_string = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&param_string)
        );
        let key = format!("{}&{}", encode(&self.consumer_secret), encode(&self.token_secret));

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| SocialError::NotConfigured(format!("invalid signing key: {e}")))?;
        mac.update(base.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("consumer_key", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// RFC 3986 percent-encoding (unreserved characters pass through).
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}
