//! Twitter / X client over API v2.
//!
//! User-context calls (post, reply, media upload, mentions, profiles) are
//! signed with OAuth 1.0a. The authenticated account's user id is looked up
//! once and cached for mention queries.

use async_trait::async_trait;
use base64::Engine;
use murmur_config::TwitterConfig;
use murmur_core::error::SocialError;
use murmur_core::social::{InboundMention, Profile, SocialClient};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use crate::oauth::OAuth1Signer;

enum Body {
    Empty,
    Json(Value),
    Form(Vec<(&'static str, String)>),
}

/// Production client for the platform.
pub struct TwitterClient {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    signer: OAuth1Signer,
    user_id: OnceCell<String>,
}

impl TwitterClient {
    /// Build from the `[twitter]` config section. All four user-context
    /// credentials are required.
    pub fn from_config(config: &TwitterConfig) -> Result<Self, SocialError> {
        let (Some(key), Some(secret), Some(token), Some(token_secret)) = (
            config.api_key.as_ref(),
            config.api_secret.as_ref(),
            config.access_token.as_ref(),
            config.access_secret.as_ref(),
        ) else {
            return Err(SocialError::NotConfigured(
                "twitter api_key, api_secret, access_token and access_secret are required".into(),
            ));
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SocialError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            signer: OAuth1Signer::new(key, secret, token, token_secret),
            user_id: OnceCell::new(),
        })
    }

    /// Send a signed request and return the parsed JSON body.
    async fn send(&self, method: reqwest::Method, url: &str, query: &[(&str, &str)], body: Body) -> Result<Value, SocialError> {
        let mut signed: Vec<(&str, &str)> = query.to_vec();
        if let Body::Form(fields) = &body {
            signed.extend(fields.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let auth = self.signer.authorization(method.as_str(), url, &signed)?;

        let mut request = self
            .client
            .request(method, url)
            .header("Authorization", auth)
            .query(query);
        request = match body {
            Body::Empty => request,
            Body::Json(json) => request.json(&json),
            Body::Form(fields) => request.form(&fields),
        };

        let response = request.send().await.map_err(|e| SocialError::Transient(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| SocialError::Transient(e.to_string()))?;

        if !(200..300).contains(&status) {
            warn!(status, url, body = %text, "Platform returned error");
            return Err(map_status(status, text));
        }

        serde_json::from_str(&text).map_err(|e| SocialError::InvalidResponse(format!("{e}: {text}")))
    }

    /// The authenticated account's user id.
    async fn me(&self) -> Result<&str, SocialError> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let url = format!("{}/2/users/me", self.api_base);
                let body = self.send(reqwest::Method::GET, &url, &[], Body::Empty).await?;
                let id = body["data"]["id"]
                    .as_str()
                    .ok_or_else(|| SocialError::InvalidResponse("users/me without data.id".into()))?
                    .to_string();
                info!(user_id = %id, "Resolved authenticated account");
                Ok::<_, SocialError>(id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn create_tweet(&self, payload: Value) -> Result<String, SocialError> {
        let url = format!("{}/2/tweets", self.api_base);
        let body = self.send(reqwest::Method::POST, &url, &[], Body::Json(payload)).await?;
        body["data"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| SocialError::InvalidResponse("tweet created without data.id".into()))
    }
}

/// Build the `POST /2/tweets` payload.
fn tweet_payload(text: &str, reply_to: Option<&str>, media_id: Option<&str>) -> Value {
    let mut payload = serde_json::json!({ "text": text });
    if let Some(target) = reply_to {
        payload["reply"] = serde_json::json!({ "in_reply_to_tweet_id": target });
    }
    if let Some(media) = media_id {
        payload["media"] = serde_json::json!({ "media_ids": [media] });
    }
    payload
}

/// Map a non-2xx status onto the error taxonomy.
fn map_status(status: u16, body: String) -> SocialError {
    match status {
        429 => SocialError::RateLimited,
        401 | 403 => SocialError::Unauthorized(body),
        404 => SocialError::NotFound(body),
        s if s >= 500 => SocialError::Transient(format!("HTTP {s}: {body}")),
        s => SocialError::Api { status_code: s, message: body },
    }
}

/// Join mention tweets with their expanded authors.
fn parse_mentions(body: &Value) -> Vec<InboundMention> {
    let users: HashMap<&str, &str> = body["includes"]["users"]
        .as_array()
        .map(|users| {
            users
                .iter()
                .filter_map(|u| Some((u["id"].as_str()?, u["username"].as_str()?)))
                .collect()
        })
        .unwrap_or_default();

    body["data"]
        .as_array()
        .map(|tweets| {
            tweets
                .iter()
                .filter_map(|t| {
                    let id = t["id"].as_str()?;
                    let author_id = t["author_id"].as_str().unwrap_or("unknown");
                    Some(InboundMention {
                        id: id.to_string(),
                        author: users.get(author_id).copied().unwrap_or(author_id).to_string(),
                        text: t["text"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A lookup that returns `errors` without `data` means the user does not exist.
fn parse_profile(body: &Value) -> Option<Profile> {
    let data = body.get("data")?;
    let metrics = &data["public_metrics"];
    Some(Profile {
        username: data["username"].as_str().unwrap_or_default().to_string(),
        bio: data["description"].as_str().unwrap_or_default().to_string(),
        followers: metrics["followers_count"].as_u64().unwrap_or(0),
        following: metrics["following_count"].as_u64().unwrap_or(0),
        post_count: metrics["tweet_count"].as_u64().unwrap_or(0),
        location: data["location"].as_str().map(String::from),
    })
}

#[async_trait]
impl SocialClient for TwitterClient {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn post(&self, text: &str, media_id: Option<&str>) -> Result<String, SocialError> {
        let id = self.create_tweet(tweet_payload(text, None, media_id)).await?;
        info!(tweet_id = %id, has_media = media_id.is_some(), "Posted");
        Ok(id)
    }

    async fn reply(&self, text: &str, target_id: &str, media_id: Option<&str>) -> Result<String, SocialError> {
        let id = self.create_tweet(tweet_payload(text, Some(target_id), media_id)).await?;
        info!(tweet_id = %id, target_id, "Replied");
        Ok(id)
    }

    async fn upload_media(&self, bytes: &[u8]) -> Result<String, SocialError> {
        let url = format!("{}/1.1/media/upload.json", self.upload_base);
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let body = self
            .send(reqwest::Method::POST, &url, &[], Body::Form(vec![("media_data", encoded)]))
            .await?;
        let media_id = body["media_id_string"]
            .as_str()
            .ok_or_else(|| SocialError::InvalidResponse("upload without media_id_string".into()))?
            .to_string();
        debug!(media_id = %media_id, size = bytes.len(), "Uploaded media");
        Ok(media_id)
    }

    async fn get_mentions(&self, since_id: Option<&str>) -> Result<Vec<InboundMention>, SocialError> {
        let user_id = self.me().await?;
        let url = format!("{}/2/users/{user_id}/mentions", self.api_base);
        let mut query = vec![
            ("max_results", "10"),
            ("expansions", "author_id"),
            ("tweet.fields", "author_id,created_at"),
        ];
        if let Some(since) = since_id {
            query.push(("since_id", since));
        }
        let body = self.send(reqwest::Method::GET, &url, &query, Body::Empty).await?;
        let mentions = parse_mentions(&body);
        debug!(count = mentions.len(), "Fetched mentions");
        Ok(mentions)
    }

    async fn get_profile(&self, username: &str) -> Result<Option<Profile>, SocialError> {
        let username = username.trim_start_matches('@');
        let url = format!("{}/2/users/by/username/{username}", self.api_base);
        let query = [("user.fields", "description,public_metrics,location")];
        match self.send(reqwest::Method::GET, &url, &query, Body::Empty).await {
            Ok(body) => Ok(parse_profile(&body)),
            Err(SocialError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
