//! Usage detection against the platform's account-limits endpoint.

use async_trait::async_trait;
use murmur_config::TwitterConfig;
use murmur_core::error::SocialError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Monthly usage as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub project_cap: u64,
    pub project_usage: u64,
    pub cap_reset_day: Option<u32>,
    pub project_id: Option<String>,
}

impl UsageSnapshot {
    /// Usage as a percentage of the cap. Zero when the cap is unknown.
    pub fn percent(&self) -> f64 {
        if self.project_cap == 0 {
            0.0
        } else {
            self.project_usage as f64 / self.project_cap as f64 * 100.0
        }
    }
}

/// What one detection call learned.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Usage(UsageSnapshot),
    /// HTTP 429: try again later, nothing learned.
    Throttled,
    /// HTTP 403: the endpoint is not part of the plan.
    Forbidden,
}

/// Anything that can ask the platform for the account's usage.
#[async_trait]
pub trait UsageProbe: Send + Sync {
    async fn probe(&self) -> Result<ProbeOutcome, SocialError>;
}

/// Calls `GET /2/usage/tweets` with the app bearer token.
pub struct HttpUsageProbe {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpUsageProbe {
    pub fn from_config(config: &TwitterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/2/usage/tweets", config.api_base.trim_end_matches('/')),
            bearer_token: config.bearer_token.clone(),
        }
    }
}

/// Numbers in the usage payload arrive either as JSON numbers or strings.
fn as_u64(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn parse_usage(body: &Value) -> Result<UsageSnapshot, SocialError> {
    let data = body
        .get("data")
        .ok_or_else(|| SocialError::InvalidResponse("usage payload without data".into()))?;
    let project_cap = as_u64(&data["project_cap"])
        .ok_or_else(|| SocialError::InvalidResponse("usage payload without project_cap".into()))?;
    Ok(UsageSnapshot {
        project_cap,
        project_usage: as_u64(&data["project_usage"]).unwrap_or(0),
        cap_reset_day: as_u64(&data["cap_reset_day"]).and_then(|d| u32::try_from(d).ok()),
        project_id: data["project_id"]
            .as_str()
            .map(String::from)
            .or_else(|| data["project_id"].as_u64().map(|n| n.to_string())),
    })
}

#[async_trait]
impl UsageProbe for HttpUsageProbe {
    async fn probe(&self) -> Result<ProbeOutcome, SocialError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or_else(|| SocialError::NotConfigured("TWITTER_BEARER_TOKEN is not set".into()))?;

        let response = self
            .client
            .get(&self.url)
            .timeout(Duration::from_secs(30))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SocialError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            429 => return Ok(ProbeOutcome::Throttled),
            403 => return Ok(ProbeOutcome::Forbidden),
            s if !(200..300).contains(&s) => {
                let body = response.text().await.unwrap_or_default();
                return Err(SocialError::Api { status_code: s, message: body });
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SocialError::InvalidResponse(e.to_string()))?;
        let snapshot = parse_usage(&body)?;
        debug!(cap = snapshot.project_cap, usage = snapshot.project_usage, "Usage probe succeeded");
        Ok(ProbeOutcome::Usage(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_string_fields() {
        let body = serde_json::json!({
            "data": {
                "project_cap": "10000",
                "project_usage": 2500,
                "cap_reset_day": 14,
                "project_id": "1234567"
            }
        });
        let snap = parse_usage(&body).unwrap();
        assert_eq!(snap.project_cap, 10_000);
        assert_eq!(snap.project_usage, 2_500);
        assert_eq!(snap.cap_reset_day, Some(14));
        assert_eq!(snap.project_id.as_deref(), Some("1234567"));
        assert!((snap.percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_cap_is_invalid() {
        let body = serde_json::json!({"data": {"project_usage": 3}});
        assert!(matches!(parse_usage(&body), Err(SocialError::InvalidResponse(_))));
        assert!(parse_usage(&serde_json::json!({"errors": []})).is_err());
    }

    #[test]
    fn zero_cap_percent_is_zero() {
        let snap = UsageSnapshot {
            project_cap: 0,
            project_usage: 10,
            cap_reset_day: None,
            project_id: None,
        };
        assert_eq!(snap.percent(), 0.0);
    }

    #[tokio::test]
    async fn missing_bearer_is_not_configured() {
        let probe = HttpUsageProbe::from_config(&TwitterConfig::default());
        assert!(matches!(probe.probe().await, Err(SocialError::NotConfigured(_))));
    }
}
