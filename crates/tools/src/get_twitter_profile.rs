//! Public profile lookup.

use crate::context::{ToolContext, ToolOutput};
use crate::params::{decode, handle};
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::social::Profile;
use murmur_core::tool::{ParamSpec, ToolName};
use serde::Deserialize;
use tracing::{info, warn};

pub struct GetTwitterProfileTool;

#[derive(Deserialize)]
struct Params {
    #[serde(deserialize_with = "handle")]
    username: String,
}

const PARAMS: &[ParamSpec] = &[ParamSpec::required("username", "string", "Twitter handle without @")];

/// `1234567` → `1,234,567`
fn grouped(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn render(profile: &Profile) -> String {
    let bio = if profile.bio.trim().is_empty() { "No bio" } else { profile.bio.as_str() };
    let location = profile
        .location
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or("Not specified");
    format!(
        "Profile for @{}:\nBio: {bio}\nFollowers: {}\nFollowing: {}\nTweets: {}\nLocation: {location}",
        profile.username,
        grouped(profile.followers),
        grouped(profile.following),
        grouped(profile.post_count),
    )
}

#[async_trait]
impl Tool for GetTwitterProfileTool {
    fn name(&self) -> ToolName {
        ToolName::GetTwitterProfile
    }

    fn description(&self) -> &'static str {
        "Get a Twitter user's profile info (bio, followers, tweets count)"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let Params { username } = decode(params)?;
        info!(%username, "Fetching profile");

        match ctx.social.get_profile(&username).await {
            Ok(Some(profile)) => Ok(ToolOutput::ok(render(&profile))),
            Ok(None) => Ok(ToolOutput::failure(format!("Error: User @{username} not found"))),
            Err(e) => {
                warn!(%username, error = %e, "Profile lookup failed");
                Ok(ToolOutput::failure(format!("Error: Could not fetch @{username}: {e}")))
            }
        }
    }
}
