//! Subscription tiers of the platform account and what each one allows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription level, ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Pro,
    Enterprise,
}

/// Quotas and features bundled with a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub mentions: bool,
    /// `None` means no monthly ceiling.
    pub monthly_posts: Option<u64>,
    pub read_cap: u64,
    pub daily_posts: u32,
    pub daily_replies: u32,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Basic, Tier::Pro, Tier::Enterprise];

    /// Infer the tier from the monthly project cap reported by the usage endpoint.
    ///
    /// Caps between the free and basic thresholds match no known plan and
    /// yield `None`.
    pub fn from_project_cap(cap: u64) -> Option<Tier> {
        match cap {
            c if c >= 10_000_000 => Some(Tier::Enterprise),
            c if c >= 1_000_000 => Some(Tier::Pro),
            c if c >= 10_000 => Some(Tier::Basic),
            c if c <= 500 => Some(Tier::Free),
            _ => None,
        }
    }

    pub fn limits(self) -> TierLimits {
        match self {
            Tier::Free => TierLimits {
                mentions: false,
                monthly_posts: Some(500),
                read_cap: 100,
                daily_posts: 15,
                daily_replies: 0,
            },
            Tier::Basic => TierLimits {
                mentions: true,
                monthly_posts: Some(3_000),
                read_cap: 10_000,
                daily_posts: 50,
                daily_replies: 50,
            },
            Tier::Pro => TierLimits {
                mentions: true,
                monthly_posts: Some(300_000),
                read_cap: 1_000_000,
                daily_posts: 500,
                daily_replies: 500,
            },
            Tier::Enterprise => TierLimits {
                mentions: true,
                monthly_posts: None,
                read_cap: 10_000_000,
                daily_posts: 1_000,
                daily_replies: 1_000,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Free < Tier::Basic);
        assert!(Tier::Basic < Tier::Pro);
        assert!(Tier::Pro < Tier::Enterprise);
    }

    #[test]
    fn project_cap_detection() {
        assert_eq!(Tier::from_project_cap(100), Some(Tier::Free));
        assert_eq!(Tier::from_project_cap(500), Some(Tier::Free));
        assert_eq!(Tier::from_project_cap(10_000), Some(Tier::Basic));
        assert_eq!(Tier::from_project_cap(1_000_000), Some(Tier::Pro));
        assert_eq!(Tier::from_project_cap(50_000_000), Some(Tier::Enterprise));
        assert_eq!(Tier::from_project_cap(2_000), None);
    }

    #[test]
    fn free_tier_has_no_replies() {
        let limits = Tier::Free.limits();
        assert!(!limits.mentions);
        assert_eq!(limits.daily_replies, 0);
        assert_eq!(limits.daily_posts, 15);
        assert!(Tier::Enterprise.limits().monthly_posts.is_none());
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Pro).unwrap(), "\"pro\"");
        assert_eq!(Tier::Basic.to_string(), "basic");
    }
}
