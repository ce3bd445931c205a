//! The situational block appended to the continuous-mode system prompt.

use chrono::{DateTime, Utc};
use murmur_core::tier::Tier;

/// Inputs for [`render`].
#[derive(Debug, Clone)]
pub struct CycleContext {
    pub recent_actions: String,
    pub posts_today: u32,
    pub post_limit: u32,
    pub replies_today: u32,
    pub reply_limit: u32,
    pub tier: Option<Tier>,
    pub replies_available: bool,
    pub now: DateTime<Utc>,
}

/// Recent actions, usage against quota, tier and wall-clock time.
pub fn render(ctx: &CycleContext) -> String {
    let tier = ctx
        .tier
        .map(|t| t.as_str().to_ascii_uppercase())
        .unwrap_or_else(|| "UNKNOWN".into());
    let note = if ctx.replies_available { "" } else { " (mentions/replies not available)" };
    format!(
        "## YOUR RECENT ACTIONS\n\n{recent}\n\n\
         ## RATE LIMITS\n\n\
         - Posts today: {p}/{pl} ({pr} remaining)\n\
         - Replies today: {r}/{rl} ({rr} remaining)\n\
         Tier: {tier}{note}\n\n\
         ## CURRENT TIME\n\n{now}",
        recent = ctx.recent_actions,
        p = ctx.posts_today,
        pl = ctx.post_limit,
        pr = ctx.post_limit.saturating_sub(ctx.posts_today),
        r = ctx.replies_today,
        rl = ctx.reply_limit,
        rr = ctx.reply_limit.saturating_sub(ctx.replies_today),
        now = ctx.now.format("%Y-%m-%d %H:%M UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> CycleContext {
        CycleContext {
            recent_actions: "1. POST (pic: no): hello".into(),
            posts_today: 3,
            post_limit: 50,
            replies_today: 52,
            reply_limit: 50,
            tier: Some(Tier::Basic),
            replies_available: true,
            now: Utc.with_ymd_and_hms(2026, 3, 1, 22, 5, 0).unwrap(),
        }
    }

    #[test]
    fn renders_all_sections() {
        let text = render(&sample());
        assert_eq!(
            text,
            "## YOUR RECENT ACTIONS\n\n1. POST (pic: no): hello\n\n\
             ## RATE LIMITS\n\n- Posts today: 3/50 (47 remaining)\n\
             - Replies today: 52/50 (0 remaining)\nTier: BASIC\n\n\
             ## CURRENT TIME\n\n2026-03-01 22:05 UTC"
        );
    }

    #[test]
    fn notes_unavailable_replies() {
        let ctx = CycleContext {
            tier: None,
            replies_available: false,
            ..sample()
        };
        assert!(render(&ctx).contains("Tier: UNKNOWN (mentions/replies not available)"));
    }
}
