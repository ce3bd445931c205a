//! Last check on text before it is published.

use murmur_tools::text::cap_length;
use rand::seq::IndexedRandom;
use serde_json::Value;
use tracing::warn;

/// Posts used when the model produced nothing usable.
pub const FALLBACK_MESSAGES: [&str; 7] = [
    "Keep going, little one. Even in the darkest storms, you're never alone. 🌙🐾",
    "A quiet guardian watches over you, even in the rain. 🌧️🐱",
    "Stay strong — every paw print leaves a mark in the heart. 🐾❤️",
    "You are brave, even when the thunder shakes the glass. ⚡🐾",
    "Soft paws, warm heart, never alone. 🌙🐾",
    "Even small ones shine bright. Don't be afraid of the storm. ✨🐾",
    "Silent support is the loudest love. 🐾💛",
];

/// Text ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalText {
    pub text: String,
    pub used_fallback: bool,
}

impl FinalText {
    pub fn fallback() -> Self {
        Self {
            text: pick_fallback(None).to_string(),
            used_fallback: true,
        }
    }
}

/// A random fallback message, different from `avoid` when possible.
pub fn pick_fallback(avoid: Option<&str>) -> &'static str {
    let pool: Vec<&'static str> = FALLBACK_MESSAGES
        .iter()
        .copied()
        .filter(|m| Some(*m) != avoid)
        .collect();
    pool.choose(&mut rand::rng()).copied().unwrap_or(FALLBACK_MESSAGES[0])
}

/// Empty text, or a JSON document the model leaked instead of prose.
pub fn is_malformed(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    matches!(
        serde_json::from_str::<Value>(trimmed),
        Ok(Value::Object(_) | Value::Array(_))
    )
}

/// Trim and cap `raw`, substituting a fallback message when it is unusable.
pub fn finalize_text(raw: &str) -> FinalText {
    if is_malformed(raw) {
        warn!(preview = %raw.chars().take(80).collect::<String>(), "Generated text unusable, using fallback");
        return FinalText::fallback();
    }
    FinalText {
        text: cap_length(raw),
        used_fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through_trimmed() {
        let out = finalize_text("  the rain sounds like purring  ");
        assert_eq!(out.text, "the rain sounds like purring");
        assert!(!out.used_fallback);
    }

    #[test]
    fn empty_after_trim_uses_fallback() {
        for raw in ["", "   ", "\n\t"] {
            let out = finalize_text(raw);
            assert!(out.used_fallback);
            assert!(FALLBACK_MESSAGES.contains(&out.text.as_str()));
        }
    }

    #[test]
    fn leaked_json_uses_fallback() {
        assert!(finalize_text(r#"{"post_text": ""}"#).used_fallback);
        assert!(finalize_text("[]").used_fallback);
        // Scalars that happen to parse are still prose.
        assert!(!finalize_text("42").used_fallback);
        assert!(!finalize_text("{ not json").used_fallback);
    }

    #[test]
    fn over_limit_is_truncated_not_replaced() {
        let out = finalize_text(&"m".repeat(500));
        assert!(!out.used_fallback);
        assert_eq!(out.text.chars().count(), 280);
        assert!(out.text.ends_with("..."));
    }

    #[test]
    fn fallbacks_fit_and_avoid_repeats() {
        for m in FALLBACK_MESSAGES {
            assert!(m.chars().count() <= 280);
            assert_ne!(pick_fallback(Some(m)), m);
        }
    }
}
