//! Length policy for anything that gets published.

/// Platform limit, in code points.
pub const MAX_POST_CHARS: usize = 280;

const ELLIPSIS: &str = "...";

/// Trim and hard-truncate to [`MAX_POST_CHARS`], ending in `...` when cut.
pub fn cap_length(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_POST_CHARS {
        return text.to_string();
    }
    let keep = MAX_POST_CHARS - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_only_trimmed() {
        assert_eq!(cap_length("  hello  "), "hello");
    }

    #[test]
    fn exactly_at_limit_is_kept() {
        let text = "a".repeat(280);
        assert_eq!(cap_length(&text), text);
    }

    #[test]
    fn long_text_is_cut_with_ellipsis() {
        let capped = cap_length(&"b".repeat(400));
        assert_eq!(capped.chars().count(), 280);
        assert!(capped.ends_with("bbb..."));
    }

    #[test]
    fn counts_code_points_not_bytes() {
        let capped = cap_length(&"🐾".repeat(300));
        assert_eq!(capped.chars().count(), 280);
        assert!(capped.starts_with("🐾"));
    }
}
