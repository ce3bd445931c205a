//! Turning whatever the model proposed into a plan that is safe to run.
//!
//! [`sanitize_plan`] is total: anything it cannot make sense of is dropped,
//! so the worst outcome of a bad plan is an empty one.

use murmur_core::tool::ToolName;
use serde_json::{Map, Value};
use tracing::warn;

/// Longest plan a batch cycle executes, whatever the caller asks for.
pub use murmur_config::MAX_PLAN_STEPS;

/// One vetted tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub tool: ToolName,
    pub params: Value,
}

/// Sanitize a proposed plan against the admissible tool set.
///
/// The result holds at most `max_steps` steps (never more than
/// [`MAX_PLAN_STEPS`]), only tools from `admissible`, and at most one
/// image-class step, which is always last.
pub fn sanitize_plan(raw: &Value, admissible: &[ToolName], max_steps: usize) -> Vec<PlanStep> {
    let max_steps = max_steps.min(MAX_PLAN_STEPS);
    let Some(items) = raw.as_array() else {
        if !raw.is_null() {
            warn!("Plan is not a list, ignoring it");
        }
        return Vec::new();
    };

    let mut steps = Vec::new();
    let mut has_image = false;

    for item in items {
        if steps.len() >= max_steps {
            break;
        }
        let Some(step) = item.as_object() else {
            warn!("Dropping malformed plan step");
            continue;
        };
        let Some(name) = step.get("tool").and_then(Value::as_str) else {
            warn!("Dropping plan step without a tool name");
            continue;
        };
        let Some(tool) = name.parse::<ToolName>().ok().filter(|t| admissible.contains(t)) else {
            warn!(tool = %name, "Dropping unknown or inadmissible tool from plan");
            continue;
        };
        let params = match step.get("params") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(p @ Value::Object(_)) => p.clone(),
            Some(_) => {
                warn!(%tool, "Dropping plan step with non-object params");
                continue;
            }
        };
        if tool.is_image_class() {
            if has_image {
                continue;
            }
            has_image = true;
        }
        steps.push(PlanStep { tool, params });
    }

    // Stable partition: the image step goes last, everything else keeps its order.
    let (mut plan, image): (Vec<_>, Vec<_>) = steps.into_iter().partition(|s| !s.tool.is_image_class());
    plan.extend(image);
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BATCH: &[ToolName] = &[
        ToolName::WebSearch,
        ToolName::GetTwitterProfile,
        ToolName::GetConversationHistory,
        ToolName::GenerateImage,
    ];

    fn names(plan: &[PlanStep]) -> Vec<&'static str> {
        plan.iter().map(|s| s.tool.as_str()).collect()
    }

    #[test]
    fn non_list_input_is_empty() {
        assert!(sanitize_plan(&json!({"tool": "web_search"}), BATCH, 3).is_empty());
        assert!(sanitize_plan(&json!("web_search"), BATCH, 3).is_empty());
        assert!(sanitize_plan(&Value::Null, BATCH, 3).is_empty());
    }

    #[test]
    fn drops_malformed_and_unknown_steps() {
        let raw = json!([
            "web_search",
            {"params": {"query": "x"}},
            {"tool": "rm_rf", "params": {}},
            {"tool": "create_post", "params": {"text": "not in batch"}},
            {"tool": "web_search", "params": "query"},
            {"tool": "web_search", "params": {"query": "storms"}},
        ]);
        let plan = sanitize_plan(&raw, BATCH, 3);
        assert_eq!(names(&plan), ["web_search"]);
        assert_eq!(plan[0].params, json!({"query": "storms"}));
    }

    #[test]
    fn missing_params_become_empty_object() {
        let plan = sanitize_plan(&json!([{"tool": "web_search"}]), BATCH, 3);
        assert_eq!(plan[0].params, json!({}));
    }

    #[test]
    fn keeps_first_image_and_moves_it_last() {
        let raw = json!([
            {"tool": "generate_image", "params": {"prompt": "first"}},
            {"tool": "web_search", "params": {"query": "q"}},
            {"tool": "generate_image", "params": {"prompt": "second"}},
        ]);
        let plan = sanitize_plan(&raw, BATCH, 3);
        assert_eq!(names(&plan), ["web_search", "generate_image"]);
        assert_eq!(plan[1].params["prompt"], "first");
    }

    #[test]
    fn caps_length_before_reordering() {
        let raw = json!([
            {"tool": "generate_image", "params": {"prompt": "p"}},
            {"tool": "web_search", "params": {"query": "1"}},
            {"tool": "get_twitter_profile", "params": {"username": "a"}},
            {"tool": "get_conversation_history", "params": {"username": "a"}},
        ]);
        let plan = sanitize_plan(&raw, BATCH, 3);
        assert_eq!(names(&plan), ["web_search", "get_twitter_profile", "generate_image"]);
    }

    #[test]
    fn image_dropped_when_not_admissible() {
        let admissible = &[ToolName::WebSearch];
        let raw = json!([
            {"tool": "generate_image", "params": {"prompt": "p"}},
            {"tool": "web_search", "params": {"query": "q"}},
        ]);
        assert_eq!(names(&sanitize_plan(&raw, admissible, 3)), ["web_search"]);
    }

    #[test]
    fn output_invariants_hold_for_noisy_input() {
        let tools = ["web_search", "generate_image", "nope", "get_twitter_profile", "generate_image"];
        for len in 0..8 {
            let raw: Vec<Value> = (0..len)
                .map(|i| json!({"tool": tools[(i * 3 + len) % tools.len()], "params": {}}))
                .collect();
            let plan = sanitize_plan(&Value::Array(raw), BATCH, MAX_PLAN_STEPS);
            assert!(plan.len() <= MAX_PLAN_STEPS);
            let images = plan.iter().filter(|s| s.tool.is_image_class()).count();
            assert!(images <= 1);
            if images == 1 {
                assert!(plan.last().is_some_and(|s| s.tool.is_image_class()));
            }
            assert!(plan.iter().all(|s| BATCH.contains(&s.tool)));
        }
    }

    #[test]
    fn larger_step_budget_is_still_capped() {
        let raw = json!([
            {"tool": "web_search", "params": {"query": "a"}},
            {"tool": "get_twitter_profile", "params": {"username": "b"}},
            {"tool": "get_conversation_history", "params": {"username": "c"}},
            {"tool": "web_search", "params": {"query": "d"}},
            {"tool": "web_search", "params": {"query": "e"}},
        ]);
        let plan = sanitize_plan(&raw, BATCH, 10);
        assert_eq!(plan.len(), MAX_PLAN_STEPS);
        assert_eq!(names(&plan), ["web_search", "get_twitter_profile", "get_conversation_history"]);
    }
}
