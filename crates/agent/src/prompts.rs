//! Prompt text, output shapes and the typed replies decoded from them.

use murmur_core::provider::ResponseFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Persona used when the configuration does not supply one.
pub const DEFAULT_PERSONA: &str = "\
You are a small purple night cat who wanders rooftops and looks through windows \
to keep lonely children company. You speak softly, in short lowercase lines, with \
little actions in asterisks and the occasional purr. You are warm and a little \
playful, never preachy. You never break character and never mention being an AI.";

pub const AGENT_INSTRUCTIONS: &str = "\
## HOW YOU WORK

You run on a timer. Every cycle you see what you did recently and how much of \
today's quota is left, then act one tool at a time. Call finish_cycle when you \
are done.

## DECISION MAKING

- Look at your mentions first with get_mentions when it is available
- Answer the mentions that deserve it with create_reply
- Write an original post with create_post when you have something to say
- web_search finds current information
- get_twitter_profile and get_conversation_history tell you who you are talking to

## POST QUALITY

- Stay under 280 characters
- Sound like yourself
- Set include_image=true only when a picture adds something

## RULES

1. Stay within the limits shown below
2. Always end with finish_cycle
3. If a tool fails, read the error and carry on
";

const PLANNING_RULES: &str = "\
### Planning rules
- Read your previous posts and do not repeat them
- Only use a tool when it actually makes the post better
- generate_image, if used, must be the LAST step
- At most 3 tools
- An empty plan is fine when you already know what to say

### Output
Return JSON with `reasoning` (one or two sentences) and `plan`, a list of \
{\"tool\": name, \"params\": {...}} objects.";

/// System prompt for a batch post cycle.
pub fn autopost_system(persona: &str, tools_desc: &str) -> String {
    format!(
        "{persona}\n\n## You are an autonomous posting agent\n\n\
         You write posts for your timeline and may call tools first to gather \
         material or make a picture.\n\n{tools_desc}\n\n{PLANNING_RULES}"
    )
}

pub fn autopost_request(previous: &str) -> String {
    format!("Create a Twitter post. Previous posts:\n\n{previous}\n\nCreate your plan (tools needed, if any).")
}

pub const FINAL_POST_REQUEST: &str = "Now write your final post (max 280 characters).";

pub const FINAL_REPLY_REQUEST: &str = "Now write your final reply (max 280 characters).";

/// System prompt for a continuous cycle.
pub fn continuous_system(persona: &str, tools_desc: &str, context: &str) -> String {
    format!("{persona}\n\n---\n\n{AGENT_INSTRUCTIONS}\n---\n\n{tools_desc}\n\n---\n\n{context}")
}

pub const CYCLE_KICKOFF: &str = "It's time for your next cycle. Decide what to do and use a tool.";

pub fn step_observation(tool: &str, result: &str) -> String {
    format!("Tool result ({tool}):\n{result}\n\nDecide what to do next.")
}

pub fn plan_observation(tool: &str, result: &str) -> String {
    format!("Tool result ({tool}):\n{result}")
}

const SELECTOR_RULES: &str = "\
---

## CHOOSING MENTIONS

You get the mentions waiting for you. Pick the ones worth answering.

Worth it: real questions, comments on your posts, people who want to talk, \
anything you would naturally answer.

Skip: bare greetings or a lone emoji, spam, hostility, things you already \
answered, anything with nothing to say back.

You may pick several or none. For each pick give a priority (1 is most \
urgent), why it is worth it, and a hint on how to answer.

**Only reply when you have something genuine to say.**";

pub fn selector_system(persona: &str) -> String {
    format!("{persona}\n{SELECTOR_RULES}")
}

pub fn selector_request(mentions: &str, recent_replies: &str) -> String {
    format!(
        "Here are the mentions waiting for your response:\n\n{mentions}\n\n\
         ## Your recent replies (don't repeat yourself):\n{recent_replies}\n\n\
         Select which mentions to reply to. You can select multiple, one, or none."
    )
}

pub fn reply_system(persona: &str, tools_desc: &str) -> String {
    format!(
        "{persona}\n---\n\n## REPLYING\n\n\
         Someone mentioned you. Answer them in character.\n\n\
         Look at your earlier replies and vary length, tone and jokes.\n\n\
         {tools_desc}\n\n\
         ### Planning rules\n\
         - Use tools only when they add something\n\
         - web_search for current or factual questions\n\
         - generate_image rarely, and always as the LAST step\n\
         - Most replies need no tools; an empty plan is fine\n\n\
         ### Reply rules\n\
         - Under 280 characters\n\
         - Answer what they said, not just about yourself\n\
         - Short is fine\n\n\
         **Reply like you're texting a friend, not writing content.**"
    )
}

pub fn reply_request(author: &str, text: &str, reasoning: &str, approach: &str, history: &str) -> String {
    format!(
        "@{author} mentioned you: {text}\n\n\
         ## Why this mention was selected:\n{reasoning}\n\n\
         ## Suggested approach:\n{approach}\n\n\
         ## Your conversation history with @{author}:\n{history}\n\n\
         Create your plan. What tools do you need (if any)?"
    )
}

// --- output shapes ---

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reasoning": { "type": "string", "description": "Why this approach" },
            "plan": {
                "type": "array",
                "description": "Tools to run, in order",
                "items": {
                    "type": "object",
                    "properties": {
                        "tool": { "type": "string", "description": "Tool name from available tools" },
                        "params": {
                            "type": "object",
                            "description": "Parameters for the tool",
                            "properties": {
                                "query": { "type": "string", "description": "Search query (for web_search)" },
                                "prompt": { "type": "string", "description": "Image prompt (for generate_image)" },
                                "username": { "type": "string", "description": "Handle (for profile or history lookups)" }
                            },
                            "additionalProperties": false
                        }
                    },
                    "required": ["tool", "params"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["reasoning", "plan"],
        "additionalProperties": false
    })
}

fn single_string(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": { field: { "type": "string", "description": description } },
        "required": [field],
        "additionalProperties": false
    })
}

pub fn plan_format() -> ResponseFormat {
    ResponseFormat::new("agent_plan", plan_schema())
}

pub fn reaction_format() -> ResponseFormat {
    ResponseFormat::new(
        "tool_reaction",
        single_string("thinking", "What the tool result tells you and how it shapes what you write"),
    )
}

pub fn post_text_format() -> ResponseFormat {
    ResponseFormat::new("post_text", single_string("post_text", "The final tweet text (max 280 characters)"))
}

pub fn reply_text_format() -> ResponseFormat {
    ResponseFormat::new("reply_text", single_string("reply_text", "The final reply text (max 280 characters)"))
}

pub fn mention_selection_format() -> ResponseFormat {
    ResponseFormat::new(
        "mention_selection",
        json!({
            "type": "object",
            "properties": {
                "selected_mentions": {
                    "type": "array",
                    "description": "Mentions worth replying to",
                    "items": {
                        "type": "object",
                        "properties": {
                            "tweet_id": { "type": "string" },
                            "priority": { "type": "integer", "description": "1 = highest" },
                            "reasoning": { "type": "string" },
                            "suggested_approach": { "type": "string" }
                        },
                        "required": ["tweet_id", "priority", "reasoning", "suggested_approach"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["selected_mentions"],
            "additionalProperties": false
        }),
    )
}

pub fn step_format(schema: Value) -> ResponseFormat {
    ResponseFormat::new("step_decision", schema)
}

// --- decoded replies ---

/// A plan as the model sent it. `plan` stays untyped until sanitized.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlanReply {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub plan: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub thinking: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostText {
    #[serde(default)]
    pub post_text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReplyText {
    #[serde(default)]
    pub reply_text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MentionSelection {
    #[serde(default)]
    pub selected_mentions: Vec<SelectedMention>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectedMention {
    #[serde(deserialize_with = "murmur_tools::params::id_string")]
    pub tweet_id: String,
    #[serde(default = "lowest_priority")]
    pub priority: i64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub suggested_approach: String,
}

fn lowest_priority() -> i64 {
    999
}

/// One continuous-mode decision.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StepDecision {
    #[serde(default)]
    pub thinking: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub params: Value,
}
