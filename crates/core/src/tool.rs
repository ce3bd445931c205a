//! The closed set of agent capabilities.
//!
//! Every tool the model can name is a [`ToolName`] variant. Static facts about
//! a tool (which mode offers it, the minimum tier, whether it is single-use or
//! terminal) live here so that the registry, the sanitizer and the loop agree
//! on them without string matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::ledger::ActionKind;
use crate::tier::Tier;

/// Control shape of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One up-front plan, executed step by step, then exactly one publish.
    Batch,
    /// One tool per decision until the model finishes or the step cap hits.
    Continuous,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Batch => "batch",
            Mode::Continuous => "continuous",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" | "plan" => Ok(Mode::Batch),
            "continuous" | "agent" | "unified" => Ok(Mode::Continuous),
            other => Err(format!("unknown mode '{other}' (expected batch or continuous)")),
        }
    }
}

/// Registered tool names, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    WebSearch,
    GetTwitterProfile,
    GetConversationHistory,
    GenerateImage,
    CreatePost,
    CreateReply,
    GetMentions,
    FinishCycle,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::WebSearch,
        ToolName::GetTwitterProfile,
        ToolName::GetConversationHistory,
        ToolName::GenerateImage,
        ToolName::CreatePost,
        ToolName::CreateReply,
        ToolName::GetMentions,
        ToolName::FinishCycle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::WebSearch => "web_search",
            ToolName::GetTwitterProfile => "get_twitter_profile",
            ToolName::GetConversationHistory => "get_conversation_history",
            ToolName::GenerateImage => "generate_image",
            ToolName::CreatePost => "create_post",
            ToolName::CreateReply => "create_reply",
            ToolName::GetMentions => "get_mentions",
            ToolName::FinishCycle => "finish_cycle",
        }
    }

    /// Whether `mode` offers this tool at all.
    pub fn offered_in(self, mode: Mode) -> bool {
        match self {
            ToolName::WebSearch | ToolName::GetTwitterProfile | ToolName::GetConversationHistory => true,
            ToolName::GenerateImage => mode == Mode::Batch,
            ToolName::CreatePost | ToolName::CreateReply | ToolName::GetMentions | ToolName::FinishCycle => {
                mode == Mode::Continuous
            }
        }
    }

    pub fn min_tier(self) -> Tier {
        match self {
            ToolName::CreateReply | ToolName::GetMentions => Tier::Basic,
            _ => Tier::Free,
        }
    }

    /// Single-use per cycle; hidden when image generation is off.
    pub fn is_image_class(self) -> bool {
        self == ToolName::GenerateImage
    }

    /// Hidden when reply features are disabled.
    pub fn is_mention_class(self) -> bool {
        matches!(self, ToolName::CreateReply | ToolName::GetMentions)
    }

    pub fn is_terminal(self) -> bool {
        self == ToolName::FinishCycle
    }

    /// The artifact kind this tool publishes, if it publishes one.
    pub fn publishes(self) -> Option<ActionKind> {
        match self {
            ToolName::CreatePost => Some(ActionKind::Post),
            ToolName::CreateReply => Some(ActionKind::Reply),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}

/// One parameter of a tool, as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    /// JSON Schema type ("string", "boolean")
    pub kind: &'static str,
    pub description: &'static str,
    pub required: bool,
    /// Only shown when image generation is enabled
    pub image_only: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: &'static str, description: &'static str) -> Self {
        Self { name, kind, description, required: true, image_only: false }
    }

    pub const fn optional(name: &'static str, kind: &'static str, description: &'static str) -> Self {
        Self { name, kind, description, required: false, image_only: false }
    }

    pub const fn image_flag(name: &'static str, description: &'static str) -> Self {
        Self { name, kind: "boolean", description, required: false, image_only: true }
    }
}

/// An admissible tool as exposed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    /// JSON Schema object for this tool's parameters.
    pub fn parameters_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for p in &self.params {
            properties.insert(
                p.name.to_string(),
                serde_json::json!({ "type": p.kind, "description": p.description }),
            );
            if p.required {
                required.push(p.name);
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
