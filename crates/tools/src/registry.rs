//! The action registry: discovery, description, and dispatch.

use crate::context::{ToolContext, ToolOutput};
use crate::Tool;
use chrono::Utc;
use murmur_core::error::ToolError;
use murmur_core::event::{DomainEvent, EventBus};
use murmur_core::tier::Tier;
use murmur_core::tool::{Mode, ToolDescriptor, ToolName};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Ordered set of registered tools plus the feature flags that hide some.
///
/// Holds no cycle state and can be rebuilt at any time.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    image_generation: bool,
    mentions: bool,
    events: Option<Arc<EventBus>>,
}

impl ToolRegistry {
    pub fn new(image_generation: bool, mentions: bool) -> Self {
        Self {
            tools: Vec::new(),
            image_generation,
            mentions,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Register a tool. Replaces a tool with the same name in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(i) => self.tools[i] = tool,
            None => self.tools.push(tool),
        }
    }

    fn enabled(&self, name: ToolName) -> bool {
        (!name.is_image_class() || self.image_generation) && (!name.is_mention_class() || self.mentions)
    }

    fn admits(&self, name: ToolName, mode: Mode, tier: Option<Tier>) -> bool {
        name.offered_in(mode) && self.enabled(name) && tier.is_none_or(|t| t >= name.min_tier())
    }

    /// Admissible tools for `mode` and `tier`, in registration order.
    ///
    /// An unknown tier (`None`) passes every tier restriction.
    pub fn list_tools(&self, mode: Mode, tier: Option<Tier>) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| self.admits(t.name(), mode, tier))
            .map(|t| ToolDescriptor {
                name: t.name(),
                description: t.description().to_string(),
                params: t
                    .params()
                    .iter()
                    .filter(|p| !p.image_only || self.image_generation)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Names of the admissible tools.
    pub fn admissible(&self, mode: Mode, tier: Option<Tier>) -> Vec<ToolName> {
        self.list_tools(mode, tier).into_iter().map(|d| d.name).collect()
    }

    /// The tool block injected into the model's instructions. Stable across
    /// calls for the same inputs.
    pub fn describe(&self, mode: Mode, tier: Option<Tier>) -> String {
        let mut lines = vec!["## AVAILABLE TOOLS\n".to_string()];
        for (i, tool) in self.list_tools(mode, tier).iter().enumerate() {
            lines.push(format!("{}. **{}** - {}", i + 1, tool.name, tool.description));
            if tool.params.is_empty() {
                lines.push("   - params: none".into());
            } else {
                lines.push("   - params:".into());
                for p in &tool.params {
                    let required = if p.required { " [REQUIRED]" } else { "" };
                    lines.push(format!("     - {} ({}){required}: {}", p.name, p.kind, p.description));
                }
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// JSON schema for a single continuous-mode decision:
    /// `{thinking, tool, params}` with `tool` restricted to the admissible names.
    pub fn step_schema(&self, mode: Mode, tier: Option<Tier>) -> Value {
        let tools = self.list_tools(mode, tier);
        let names: Vec<&str> = tools.iter().map(|d| d.name.as_str()).collect();

        let mut properties = Map::new();
        for p in tools.iter().flat_map(|d| d.params.iter()) {
            properties
                .entry(p.name.to_string())
                .or_insert_with(|| json!({ "type": p.kind }));
        }

        json!({
            "type": "object",
            "properties": {
                "thinking": {
                    "type": "string",
                    "description": "Your reasoning about what to do next"
                },
                "tool": {
                    "type": "string",
                    "enum": names,
                    "description": "Which tool to use"
                },
                "params": {
                    "type": "object",
                    "description": "Parameters for the tool",
                    "properties": properties,
                    "additionalProperties": false
                }
            },
            "required": ["thinking", "tool", "params"],
            "additionalProperties": false
        })
    }

    /// Invoke `name`. Never fails: unknown tools, bad parameters and faults
    /// all come back as an error observation.
    pub async fn invoke(&self, name: &str, params: Value, ctx: &ToolContext) -> ToolOutput {
        let tool = name
            .parse::<ToolName>()
            .ok()
            .filter(|n| self.enabled(*n))
            .and_then(|n| self.tools.iter().find(|t| t.name() == n));
        let Some(tool) = tool else {
            warn!(tool = %name, "Unknown tool requested");
            return ToolOutput::unknown_tool(name);
        };

        debug!(tool = %name, params = %params, "Invoking tool");
        let start = Instant::now();
        let output = match tool.execute(params, ctx).await {
            Ok(output) => output,
            Err(ToolError::InvalidArguments(reason)) => {
                warn!(tool = %name, %reason, "Invalid tool parameters");
                ToolOutput::failure(format!("Error: invalid parameters for {name}: {reason}"))
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool failed");
                ToolOutput::failure(format!("Error executing {name}: {e}"))
            }
        };

        if let Some(events) = &self.events {
            events.publish(DomainEvent::ToolExecuted {
                tool_name: name.to_string(),
                success: output.success,
                duration_ms: start.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });
        }
        output
    }

    /// Registered names, regardless of filters.
    pub fn names(&self) -> Vec<ToolName> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}
