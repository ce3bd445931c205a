use crate::context::{ToolContext, ToolOutput};
use crate::params::decode;
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::tool::{ParamSpec, ToolName};
use serde::Deserialize;
use tracing::info;

/// The terminal tool of a continuous cycle.
pub struct FinishCycleTool;

#[derive(Deserialize)]
struct Params {
    #[serde(default)]
    reasoning: String,
}

const PARAMS: &[ParamSpec] = &[ParamSpec::required("reasoning", "string", "Why you're finishing the cycle")];

#[async_trait]
impl Tool for FinishCycleTool {
    fn name(&self) -> ToolName {
        ToolName::FinishCycle
    }

    fn description(&self) -> &'static str {
        "End this agent cycle when you're done or have nothing more to do"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(&self, params: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let Params { reasoning } = decode(params)?;
        info!(%reasoning, "Cycle finished by agent");
        let mut out = ToolOutput::ok(format!("CYCLE_FINISHED: {reasoning}"));
        out.finished = Some(reasoning);
        Ok(out)
    }
}
